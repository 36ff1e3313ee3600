//! One-way password digests.
//!
//! The account operations only need to produce a digest and compare a
//! plaintext against one. [`Argon2Digest`] stores argon2id PHC strings
//! (`$argon2id$v=19$m=...`), which carry their own salt and cost
//! parameters, so digests written under one cost setting still verify
//! after the setting changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

/// Failure to produce a digest.
#[derive(Debug, Error)]
#[error("password digest failed: {0}")]
pub struct DigestError(String);

/// Produces and checks one-way password digests.
pub trait PasswordDigest: Send + Sync {
    /// Digests `plain`.
    fn digest(&self, plain: &str) -> Result<String, DigestError>;

    /// Returns `true` if `plain` matches `digest`. Malformed digests never
    /// match.
    fn verify(&self, plain: &str, digest: &str) -> bool;
}

/// Argon2id digests with a random per-password salt.
#[derive(Debug, Clone)]
pub struct Argon2Digest {
    params: Params,
}

impl Default for Argon2Digest {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Digest {
    /// Creates a digest with explicit costs: memory in KiB, iterations and
    /// lanes.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, DigestError> {
        let params =
            Params::new(m_cost, t_cost, p_cost, None).map_err(|e| DigestError(e.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordDigest for Argon2Digest {
    fn digest(&self, plain: &str) -> Result<String, DigestError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| DigestError(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .hasher()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
