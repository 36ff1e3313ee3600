//! Offset pagination for user listings.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Page size used when a caller asks for a limit of zero.
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// An offset/limit window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    offset: u32,
    limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    /// Creates a page from caller-supplied values.
    ///
    /// A `limit` of zero selects [`DEFAULT_PAGE_LIMIT`]. Negative values are
    /// rejected.
    pub fn new(offset: i64, limit: i64) -> Result<Self, ValidationError> {
        Self::with_default_limit(offset, limit, DEFAULT_PAGE_LIMIT)
    }

    /// Like [`Page::new`] but with a configurable default for a zero limit.
    pub fn with_default_limit(
        offset: i64,
        limit: i64,
        default_limit: u32,
    ) -> Result<Self, ValidationError> {
        let offset = u32::try_from(offset).map_err(|_| ValidationError::InvalidField {
            field: "offset".to_string(),
            message: format!("must be between 0 and {}", u32::MAX),
        })?;
        let limit = u32::try_from(limit).map_err(|_| ValidationError::InvalidField {
            field: "limit".to_string(),
            message: format!("must be between 0 and {}", u32::MAX),
        })?;
        Ok(Self {
            offset,
            limit: if limit == 0 { default_limit } else { limit },
        })
    }

    /// Caps the limit at `max`.
    pub fn clamp_limit(mut self, max: u32) -> Self {
        self.limit = self.limit.min(max);
        self
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Maximum number of rows to return.
    pub fn limit(&self) -> u32 {
        self.limit
    }
}
