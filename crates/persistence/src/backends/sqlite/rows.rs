//! Column conversions shared by the control and tenant queries.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

use crate::error::{ResourceError, StorageError};

pub(crate) fn uuid_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parsed_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Maps a UNIQUE constraint failure to `AlreadyExists`, and anything else to
/// the generic conversion.
pub(crate) fn insert_error(err: rusqlite::Error, kind: &'static str, key: &str) -> StorageError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation
            && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        {
            return ResourceError::AlreadyExists {
                kind,
                key: key.to_string(),
            }
            .into();
        }
    }
    err.into()
}

/// Fails with `NotFound` when an update touched no row.
pub(crate) fn require_updated(changed: usize, kind: &'static str, id: impl ToString) -> Result<(), StorageError> {
    if changed == 0 {
        return Err(ResourceError::NotFound {
            kind,
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}
