use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Persisted store errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process has locked the database
    #[error("Another instance of podsync appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a sqlx error, recognising SQLite lock failures
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StoreError::InstanceLocked;
        }

        StoreError::Other(err)
    }
}

/// Converts a stored INTEGER back to seconds, treating corrupt negatives as 0.
pub(crate) fn to_seconds(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Converts seconds to a storable INTEGER, saturating at `i64::MAX`.
pub(crate) fn from_seconds(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
