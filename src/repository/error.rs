#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Failed to apply migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Channel {channel_id} is already subscribed to streamer {streamer_id}")]
    DuplicateSubscription { streamer_id: i64, channel_id: u64 },
}

impl DatabaseError {
    /// Whether this wraps a UNIQUE constraint violation from the backend.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::BackendError(e) => e
                .as_database_error()
                .is_some_and(|db_err| matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation)),
            _ => false,
        }
    }
}
