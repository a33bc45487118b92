use crate::platform::error::PlatformError;
use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Unable to find user {login}. Expected 1 result, got {found}")]
    StreamerNotFound { login: String, found: usize },

    #[error("This channel is already subscribed to {display_name} streams")]
    DuplicateSubscription { display_name: String },

    #[error("PlatformError: {0}")]
    PlatformError(#[from] PlatformError),

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl ServiceError {
    /// Whether this is an expected outcome of user input rather than a failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ServiceError::StreamerNotFound { .. } | ServiceError::DuplicateSubscription { .. }
        )
    }
}
