//! Application-level errors.

use log::error;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Invalid config value for \"{key}\": {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },
}

impl AppError {
    /// Logs an error together with a fresh reference id and returns the id.
    ///
    /// The id is shown to users so a report can be matched to the log line.
    pub fn log_with_ref(err: &(dyn std::error::Error + Send + Sync)) -> String {
        let ref_id = Uuid::new_v4().simple().to_string();
        error!("[ref {ref_id}] {err:?}");
        ref_id
    }
}
