#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NotifierError {
    #[error("Failed to deliver notification to channel {channel_id}: {source}")]
    DeliveryFailed {
        channel_id: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Delivery to channel {channel_id} timed out after {timeout_secs}s")]
    Timeout { channel_id: u64, timeout_secs: u64 },

    #[error("Invalid channel id {channel_id}")]
    InvalidChannel { channel_id: u64 },

    #[error("Channel {channel_id} is unavailable (status {status}): {source}")]
    ChannelUnavailable {
        channel_id: u64,
        status: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl NotifierError {
    /// Classifies a rejected send by its HTTP status, if any.
    ///
    /// 403 and 404 mean the channel is gone or the bot lost access to it.
    pub fn from_delivery(
        channel_id: u64,
        status: Option<u16>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        match status {
            Some(status @ (403 | 404)) => NotifierError::ChannelUnavailable {
                channel_id,
                status,
                source,
            },
            _ => NotifierError::DeliveryFailed { channel_id, source },
        }
    }

    /// Whether retrying the same channel can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            NotifierError::InvalidChannel { .. } | NotifierError::ChannelUnavailable { .. }
        )
    }
}
