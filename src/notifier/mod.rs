//! Delivery of go-live notifications to chat channels.

use async_trait::async_trait;

use crate::notifier::error::NotifierError;
use crate::notifier::live_notification::LiveNotification;

pub mod discord_channel_notifier;
pub mod error;
pub mod live_notification;
pub mod message_builder;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `notification` to the channel identified by `channel_id`.
    async fn notify(
        &self,
        channel_id: u64,
        notification: &LiveNotification,
    ) -> Result<(), NotifierError>;
}
