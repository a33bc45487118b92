//! Notifier that posts go-live embeds into Discord text channels.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use poise::serenity_prelude::Error as SerenityError;
use poise::serenity_prelude::GenericChannelId;
use poise::serenity_prelude::Http;

use crate::notifier::Notifier;
use crate::notifier::error::NotifierError;
use crate::notifier::live_notification::LiveNotification;
use crate::notifier::message_builder::LiveMessageBuilder;

pub struct DiscordChannelNotifier {
    http: Arc<Http>,
    timeout: Duration,
}

impl DiscordChannelNotifier {
    pub fn new(http: Arc<Http>, timeout: Duration) -> Self {
        debug!("Initializing DiscordChannelNotifier.");
        Self { http, timeout }
    }
}

#[async_trait]
impl Notifier for DiscordChannelNotifier {
    async fn notify(
        &self,
        channel_id: u64,
        notification: &LiveNotification,
    ) -> Result<(), NotifierError> {
        if channel_id == 0 {
            return Err(NotifierError::InvalidChannel { channel_id });
        }

        let channel = GenericChannelId::new(channel_id);
        let message = LiveMessageBuilder::new(notification).build();

        debug!(
            "Sending notification to channel `{}`: {}",
            channel_id, notification.title
        );
        match tokio::time::timeout(self.timeout, channel.send_message(&self.http, message)).await {
            Ok(Ok(_)) => {
                info!(
                    "Successfully sent notification to channel `{}`: {}",
                    channel_id, notification.title
                );
                Ok(())
            }
            Ok(Err(e)) => {
                let status = match &e {
                    SerenityError::Http(http_err) => http_err.status_code().map(|s| s.as_u16()),
                    _ => None,
                };
                Err(NotifierError::from_delivery(channel_id, status, Box::new(e)))
            }
            Err(_) => Err(NotifierError::Timeout {
                channel_id,
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}
