//! Go-live subscription management service.

use std::sync::Arc;

use log::debug;
use log::info;

use crate::entity::SubscriptionEntity;
use crate::platform::StreamPlatform;
use crate::repository::Repository;
use crate::repository::error::DatabaseError;
use crate::service::error::ServiceError;

/// Outcome of a successful subscribe.
#[derive(Clone, Debug)]
pub struct Subscribed {
    /// Display name of the streamer as reported by the platform
    pub display_name: String,
    pub subscription: SubscriptionEntity,
}

/// Service for managing channel subscriptions to streamers.
///
/// Creation and deletion are single statements, so this service does not take
/// the lock the periodic tasks share.
pub struct SubscriptionService {
    pub repo: Arc<Repository>,
    pub platform: Arc<dyn StreamPlatform>,
}

impl SubscriptionService {
    pub fn new(repo: Arc<Repository>, platform: Arc<dyn StreamPlatform>) -> Self {
        Self { repo, platform }
    }

    /// Subscribes `channel_id` to the streamer identified by `streamer_login`.
    ///
    /// # Performance
    /// * Platform calls: 1
    /// * DB calls: 2
    pub async fn subscribe(
        &self,
        streamer_login: &str,
        channel_id: u64,
    ) -> Result<Subscribed, ServiceError> {
        let login = streamer_login.trim();
        if login.is_empty() {
            return Err(ServiceError::StreamerNotFound {
                login: login.to_string(),
                found: 0,
            });
        }

        let mut users = self.platform.fetch_users(&[login.to_string()]).await?;
        if users.len() != 1 {
            return Err(ServiceError::StreamerNotFound {
                login: login.to_string(),
                found: users.len(),
            });
        }
        let user = users.remove(0);
        debug!(
            "Resolved streamer login `{}` to id `{}` ({}).",
            login, user.id, user.display_name
        );

        match self
            .repo
            .subscription
            .create(&user.display_name, user.id, channel_id)
            .await
        {
            Ok(subscription) => {
                info!(
                    "Channel `{}` subscribed to streamer `{}` (id `{}`).",
                    channel_id, user.display_name, user.id
                );
                Ok(Subscribed {
                    display_name: user.display_name,
                    subscription,
                })
            }
            Err(DatabaseError::DuplicateSubscription { .. }) => {
                Err(ServiceError::DuplicateSubscription {
                    display_name: user.display_name,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the channel's subscriptions to `streamer_login`. Returns the deleted count.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn unsubscribe(
        &self,
        streamer_login: &str,
        channel_id: u64,
    ) -> Result<u64, ServiceError> {
        let deleted = self
            .repo
            .subscription
            .delete_by_channel_and_login(channel_id, streamer_login.trim())
            .await?;
        info!(
            "Deleted {} subscriptions of channel `{}` to `{}`.",
            deleted,
            channel_id,
            streamer_login.trim()
        );
        Ok(deleted)
    }

    /// Subscriptions of a channel, ordered by streamer login.
    pub async fn list_channel_subscriptions(
        &self,
        channel_id: u64,
    ) -> Result<Vec<SubscriptionEntity>, ServiceError> {
        Ok(self
            .repo
            .subscription
            .select_all_by_channel(channel_id)
            .await?)
    }

    /// Subscriptions with a stream start that has not been notified yet.
    pub async fn list_pending(&self) -> Result<Vec<SubscriptionEntity>, ServiceError> {
        Ok(self.repo.subscription.select_pending().await?)
    }
}
