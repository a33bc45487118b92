//! Periodic dispatch of pending go-live notifications.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::notifier::Notifier;
use crate::notifier::live_notification::LiveNotification;
use crate::task::Task;
use crate::task::shared_store::SharedStore;

/// What one poster tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostSummary {
    pub pending: usize,
    pub delivered: usize,
    /// Deliveries that failed; these subscriptions stay pending
    pub failed: usize,
    /// Channels that can never be reached; these are marked notified
    pub dropped: usize,
}

/// Sends a notification for every subscription whose stream start is newer
/// than its last notification.
pub struct NotificationPoster {
    store: Arc<SharedStore>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationPoster {
    pub fn new(store: Arc<SharedStore>, notifier: Arc<dyn Notifier>) -> Self {
        debug!("Initializing NotificationPoster.");
        Self { store, notifier }
    }

    /// Runs one pass over pending subscriptions while holding the store lock.
    ///
    /// A failed delivery is logged and skipped; the rest of the batch is still
    /// processed. A channel that is gone or inaccessible is marked notified so
    /// the same stream is not retried every tick.
    pub async fn tick(&self) -> anyhow::Result<PostSummary> {
        let repo = self.store.lock().await;
        let pending = repo.subscription.select_pending().await?;

        let mut summary = PostSummary {
            pending: pending.len(),
            ..Default::default()
        };

        for sub in pending {
            let Some(stream_start) = sub.last_stream_start else {
                continue;
            };
            let notification = LiveNotification::from_subscription(&sub);

            match self.notifier.notify(sub.channel_id, &notification).await {
                Ok(()) => summary.delivered += 1,
                Err(e) if e.is_permanent() => {
                    warn!(
                        "Dropping notification for channel `{}` about `{}`: {}",
                        sub.channel_id, sub.streamer_login, e
                    );
                    summary.dropped += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to notify channel `{}` about `{}`: {}",
                        sub.channel_id, sub.streamer_login, e
                    );
                    summary.failed += 1;
                    continue;
                }
            }

            // Never earlier than the stream start, even if the local clock lags
            let notified_at = Utc::now().max(stream_start);
            if let Err(e) = repo.subscription.mark_notified(sub.id, &notified_at).await {
                error!(
                    "Handled channel `{}` about `{}` but failed to record it: {}",
                    sub.channel_id, sub.streamer_login, e
                );
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl Task for NotificationPoster {
    fn name(&self) -> &'static str {
        "NotificationPoster"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let summary = self.tick().await?;
        if summary.pending > 0 {
            info!(
                "Posted {} of {} pending notifications ({} failed, {} dropped).",
                summary.delivered, summary.pending, summary.failed, summary.dropped
            );
        }
        Ok(())
    }
}
