//! Periodic refresh of stored stream state.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use log::info;

use crate::platform::StreamPlatform;
use crate::task::Task;
use crate::task::shared_store::SharedStore;

/// What one updater tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Distinct streamers with at least one subscription
    pub streamers: usize,
    pub live: usize,
    pub rows_updated: u64,
}

/// Pulls live status for every subscribed streamer into the store.
///
/// Never sends notifications; it only moves `last_stream_start` forward so the
/// poster can see the transition.
pub struct StatusUpdater {
    store: Arc<SharedStore>,
    platform: Arc<dyn StreamPlatform>,
}

impl StatusUpdater {
    pub fn new(store: Arc<SharedStore>, platform: Arc<dyn StreamPlatform>) -> Self {
        debug!("Initializing StatusUpdater.");
        Self { store, platform }
    }

    /// Runs one update. A fetch failure returns before anything is written.
    pub async fn tick(&self) -> anyhow::Result<UpdateSummary> {
        let streamer_ids = self
            .store
            .repo()
            .subscription
            .select_distinct_streamer_ids()
            .await?;

        if streamer_ids.is_empty() {
            debug!("No subscriptions. Skipping status fetch.");
            return Ok(UpdateSummary::default());
        }

        let streams = self
            .platform
            .fetch_streams(&streamer_ids)
            .await
            .context("Failed to fetch stream status")?;

        let mut summary = UpdateSummary {
            streamers: streamer_ids.len(),
            live: streams.len(),
            rows_updated: 0,
        };

        let repo = self.store.lock().await;
        for stream in &streams {
            summary.rows_updated += repo
                .subscription
                .update_stream_state_by_streamer_id(stream.streamer_id, &stream.state())
                .await?;
        }
        drop(repo);

        debug!(
            "Status update: {} of {} streamers live, {} rows updated.",
            summary.live, summary.streamers, summary.rows_updated
        );
        Ok(summary)
    }
}

#[async_trait]
impl Task for StatusUpdater {
    fn name(&self) -> &'static str {
        "StatusUpdater"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let summary = self.tick().await?;
        if summary.live > 0 {
            info!(
                "{} of {} subscribed streamers are live.",
                summary.live, summary.streamers
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::platform::LiveStream;
    use crate::platform::MockStreamPlatform;
    use crate::platform::error::PlatformError;
    use crate::repository::table::Table;
    use crate::task::testing::temp_store;

    fn live(streamer_id: i64) -> LiveStream {
        LiveStream {
            streamer_id,
            streamer_login: "streamer".to_string(),
            title: "title".to_string(),
            started_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            game_name: Some("Chess".to_string()),
            thumbnail_url: None,
        }
    }

    #[tokio::test]
    async fn test_no_subscriptions_skips_fetch() {
        let (store, path) = temp_store().await;
        let mut platform = MockStreamPlatform::new();
        platform.expect_fetch_streams().times(0);

        let updater = StatusUpdater::new(store, Arc::new(platform));
        assert_eq!(updater.tick().await.unwrap(), UpdateSummary::default());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_one_fetch_updates_every_channel_of_streamer() {
        let (store, path) = temp_store().await;
        store.repo().subscription.create("Streamer", 1, 100).await.unwrap();
        store.repo().subscription.create("Streamer", 1, 200).await.unwrap();

        let mut platform = MockStreamPlatform::new();
        platform
            .expect_fetch_streams()
            .withf(|ids| ids.len() == 1 && ids[0] == 1)
            .times(1)
            .returning(|_| Ok(vec![live(1)]));

        let updater = StatusUpdater::new(store.clone(), Arc::new(platform));
        let summary = updater.tick().await.unwrap();
        assert_eq!(summary.streamers, 1);
        assert_eq!(summary.rows_updated, 2);

        for sub in store.repo().subscription.select_all().await.unwrap() {
            assert_eq!(sub.last_stream_start, Some(live(1).started_at));
            assert_eq!(sub.last_game_name.as_deref(), Some("Chess"));
            assert!(sub.is_pending());
        }

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_unchanged() {
        let (store, path) = temp_store().await;
        store.repo().subscription.create("Streamer", 1, 100).await.unwrap();

        let mut platform = MockStreamPlatform::new();
        platform.expect_fetch_streams().returning(|_| {
            Err(PlatformError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            })
        });

        let updater = StatusUpdater::new(store.clone(), Arc::new(platform));
        assert!(updater.tick().await.is_err());

        let subs = store.repo().subscription.select_all().await.unwrap();
        assert!(subs[0].last_stream_start.is_none());

        let _ = std::fs::remove_file(path);
    }
}
