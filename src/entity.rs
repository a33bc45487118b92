//! Persisted records.

use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;

/// A (streamer, channel) pairing that wants go-live notifications.
///
/// The `last_*` stream fields mirror the most recent live stream the status
/// updater has seen for `streamer_id`. A subscription is pending notification
/// while `last_notified_at` is older than `last_stream_start`; there is no
/// separate "is live" flag.
#[derive(FromRow, Clone, Debug, PartialEq)]
pub struct SubscriptionEntity {
    pub id: i32,
    /// Display name of the streamer, as resolved at subscribe time
    pub streamer_login: String,
    /// Platform-stable streamer id, used as the fetch key
    pub streamer_id: i64,
    /// Discord channel snowflake
    #[sqlx(try_from = "i64")]
    pub channel_id: u64,
    pub last_stream_start: Option<DateTime<Utc>>,
    pub last_game_name: Option<String>,
    /// Thumbnail template containing `{width}` and `{height}` placeholders
    pub last_thumbnail_url: Option<String>,
    pub last_notified_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    /// A fresh subscription: never seen live, eligible for its first notification.
    pub fn new(streamer_login: impl Into<String>, streamer_id: i64, channel_id: u64) -> Self {
        Self {
            streamer_login: streamer_login.into(),
            streamer_id,
            channel_id,
            ..Default::default()
        }
    }

    /// Whether the last known stream start has not been notified yet.
    pub fn is_pending(&self) -> bool {
        self.last_stream_start
            .is_some_and(|start| self.last_notified_at < start)
    }
}

impl Default for SubscriptionEntity {
    fn default() -> Self {
        Self {
            id: 0,
            streamer_login: String::new(),
            streamer_id: 0,
            channel_id: 0,
            last_stream_start: None,
            last_game_name: None,
            last_thumbnail_url: None,
            last_notified_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Stream metadata written to every subscription of one streamer.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamState {
    pub started_at: DateTime<Utc>,
    pub game_name: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_new_subscription_is_not_pending() {
        let sub = SubscriptionEntity::new("Streamer", 42, 7);
        assert_eq!(sub.last_notified_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(sub.last_stream_start.is_none());
        assert!(!sub.is_pending());
    }

    #[test]
    fn test_pending_after_newer_stream_start() {
        let now = Utc::now();
        let mut sub = SubscriptionEntity::new("Streamer", 42, 7);

        sub.last_stream_start = Some(now);
        assert!(sub.is_pending());

        sub.last_notified_at = now;
        assert!(!sub.is_pending());

        sub.last_stream_start = Some(now + Duration::minutes(1));
        assert!(sub.is_pending());
    }
}
