//! Streaming platform integration.
//!
//! The status updater and the subscription service only see the
//! [`StreamPlatform`] trait: resolve logins to streamer identities, and fetch
//! which of a set of streamers are live right now.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::entity::StreamState;
use crate::platform::error::PlatformError;

pub mod error;
pub mod twitch_platform;

/// Endpoints and display metadata of a platform.
#[derive(Clone, Debug)]
pub struct PlatformInfo {
    /// e.g. "Twitch"
    pub name: String,
    /// REST API root, e.g. https://api.twitch.tv/helix
    pub api_url: String,
    /// OAuth root, e.g. https://id.twitch.tv/oauth2
    pub auth_url: String,
}

/// Shared state for platform implementations.
#[derive(Clone, Debug)]
pub struct BasePlatform {
    pub info: PlatformInfo,
}

impl BasePlatform {
    pub fn new(info: PlatformInfo) -> Self {
        Self { info }
    }
}

/// A streamer identity resolved from a login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamerInfo {
    pub id: i64,
    pub login: String,
    pub display_name: String,
}

/// A stream that is live at fetch time.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveStream {
    pub streamer_id: i64,
    pub streamer_login: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub game_name: Option<String>,
    /// Template with `{width}` and `{height}` placeholders
    pub thumbnail_url: Option<String>,
}

impl LiveStream {
    /// The part of this stream that is persisted on subscriptions.
    pub fn state(&self) -> StreamState {
        StreamState {
            started_at: self.started_at,
            game_name: self.game_name.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamPlatform: Send + Sync {
    /// Resolves logins to streamer identities. Unknown logins are simply absent.
    async fn fetch_users(&self, logins: &[String]) -> Result<Vec<StreamerInfo>, PlatformError>;

    /// Returns the streams that are currently live among `streamer_ids`.
    ///
    /// Streamers missing from the result are offline.
    async fn fetch_streams(&self, streamer_ids: &[i64]) -> Result<Vec<LiveStream>, PlatformError>;
}

