//! Twitch Helix platform integration.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use log::warn;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use wreq::Client;
use wreq::header::AUTHORIZATION;
use wreq::header::HeaderMap;
use wreq::header::HeaderValue;
use wreq::header::USER_AGENT;

use crate::platform::BasePlatform;
use crate::platform::LiveStream;
use crate::platform::PlatformInfo;
use crate::platform::StreamPlatform;
use crate::platform::StreamerInfo;
use crate::platform::error::PlatformError;

/// Helix accepts at most this many ids/logins per request.
const HELIX_PAGE_SIZE: usize = 100;

/// Default Helix bucket for app access tokens.
const REQUESTS_PER_MINUTE: NonZeroU32 = NonZeroU32::new(800).unwrap();

/// Tokens are refreshed this long before Twitch says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, Debug)]
struct AppAccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AppAccessToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + chrono::Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct HelixResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HelixError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    login: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
    user_id: String,
    user_login: String,
    #[serde(default)]
    game_name: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    stream_type: String,
    started_at: DateTime<Utc>,
    #[serde(default)]
    thumbnail_url: String,
}

/// Twitch platform using an app access token (client credentials grant).
pub struct TwitchPlatform {
    pub base: BasePlatform,
    client: Client,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<AppAccessToken>>,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl TwitchPlatform {
    /// Creates a Twitch platform client. No request is made until first use.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tatl/", env!("CARGO_PKG_VERSION"))),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let info = PlatformInfo {
            name: "Twitch".to_string(),
            api_url: "https://api.twitch.tv/helix".to_string(),
            auth_url: "https://id.twitch.tv/oauth2".to_string(),
        };

        Ok(Self {
            base: BasePlatform::new(info),
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: RwLock::new(None),
            limiter: RateLimiter::direct(Quota::per_minute(REQUESTS_PER_MINUTE)),
        })
    }

    async fn send(&self, request: wreq::RequestBuilder) -> Result<wreq::Response, wreq::Error> {
        if self.limiter.check().is_err() {
            info!("Source {} is ratelimited. Waiting...", self.base.info.name);
        }
        self.limiter.until_ready().await;

        let req = request.build()?;
        debug!("Making request to: {}", req.url());
        self.client.execute(req).await
    }

    /// Returns a valid app access token, requesting a new one when needed.
    async fn app_token(&self) -> Result<String, PlatformError> {
        if let Some(token) = self.token.read().await.as_ref()
            && token.is_fresh()
        {
            return Ok(token.token.clone());
        }

        let mut guard = self.token.write().await;
        // Another caller may have refreshed while we waited for the write lock
        if let Some(token) = guard.as_ref()
            && token.is_fresh()
        {
            return Ok(token.token.clone());
        }

        debug!("Requesting new {} app access token.", self.base.info.name);
        let request = self
            .client
            .post(format!("{}/token", self.base.info.auth_url))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ]);
        let response = self.send(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PlatformError::AuthenticationFailed {
                message: format!("status {}: {}", status.as_u16(), Self::error_message(&body)),
            });
        }

        let resp: TokenResponse = serde_json::from_str(&body)?;
        let token = AppAccessToken {
            token: resp.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(resp.expires_in),
        };
        info!(
            "Obtained {} app access token (expires at {}).",
            self.base.info.name, token.expires_at
        );
        let value = token.token.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Requests an app access token, failing if Twitch rejects the credentials.
    pub async fn authenticate(&self) -> Result<(), PlatformError> {
        self.app_token().await.map(|_| ())
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<HelixError>(body)
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string())
    }

    /// GETs a Helix endpoint and returns its `data` array.
    ///
    /// A 401 drops the cached token and retries once with a fresh one.
    async fn helix_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, PlatformError> {
        let mut retried = false;
        loop {
            let token = self.app_token().await?;
            let request = self
                .client
                .get(format!("{}/{}", self.base.info.api_url, path))
                .query(query)
                .header("Client-Id", self.client_id.as_str())
                .header(AUTHORIZATION, format!("Bearer {token}"));

            let response = self.send(request).await?;
            let status = response.status();
            let body = response.text().await?;

            if status.as_u16() == 401 && !retried {
                warn!(
                    "{} rejected the app access token. Refreshing.",
                    self.base.info.name
                );
                self.invalidate_token().await;
                retried = true;
                continue;
            }

            if !status.is_success() {
                return Err(PlatformError::ApiError {
                    status: status.as_u16(),
                    message: Self::error_message(&body),
                });
            }

            let resp: HelixResponse<T> = serde_json::from_str(&body)?;
            return Ok(resp.data);
        }
    }

    fn parse_id(field: &str, value: &str) -> Result<i64, PlatformError> {
        value.parse::<i64>().map_err(|_| PlatformError::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    fn non_empty(value: String) -> Option<String> {
        if value.is_empty() { None } else { Some(value) }
    }
}

#[async_trait]
impl StreamPlatform for TwitchPlatform {
    async fn fetch_users(&self, logins: &[String]) -> Result<Vec<StreamerInfo>, PlatformError> {
        debug!("Fetching {} users: {logins:?}", self.base.info.name);
        let mut users = Vec::new();

        for chunk in logins.chunks(HELIX_PAGE_SIZE) {
            let query: Vec<(&str, String)> = chunk
                .iter()
                .map(|login| ("login", login.trim().to_lowercase()))
                .collect();

            for user in self.helix_get::<HelixUser>("users", &query).await? {
                users.push(StreamerInfo {
                    id: Self::parse_id("users.id", &user.id)?,
                    login: user.login,
                    display_name: user.display_name,
                });
            }
        }

        Ok(users)
    }

    async fn fetch_streams(&self, streamer_ids: &[i64]) -> Result<Vec<LiveStream>, PlatformError> {
        let mut streams = Vec::new();

        for chunk in streamer_ids.chunks(HELIX_PAGE_SIZE) {
            let mut query: Vec<(&str, String)> =
                chunk.iter().map(|id| ("user_id", id.to_string())).collect();
            query.push(("first", HELIX_PAGE_SIZE.to_string()));

            for stream in self.helix_get::<HelixStream>("streams", &query).await? {
                // Helix reports "" instead of "live" when the stream errored
                if stream.stream_type != "live" {
                    continue;
                }
                streams.push(LiveStream {
                    streamer_id: Self::parse_id("streams.user_id", &stream.user_id)?,
                    streamer_login: stream.user_login,
                    title: stream.title,
                    started_at: stream.started_at,
                    game_name: Self::non_empty(stream.game_name),
                    thumbnail_url: Self::non_empty(stream.thumbnail_url),
                });
            }
        }

        debug!(
            "{} of {} {} streamers are live.",
            streams.len(),
            streamer_ids.len(),
            self.base.info.name
        );
        Ok(streams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_helix_message() {
        let body = r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#;
        assert_eq!(TwitchPlatform::error_message(body), "Invalid OAuth token");
        assert_eq!(TwitchPlatform::error_message("gateway down"), "gateway down");
    }

    #[test]
    fn test_parse_id_rejects_non_numeric() {
        assert_eq!(TwitchPlatform::parse_id("users.id", "141981764").unwrap(), 141981764);
        assert!(matches!(
            TwitchPlatform::parse_id("users.id", "abc"),
            Err(PlatformError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_token_freshness_margin() {
        let fresh = AppAccessToken {
            token: "t".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        };
        let stale = AppAccessToken {
            token: "t".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(30),
        };
        assert!(fresh.is_fresh());
        assert!(!stale.is_fresh());
    }
}
