//! Common test utilities and mock implementations.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tatl::notifier::Notifier;
use tatl::notifier::error::NotifierError;
use tatl::notifier::live_notification::LiveNotification;
use tatl::platform::LiveStream;
use tatl::platform::StreamPlatform;
use tatl::platform::StreamerInfo;
use tatl::platform::error::PlatformError;
use tatl::repository::Repository;
use uuid::Uuid;

/// Sets up a temporary test database.
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("tatl-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

pub async fn teardown_db(db_path: PathBuf) {
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

// MOCK PLATFORM

#[derive(Default)]
#[allow(dead_code)]
pub struct MockPlatformState {
    pub users: Vec<StreamerInfo>,
    pub live: Vec<LiveStream>,
    pub fail_fetch: bool,
    /// Every id set passed to `fetch_streams`
    pub fetch_calls: Vec<Vec<i64>>,
}

#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockPlatform {
    pub state: Arc<RwLock<MockPlatformState>>,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: i64, login: &str, display_name: &str) {
        self.state.write().unwrap().users.push(StreamerInfo {
            id,
            login: login.to_string(),
            display_name: display_name.to_string(),
        });
    }

    pub fn set_live(&self, live: Vec<LiveStream>) {
        self.state.write().unwrap().live = live;
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_fetch = fail;
    }

    pub fn fetch_calls(&self) -> Vec<Vec<i64>> {
        self.state.read().unwrap().fetch_calls.clone()
    }
}

#[async_trait]
impl StreamPlatform for MockPlatform {
    async fn fetch_users(&self, logins: &[String]) -> Result<Vec<StreamerInfo>, PlatformError> {
        let state = self.state.read().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| logins.iter().any(|l| l.eq_ignore_ascii_case(&u.login)))
            .cloned()
            .collect())
    }

    async fn fetch_streams(&self, streamer_ids: &[i64]) -> Result<Vec<LiveStream>, PlatformError> {
        let mut state = self.state.write().unwrap();
        state.fetch_calls.push(streamer_ids.to_vec());
        if state.fail_fetch {
            return Err(PlatformError::ApiError {
                status: 500,
                message: "mock failure".to_string(),
            });
        }
        Ok(state
            .live
            .iter()
            .filter(|s| streamer_ids.contains(&s.streamer_id))
            .cloned()
            .collect())
    }
}

// MOCK NOTIFIER

#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockNotifier {
    pub sent: Arc<RwLock<Vec<(u64, LiveNotification)>>>,
    pub failing_channels: Arc<RwLock<HashSet<u64>>>,
    pub attempts: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_channel(&self, channel_id: u64) {
        self.failing_channels.write().unwrap().insert(channel_id);
    }

    pub fn heal_channel(&self, channel_id: u64) {
        self.failing_channels.write().unwrap().remove(&channel_id);
    }

    pub fn sent(&self) -> Vec<(u64, LiveNotification)> {
        self.sent.read().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(
        &self,
        channel_id: u64,
        notification: &LiveNotification,
    ) -> Result<(), NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_channels.read().unwrap().contains(&channel_id) {
            return Err(NotifierError::DeliveryFailed {
                channel_id,
                source: "mock delivery failure".into(),
            });
        }
        self.sent
            .write()
            .unwrap()
            .push((channel_id, notification.clone()));
        Ok(())
    }
}
