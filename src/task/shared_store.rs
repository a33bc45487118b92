use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

use crate::repository::Repository;

/// The repository together with the lock serializing the periodic tasks.
///
/// The status updater holds the lock for its write batch and the notification
/// poster for its read, dispatch and write phase, so a stream start can never
/// be overwritten between the poster reading it and marking it notified.
pub struct SharedStore {
    repo: Arc<Repository>,
    lock: Mutex<()>,
}

/// Exclusive access to the repository for as long as the guard lives.
pub struct StoreGuard<'a> {
    repo: &'a Repository,
    _guard: MutexGuard<'a, ()>,
}

impl Deref for StoreGuard<'_> {
    type Target = Repository;

    fn deref(&self) -> &Self::Target {
        self.repo
    }
}

impl SharedStore {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            lock: Mutex::new(()),
        }
    }

    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            _guard: self.lock.lock().await,
            repo: &self.repo,
        }
    }

    /// Unlocked access, for reads that need no consistency with the tasks.
    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }
}
