//! Background tasks polling stream status and posting notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::error;
use log::info;
use tokio::task::JoinError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub mod notification_poster;
pub mod shared_store;
pub mod status_updater;

/// A unit of periodic work.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one tick. Errors are logged by the loop and the next tick still runs.
    async fn run(&self) -> anyhow::Result<()>;
}

/// Handle to a spawned periodic task.
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cancels the loop and waits for it to exit.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        info!("Stopping {} loop.", self.name);
        self.token.cancel();
        self.join.await
    }
}

/// Spawns `task` to run every `period` until `token` is cancelled.
///
/// The first tick runs immediately. Cancellation is observed between ticks.
pub fn spawn_periodic<T: Task + 'static>(
    task: Arc<T>,
    period: Duration,
    token: CancellationToken,
) -> TaskHandle {
    let name = task.name();
    let loop_token = token.clone();
    let span = tracing::info_span!("task", task = name);

    let join = tokio::spawn(
        async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Starting {name} loop with interval {period:?}.");

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => {
                        info!("{name} loop cancelled.");
                        break;
                    }
                    _ = interval.tick() => {}
                }

                if let Err(e) = task.run().await {
                    error!("{name} tick failed: {e:#}");
                }
            }
        }
        .instrument(span),
    );

    TaskHandle { name, token, join }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::repository::Repository;
    use crate::task::shared_store::SharedStore;

    /// A migrated store on a fresh temporary database file.
    pub async fn temp_store() -> (Arc<SharedStore>, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("tatl_unit_{}.db", uuid::Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();
        let repo = Repository::new(&format!("sqlite://{path_str}"), &path_str)
            .await
            .unwrap();
        repo.run_migrations().await.unwrap();
        (Arc::new(SharedStore::new(Arc::new(repo))), path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    struct CountingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Task for CountingTask {
        fn name(&self) -> &'static str {
            "CountingTask"
        }

        async fn run(&self) -> anyhow::Result<()> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                anyhow::bail!("first tick fails");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_loop_survives_errors_and_stops_on_shutdown() {
        let task = Arc::new(CountingTask {
            runs: AtomicUsize::new(0),
        });
        let handle = spawn_periodic(
            task.clone(),
            Duration::from_millis(10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(task.runs.load(Ordering::SeqCst) >= 2);

        handle.shutdown().await.unwrap();
        let after = task.runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), after);
    }

    #[tokio::test]
    async fn test_cancel_through_parent_token() {
        let parent = CancellationToken::new();
        let task = Arc::new(CountingTask {
            runs: AtomicUsize::new(0),
        });
        let handle = spawn_periodic(task, Duration::from_secs(3600), parent.child_token());

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .unwrap()
            .unwrap();
    }
}
