//! Application entry point for tatl.
//!
//! Initializes all components, starts the Discord bot and the periodic tasks.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use anyhow::Result;
use anyhow::anyhow;
use dotenv::dotenv;
use log::debug;
use log::error;
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tatl::bot::Bot;
use tatl::bot::run_until_stopped;
use tatl::config::Config;
use tatl::logging::setup_logging;
use tatl::notifier::discord_channel_notifier::DiscordChannelNotifier;
use tatl::platform::StreamPlatform;
use tatl::platform::twitch_platform::TwitchPlatform;
use tatl::repository::Repository;
use tatl::service::Services;
use tatl::task::TaskHandle;
use tatl::task::notification_poster::NotificationPoster;
use tatl::task::shared_store::SharedStore;
use tatl::task::spawn_periodic;
use tatl::task::status_updater::StatusUpdater;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = load_config()?;

    let repo = setup_repository(&config, init_start).await?;
    let platform = setup_platform(&config, init_start).await?;
    let services = Arc::new(Services::new(repo.clone(), platform.clone()));

    let (bot, client) = setup_bot(&config, services, init_start)?;

    let shutdown = CancellationToken::new();
    let tasks = setup_tasks(&config, repo, platform, &bot, &shutdown, init_start);

    info!(
        "tatl is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );
    let outcome = run_until_stopped(client, tokio::signal::ctrl_c()).await;

    shutdown.cancel();
    for task in tasks {
        let name = task.name();
        if let Err(e) = task.shutdown().await {
            error!("{name} did not stop cleanly: {e}");
        }
    }
    info!("Shutdown complete.");
    outcome
}

fn load_config() -> Result<Arc<Config>> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    let config = Arc::new(config);
    setup_logging(&config)?;
    info!("Starting tatl...");
    Ok(config)
}

async fn setup_repository(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Repository...");
    let repo = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    repo.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(repo)
}

async fn setup_platform(config: &Config, init_start: Instant) -> Result<Arc<dyn StreamPlatform>> {
    debug!("Setting up Twitch platform...");
    let twitch = TwitchPlatform::new(
        config.twitch_client_id.clone(),
        config.twitch_client_secret.clone(),
        config.request_timeout,
    )?;

    twitch
        .authenticate()
        .await
        .context("Twitch rejected the configured client credentials")?;
    info!(
        "Twitch platform setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(Arc::new(twitch))
}

fn setup_bot(
    config: &Config,
    services: Arc<Services>,
    init_start: Instant,
) -> Result<(Bot, JoinHandle<Result<()>>)> {
    info!("Starting bot...");
    let mut bot = Bot::new(config, services)?;

    let client = bot
        .start()
        .ok_or_else(|| anyhow!("Bot client was already started"))?;
    info!(
        "Bot setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok((bot, client))
}

fn setup_tasks(
    config: &Config,
    repo: Arc<Repository>,
    platform: Arc<dyn StreamPlatform>,
    bot: &Bot,
    shutdown: &CancellationToken,
    init_start: Instant,
) -> Vec<TaskHandle> {
    debug!("Setting up Tasks...");
    let store = Arc::new(SharedStore::new(repo));
    let notifier = Arc::new(DiscordChannelNotifier::new(
        bot.http.clone(),
        config.request_timeout,
    ));

    let updater = Arc::new(StatusUpdater::new(store.clone(), platform));
    let poster = Arc::new(NotificationPoster::new(store, notifier));

    let tasks = vec![
        spawn_periodic(updater, config.poll_interval, shutdown.child_token()),
        spawn_periodic(poster, config.poll_interval, shutdown.child_token()),
    ];

    info!(
        "Tasks setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    tasks
}
