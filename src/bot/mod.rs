pub mod commands;
pub mod error;
pub mod error_handler;

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context as _;
use anyhow::Result;
use async_trait::async_trait;
use log::error;
use log::info;
use poise::Framework;
use poise::FrameworkOptions;
use poise::serenity_prelude::ClientBuilder;
use poise::serenity_prelude::Context as SerenityContext;
use poise::serenity_prelude::EventHandler;
use poise::serenity_prelude::FullEvent;
use poise::serenity_prelude::GatewayIntents;
use poise::serenity_prelude::Http;
use poise::serenity_prelude::Token;
use tokio::task::JoinHandle;

use crate::bot::commands::Cog;
use crate::bot::commands::Cogs;
use crate::bot::commands::Error;
use crate::bot::error_handler::ErrorHandler;
use crate::config::Config;
use crate::service::Services;

pub struct Data {
    pub services: Arc<Services>,
}

pub struct Bot {
    pub http: Arc<Http>,
    client_builder: Option<ClientBuilder>,
}

impl Bot {
    pub fn new(config: &Config, services: Arc<Services>) -> Result<Self> {
        info!("Initializing bot...");

        let framework = Self::create_framework();
        let data = Arc::new(Data { services });
        let (token, intents) = Self::create_client_config(config)?;

        let client_builder = ClientBuilder::new(token.clone(), intents)
            .event_handler(Arc::new(BotEventHandler))
            .framework(framework)
            .data(data);

        Ok(Self {
            http: Arc::new(Http::new(token)),
            client_builder: Some(client_builder),
        })
    }

    /// Connects to Discord in the background. Returns `None` if already started.
    ///
    /// The handle resolves when the client stops, with an error if it could not
    /// be built or was rejected by the gateway.
    pub fn start(&mut self) -> Option<JoinHandle<Result<()>>> {
        let client_builder = self.client_builder.take()?;
        info!("Starting bot client...");

        Some(tokio::spawn(Self::connect(client_builder)))
    }

    async fn connect(client_builder: ClientBuilder) -> Result<()> {
        info!("Connecting bot to Discord...");
        let mut client = client_builder
            .await
            .context("Failed to build Discord client")?;
        info!("Bot connected to Discord.");

        client.start().await.context("Bot client crashed")?;
        anyhow::bail!("Bot client stopped")
    }

    fn create_framework() -> Box<Framework<Data, Error>> {
        let options = FrameworkOptions::<Data, Error> {
            commands: Cogs.commands(),
            on_error: |error| Box::pin(ErrorHandler::handle(error)),
            ..Default::default()
        };

        Box::new(poise::Framework::builder().options(options).build())
    }

    fn create_client_config(config: &Config) -> Result<(Token, GatewayIntents)> {
        let token = Token::from_str(&config.discord_token)?;
        Ok((token, GatewayIntents::non_privileged()))
    }
}

/// Waits for `shutdown_signal` or for the bot client to exit, whichever comes first.
///
/// A client exit is always an error: the bot is meant to run until shutdown.
pub async fn run_until_stopped<F>(client: JoinHandle<Result<()>>, shutdown_signal: F) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        res = shutdown_signal => {
            res.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received.");
            Ok(())
        }
        res = client => match res {
            Ok(Ok(())) => anyhow::bail!("Bot client exited"),
            Ok(Err(e)) => {
                error!("Bot client failed: {e:#}");
                Err(e)
            }
            Err(e) => Err(e).context("Bot client task panicked"),
        },
    }
}

pub struct BotEventHandler;

#[async_trait]
impl EventHandler for BotEventHandler {
    async fn dispatch(&self, ctx: &SerenityContext, event: &FullEvent) {
        #[allow(clippy::single_match)]
        match event {
            FullEvent::Ready { data_about_bot, .. } => {
                info!("Logged in as {}.", data_about_bot.user.name);
                match poise::builtins::register_globally(&ctx.http, &Cogs.commands()).await {
                    Ok(()) => info!("Registered slash commands globally."),
                    Err(e) => error!("Failed to register slash commands: {e}"),
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_dead_client_ends_run_with_error() {
        let client = tokio::spawn(async { Err::<(), _>(anyhow::anyhow!("Authentication failed")) });
        let never = std::future::pending::<std::io::Result<()>>();

        let res = tokio::time::timeout(Duration::from_secs(1), run_until_stopped(client, never))
            .await
            .expect("run did not return after the client died");
        assert!(res.unwrap_err().to_string().contains("Authentication failed"));
    }

    #[tokio::test]
    async fn test_client_returning_is_an_error() {
        let client = tokio::spawn(async { Ok::<(), anyhow::Error>(()) });
        let never = std::future::pending::<std::io::Result<()>>();

        assert!(run_until_stopped(client, never).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_signal_while_client_runs() {
        let client = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok::<(), anyhow::Error>(())
        });
        let signal = async { Ok::<(), std::io::Error>(()) };

        assert!(run_until_stopped(client, signal).await.is_ok());
    }
}
