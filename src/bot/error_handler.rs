//! Error handling for Discord bot commands.

use log::error;
use log::warn;
use poise::CreateReply;
use poise::FrameworkError;

use crate::bot::Data;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::error::AppError;
use crate::service::error::ServiceError;

/// Handles framework errors and sends appropriate responses to users.
pub struct ErrorHandler;

impl ErrorHandler {
    /// Handles a framework error by classifying and responding appropriately.
    pub async fn handle(error: FrameworkError<'_, Data, Error>) {
        match error {
            FrameworkError::Command { error, ctx, .. } => {
                let message = Self::classify_error(&error, &ctx);
                Self::reply(&ctx, message).await;
            }
            FrameworkError::ArgumentParse { error, ctx, .. } => {
                let message = format!(
                    "Invalid arguments for `/{}`: {}",
                    ctx.command().qualified_name,
                    error
                );
                Self::reply(&ctx, message).await;
            }
            error => {
                if let Err(e) = poise::builtins::on_error(error).await {
                    error!("Error while handling error: {}", e);
                }
            }
        }
    }

    /// Maps an error to the text shown to the user.
    ///
    /// Unexpected errors are logged with a reference id that is included in
    /// the reply.
    fn classify_error(error: &Error, ctx: &poise::Context<'_, Data, Error>) -> String {
        if let Some(bot_error) = error.downcast_ref::<BotError>() {
            return bot_error.to_string();
        }
        if let Some(service_error) = error.downcast_ref::<ServiceError>()
            && service_error.is_user_facing()
        {
            return service_error.to_string();
        }

        let ref_id = AppError::log_with_ref(&**error);
        warn!(
            "Unexpected error in command `{}` (ref {})",
            ctx.command().qualified_name,
            ref_id
        );
        format!(
            "An unexpected error occurred. Please contact the bot developer.\n-# Reference ID: {}",
            ref_id
        )
    }

    async fn reply(ctx: &poise::Context<'_, Data, Error>, message: String) {
        if let Err(e) = ctx
            .send(CreateReply::default().content(message).ephemeral(true))
            .await
        {
            error!("Failed to send error reply: {}", e);
        }
    }
}
