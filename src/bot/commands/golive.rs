//! Go-live subscription commands.

use poise::serenity_prelude::AutocompleteChoice;
use poise::serenity_prelude::CreateAutocompleteResponse;

use crate::bot::commands::Cog;
use crate::bot::commands::Context;
use crate::bot::commands::Error;
use crate::bot::error::BotError;
use crate::entity::SubscriptionEntity;

/// Discord allows at most this many autocomplete choices.
const MAX_AUTOCOMPLETE_CHOICES: usize = 25;

/// Cog for go-live notification commands.
pub struct GoLiveCog;

impl GoLiveCog {
    /// Manage Twitch go-live notifications for this channel
    #[poise::command(
        slash_command,
        guild_only,
        default_member_permissions = "MANAGE_MESSAGES",
        subcommands("Self::subscribe", "Self::unsubscribe", "Self::list"),
        subcommand_required
    )]
    pub async fn golive(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Post a message in this channel whenever the streamer goes live
    #[poise::command(slash_command, guild_only)]
    pub async fn subscribe(
        ctx: Context<'_>,
        #[description = "Twitch login of the streamer"] streamer_login: String,
    ) -> Result<(), Error> {
        ctx.guild_id().ok_or(BotError::GuildOnlyCommand)?;
        ctx.defer().await?;

        let channel_id = ctx.channel_id().get();
        let result = ctx
            .data()
            .services
            .subscription
            .subscribe(&streamer_login, channel_id)
            .await;

        match result {
            Ok(subscribed) => {
                ctx.say(format!("Subscribed to {} streams!", subscribed.display_name))
                    .await?
            }
            Err(e) if e.is_user_facing() => ctx.say(e.to_string()).await?,
            Err(e) => return Err(e.into()),
        };
        Ok(())
    }

    /// Stop posting go-live messages for the streamer in this channel
    #[poise::command(slash_command, guild_only)]
    pub async fn unsubscribe(
        ctx: Context<'_>,
        #[description = "Streamer to unsubscribe from"]
        #[autocomplete = "Self::autocomplete_subscriptions"]
        streamer_login: String,
    ) -> Result<(), Error> {
        ctx.guild_id().ok_or(BotError::GuildOnlyCommand)?;

        let deleted = ctx
            .data()
            .services
            .subscription
            .unsubscribe(&streamer_login, ctx.channel_id().get())
            .await?;

        ctx.say(format!("Deleted {deleted} subscriptions")).await?;
        Ok(())
    }

    /// List the streamers this channel is subscribed to
    #[poise::command(slash_command, guild_only)]
    pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
        ctx.guild_id().ok_or(BotError::GuildOnlyCommand)?;

        let subs = ctx
            .data()
            .services
            .subscription
            .list_channel_subscriptions(ctx.channel_id().get())
            .await?;

        ctx.say(Self::format_list(&subs)).await?;
        Ok(())
    }

    fn format_list(subs: &[SubscriptionEntity]) -> String {
        if subs.is_empty() {
            return "This channel is not subscribed to any streamers".to_string();
        }

        let mut lines = vec![format!("This channel is subscribed to {} streamers:", subs.len())];
        for sub in subs {
            let line = match sub.last_stream_start {
                Some(start) => format!(
                    "- **{}** (last live <t:{}:R>)",
                    sub.streamer_login,
                    start.timestamp()
                ),
                None => format!("- **{}**", sub.streamer_login),
            };
            lines.push(line);
        }
        lines.join("\n")
    }

    async fn autocomplete_subscriptions<'a>(
        ctx: Context<'_>,
        partial: &str,
    ) -> CreateAutocompleteResponse<'a> {
        let subs = ctx
            .data()
            .services
            .subscription
            .list_channel_subscriptions(ctx.channel_id().get())
            .await
            .unwrap_or_default();

        let partial = partial.trim().to_lowercase();
        let mut choices = subs
            .into_iter()
            .filter(|sub| sub.streamer_login.to_lowercase().contains(&partial))
            .map(|sub| AutocompleteChoice::new(sub.streamer_login.clone(), sub.streamer_login))
            .collect::<Vec<_>>();

        choices.truncate(MAX_AUTOCOMPLETE_CHOICES);
        CreateAutocompleteResponse::new().set_choices(choices)
    }
}

impl Cog for GoLiveCog {
    fn commands(&self) -> Vec<poise::Command<crate::bot::Data, Error>> {
        vec![Self::golive()]
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_format_empty_list() {
        assert_eq!(
            GoLiveCog::format_list(&[]),
            "This channel is not subscribed to any streamers"
        );
    }

    #[test]
    fn test_format_list_with_last_live() {
        let mut live = SubscriptionEntity::new("Alpha", 1, 7);
        live.last_stream_start = Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        let never = SubscriptionEntity::new("Beta", 2, 7);

        let text = GoLiveCog::format_list(&[live, never]);
        assert_eq!(
            text,
            "This channel is subscribed to 2 streamers:\n- **Alpha** (last live <t:1748736000:R>)\n- **Beta**"
        );
    }
}
