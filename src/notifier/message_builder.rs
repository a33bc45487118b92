use poise::serenity_prelude::Colour;
use poise::serenity_prelude::CreateEmbed;
use poise::serenity_prelude::CreateMessage;

use crate::notifier::live_notification::LiveNotification;

pub struct LiveMessageBuilder<'a> {
    notification: &'a LiveNotification,
}

impl<'a> LiveMessageBuilder<'a> {
    pub fn new(notification: &'a LiveNotification) -> Self {
        Self { notification }
    }

    pub fn build(&self) -> CreateMessage<'a> {
        let n = self.notification;

        let mut embed = CreateEmbed::new()
            .colour(Colour::BLURPLE)
            .title(n.title.as_str())
            .description(n.description.as_str())
            .field("Link", n.link.as_str(), false);
        if let Some(image_url) = &n.image_url {
            embed = embed.image(image_url.as_str());
        }

        CreateMessage::new().embed(embed)
    }
}
