//! Rendering of go-live notifications.

use crate::entity::SubscriptionEntity;

const CHANNEL_URL_BASE: &str = "https://twitch.tv";
const THUMBNAIL_WIDTH: &str = "1024";
const THUMBNAIL_HEIGHT: &str = "576";

/// A rendered go-live notification, independent of the delivery channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveNotification {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub link: String,
}

impl LiveNotification {
    pub fn from_subscription(sub: &SubscriptionEntity) -> Self {
        let login = &sub.streamer_login;

        let description = match sub.last_game_name.as_deref() {
            Some(game) if !game.is_empty() => format!("{login} just started streaming {game}"),
            _ => format!("{login} just started streaming"),
        };

        Self {
            title: format!("{login} just went live!"),
            description,
            image_url: sub.last_thumbnail_url.as_deref().map(Self::thumbnail_url),
            link: format!("{CHANNEL_URL_BASE}/{login}"),
        }
    }

    /// Fills the `{width}` and `{height}` placeholders of a thumbnail template.
    pub fn thumbnail_url(template: &str) -> String {
        template
            .replace("{width}", THUMBNAIL_WIDTH)
            .replace("{height}", THUMBNAIL_HEIGHT)
    }
}
