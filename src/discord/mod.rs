//! Discord glue: gateway client, presence sink and voice channel surface.

use serenity::all::ActivityData;
use serenity::prelude::*;
use tracing::info;

use crate::presence::PresenceSink;

pub mod handler;
pub mod surface;

pub use handler::{Handler, SchedulerSlot};
pub use surface::VoiceChannelSurface;

/// Publishes presence as a "Watching <text>" activity.
pub struct ActivitySink {
    ctx: Context,
}

impl ActivitySink {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }
}

impl PresenceSink for ActivitySink {
    fn publish(&self, text: &str) {
        self.ctx.set_activity(Some(ActivityData::watching(text)));
    }
}

/// Build the gateway client. Only the guilds intent is needed: the bot
/// reads no messages, it just sets presence and renames one channel.
pub async fn connect(token: &str, handler: Handler) -> Result<Client, serenity::Error> {
    info!("Starting Discord bot...");

    Client::builder(token, GatewayIntents::GUILDS)
        .event_handler(handler)
        .await
}
