//! Voice channel as a [`DisplaySurface`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::builder::EditChannel;
use serenity::http::{Http, HttpError};
use serenity::model::id::ChannelId;
use tokio::time;

use crate::error::SurfaceError;
use crate::presence::DisplaySurface;

pub struct VoiceChannelSurface {
    http: Arc<Http>,
    channel_id: ChannelId,
    /// Serenity waits out Discord's rename rate limit (two per ten
    /// minutes) inside the request, so every call is bounded here.
    timeout: Duration,
}

impl VoiceChannelSurface {
    /// `id` must be non-zero; the config loader rejects zero.
    pub fn new(http: Arc<Http>, id: u64, timeout: Duration) -> Self {
        Self {
            http,
            channel_id: ChannelId::new(id),
            timeout,
        }
    }

    fn classify(&self, e: serenity::Error) -> SurfaceError {
        if let serenity::Error::Http(http_err) = &e {
            let http_err: &HttpError = http_err;
            if let HttpError::UnsuccessfulRequest(resp) = http_err {
                if resp.status_code.as_u16() == 404 {
                    return SurfaceError::NotFound(self.channel_id.get());
                }
            }
        }
        SurfaceError::Discord(e)
    }
}

#[async_trait]
impl DisplaySurface for VoiceChannelSurface {
    async fn current_name(&self) -> Result<String, SurfaceError> {
        let channel = time::timeout(self.timeout, self.channel_id.to_channel(&self.http))
            .await
            .map_err(|_| SurfaceError::Timeout)?
            .map_err(|e| self.classify(e))?;

        channel
            .guild()
            .map(|c| c.name)
            .ok_or(SurfaceError::NotAGuildChannel(self.channel_id.get()))
    }

    async fn rename(&self, name: &str) -> Result<(), SurfaceError> {
        let edit = self.channel_id.edit(&self.http, EditChannel::new().name(name));
        time::timeout(self.timeout, edit)
            .await
            .map_err(|_| SurfaceError::Timeout)?
            .map_err(|e| self.classify(e))?;
        Ok(())
    }
}
