//! mc-presence — Minecraft server status in Discord.
//!
//! Polls the public status APIs on a timer, shows the result as the bot's
//! presence and (optionally) as a voice channel name. Shuts down
//! gracefully on SIGINT/SIGTERM or a panic, leaving the channel named
//! "Bot Offline".

use anyhow::{Context, Result};
use serenity::http::Http;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mc_presence::config::{Config, CooldownScope};
use mc_presence::discord::{self, Handler, SchedulerSlot, VoiceChannelSurface};
use mc_presence::presence::{DisplaySurface, Reconciler, RenamePolicy};
use mc_presence::shutdown::{self, ShutdownReason};
use mc_presence::status::StatusFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    // .env first, so RUST_LOG / LOG_FORMAT from the file apply too.
    dotenv::dotenv().ok();
    init_tracing();

    info!("🎮 mc-presence v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        address = %config.server_address,
        poll_secs = config.poll_interval().as_secs(),
        voice_channel = ?config.display_surface_id,
        "Configuration loaded"
    );
    let renames_enabled = config.display_surface_id.is_some();
    if renames_enabled && config.cooldown_scope == CooldownScope::PlayersOnly {
        warn!(
            cooldown_secs = config.rename_cooldown().as_secs(),
            "Rename cooldown applies to player-count names only; offline/error names rename \
             immediately (set RENAME_COOLDOWN_SCOPE=all to gate every rename)"
        );
    }

    let shutdown_token = CancellationToken::new();
    shutdown::install_panic_hook(shutdown_token.clone());

    // ── Status Fetcher ──────────────────────────────────────────────
    let fetcher = Arc::new(
        StatusFetcher::new(&config.endpoints, config.request_timeout)
            .context("Failed to build HTTP client")?,
    );

    // ── Reconciler ──────────────────────────────────────────────────
    let surface = config.display_surface_id.map(|id| {
        let http = Arc::new(Http::new(&config.auth_token));
        let surface = VoiceChannelSurface::new(http, id, config.request_timeout);
        Arc::new(surface) as Arc<dyn DisplaySurface>
    });
    let reconciler = Arc::new(Reconciler::new(
        surface,
        RenamePolicy {
            cooldown: config.rename_cooldown(),
            scope: config.cooldown_scope,
        },
    ));

    // ── Discord Client ──────────────────────────────────────────────
    let ready = Arc::new(AtomicBool::new(false));
    let scheduler: SchedulerSlot = Arc::default();
    let handler = Handler {
        address: config.server_address.clone(),
        poll_interval: config.poll_interval(),
        fetcher,
        reconciler: Arc::clone(&reconciler),
        ready: Arc::clone(&ready),
        scheduler: Arc::clone(&scheduler),
        cancel: shutdown_token.child_token(),
    };

    let mut client = discord::connect(&config.auth_token, handler)
        .await
        .context("Failed to create Discord client")?;
    let shard_manager = Arc::clone(&client.shard_manager);

    let mut client_task = tokio::spawn(async move { client.start().await });
    let mut client_done = false;

    let reason = tokio::select! {
        reason = shutdown::wait_for_signal() => reason,
        _ = shutdown_token.cancelled() => ShutdownReason::Fault,
        res = &mut client_task => {
            client_done = true;
            match res {
                Ok(Ok(())) => info!("Discord client stopped"),
                Ok(Err(e)) => error!("Client error: {:?}", e),
                Err(e) => error!("Discord client task failed: {}", e),
            }
            ShutdownReason::ClientExited
        }
    };

    // ── Graceful Shutdown ───────────────────────────────────────────
    info!("🛑 Received {}, shutting down gracefully...", reason);
    shutdown_token.cancel();

    if let Some(scheduler) = scheduler.lock().await.take() {
        scheduler.stop().await;
    }

    if ready.load(Ordering::SeqCst) {
        shutdown::announce_offline(&reconciler, config.shutdown_timeout).await;
    }

    if !client_done {
        shard_manager.shutdown_all().await;
        match time::timeout(config.shutdown_timeout, client_task).await {
            Ok(_) => info!("✅ Discord connection closed"),
            Err(_) => warn!("Discord client did not stop in time"),
        }
    }

    info!("👋 Bot shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mc_presence=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
