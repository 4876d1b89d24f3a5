//! Shutdown triggers and the final "bot offline" rename.
//!
//! SIGINT, SIGTERM, a panic anywhere in the process and the gateway client
//! exiting all end up on the same path: stop polling, rename the voice
//! channel once (bounded), disconnect, exit 0.

use std::fmt;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::presence::{Reconciler, BOT_OFFLINE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    /// A panic tripped the shutdown token.
    Fault,
    ClientExited,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Fault => "panic",
            ShutdownReason::ClientExited => "client exit",
        };
        f.write_str(s)
    }
}

/// Wait for Ctrl+C or SIGTERM.
#[cfg(unix)]
pub async fn wait_for_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => ShutdownReason::Interrupt,
                _ = sigterm.recv() => ShutdownReason::Terminate,
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            wait_for_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> ShutdownReason {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler, only a fault or client exit can stop us.
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}

/// Route panics into the graceful shutdown path. The default hook still
/// runs, so the panic message and backtrace are not lost.
pub fn install_panic_hook(trigger: CancellationToken) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("💥 Panic: {}", info);
        default_hook(info);
        trigger.cancel();
    }));
}

/// Best-effort rename to the "bot offline" name. Never waits longer than
/// `timeout`. Returns whether the rename went through.
pub async fn announce_offline(reconciler: &Reconciler, timeout: Duration) -> bool {
    if !reconciler.has_surface() {
        return false;
    }

    match time::timeout(timeout, reconciler.force_rename(BOT_OFFLINE_NAME)).await {
        Ok(Ok(())) => {
            info!("✅ Updated voice channel to show bot offline");
            true
        }
        Ok(Err(e)) => {
            error!("❌ Error updating voice channel on shutdown: {}", e);
            false
        }
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "❌ Timed out updating voice channel on shutdown"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CooldownScope;
    use crate::error::SurfaceError;
    use crate::presence::testing::FakeSurface;
    use crate::presence::{DisplaySurface, RenamePolicy};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn policy() -> RenamePolicy {
        RenamePolicy {
            cooldown: Duration::from_secs(600),
            scope: CooldownScope::PlayersOnly,
        }
    }

    struct HangingSurface;

    #[async_trait]
    impl DisplaySurface for HangingSurface {
        async fn current_name(&self) -> Result<String, SurfaceError> {
            std::future::pending().await
        }

        async fn rename(&self, _name: &str) -> Result<(), SurfaceError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_announce_offline_renames() {
        let surface = Arc::new(FakeSurface::new("🎮 Players: 2/20"));
        let reconciler = Reconciler::new(Some(surface.clone()), policy());

        assert!(announce_offline(&reconciler, Duration::from_secs(5)).await);
        assert_eq!(surface.name.lock().unwrap().as_str(), BOT_OFFLINE_NAME);
    }

    #[tokio::test]
    async fn test_announce_offline_without_surface() {
        let reconciler = Reconciler::new(None, policy());
        assert!(!announce_offline(&reconciler, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_announce_offline_swallows_failure() {
        let surface = Arc::new(FakeSurface::new("general"));
        surface.set_failing(true);
        let reconciler = Reconciler::new(Some(surface.clone()), policy());

        assert!(!announce_offline(&reconciler, Duration::from_secs(5)).await);
        assert_eq!(reconciler.state().await.last_display_name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_announce_offline_is_bounded() {
        let reconciler = Reconciler::new(Some(Arc::new(HangingSurface)), policy());
        assert!(!announce_offline(&reconciler, Duration::from_secs(5)).await);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ShutdownReason::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownReason::Terminate.to_string(), "SIGTERM");
    }
}
