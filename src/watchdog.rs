//! Idle detection: polls the session snapshot and clears presence once the
//! tracked session is gone.

use crate::plex::MediaServer;
use crate::plex::sessions::contains_session;
use crate::presence::{PresenceBroadcaster, PresencePayload};
use crate::state::{SharedState, ShutdownSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot fetch failed; nothing changed.
    Skipped,
    /// The tracked session is still listed.
    Active,
    IdlePublished,
    IdlePublishFailed,
}

pub struct IdleWatchdog {
    server: Arc<dyn MediaServer>,
    broadcaster: Arc<dyn PresenceBroadcaster>,
    state: SharedState,
    interval: Duration,
}

impl IdleWatchdog {
    pub fn new(
        server: Arc<dyn MediaServer>,
        broadcaster: Arc<dyn PresenceBroadcaster>,
        state: SharedState,
        interval: Duration,
    ) -> Self {
        Self {
            server,
            broadcaster,
            state,
            interval,
        }
    }

    /// Ticks until `shutdown` fires. A tick already in progress finishes
    /// first; no tick starts after shutdown is observed.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        tracing::debug!("Idle watchdog stopped");
    }

    /// One poll. Idle is published on every tick the session is missing,
    /// not only on the first; repeating it is harmless and needs no extra
    /// "already idle" bookkeeping.
    pub async fn tick(&self) -> TickOutcome {
        let sessions = match self.server.get_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::debug!(error = %e, "Watchdog skipped tick");
                return TickOutcome::Skipped;
            }
        };

        let tracked = self.state.session_id().await;
        let still_listed = tracked
            .as_deref()
            .is_some_and(|id| contains_session(&sessions, id));
        if still_listed {
            return TickOutcome::Active;
        }

        self.state.mark_idle().await;
        match self.broadcaster.set_activity(&PresencePayload::idle()).await {
            Ok(()) => TickOutcome::IdlePublished,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to publish idle presence");
                TickOutcome::IdlePublishFailed
            }
        }
    }
}
