// state.rs: State shared between the event path and the idle watchdog

use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Status before any server connection has been attempted.
pub const NOT_LISTENING: &str = "Not listening. Waiting to connect to a server.";

/// Where the synchronizer currently is in its cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Correlating,
    Publishing,
}

/// The tracked user's playback session as last seen by the synchronizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedSession {
    pub username: String,
    /// Identifier from the last successful correlation. Kept across
    /// correlation misses; only the watchdog decides the session is gone.
    pub session_id: Option<String>,
    pub active: bool,
}

#[derive(Debug, Default)]
struct Inner {
    session: TrackedSession,
    phase: SyncPhase,
    status: String,
}

/// Mutex-guarded cell written by the synchronizer and read by the watchdog.
/// Cloning shares the same cell.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

impl SharedState {
    pub fn new(username: &str) -> Self {
        let inner = Inner {
            session: TrackedSession {
                username: username.to_string(),
                ..Default::default()
            },
            phase: SyncPhase::Idle,
            status: NOT_LISTENING.to_string(),
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub async fn username(&self) -> String {
        self.inner.lock().await.session.username.clone()
    }

    pub async fn session(&self) -> TrackedSession {
        self.inner.lock().await.session.clone()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.inner.lock().await.session.session_id.clone()
    }

    /// Records the outcome of a correlation. A hit replaces the session
    /// identifier; a miss only clears the active flag.
    pub async fn record_correlation(&self, session_id: Option<String>) {
        let mut guard = self.inner.lock().await;
        guard.session.active = session_id.is_some();
        if let Some(id) = session_id {
            guard.session.session_id = Some(id);
        }
    }

    /// Called by the watchdog once the tracked session has disappeared.
    pub async fn mark_idle(&self) {
        let mut guard = self.inner.lock().await;
        guard.session.active = false;
        guard.phase = SyncPhase::Idle;
    }

    pub async fn phase(&self) -> SyncPhase {
        self.inner.lock().await.phase
    }

    #[cfg(test)]
    pub async fn set_phase(&self, phase: SyncPhase) {
        self.inner.lock().await.phase = phase;
    }

    /// Enters `Correlating` and returns the phase it replaced.
    pub async fn begin_correlating(&self) -> SyncPhase {
        let mut guard = self.inner.lock().await;
        std::mem::replace(&mut guard.phase, SyncPhase::Correlating)
    }

    /// Leaves `Correlating` after an event. A publish moves to `Publishing`.
    /// Otherwise `previous` is restored, unless the watchdog already moved
    /// the phase on while the event was in flight.
    pub async fn finish_event(&self, previous: SyncPhase, published: bool) {
        let mut guard = self.inner.lock().await;
        if published {
            guard.phase = SyncPhase::Publishing;
        } else if guard.phase == SyncPhase::Correlating {
            guard.phase = previous;
        }
    }

    pub async fn status(&self) -> String {
        self.inner.lock().await.status.clone()
    }

    pub async fn set_status(&self, status: impl Into<String>) {
        self.inner.lock().await.status = status.into();
    }
}

/// Sending half of a connection's shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into every task of a connection.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested, or the trigger is dropped.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
