//! Rich-presence payloads and the broadcaster they are published through.

pub mod discord;

use crate::artwork::DEFAULT_LOGO;
use async_trait::async_trait;
use std::time::SystemTime;

pub use discord::DiscordPresence;

#[derive(thiserror::Error, Debug)]
pub enum PresenceError {
    #[error("Presence service unavailable: {0}")]
    Unavailable(String),
    #[error("Presence update rejected: {0}")]
    Rejected(String),
}

/// Complete status shown by the presence service. Every publish sends a
/// whole payload; there are no partial updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresencePayload {
    pub large_text: String,
    pub details: String,
    pub large_image: String,
    pub small_text: String,
    pub small_image: String,
    /// Anchor for the elapsed-time display; absent while paused.
    pub start_timestamp: Option<SystemTime>,
}

impl PresencePayload {
    /// Shown once the tracked session can no longer be found.
    pub fn idle() -> Self {
        Self {
            large_text: "Idle".to_string(),
            details: "Idle".to_string(),
            large_image: DEFAULT_LOGO.to_string(),
            ..Default::default()
        }
    }
}

/// Each call fully replaces the remote presence.
#[async_trait]
pub trait PresenceBroadcaster: Send + Sync {
    async fn set_activity(&self, payload: &PresencePayload) -> Result<(), PresenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_payload_shape() {
        let idle = PresencePayload::idle();
        assert_eq!(idle.large_text, "Idle");
        assert_eq!(idle.details, "Idle");
        assert_eq!(idle.large_image, "logo");
        assert!(idle.small_text.is_empty());
        assert!(idle.small_image.is_empty());
        assert_eq!(idle.start_timestamp, None);
        assert_eq!(idle, PresencePayload::idle());
    }
}
