//! Discord Rich Presence over the local IPC socket.

use crate::presence::{PresenceBroadcaster, PresenceError, PresencePayload};
use async_trait::async_trait;
use discord_rich_presence::activity::{Activity, Assets, Timestamps};
use discord_rich_presence::{DiscordIpc, DiscordIpcClient};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

struct Connection {
    client: DiscordIpcClient,
    connected: bool,
}

/// Publishes presence through the desktop Discord client.
///
/// The IPC calls block on the local socket, so each publish runs on the
/// blocking pool. The std mutex is only ever locked there.
pub struct DiscordPresence {
    conn: Arc<Mutex<Connection>>,
}

impl DiscordPresence {
    /// Creates the IPC client and tries a first handshake. A Discord client
    /// that is not running yet is not an error; the handshake is retried on
    /// the next publish.
    pub fn new(application_id: &str) -> Result<Self, PresenceError> {
        let mut client = DiscordIpcClient::new(application_id)
            .map_err(|e| PresenceError::Unavailable(e.to_string()))?;
        let connected = match client.connect() {
            Ok(()) => {
                tracing::info!("Discord Rich Presence connected");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discord not available yet");
                false
            }
        };
        Ok(Self::from_connection(Connection { client, connected }))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

fn unix_seconds(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn build_activity(payload: &PresencePayload) -> Activity<'_> {
    let mut assets = Assets::new();
    if !payload.large_image.is_empty() {
        assets = assets.large_image(&payload.large_image);
    }
    if !payload.large_text.is_empty() {
        assets = assets.large_text(&payload.large_text);
    }
    if !payload.small_image.is_empty() {
        assets = assets.small_image(&payload.small_image);
    }
    if !payload.small_text.is_empty() {
        assets = assets.small_text(&payload.small_text);
    }

    let mut activity = Activity::new().details(&payload.details).assets(assets);
    if let Some(start) = payload.start_timestamp {
        activity = activity.timestamps(Timestamps::new().start(unix_seconds(start)));
    }
    activity
}

/// Handshakes if needed, then writes the activity. Blocks on the IPC socket.
fn publish(conn: &Mutex<Connection>, payload: &PresencePayload) -> Result<(), PresenceError> {
    let mut conn = conn
        .lock()
        .map_err(|_| PresenceError::Unavailable("connection lock poisoned".to_string()))?;

    if !conn.connected {
        conn.client
            .connect()
            .map_err(|e| PresenceError::Unavailable(e.to_string()))?;
        conn.connected = true;
        tracing::info!("Discord Rich Presence connected");
    }

    let result = conn
        .client
        .set_activity(build_activity(payload))
        .map_err(|e| e.to_string());
    if let Err(e) = result {
        // Force a fresh handshake on the next publish.
        conn.connected = false;
        let _ = conn.client.close();
        return Err(PresenceError::Rejected(e));
    }
    Ok(())
}

#[async_trait]
impl PresenceBroadcaster for DiscordPresence {
    async fn set_activity(&self, payload: &PresencePayload) -> Result<(), PresenceError> {
        let conn = self.conn.clone();
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || publish(&conn, &payload))
            .await
            .map_err(|e| PresenceError::Unavailable(format!("presence task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn converts_anchor_to_unix_seconds() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_900);
        assert_eq!(unix_seconds(at), 1_700_000_000);
        assert_eq!(unix_seconds(UNIX_EPOCH - Duration::from_secs(5)), 0);
    }

    #[tokio::test]
    async fn poisoned_connection_reports_unavailable() {
        let client = DiscordIpcClient::new("413407336082833418").unwrap();
        let presence = DiscordPresence::from_connection(Connection {
            client,
            connected: false,
        });
        let conn = presence.conn.clone();
        let _ = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("poison");
        })
        .join();

        let result = presence.set_activity(&PresencePayload::idle()).await;
        assert!(matches!(result, Err(PresenceError::Unavailable(_))));
    }
}
