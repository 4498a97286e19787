//! Playback notifications pushed by the server over its websocket.

use crate::plex::PlexError;
use crate::plex::de::{lenient_i64, lenient_string};
use crate::state::ShutdownSignal;
use futures_util::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Delay before re-opening a dropped or refused subscription.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Upper bound on the TCP connect plus websocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One playback state change for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlaybackEvent {
    #[serde(rename = "ratingKey", default, deserialize_with = "lenient_string")]
    pub rating_key: String,
    #[serde(rename = "sessionKey", default, deserialize_with = "lenient_string")]
    pub session_key: String,
    /// Elapsed playback in milliseconds.
    #[serde(rename = "viewOffset", default, deserialize_with = "lenient_i64")]
    pub view_offset_ms: i64,
    /// `playing`, `paused`, `buffering` or `stopped`.
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct NotificationFrame {
    #[serde(rename = "NotificationContainer")]
    container: NotificationContainer,
}

#[derive(Debug, Deserialize)]
struct NotificationContainer {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "PlaySessionStateNotification", default)]
    play_session_state: Vec<PlaybackEvent>,
}

/// Extracts the playback event from a text frame. Frames of other types
/// (activity, timeline, status...) yield `None`, as does a `playing` frame
/// without any session notification.
pub fn parse_notification(text: &str) -> Result<Option<PlaybackEvent>, PlexError> {
    let frame: NotificationFrame = serde_json::from_str(text)?;
    if frame.container.kind != "playing" {
        return Ok(None);
    }
    Ok(frame.container.play_session_state.into_iter().next())
}

/// Subscribes to the notification stream at `url` until `shutdown` fires.
///
/// Playback events are forwarded to `events` in arrival order. While the
/// queue is full the socket is not read, so the server's own buffering holds
/// later frames instead of anything being dropped. Connection and decoding
/// failures go to `on_error` and the subscription is re-established after a
/// short delay. Returns once shutdown is observed or the receiver is gone.
pub async fn subscribe<E>(
    url: String,
    events: mpsc::Sender<PlaybackEvent>,
    mut on_error: E,
    mut shutdown: ShutdownSignal,
) where
    E: FnMut(PlexError) + Send,
{
    while !shutdown.is_triggered() {
        let connected = tokio::select! {
            biased;
            _ = shutdown.wait() => return,
            result = tokio::time::timeout(
                CONNECT_TIMEOUT,
                tokio_tungstenite::connect_async(url.as_str()),
            ) => result,
        };
        match connected {
            Ok(Ok((mut ws_stream, _))) => {
                tracing::info!("Subscribed to server notifications");
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => return,
                        message = ws_stream.next() => match message {
                            Some(Ok(Message::Text(text))) => match parse_notification(text.as_str()) {
                                Ok(Some(event)) => {
                                    if !forward(&events, event, &mut shutdown).await {
                                        return;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => on_error(e),
                            },
                            Some(Ok(Message::Close(frame))) => {
                                tracing::warn!(?frame, "Notification stream closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                on_error(e.into());
                                break;
                            }
                            None => break,
                        },
                    }
                }
            }
            Ok(Err(e)) => on_error(e.into()),
            Err(_) => on_error(PlexError::Timeout(CONNECT_TIMEOUT)),
        }

        tokio::select! {
            biased;
            _ = shutdown.wait() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

/// Waits for queue space. `false` means the subscription should end.
async fn forward(
    events: &mpsc::Sender<PlaybackEvent>,
    event: PlaybackEvent,
    shutdown: &mut ShutdownSignal,
) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.wait() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}
