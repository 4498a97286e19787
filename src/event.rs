use crate::artwork::ArtworkPublisher;
use crate::plex::metadata::{derive_category_label, derive_title};
use crate::plex::sessions::correlate;
use crate::plex::{MediaMetadata, MediaServer, MediaType, PlaybackEvent, SessionEntry};
use crate::presence::{PresenceBroadcaster, PresencePayload};
use crate::state::SharedState;
use crate::text_utils::title_case;
use crate::timer::playback_start;
use std::sync::Arc;
use std::time::SystemTime;

const PAUSED: &str = "paused";

/// How a single playback event was handled. Only `Published` changes the
/// remote presence; every other outcome leaves it as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Published,
    /// The session snapshot could not be fetched.
    SessionFetchFailed,
    /// The tracked user has no session. Not an error, and not a reason to
    /// go idle: the watchdog owns that transition.
    CorrelationMiss,
    /// No session in the snapshot is both the tracked user's and the one the
    /// event refers to.
    Unrelated,
    MetadataUnavailable,
    /// The payload was built but the broadcaster refused it.
    PublishFailed,
}

/// Event-driven half of the presence bridge: turns a playback notification
/// into a published presence payload.
#[derive(Clone)]
pub struct Synchronizer {
    server: Arc<dyn MediaServer>,
    artwork: ArtworkPublisher,
    broadcaster: Arc<dyn PresenceBroadcaster>,
    state: SharedState,
}

impl Synchronizer {
    pub fn new(
        server: Arc<dyn MediaServer>,
        artwork: ArtworkPublisher,
        broadcaster: Arc<dyn PresenceBroadcaster>,
        state: SharedState,
    ) -> Self {
        Self {
            server,
            artwork,
            broadcaster,
            state,
        }
    }

    /// Handles one event to completion. Failures are logged and absorbed.
    pub async fn process_event(&self, event: &PlaybackEvent) -> EventOutcome {
        let previous = self.state.begin_correlating().await;
        let outcome = self.correlate_and_publish(event).await;
        self.state
            .finish_event(previous, outcome == EventOutcome::Published)
            .await;
        outcome
    }

    async fn correlate_and_publish(&self, event: &PlaybackEvent) -> EventOutcome {
        let sessions = match self.server.get_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch sessions on media server");
                return EventOutcome::SessionFetchFailed;
            }
        };

        let username = self.state.username().await;
        let correlated = correlate(&sessions, &username);
        let is_active = correlated.is_some();
        self.state.record_correlation(correlated).await;
        if !is_active {
            tracing::debug!(user = %username, "No active session for tracked user");
            return EventOutcome::CorrelationMiss;
        }

        let mut outcome = EventOutcome::Unrelated;
        for session in sessions
            .iter()
            .filter(|s| s.username == username && s.session_key == event.session_key)
        {
            outcome = self.handle_session(session, event).await;
        }
        if outcome == EventOutcome::Unrelated {
            tracing::debug!(
                session_key = %event.session_key,
                "Event does not belong to the tracked session"
            );
        }
        outcome
    }

    async fn handle_session(&self, session: &SessionEntry, event: &PlaybackEvent) -> EventOutcome {
        let meta = match self.server.get_metadata(&event.rating_key).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(rating_key = %event.rating_key, error = %e, "Failed to get metadata");
                return EventOutcome::MetadataUnavailable;
            }
        };

        let artwork_url = self.artwork.resolve_artwork_url(&meta).await;
        let payload = build_presence(session.media_type, &meta, artwork_url, event, SystemTime::now());

        match self.broadcaster.set_activity(&payload).await {
            Ok(()) => {
                tracing::debug!(details = %payload.details, state = %event.state, "Published presence");
                EventOutcome::Published
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to publish presence");
                EventOutcome::PublishFailed
            }
        }
    }
}

/// Builds the payload for a playing (or paused) item.
///
/// The elapsed-time anchor is included unless playback is paused.
pub fn build_presence(
    session_type: MediaType,
    meta: &MediaMetadata,
    artwork_url: String,
    event: &PlaybackEvent,
    now: SystemTime,
) -> PresencePayload {
    let start_timestamp =
        (event.state != PAUSED).then(|| playback_start(now, event.view_offset_ms));
    PresencePayload {
        large_text: derive_category_label(session_type).to_string(),
        details: derive_title(meta, session_type),
        large_image: artwork_url,
        small_text: title_case(&event.state),
        small_image: event.state.clone(),
        start_timestamp,
    }
}
