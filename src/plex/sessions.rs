//! Active-session snapshots and correlation of the tracked user.

use crate::plex::de::lenient_string;
use crate::plex::metadata::MediaType;
use serde::Deserialize;

/// One entry of the server's `/status/sessions` snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionEntry {
    /// Key echoed by playback notifications (`sessionKey`).
    pub session_key: String,
    /// Stable playback-session identifier (`Session.id`, or the session key
    /// when the server omits the `Session` object). Empty when neither exists.
    pub session_id: String,
    /// Display name of the user owning the session (`User.title`).
    pub username: String,
    pub media_type: MediaType,
    pub rating_key: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionsResponse {
    #[serde(rename = "MediaContainer", default)]
    media_container: SessionsContainer,
}

#[derive(Debug, Default, Deserialize)]
struct SessionsContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<RawSession>,
}

#[derive(Debug, Deserialize)]
struct RawSession {
    #[serde(rename = "sessionKey", default, deserialize_with = "lenient_string")]
    session_key: String,
    #[serde(rename = "ratingKey", default, deserialize_with = "lenient_string")]
    rating_key: String,
    #[serde(rename = "type", default)]
    media_type: MediaType,
    #[serde(rename = "User")]
    user: Option<RawUser>,
    #[serde(rename = "Session")]
    session: Option<RawSessionInfo>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct RawSessionInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
}

impl SessionsResponse {
    pub(crate) fn into_entries(self) -> Vec<SessionEntry> {
        self.media_container
            .metadata
            .into_iter()
            .map(|raw| {
                let session_id = raw
                    .session
                    .map(|s| s.id)
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| raw.session_key.clone());
                SessionEntry {
                    session_key: raw.session_key,
                    session_id,
                    username: raw.user.map(|u| u.title).unwrap_or_default(),
                    media_type: raw.media_type,
                    rating_key: raw.rating_key,
                }
            })
            .collect()
    }
}

/// Returns the session identifier of the first entry owned by `username`.
///
/// Scan order is the snapshot order, so a user with two simultaneous
/// sessions is always correlated to the first one listed. Entries without an
/// identifier are skipped.
pub fn correlate(sessions: &[SessionEntry], username: &str) -> Option<String> {
    sessions
        .iter()
        .find(|s| s.username == username && !s.session_id.is_empty())
        .map(|s| s.session_id.clone())
}

/// Whether a previously correlated session identifier is still listed. An
/// empty identifier is never listed.
pub fn contains_session(sessions: &[SessionEntry], session_id: &str) -> bool {
    !session_id.is_empty() && sessions.iter().any(|s| s.session_id == session_id)
}
