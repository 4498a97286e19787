//! Plex module: media-server client, session snapshots, metadata and the
//! notification subscription.

pub mod connection;
mod de;
pub mod events;
pub mod metadata;
pub mod sessions;

use async_trait::async_trait;

pub use connection::{PlexClient, PlexError};
pub use events::PlaybackEvent;
pub use metadata::{MediaMetadata, MediaType};
pub use sessions::SessionEntry;

/// The slice of the media server the synchronizer and watchdog depend on.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Snapshot of every active playback session on the server.
    async fn get_sessions(&self) -> Result<Vec<SessionEntry>, PlexError>;

    /// Full metadata for one item. An empty result set is `PlexError::NotFound`.
    async fn get_metadata(&self, rating_key: &str) -> Result<MediaMetadata, PlexError>;

    /// Raw image bytes for a thumbnail path such as `/library/metadata/1/thumb/2`.
    async fn fetch_thumbnail(&self, path: &str) -> Result<Vec<u8>, PlexError>;
}
