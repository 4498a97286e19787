//! Resolves a media item to a publicly reachable artwork URL.
//!
//! ```text
//! metadata ──▶ choose thumbnail ──▶ cache ─── hit ──▶ URL or default logo
//!                                     │
//!                                     │ miss
//!                                     ▼
//!                       fetch from media server ──▶ upload ──▶ record
//! ```

use crate::artwork::cache::{CachedArtwork, ThumbnailCache};
use crate::artwork::types::{ArtworkError, DEFAULT_LOGO, ImageHost};
use crate::plex::{MediaMetadata, MediaServer, MediaType};
use std::sync::Arc;

/// Picks the thumbnail path for an item.
///
/// Episodes always use the show-level artwork; other items use their own,
/// then the parent's, then the grandparent's.
pub fn select_thumbnail(meta: &MediaMetadata) -> &str {
    if meta.media_type == MediaType::Episode {
        return &meta.grandparent_thumb;
    }
    [&meta.thumb, &meta.parent_thumb, &meta.grandparent_thumb]
        .into_iter()
        .find(|t| !t.is_empty())
        .map(String::as_str)
        .unwrap_or("")
}

#[derive(Clone)]
pub struct ArtworkPublisher {
    server: Arc<dyn MediaServer>,
    host: Arc<dyn ImageHost>,
    cache: ThumbnailCache,
}

impl ArtworkPublisher {
    pub fn new(server: Arc<dyn MediaServer>, host: Arc<dyn ImageHost>, cache: ThumbnailCache) -> Self {
        Self { server, host, cache }
    }

    /// Never fails: every error degrades to [`DEFAULT_LOGO`].
    pub async fn resolve_artwork_url(&self, meta: &MediaMetadata) -> String {
        let thumbnail = select_thumbnail(meta);
        if thumbnail.is_empty() {
            return DEFAULT_LOGO.to_string();
        }

        match self.cache.get(thumbnail).await {
            Ok(Some(entry)) => return artwork_for(&entry),
            Ok(None) => {}
            // An unreadable cache is treated as a miss; the upload below
            // still gets a chance to record a fresh entry.
            Err(e) => tracing::warn!(thumbnail, error = %e, "Thumbnail cache lookup failed"),
        }

        let entry = match self.upload(thumbnail).await {
            Ok(url) => CachedArtwork::url(url),
            Err(e) => {
                tracing::warn!(thumbnail, error = %e, "Artwork upload failed, using default logo");
                CachedArtwork::fallback()
            }
        };

        match self.cache.record(thumbnail, entry.clone()).await {
            Ok(stored) => artwork_for(&stored),
            Err(e) => {
                tracing::warn!(thumbnail, error = %e, "Failed to record artwork in cache");
                artwork_for(&entry)
            }
        }
    }

    async fn upload(&self, thumbnail: &str) -> Result<String, ArtworkError> {
        let bytes = self.server.fetch_thumbnail(thumbnail).await?;
        self.host.upload(bytes, thumbnail).await
    }
}

fn artwork_for(entry: &CachedArtwork) -> String {
    match entry {
        CachedArtwork::Url { url } => url.clone(),
        CachedArtwork::Fallback { .. } => DEFAULT_LOGO.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::{PlexError, SessionEntry};
    use crate::storage::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeServer {
        fetches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MediaServer for FakeServer {
        async fn get_sessions(&self) -> Result<Vec<SessionEntry>, PlexError> {
            Ok(Vec::new())
        }
        async fn get_metadata(&self, rating_key: &str) -> Result<MediaMetadata, PlexError> {
            Err(PlexError::NotFound(rating_key.to_string()))
        }
        async fn fetch_thumbnail(&self, _path: &str) -> Result<Vec<u8>, PlexError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PlexError::Api("thumbnail: HTTP 404".into()));
            }
            Ok(vec![0x89, 0x50, 0x4e, 0x47])
        }
    }

    #[derive(Default)]
    struct FakeHost {
        uploads: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ImageHost for FakeHost {
        async fn upload(&self, _bytes: Vec<u8>, title: &str) -> Result<String, ArtworkError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ArtworkError::Upload("rate limited".into()));
            }
            Ok(format!("https://img.example{title}.png"))
        }
    }

    async fn publisher(server: Arc<FakeServer>, host: Arc<FakeHost>) -> ArtworkPublisher {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        ArtworkPublisher::new(server, host, ThumbnailCache::new(store))
    }

    fn movie(thumb: &str) -> MediaMetadata {
        MediaMetadata {
            media_type: MediaType::Movie,
            thumb: thumb.into(),
            ..Default::default()
        }
    }

    #[test]
    fn episode_uses_show_artwork() {
        let meta = MediaMetadata {
            media_type: MediaType::Episode,
            thumb: "/ep".into(),
            parent_thumb: "/season".into(),
            grandparent_thumb: "/show".into(),
            ..Default::default()
        };
        assert_eq!(select_thumbnail(&meta), "/show");
    }

    #[test]
    fn other_types_fall_back_in_order() {
        let mut meta = MediaMetadata {
            media_type: MediaType::Track,
            parent_thumb: "/album".into(),
            grandparent_thumb: "/artist".into(),
            ..Default::default()
        };
        assert_eq!(select_thumbnail(&meta), "/album");
        meta.parent_thumb.clear();
        assert_eq!(select_thumbnail(&meta), "/artist");
        meta.thumb = "/track".into();
        assert_eq!(select_thumbnail(&meta), "/track");
    }

    #[tokio::test]
    async fn uploads_once_per_thumbnail() {
        let server = Arc::new(FakeServer::default());
        let host = Arc::new(FakeHost::default());
        let publisher = publisher(server.clone(), host.clone()).await;

        let first = publisher.resolve_artwork_url(&movie("/m/1")).await;
        let second = publisher.resolve_artwork_url(&movie("/m/1")).await;

        assert_eq!(first, "https://img.example/m/1.png");
        assert_eq!(first, second);
        assert_eq!(host.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_upload_is_cached_as_fallback() {
        let server = Arc::new(FakeServer::default());
        let host = Arc::new(FakeHost {
            fail: true,
            ..Default::default()
        });
        let publisher = publisher(server.clone(), host.clone()).await;

        for _ in 0..3 {
            assert_eq!(publisher.resolve_artwork_url(&movie("/m/2")).await, DEFAULT_LOGO);
        }
        assert_eq!(host.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(
            publisher.cache.get("/m/2").await.unwrap(),
            Some(CachedArtwork::fallback())
        );
    }

    #[tokio::test]
    async fn failed_fetch_skips_upload_and_caches_fallback() {
        let server = Arc::new(FakeServer {
            fail: true,
            ..Default::default()
        });
        let host = Arc::new(FakeHost::default());
        let publisher = publisher(server.clone(), host.clone()).await;

        assert_eq!(publisher.resolve_artwork_url(&movie("/m/3")).await, DEFAULT_LOGO);
        assert_eq!(publisher.resolve_artwork_url(&movie("/m/3")).await, DEFAULT_LOGO);
        assert_eq!(host.uploads.load(Ordering::SeqCst), 0);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_thumbnail_uses_logo_without_network() {
        let server = Arc::new(FakeServer::default());
        let host = Arc::new(FakeHost::default());
        let publisher = publisher(server.clone(), host.clone()).await;

        assert_eq!(publisher.resolve_artwork_url(&movie("")).await, DEFAULT_LOGO);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(host.uploads.load(Ordering::SeqCst), 0);
    }
}
