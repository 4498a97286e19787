//! Durable thumbnail-path → artwork cache.
//!
//! Entries are stored as tagged JSON so a failed upload is never confused
//! with a real URL:
//!
//! ```text
//! {"url":"https://i.imgur.com/abc.png"}
//! {"fallback":true}
//! ```
//!
//! Raw legacy values are still understood: the literal `logo` reads as the
//! fallback marker and any other string as a URL.

use crate::artwork::types::ArtworkError;
use crate::storage::{ARTWORK_NAMESPACE, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LEGACY_SENTINEL: &str = "logo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedArtwork {
    /// Upload succeeded; the URL is stable for this thumbnail.
    Url { url: String },
    /// Upload failed once; use the default logo from now on.
    Fallback { fallback: bool },
}

impl CachedArtwork {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    pub fn fallback() -> Self {
        Self::Fallback { fallback: true }
    }

    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if let Ok(entry) = serde_json::from_slice::<CachedArtwork>(bytes) {
            return Some(entry);
        }
        let raw = std::str::from_utf8(bytes).ok()?.trim();
        match raw {
            "" => None,
            LEGACY_SENTINEL => Some(Self::fallback()),
            url => Some(Self::url(url)),
        }
    }
}

#[derive(Clone)]
pub struct ThumbnailCache {
    store: Arc<dyn KeyValueStore>,
}

impl ThumbnailCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, thumbnail: &str) -> Result<Option<CachedArtwork>, ArtworkError> {
        let raw = self.store.get(ARTWORK_NAMESPACE, thumbnail).await?;
        Ok(raw.as_deref().and_then(CachedArtwork::decode))
    }

    /// Stores `entry` unless a URL is already recorded for `thumbnail`, in
    /// which case the existing URL wins and is returned.
    pub async fn record(
        &self,
        thumbnail: &str,
        entry: CachedArtwork,
    ) -> Result<CachedArtwork, ArtworkError> {
        if let Some(existing @ CachedArtwork::Url { .. }) = self.get(thumbnail).await? {
            return Ok(existing);
        }
        let bytes = entry
            .encode()
            .map_err(|e| ArtworkError::Upload(format!("encode cache entry: {e}")))?;
        self.store.set(ARTWORK_NAMESPACE, thumbnail, &bytes).await?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    async fn cache() -> (ThumbnailCache, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        (ThumbnailCache::new(store.clone()), store)
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let (cache, _) = cache().await;
        assert_eq!(cache.get("/t/1").await.unwrap(), None);
        cache.record("/t/1", CachedArtwork::url("https://i/1.png")).await.unwrap();
        assert_eq!(
            cache.get("/t/1").await.unwrap(),
            Some(CachedArtwork::url("https://i/1.png"))
        );
    }

    #[tokio::test]
    async fn url_entries_are_never_overwritten() {
        let (cache, _) = cache().await;
        cache.record("/t/1", CachedArtwork::url("https://i/first.png")).await.unwrap();
        let kept = cache.record("/t/1", CachedArtwork::url("https://i/second.png")).await.unwrap();
        assert_eq!(kept, CachedArtwork::url("https://i/first.png"));
        let kept = cache.record("/t/1", CachedArtwork::fallback()).await.unwrap();
        assert_eq!(kept, CachedArtwork::url("https://i/first.png"));
    }

    #[tokio::test]
    async fn fallback_can_be_upgraded() {
        let (cache, _) = cache().await;
        cache.record("/t/1", CachedArtwork::fallback()).await.unwrap();
        cache.record("/t/1", CachedArtwork::url("https://i/1.png")).await.unwrap();
        assert_eq!(
            cache.get("/t/1").await.unwrap(),
            Some(CachedArtwork::url("https://i/1.png"))
        );
    }

    #[tokio::test]
    async fn reads_legacy_raw_values() {
        let (cache, store) = cache().await;
        store.set(ARTWORK_NAMESPACE, "/t/a", b"logo").await.unwrap();
        store.set(ARTWORK_NAMESPACE, "/t/b", b"https://i.imgur.com/b.png").await.unwrap();
        assert_eq!(cache.get("/t/a").await.unwrap(), Some(CachedArtwork::fallback()));
        assert_eq!(
            cache.get("/t/b").await.unwrap(),
            Some(CachedArtwork::url("https://i.imgur.com/b.png"))
        );
    }

    #[test]
    fn encoding_is_tagged() {
        assert_eq!(CachedArtwork::fallback().encode().unwrap(), br#"{"fallback":true}"#);
        assert_eq!(
            CachedArtwork::url("u").encode().unwrap(),
            br#"{"url":"u"}"#
        );
    }
}
