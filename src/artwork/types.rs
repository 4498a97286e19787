use crate::plex::PlexError;
use crate::storage::StoreError;
use async_trait::async_trait;
use thiserror::Error;

/// Asset key of the application's own logo, shown whenever no artwork can be
/// published.
pub const DEFAULT_LOGO: &str = "logo";

#[derive(Error, Debug)]
pub enum ArtworkError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] PlexError),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Upload error: {0}")]
    Upload(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Public image host the artwork is re-uploaded to.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads `bytes` and returns the publicly reachable URL.
    async fn upload(&self, bytes: Vec<u8>, title: &str) -> Result<String, ArtworkError>;
}
