//! Artwork module: resolves a media item's thumbnail to a public image URL.
pub mod cache;
pub mod imgur;
pub mod publisher;
pub mod types;

pub use cache::ThumbnailCache;
pub use imgur::ImgurUploader;
pub use publisher::ArtworkPublisher;
pub use types::{ArtworkError, DEFAULT_LOGO, ImageHost};
