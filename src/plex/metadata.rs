//! Media item metadata and the human-readable labels derived from it.

use crate::plex::de::{lenient_i64, lenient_string};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Track,
    Movie,
    Episode,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Immutable snapshot of an item, fetched once per playback event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating_key: String,
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub grandparent_title: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub parent_index: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub index: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub year: i64,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub parent_thumb: String,
    #[serde(default)]
    pub grandparent_thumb: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataResponse {
    #[serde(rename = "MediaContainer", default)]
    media_container: MetadataContainer,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<MediaMetadata>,
}

impl MetadataResponse {
    pub(crate) fn into_first(self) -> Option<MediaMetadata> {
        self.media_container.metadata.into_iter().next()
    }
}

/// Title line shown under the category label.
///
/// The session's type drives the format, not the item's own type, since the
/// snapshot is what identified the playback.
pub fn derive_title(meta: &MediaMetadata, session_type: MediaType) -> String {
    match session_type {
        MediaType::Track => format!("{} - {}", meta.grandparent_title, meta.title),
        MediaType::Movie => format!("{} ({})", meta.title, meta.year),
        MediaType::Episode => format!(
            "{} S{:02}E{:02} - {}",
            meta.grandparent_title, meta.parent_index, meta.index, meta.title
        ),
        MediaType::Unknown => "Unknown Media Title".to_string(),
    }
}

pub fn derive_category_label(session_type: MediaType) -> &'static str {
    match session_type {
        MediaType::Track => "Listening to Music",
        MediaType::Movie => "Watching a Movie",
        MediaType::Episode => "Watching a TV Show",
        MediaType::Unknown => "Unknown Media Type",
    }
}
