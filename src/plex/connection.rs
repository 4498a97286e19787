//! HTTP connection to a Plex Media Server and server discovery.

use crate::http::http_client;
use crate::plex::MediaServer;
use crate::plex::metadata::{MediaMetadata, MetadataResponse};
use crate::plex::sessions::{SessionEntry, SessionsResponse};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};

const CLIENT_IDENTIFIER: &str = "whatsplaying";
const PRODUCT: &str = "What's Playing";

/// Errors that can occur while talking to the media server
#[derive(thiserror::Error, Debug)]
pub enum PlexError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Serde error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("No metadata for rating key {0}")]
    NotFound(String),
    #[error("Failed to connect to any server address")]
    NoConnection,
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A connection to one server address, authenticated with the account token.
#[derive(Debug, Clone)]
pub struct PlexClient {
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Walks the server's advertised addresses in order and keeps the first
    /// one whose session endpoint answers. Session data is only served to
    /// the server owner, so an address that answers anything else is skipped.
    pub async fn connect(candidates: &[String], token: &str) -> Result<Self, PlexError> {
        for uri in candidates {
            let client = Self::new(uri, token);
            match client.get_sessions().await {
                Ok(_) => {
                    tracing::info!(url = %client.base_url, "Connected to media server");
                    return Ok(client);
                }
                Err(e) => {
                    tracing::warn!(url = %uri, error = %e, "Failed to connect to server address");
                }
            }
        }
        Err(PlexError::NoConnection)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Websocket endpoint for the server's notification stream.
    pub fn notification_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.base_url)
        };
        format!(
            "{}/:/websockets/notifications?X-Plex-Token={}",
            ws_base,
            urlencoding::encode(&self.token)
        )
    }

    /// Raw-image URL convention: `<base><thumb path>?X-Plex-Token=<token>`.
    pub fn thumbnail_url(&self, path: &str) -> String {
        format!(
            "{}{}?X-Plex-Token={}",
            self.base_url,
            path,
            urlencoding::encode(&self.token)
        )
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, PlexError> {
        Ok(http_client()?
            .get(format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
            .header("X-Plex-Product", PRODUCT))
    }
}

fn check_status(resp: Response, what: &str) -> Result<Response, PlexError> {
    if !resp.status().is_success() {
        return Err(PlexError::Api(format!("{what}: HTTP {}", resp.status())));
    }
    Ok(resp)
}

#[async_trait]
impl MediaServer for PlexClient {
    async fn get_sessions(&self) -> Result<Vec<SessionEntry>, PlexError> {
        let resp = check_status(self.get("/status/sessions")?.send().await?, "sessions")?;
        let body = resp.text().await?;
        let parsed: SessionsResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_entries())
    }

    async fn get_metadata(&self, rating_key: &str) -> Result<MediaMetadata, PlexError> {
        let path = format!("/library/metadata/{}", urlencoding::encode(rating_key));
        let resp = check_status(self.get(&path)?.send().await?, "metadata")?;
        let body = resp.text().await?;
        let parsed: MetadataResponse = serde_json::from_str(&body)?;
        parsed
            .into_first()
            .ok_or_else(|| PlexError::NotFound(rating_key.to_string()))
    }

    async fn fetch_thumbnail(&self, path: &str) -> Result<Vec<u8>, PlexError> {
        let resp = http_client()?.get(self.thumbnail_url(path)).send().await?;
        let resp = check_status(resp, "thumbnail")?;
        Ok(resp.bytes().await?.to_vec())
    }
}
