mod artwork;
mod event;
mod http;
mod plex;
mod pool;
mod presence;
mod state;
mod storage;
mod text_utils;
mod timer;
mod watchdog;

use crate::artwork::{ImgurUploader, ThumbnailCache};
use crate::plex::PlexError;
use crate::pool::Bridge;
use crate::presence::{DiscordPresence, PresenceError};
use crate::storage::{SqliteStore, StoreError, load_token, save_token};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_IMGUR_CLIENT_ID: &str = "0dedf5b51d09876";
const DEFAULT_DISCORD_CLIENT_ID: &str = "413407336082833418";

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Addresses of the media server to listen to, tried in order (comma-separated).
    /// If empty, the PLEX_SERVER_URLS env var will be used as a fallback.
    #[arg(long = "server", value_name = "URL1,URL2", value_delimiter = ',')]
    servers: Vec<String>,
    /// Display name of the user whose playback is mirrored (fallback: PLEX_USERNAME)
    #[arg(long)]
    username: Option<String>,
    /// Media server auth token (fallback: PLEX_TOKEN, then the stored token).
    /// A token given here is persisted for later runs.
    #[arg(long)]
    token: Option<String>,
    /// Path to the local store (auth token and artwork cache)
    #[arg(long)]
    database: Option<PathBuf>,
    /// Imgur application client id used for artwork uploads
    #[arg(long, default_value = DEFAULT_IMGUR_CLIENT_ID)]
    imgur_client_id: String,
    /// Discord application id the presence is published under
    #[arg(long, default_value = DEFAULT_DISCORD_CLIENT_ID)]
    discord_client_id: String,
    /// Interval between idle checks, in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,
    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug_log: bool,
}

#[derive(thiserror::Error, Debug)]
enum StartupError {
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Presence(#[from] PresenceError),
    #[error(transparent)]
    Connect(#[from] PlexError),
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn apply_env_fallbacks(cfg: &mut Config) {
    if cfg.servers.is_empty()
        && let Some(s) = env_nonempty("PLEX_SERVER_URLS")
    {
        cfg.servers = s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }
    if cfg.username.is_none() {
        cfg.username = env_nonempty("PLEX_USERNAME");
    }
    if cfg.token.is_none() {
        cfg.token = env_nonempty("PLEX_TOKEN");
    }
    if let Some(id) = env_nonempty("IMGUR_CLIENT_ID")
        && cfg.imgur_client_id == DEFAULT_IMGUR_CLIENT_ID
    {
        cfg.imgur_client_id = id;
    }
    if let Some(id) = env_nonempty("DISCORD_CLIENT_ID")
        && cfg.discord_client_id == DEFAULT_DISCORD_CLIENT_ID
    {
        cfg.discord_client_id = id;
    }
}

fn default_database_path() -> PathBuf {
    let data_dir = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")));
    match data_dir {
        Some(dir) => dir.join("whatsplaying").join("whatsplaying.sqlite"),
        None => PathBuf::from("whatsplaying.sqlite"),
    }
}

fn init_logging(debug_log: bool) {
    let default_level = if debug_log { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cfg: Config) -> Result<(), StartupError> {
    if cfg.servers.is_empty() {
        return Err(StartupError::MissingConfig("server address (--server or PLEX_SERVER_URLS)"));
    }
    let username = cfg
        .username
        .clone()
        .ok_or(StartupError::MissingConfig("username (--username or PLEX_USERNAME)"))?;

    let db_path = cfg.database.clone().unwrap_or_else(default_database_path);
    let store = Arc::new(SqliteStore::open(&db_path).await?);

    let token = match cfg.token.clone() {
        Some(token) => {
            save_token(store.as_ref(), &token).await?;
            token
        }
        None => load_token(store.as_ref())
            .await?
            .ok_or(StartupError::MissingConfig("auth token (--token or PLEX_TOKEN)"))?,
    };
    tracing::info!("Token loaded");

    let broadcaster = Arc::new(DiscordPresence::new(&cfg.discord_client_id)?);
    let host = Arc::new(ImgurUploader::new(&cfg.imgur_client_id));
    let cache = ThumbnailCache::new(store.clone());

    let mut bridge = Bridge::new(
        &username,
        &token,
        Duration::from_millis(cfg.poll_interval_ms.max(1)),
        cache,
        host,
        broadcaster,
    );

    if let Err(e) = bridge.start_listening(&cfg.servers).await {
        tracing::error!("{}", bridge.status().await);
        return Err(e.into());
    }
    tracing::info!("{}", bridge.status().await);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    bridge.stop().await;
    store.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    apply_env_fallbacks(&mut cfg);
    init_logging(cfg.debug_log);

    if let Err(e) = run(cfg).await {
        tracing::error!("Error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_list() {
        let cfg = Config::parse_from([
            "whatsplaying",
            "--server",
            "http://10.0.0.2:32400,https://remote.example:32400",
            "--username",
            "alice",
        ]);
        assert_eq!(cfg.servers.len(), 2);
        assert_eq!(cfg.username.as_deref(), Some("alice"));
        assert_eq!(cfg.poll_interval_ms, 1000);
        assert_eq!(cfg.imgur_client_id, DEFAULT_IMGUR_CLIENT_ID);
    }

    #[tokio::test]
    async fn missing_server_is_a_startup_error() {
        let cfg = Config::parse_from(["whatsplaying", "--username", "alice"]);
        assert!(matches!(run(cfg).await, Err(StartupError::MissingConfig(_))));
    }

    #[tokio::test]
    async fn missing_token_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.sqlite");
        let cfg = Config::parse_from([
            "whatsplaying",
            "--server",
            "http://127.0.0.1:1",
            "--username",
            "alice",
            "--database",
            db.to_str().unwrap(),
        ]);
        let cfg = Config { token: None, ..cfg };
        assert!(matches!(run(cfg).await, Err(StartupError::MissingConfig(_))));
    }
}
