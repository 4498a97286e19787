//! Shared HTTP client.

use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("whatsplaying/", env!("CARGO_PKG_VERSION"));

/// Every network call goes through this timeout; a stalled peer surfaces as
/// an error instead of a hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static HTTP_CLIENT: OnceCell<Client> = OnceCell::new();

/// Get or build the process-wide client. Construction failures are returned,
/// not unwrapped, so callers can report them.
pub fn http_client() -> Result<&'static Client, reqwest::Error> {
    HTTP_CLIENT.get_or_try_init(|| {
        Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
    })
}
