//! Shared HTTP plumbing: client construction and status-checked GETs.

use crate::config::Config;
use crate::error::{NbdtError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// User agent string for requests
const USER_AGENT: &str = concat!("rustnbdt/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for one load or update call.
///
/// `http_timeout` bounds connecting and each idle gap while reading, never the
/// whole transfer: snapshot downloads run to hundreds of megabytes.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(config.http_timeout)
        .read_timeout(config.http_timeout)
        .build()
        .map_err(|e| NbdtError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// GET `url` and return the body as text.
///
/// A non-success status is logged and returned as [`NbdtError::Api`]; the body
/// of a failed response is never handed to the caller.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!(url = %url, "GET");
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        warn!(status = status.as_u16(), url = %url, "Request failed");
        return Err(NbdtError::Api {
            code: status.as_u16(),
            message: format!("Request to {} failed with status {}", url, status),
        });
    }

    response.text().await.map_err(NbdtError::Network)
}

/// GET `url` and deserialize the JSON body
pub async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> Result<T> {
    let body = get_text(client, url).await?;
    serde_json::from_str(&body)
        .map_err(|e| NbdtError::Parse(format!("Unexpected JSON from {}: {}", url, e)))
}
