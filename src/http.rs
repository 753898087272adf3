//! Shared HTTP client for index downloads.
//!
//! Provides a configured [`reqwest::Client`] and a byte-fetch helper that
//! turns status and network failures into the caller's error kind, naming
//! the url that failed.

use std::time::Duration;

use crate::config::ClientOptions;
use crate::error::SearchError;

/// User-Agent sent with every index request.
const USER_AGENT: &str = concat!("pagefind-client/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for fetching index files.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the client cannot be constructed.
pub fn build_client(options: &ClientOptions) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_seconds))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {e}")))
}

/// Fetch `url` and return the response body.
///
/// `fail` wraps the failure description into the error kind appropriate
/// for the resource (manifest vs. chunk).
pub(crate) async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    fail: fn(String) -> SearchError,
) -> Result<Vec<u8>, SearchError> {
    tracing::trace!(url, "fetching");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fail(format!("{url}: request failed: {e}")))?
        .error_for_status()
        .map_err(|e| fail(format!("{url}: {e}")))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| fail(format!("{url}: response read failed: {e}")))?;

    tracing::trace!(url, bytes = bytes.len(), "fetched");
    Ok(bytes.to_vec())
}
