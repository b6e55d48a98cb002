//! RPC endpoint normalization.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint is empty")]
    Empty,

    #[error("invalid endpoint {endpoint}: {reason}")]
    Unparseable { endpoint: String, reason: String },

    #[error("endpoint {0} must use http or https")]
    UnsupportedScheme(String),
}

/// Parse an endpoint as an absolute `http`/`https` URL.
///
/// The returned URL's string form is canonical, so `https://x.com` and
/// `https://x.com/` normalize to the same value.
pub fn normalize_endpoint(endpoint: &str) -> Result<Url, EndpointError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::Empty);
    }

    let url = Url::parse(trimmed).map_err(|e| EndpointError::Unparseable {
        endpoint: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(EndpointError::UnsupportedScheme(trimmed.to_string())),
    }
}
