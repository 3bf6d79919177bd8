//! Error types for the discovery client.

use thiserror::Error;

/// Errors raised while talking to the Messages API.
///
/// Parsing of the model's answer is not an error here: an unusable answer
/// becomes an empty discovery outcome instead.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Missing API key or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failure, timeout or unreadable body
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the API
    #[error("API returned {code}: {body}")]
    Status { code: u16, body: String },

    /// Response body was not a valid Messages API payload
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
