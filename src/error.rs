//! Error types shared across the harness

use thiserror::Error;

/// Errors produced by the config, auth and client layers.
///
/// Business-level failures (`code != "20000"`) are *not* errors; they come
/// back inside the response envelope and are asserted on by the tests.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-2xx response surfaced because the caller asked to raise on error.
    #[error("HTTP {status} for {url}: {snippet}")]
    HttpStatus {
        status: u16,
        url: String,
        snippet: String,
    },

    /// Transport-level failure (timeout, connection refused) after retries
    /// were exhausted.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be parsed as the expected JSON shape.
    #[error("invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No access token could be obtained through any credential provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed curl command handed to the parser.
    #[error("curl parse error: {0}")]
    CurlParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
