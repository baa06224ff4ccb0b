//! Error types for the kiosk's network collaborators
//!
//! This module defines the errors raised while talking to the shop API and
//! the push channel.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Map a reqwest error, keeping timeouts distinguishable
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Check if the error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::ServerError(status) => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors raised by the push channel
#[derive(Error, Debug)]
pub enum PushError {
    /// WebSocket handshake or transport failure
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),

    /// Transport failed after the connection was established
    #[error("websocket transport error: {0}")]
    Transport(Box<tokio_tungstenite::tungstenite::Error>),

    /// Push endpoint is not a valid URL
    #[error("Invalid push URL: {0}")]
    InvalidUrl(String),
}

impl PushError {
    /// Push failures are always retried by the reconnect loop, except a
    /// malformed endpoint
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}
