//! Error types for the application

use thiserror::Error;

/// Result type alias using our TraderError
pub type Result<T> = std::result::Result<T, TraderError>;

/// Main error type for exchange and trading operations
#[derive(Error, Debug)]
pub enum TraderError {
    /// Exchange has no metadata for the symbol
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Non-success HTTP response from a trading or query call
    #[error("Exchange error HTTP {status}: {body}")]
    Exchange { status: u16, body: String },

    /// Signed endpoint called without configured API key/secret
    #[error("Missing API key/secret")]
    MissingCredentials,

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Database errors from the position/order store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TraderError {
    /// True for the per-symbol kind of failure that skips the symbol for
    /// the current tick instead of aborting the whole pass.
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            TraderError::UnknownSymbol(_)
                | TraderError::Exchange { .. }
                | TraderError::HttpRequest(_)
                | TraderError::InvalidResponse(_)
        )
    }
}
