use thiserror::Error;

/// JSON-RPC code for rate limited requests used by several DAS providers.
const RATE_LIMITED: i64 = -32429;
const NODE_UNHEALTHY: i64 = -32005;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Indexer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Indexer error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    #[error("Missing result in {method} response")]
    MissingResult { method: String },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Base58 decode error in {field}: {message}")]
    Base58Decode { field: String, message: String },

    #[error("Invalid response data: {0}")]
    InvalidResponseData(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to parse indexer response: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexerError {
    pub fn base58_decode(field: impl Into<String>, message: impl ToString) -> Self {
        Self::Base58Decode {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Network failures, throttling and server side errors. A well formed
    /// answer the caller does not like is never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexerError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status()
                        .map(|s| s.as_u16() == 429 || s.is_server_error())
                        .unwrap_or(false)
            }
            IndexerError::Status { status, .. } => *status == 429 || *status >= 500,
            IndexerError::JsonRpc { code, .. } => *code == RATE_LIMITED || *code == NODE_UNHEALTHY,
            _ => false,
        }
    }
}
