use std::time::Duration;

use cnft_client::{
    indexer::IndexerError,
    rpc::{MerkleTreeError, RpcError},
};
use solana_sdk::{pubkey::Pubkey, signature::Signature, signer::SignerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BurnError {
    #[error("No wallet connected")]
    NoWallet,

    #[error("Signer {signer} is neither the owner {owner} nor the delegate of asset {asset}")]
    UnauthorizedSigner {
        signer: Pubkey,
        owner: Pubkey,
        asset: Pubkey,
    },

    #[error("Failed to fetch asset data: {0}")]
    Proof(#[from] IndexerError),

    #[error("Invalid proof for asset {asset}: {reason}")]
    InvalidProof { asset: Pubkey, reason: String },

    #[error("Merkle tree error: {0}")]
    Tree(#[from] MerkleTreeError),

    #[error("Lookup table error: {0}")]
    LookupTable(#[from] LookupTableError),

    #[error("Transaction too large: {size} bytes (max {max})")]
    TransactionTooLarge { size: usize, max: usize },

    #[error("Transaction simulation failed: {message}")]
    Simulation { message: String, logs: Vec<String> },

    #[error("Transaction {signature} failed: {message}")]
    TransactionFailed {
        signature: Signature,
        message: String,
        logs: Vec<String>,
    },

    #[error("Transaction {signature} not confirmed within {timeout:?}")]
    ConfirmationTimeout {
        signature: Signature,
        timeout: Duration,
    },

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("RPC error: {0}")]
    Rpc(RpcError),

    #[error("Burner error: {error}")]
    General { error: String },
}

/// Oversized and failed-preflight sends come back from the RPC as generic
/// client errors. They are lifted into their own variants here.
impl From<RpcError> for BurnError {
    fn from(err: RpcError) -> Self {
        if err.is_transaction_too_large() {
            return BurnError::TransactionTooLarge {
                size: oversized_length(&err.to_string()).unwrap_or_default(),
                max: cnft_client::constants::MAX_TRANSACTION_SIZE,
            };
        }
        if let Some(logs) = err.simulation_logs() {
            return BurnError::Simulation {
                message: err.to_string(),
                logs,
            };
        }
        match err {
            RpcError::ConfirmationTimeout { signature, timeout } => {
                BurnError::ConfirmationTimeout { signature, timeout }
            }
            RpcError::SignerError(e) => BurnError::Signing(e),
            other => BurnError::Rpc(other),
        }
    }
}

impl From<anyhow::Error> for BurnError {
    fn from(err: anyhow::Error) -> Self {
        BurnError::General {
            error: format!("{:#}", err),
        }
    }
}

/// Pulls the byte count out of "... too large: 1644 bytes ...".
fn oversized_length(message: &str) -> Option<usize> {
    let (_, rest) = message.split_once("too large: ")?;
    rest.split_whitespace().next()?.parse().ok()
}

impl BurnError {
    pub fn general<E: std::fmt::Display>(error: E) -> Self {
        Self::General {
            error: error.to_string(),
        }
    }

    /// Program logs carried by the error, if any.
    pub fn logs(&self) -> &[String] {
        match self {
            BurnError::Simulation { logs, .. } | BurnError::TransactionFailed { logs, .. } => logs,
            _ => &[],
        }
    }

    /// Whether sending the same burn again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BurnError::Rpc(e) => e.is_retryable(),
            BurnError::ConfirmationTimeout { .. } => true,
            BurnError::Proof(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum LookupTableError {
    #[error("{operation}: lookup table service failed: {message}")]
    Service {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("{operation}: timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation}: {source}")]
    Rpc {
        operation: &'static str,
        #[source]
        source: RpcError,
    },

    #[error("Lookup table {0} not found")]
    TableNotFound(Pubkey),

    #[error("Invalid lookup table mapping: {0}")]
    InvalidMapping(String),

    #[error("Slot {target} not reached within {after:?} (current slot {current})")]
    SlotNotReached {
        target: u64,
        current: u64,
        after: Duration,
    },
}

impl LookupTableError {
    pub fn service(operation: &'static str, err: reqwest::Error) -> Self {
        Self::Service {
            operation,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    pub fn rpc(operation: &'static str, source: RpcError) -> Self {
        Self::Rpc { operation, source }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LookupTableError::Service { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            LookupTableError::Timeout { .. } => true,
            LookupTableError::Rpc { source, .. } => source.is_retryable(),
            LookupTableError::TableNotFound(_)
            | LookupTableError::InvalidMapping(_)
            | LookupTableError::SlotNotReached { .. } => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid keypair data: {0}")]
    InvalidKeypair(String),

    #[error("Invalid pubkey: {field} - {error}")]
    InvalidPubkey { field: &'static str, error: String },

    #[error("Invalid URL: {field} - {error}")]
    InvalidUrl { field: &'static str, error: String },

    #[error("Invalid value: {field} - {error}")]
    InvalidValue { field: &'static str, error: String },
}
