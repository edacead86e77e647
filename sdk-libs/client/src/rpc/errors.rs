use std::{io, time::Duration};

use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    rpc_request::{RpcError as RpcRequestError, RpcResponseErrorData},
};
use solana_sdk::{
    message::CompileError, pubkey::Pubkey, signature::Signature, signer::SignerError,
    transaction::TransactionError,
};
use thiserror::Error;

/// JSON-RPC code returned while the node is behind or unhealthy.
const NODE_UNHEALTHY: i64 = -32005;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("TransactionError: {0}")]
    TransactionError(#[from] Box<TransactionError>),

    #[error("ClientError: {0}")]
    ClientError(#[from] Box<ClientError>),

    #[error("IoError: {0}")]
    IoError(#[from] Box<io::Error>),

    #[error("SignerError: {0}")]
    SignerError(#[from] SignerError),

    #[error("CompileError: {0}")]
    CompileError(#[from] CompileError),

    #[error("Invalid lookup table {address}: {reason}")]
    InvalidLookupTable { address: Pubkey, reason: String },

    #[error("Transaction {signature} not confirmed within {timeout:?}")]
    ConfirmationTimeout {
        signature: Signature,
        timeout: Duration,
    },

    #[error("Error: `{0}`")]
    CustomError(String),
}

impl From<TransactionError> for RpcError {
    fn from(err: TransactionError) -> Self {
        RpcError::TransactionError(Box::new(err))
    }
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        RpcError::ClientError(Box::new(err))
    }
}

impl From<io::Error> for RpcError {
    fn from(err: io::Error) -> Self {
        RpcError::IoError(Box::new(err))
    }
}

impl RpcError {
    /// Transport failures, rate limiting and unhealthy nodes are worth
    /// another attempt. Everything the cluster rejected is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::IoError(_) | RpcError::ConfirmationTimeout { .. } => true,
            RpcError::ClientError(err) => match err.kind() {
                ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => true,
                ClientErrorKind::RpcError(RpcRequestError::RpcRequestError(_)) => true,
                ClientErrorKind::RpcError(RpcRequestError::RpcResponseError {
                    code, data, ..
                }) => {
                    *code == NODE_UNHEALTHY
                        || matches!(data, RpcResponseErrorData::NodeUnhealthy { .. })
                }
                ClientErrorKind::Custom(message) => message.contains("429"),
                _ => false,
            },
            _ => false,
        }
    }

    /// Program logs of a failed preflight simulation, if this error is one.
    pub fn simulation_logs(&self) -> Option<Vec<String>> {
        let RpcError::ClientError(err) = self else {
            return None;
        };
        match err.kind() {
            ClientErrorKind::RpcError(RpcRequestError::RpcResponseError {
                data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
                ..
            }) => Some(result.logs.clone().unwrap_or_default()),
            _ => None,
        }
    }

    pub fn is_transaction_too_large(&self) -> bool {
        self.to_string().to_lowercase().contains("too large")
    }
}
