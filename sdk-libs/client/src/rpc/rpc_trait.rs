use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::TransactionError, transaction::VersionedTransaction,
};
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::rpc::errors::RpcError;

#[derive(Debug, Clone)]
pub struct RpcConnectionConfig {
    pub url: String,
    pub commitment_config: Option<CommitmentConfig>,
}

impl RpcConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            commitment_config: Some(CommitmentConfig::confirmed()),
        }
    }
}

/// The slice of the Solana JSON-RPC surface the burner depends on.
///
/// Every method takes `&self` so one connection can be shared by many
/// concurrent burns.
#[async_trait]
pub trait Rpc: Send + Sync + Debug + 'static {
    fn get_url(&self) -> String;

    async fn get_account(&self, address: Pubkey) -> Result<Option<Account>, RpcError>;
    async fn get_slot(&self) -> Result<u64, RpcError>;
    /// Returns the blockhash and its last valid block height.
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), RpcError>;
    async fn get_block_height(&self) -> Result<u64, RpcError>;

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> Result<Signature, RpcError>;

    /// `None` while the signature is unknown or not yet at the connection's
    /// commitment.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, RpcError>;

    async fn get_transaction_logs(&self, signature: &Signature) -> Result<Vec<String>, RpcError>;

    /// Polls the signature status until the transaction lands or `timeout`
    /// elapses. The outer error is the RPC failing, the inner one the
    /// transaction failing on-chain.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Result<(), TransactionError>, RpcError> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.get_signature_status(signature).await? {
                return Ok(status);
            }
            if start.elapsed() >= timeout {
                return Err(RpcError::ConfirmationTimeout {
                    signature: *signature,
                    timeout,
                });
            }
            trace!("Signature {} not confirmed yet", signature);
            sleep(poll_interval).await;
        }
    }
}
