use std::fmt::{Debug, Display, Formatter};

use async_trait::async_trait;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig},
};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::TransactionError, transaction::VersionedTransaction,
};
use solana_transaction_status::{option_serializer::OptionSerializer, UiTransactionEncoding};

use crate::{
    retry::{retry_with_backoff, RetryConfig},
    rpc::{errors::RpcError, rpc_trait::RpcConnectionConfig, Rpc},
};

pub enum SolanaRpcUrl {
    Mainnet,
    Devnet,
    Localnet,
    Custom(String),
}

impl Display for SolanaRpcUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            SolanaRpcUrl::Mainnet => "https://api.mainnet-beta.solana.com".to_string(),
            SolanaRpcUrl::Devnet => "https://api.devnet.solana.com".to_string(),
            SolanaRpcUrl::Localnet => "http://localhost:8899".to_string(),
            SolanaRpcUrl::Custom(url) => url.clone(),
        };
        write!(f, "{}", str)
    }
}

pub struct SolanaRpc {
    pub client: RpcClient,
    pub retry_config: RetryConfig,
}

impl Debug for SolanaRpc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SolanaRpc {{ client: {:?} }}", self.client.url())
    }
}

impl SolanaRpc {
    pub fn new(config: RpcConnectionConfig) -> Self {
        Self::new_with_retry(config, None)
    }

    pub fn new_with_retry(config: RpcConnectionConfig, retry_config: Option<RetryConfig>) -> Self {
        let commitment_config = config
            .commitment_config
            .unwrap_or(CommitmentConfig::confirmed());
        let client = RpcClient::new_with_commitment(config.url, commitment_config);
        Self {
            client,
            retry_config: retry_config.unwrap_or_default(),
        }
    }

    async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RpcError>>,
    {
        retry_with_backoff(self.retry_config, RpcError::is_retryable, operation)
            .await
            .map_err(|e| e.into_inner())
    }
}

#[async_trait]
impl Rpc for SolanaRpc {
    fn get_url(&self) -> String {
        self.client.url()
    }

    async fn get_account(&self, address: Pubkey) -> Result<Option<Account>, RpcError> {
        self.retry(|| async move {
            self.client
                .get_account_with_commitment(&address, self.client.commitment())
                .await
                .map(|response| response.value)
                .map_err(RpcError::from)
        })
        .await
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        self.retry(|| async move { self.client.get_slot().await.map_err(RpcError::from) })
            .await
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), RpcError> {
        self.retry(|| async move {
            self.client
                .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
                .await
                .map_err(RpcError::from)
        })
        .await
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        self.retry(|| async move {
            self.client
                .get_block_height_with_commitment(CommitmentConfig::confirmed())
                .await
                .map_err(RpcError::from)
        })
        .await
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> Result<Signature, RpcError> {
        // Not retried here. The burner owns resend policy.
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(RpcError::from)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, RpcError> {
        self.retry(|| async move {
            self.client
                .get_signature_status_with_commitment(signature, self.client.commitment())
                .await
                .map_err(RpcError::from)
        })
        .await
    }

    async fn get_transaction_logs(&self, signature: &Signature) -> Result<Vec<String>, RpcError> {
        let transaction = self
            .retry(|| async move {
                self.client
                    .get_transaction_with_config(
                        signature,
                        RpcTransactionConfig {
                            encoding: Some(UiTransactionEncoding::Base64),
                            commitment: Some(self.client.commitment()),
                            max_supported_transaction_version: Some(0),
                        },
                    )
                    .await
                    .map_err(RpcError::from)
            })
            .await?;
        let meta = transaction.transaction.meta.ok_or_else(|| {
            RpcError::CustomError("Transaction missing metadata information".to_string())
        })?;
        match meta.log_messages {
            OptionSerializer::Some(logs) => Ok(logs),
            OptionSerializer::None | OptionSerializer::Skip => Ok(vec![]),
        }
    }
}
