use std::{collections::HashMap, fmt::Debug, future::Future, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use cnft_client::{
    retry::{retry_with_backoff, with_timeout},
    rpc::{LookupTableExt, Rpc},
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    address_lookup_table::instruction::{close_lookup_table, deactivate_lookup_table},
    message::{v0, AddressLookupTableAccount, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use tracing::{debug, info, warn};

use crate::{config::LookupTableConfig, errors::LookupTableError, slot_tracker::wait_until_slot_reached};

/// Answer of the mapping service: which lookup table holds each proof node,
/// and the slot from which those tables are usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofTableMapping {
    pub mapping: HashMap<String, Option<String>>,
    #[serde(default)]
    pub min_slot: u64,
}

impl ProofTableMapping {
    /// Distinct tables covering `proof`, in order of first use.
    pub fn tables_for(&self, proof: &[Pubkey]) -> Result<Vec<Pubkey>, LookupTableError> {
        let mut tables: Vec<Pubkey> = Vec::new();
        for node in proof {
            let Some(Some(table)) = self.mapping.get(&node.to_string()) else {
                continue;
            };
            let table = Pubkey::from_str(table).map_err(|e| {
                LookupTableError::InvalidMapping(format!("table address {}: {}", table, e))
            })?;
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        Ok(tables)
    }
}

#[async_trait]
pub trait LookupTableService: Send + Sync + Debug + 'static {
    async fn fetch_mapping(&self, proof: &[String]) -> Result<ProofTableMapping, LookupTableError>;
}

/// Mapping service reached with a `POST` of the proof hashes as a JSON array.
#[derive(Debug, Clone)]
pub struct HttpLookupTableService {
    client: reqwest::Client,
    url: Url,
}

impl HttpLookupTableService {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, LookupTableError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupTableError::service("create lookup table client", e))?;
        Ok(Self { client, url })
    }
}

const FETCH_MAPPING: &str = "fetch proof table mapping";
const FETCH_TABLE: &str = "fetch lookup table";

#[async_trait]
impl LookupTableService for HttpLookupTableService {
    async fn fetch_mapping(&self, proof: &[String]) -> Result<ProofTableMapping, LookupTableError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(proof)
            .send()
            .await
            .map_err(|e| LookupTableError::service(FETCH_MAPPING, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupTableError::Service {
                operation: FETCH_MAPPING,
                status: Some(status.as_u16()),
                message: body,
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| LookupTableError::service(FETCH_MAPPING, e))?;
        serde_json::from_str(&body).map_err(|e| LookupTableError::InvalidMapping(e.to_string()))
    }
}

/// Finds, waits for and loads the lookup tables that let a long proof fit
/// into one transaction.
#[derive(Debug)]
pub struct LookupTableResolver<R: Rpc> {
    rpc: Arc<R>,
    service: Arc<dyn LookupTableService>,
    config: LookupTableConfig,
}

impl<R: Rpc> Clone for LookupTableResolver<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: self.rpc.clone(),
            service: self.service.clone(),
            config: self.config,
        }
    }
}

impl<R: Rpc> LookupTableResolver<R> {
    pub fn new(rpc: Arc<R>, service: Arc<dyn LookupTableService>, config: LookupTableConfig) -> Self {
        Self {
            rpc,
            service,
            config,
        }
    }

    /// Runs `operation` under the configured timeout and retry policy.
    async fn guarded<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, LookupTableError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LookupTableError>>,
    {
        let timeout = self.config.timeout;
        let f = &f;
        retry_with_backoff(self.config.retry, LookupTableError::is_retryable, || async move {
            with_timeout(operation, timeout, f())
                .await
                .map_err(|e| LookupTableError::Timeout {
                    operation,
                    after: e.after,
                })?
        })
        .await
        .map_err(|e| e.into_inner())
    }

    pub async fn resolve(
        &self,
        proof: &[Pubkey],
    ) -> Result<Vec<AddressLookupTableAccount>, LookupTableError> {
        if proof.is_empty() {
            return Ok(vec![]);
        }
        let hashes: Vec<String> = proof.iter().map(|node| node.to_string()).collect();
        let mapping = self
            .guarded(FETCH_MAPPING, || self.service.fetch_mapping(&hashes))
            .await?;
        let tables = mapping.tables_for(proof)?;
        debug!(
            "Mapping service returned {} tables for {} proof nodes (min slot {})",
            tables.len(),
            proof.len(),
            mapping.min_slot
        );
        if tables.is_empty() {
            return Ok(vec![]);
        }

        wait_until_slot_reached(self.rpc.as_ref(), mapping.min_slot, self.config.max_slot_wait)
            .await?;

        let mut accounts = Vec::with_capacity(tables.len());
        for table in tables {
            accounts.push(self.fetch_table(table).await?);
        }
        Ok(accounts)
    }

    pub async fn fetch_table(
        &self,
        address: Pubkey,
    ) -> Result<AddressLookupTableAccount, LookupTableError> {
        self.guarded(FETCH_TABLE, || async move {
            match self.rpc.get_lookup_table(address).await {
                Ok(Some(state)) => Ok(state.account),
                Ok(None) => Err(LookupTableError::TableNotFound(address)),
                Err(e) => Err(LookupTableError::rpc(FETCH_TABLE, e)),
            }
        })
        .await
    }

    /// Deactivates active tables owned by `authority` and closes deactivated
    /// ones. Tables that are missing or owned by someone else are skipped.
    /// Returns the signatures of the transactions sent.
    pub async fn close_tables(&self, authority: &Keypair, tables: &[Pubkey]) -> Vec<Signature> {
        let mut signatures = Vec::new();
        for table in tables {
            match self.close_table(authority, table).await {
                Ok(Some(signature)) => signatures.push(signature),
                Ok(None) => {}
                Err(e) => warn!("Failed to clean up lookup table {}: {}", table, e),
            }
        }
        signatures
    }

    async fn close_table(
        &self,
        authority: &Keypair,
        table: &Pubkey,
    ) -> Result<Option<Signature>, LookupTableError> {
        let Some(state) = self
            .rpc
            .get_lookup_table(*table)
            .await
            .map_err(|e| LookupTableError::rpc(FETCH_TABLE, e))?
        else {
            warn!("Lookup table {} not found, nothing to close", table);
            return Ok(None);
        };
        if state.authority != Some(authority.pubkey()) {
            warn!(
                "Lookup table {} is owned by {:?}, not {}; skipping",
                table,
                state.authority,
                authority.pubkey()
            );
            return Ok(None);
        }

        let (operation, instruction) = if state.is_active() {
            (
                "deactivate lookup table",
                deactivate_lookup_table(*table, authority.pubkey()),
            )
        } else {
            (
                "close lookup table",
                close_lookup_table(*table, authority.pubkey(), authority.pubkey()),
            )
        };

        let (blockhash, _) = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| LookupTableError::rpc(operation, e))?;
        let message = v0::Message::try_compile(&authority.pubkey(), &[instruction], &[], blockhash)
            .map_err(|e| LookupTableError::rpc(operation, e.into()))?;
        let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &[authority])
            .map_err(|e| LookupTableError::rpc(operation, e.into()))?;
        let signature = self
            .rpc
            .send_transaction(&transaction, RpcSendTransactionConfig::default())
            .await
            .map_err(|e| LookupTableError::rpc(operation, e))?;
        info!("{} {}: {}", operation, table, signature);
        Ok(Some(signature))
    }
}
