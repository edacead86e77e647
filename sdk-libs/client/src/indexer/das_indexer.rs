use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, trace};

use super::{
    request::{AssetIdParams, DisplayOptions, GetAssetsByOwnerParams, RpcRequest, RpcResponse},
    AssetList, AssetProof, DasAsset, Indexer, IndexerError,
};
use crate::retry::{retry_with_backoff, RetryConfig};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// DAS client speaking JSON-RPC over HTTP. Most RPC providers serve the DAS
/// methods on the same endpoint as the regular Solana API.
pub struct DasIndexer {
    client: reqwest::Client,
    url: String,
    retry_config: RetryConfig,
}

impl Debug for DasIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DasIndexer {{ url: {} }}", self.url)
    }
}

impl DasIndexer {
    pub fn new(url: impl Into<String>) -> Result<Self, IndexerError> {
        Self::new_with_config(url, RetryConfig::default(), DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn new_with_config(
        url: impl Into<String>,
        retry_config: RetryConfig,
        request_timeout: Duration,
    ) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_config,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, IndexerError>
    where
        P: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        retry_with_backoff(self.retry_config, IndexerError::is_retryable, || async move {
            self.call_once(method, params).await
        })
        .await
        .map_err(|e| e.into_inner())
    }

    async fn call_once<P, T>(&self, method: &str, params: &P) -> Result<T, IndexerError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        trace!("Sending {} to {}", method, self.url);
        let request = RpcRequest::new(method, params);
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: RpcResponse<T> = serde_json::from_str(&body)?;
        if let Some(error) = response.error {
            return Err(IndexerError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or_else(|| IndexerError::MissingResult {
            method: method.to_string(),
        })
    }
}

/// Providers report unknown assets as a generic JSON-RPC error or as a null
/// result.
fn not_found_to_asset_error(id: &Pubkey, error: IndexerError) -> IndexerError {
    match error {
        IndexerError::JsonRpc { ref message, .. }
            if message.to_lowercase().contains("not found") =>
        {
            IndexerError::AssetNotFound(id.to_string())
        }
        IndexerError::MissingResult { .. } => IndexerError::AssetNotFound(id.to_string()),
        other => other,
    }
}

#[async_trait]
impl Indexer for DasIndexer {
    async fn get_assets_by_owner(
        &self,
        owner: &Pubkey,
        page: u32,
        limit: u32,
    ) -> Result<AssetList, IndexerError> {
        if page == 0 {
            return Err(IndexerError::InvalidParameters(
                "pages start at 1".to_string(),
            ));
        }
        let params = GetAssetsByOwnerParams {
            owner_address: owner.to_string(),
            page,
            limit,
            display_options: DisplayOptions {
                show_unverified_collections: true,
            },
        };
        let list: AssetList = self.call("getAssetsByOwner", &params).await?;
        debug!(
            "Fetched page {} for {}: {} items ({} total)",
            page,
            owner,
            list.items.len(),
            list.total
        );
        Ok(list)
    }

    async fn get_asset(&self, id: &Pubkey) -> Result<DasAsset, IndexerError> {
        let params = AssetIdParams { id: id.to_string() };
        self.call("getAsset", &params)
            .await
            .map_err(|e| not_found_to_asset_error(id, e))
    }

    async fn get_asset_proof(&self, id: &Pubkey) -> Result<AssetProof, IndexerError> {
        let params = AssetIdParams { id: id.to_string() };
        self.call("getAssetProof", &params)
            .await
            .map_err(|e| not_found_to_asset_error(id, e))
    }
}
