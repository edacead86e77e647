use std::fmt::Debug;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use super::{AssetList, AssetProof, DasAsset, IndexerError};

/// Read side of a DAS compatible indexer.
#[async_trait]
pub trait Indexer: Send + Sync + Debug + 'static {
    /// One page of the assets held by `owner`. Pages start at 1.
    async fn get_assets_by_owner(
        &self,
        owner: &Pubkey,
        page: u32,
        limit: u32,
    ) -> Result<AssetList, IndexerError>;

    async fn get_asset(&self, id: &Pubkey) -> Result<DasAsset, IndexerError>;

    async fn get_asset_proof(&self, id: &Pubkey) -> Result<AssetProof, IndexerError>;
}
