use std::collections::HashSet;

use cnft_client::indexer::{
    decode_base58_option_to_pubkey, decode_hash, decode_pubkey, DasAsset, Indexer, IndexerError,
};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::Result;

/// Page size of `getAssetsByOwner`.
pub const ASSETS_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub owner: Pubkey,
    pub delegate: Option<Pubkey>,
    pub delegated: bool,
}

impl Ownership {
    /// Account passed as `leaf_delegate`: the recorded delegate while one is
    /// active, the owner otherwise.
    pub fn leaf_delegate(&self) -> Pubkey {
        match (self.delegated, self.delegate) {
            (true, Some(delegate)) => delegate,
            _ => self.owner,
        }
    }

    pub fn can_sign(&self, signer: &Pubkey) -> bool {
        *signer == self.owner || (self.delegated && self.delegate.as_ref() == Some(signer))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: Pubkey,
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub collection: Option<Pubkey>,
    pub collection_name: Option<String>,
    pub tree: Pubkey,
    pub leaf_index: u64,
    pub asset_hash: [u8; 32],
    pub data_hash: [u8; 32],
    pub creator_hash: [u8; 32],
    pub ownership: Ownership,
}

impl TryFrom<&DasAsset> for Asset {
    type Error = IndexerError;

    fn try_from(asset: &DasAsset) -> std::result::Result<Self, Self::Error> {
        let compression = asset.compression.as_ref().ok_or_else(|| {
            IndexerError::InvalidResponseData(format!("asset {} has no compression data", asset.id))
        })?;
        let collection = asset.collection();
        let delegated = asset.ownership.delegated;
        Ok(Self {
            id: decode_pubkey("id", &asset.id)?,
            name: asset.name().to_string(),
            symbol: asset.symbol().to_string(),
            image: asset.image().map(str::to_string),
            collection: collection
                .map(|g| decode_base58_option_to_pubkey("group_value", &g.group_value))
                .transpose()?
                .flatten(),
            collection_name: collection
                .and_then(|g| g.collection_metadata.as_ref())
                .and_then(|m| m.name.clone())
                .filter(|name| !name.is_empty()),
            tree: decode_pubkey("tree", &compression.tree)?,
            leaf_index: compression.leaf_id,
            asset_hash: decode_hash("asset_hash", &compression.asset_hash)?,
            data_hash: decode_hash("data_hash", &compression.data_hash)?,
            creator_hash: decode_hash("creator_hash", &compression.creator_hash)?,
            ownership: Ownership {
                owner: decode_pubkey("owner", &asset.ownership.owner)?,
                delegate: decode_base58_option_to_pubkey("delegate", &asset.ownership.delegate)?,
                delegated,
            },
        })
    }
}

impl Asset {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "<unnamed>"
        } else {
            &self.name
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id.to_string(),
            "name": self.name,
            "symbol": self.symbol,
            "uri": self.image,
            "collection": self.collection.map(|c| c.to_string()),
            "collectionName": self.collection_name,
            "treeAddress": self.tree.to_string(),
            "leafIndex": self.leaf_index,
            "assetHash": bs58::encode(self.asset_hash).into_string(),
            "ownership": {
                "owner": self.ownership.owner.to_string(),
                "delegate": self.ownership.delegate.map(|d| d.to_string()),
                "delegated": self.ownership.delegated,
            },
        })
    }
}

/// Whether a DAS item is a live compressed NFT.
pub fn is_burnable(asset: &DasAsset) -> bool {
    !asset.burnt && asset.is_compressed()
}

/// Lists every live compressed NFT held by `owner`, walking pages until a
/// short one. Items that fail to decode are logged and skipped.
pub async fn fetch_assets<I: Indexer + ?Sized>(indexer: &I, owner: &Pubkey) -> Result<Vec<Asset>> {
    let mut assets = Vec::new();
    let mut page = 1;
    loop {
        let list = indexer
            .get_assets_by_owner(owner, page, ASSETS_PAGE_LIMIT)
            .await?;
        let received = list.items.len();
        for item in list.items.iter().filter(|item| is_burnable(item)) {
            match Asset::try_from(item) {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!("Skipping asset {}: {}", item.id, e),
            }
        }
        debug!("Page {}: {} items, {} kept so far", page, received, assets.len());
        if received < ASSETS_PAGE_LIMIT as usize {
            break;
        }
        page += 1;
    }
    info!("Found {} compressed NFTs for {}", assets.len(), owner);
    Ok(assets)
}

/// Fetches a single asset, used to refresh delegation before a burn and to
/// verify one afterwards.
pub async fn fetch_asset<I: Indexer + ?Sized>(indexer: &I, id: &Pubkey) -> Result<Asset> {
    let asset = indexer.get_asset(id).await?;
    Ok(Asset::try_from(&asset)?)
}

/// Fetches `id` for a signer that does not hold it. `None` unless the asset
/// is live and `signer` is its active delegate.
pub async fn fetch_delegated_asset<I: Indexer + ?Sized>(
    indexer: &I,
    id: &Pubkey,
    signer: &Pubkey,
) -> Result<Option<Asset>> {
    let asset = indexer.get_asset(id).await?;
    if !is_burnable(&asset) {
        return Ok(None);
    }
    let asset = Asset::try_from(&asset)?;
    Ok(asset.ownership.can_sign(signer).then_some(asset))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionGroup {
    pub collection: Option<Pubkey>,
    pub name: String,
    pub assets: Vec<Asset>,
}

/// Groups assets by collection in order of first appearance. Assets without
/// a collection end up in one trailing group.
pub fn group_by_collection(assets: &[Asset]) -> Vec<CollectionGroup> {
    let mut groups: Vec<CollectionGroup> = Vec::new();
    let mut ungrouped = Vec::new();
    for asset in assets {
        let Some(collection) = asset.collection else {
            ungrouped.push(asset.clone());
            continue;
        };
        match groups.iter_mut().find(|g| g.collection == Some(collection)) {
            Some(group) => group.assets.push(asset.clone()),
            None => groups.push(CollectionGroup {
                collection: Some(collection),
                name: asset
                    .collection_name
                    .clone()
                    .unwrap_or_else(|| collection.to_string()),
                assets: vec![asset.clone()],
            }),
        }
    }
    if !ungrouped.is_empty() {
        groups.push(CollectionGroup {
            collection: None,
            name: "Uncategorized".to_string(),
            assets: ungrouped,
        });
    }
    groups
}

/// Picks the assets named by id or belonging to `collection`, keeping the
/// order of `assets`. Ids that are not held are returned separately.
pub fn select_assets(
    assets: &[Asset],
    ids: &[Pubkey],
    collection: Option<&Pubkey>,
) -> (Vec<Asset>, Vec<Pubkey>) {
    let wanted: HashSet<&Pubkey> = ids.iter().collect();
    let selected: Vec<Asset> = assets
        .iter()
        .filter(|a| {
            wanted.contains(&a.id) || (collection.is_some() && a.collection.as_ref() == collection)
        })
        .cloned()
        .collect();
    let held: HashSet<Pubkey> = assets.iter().map(|a| a.id).collect();
    let missing = ids.iter().filter(|id| !held.contains(id)).copied().collect();
    (selected, missing)
}
