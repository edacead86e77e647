use cnft_client::{
    indexer::{decode_hash, decode_pubkey, AssetProof, Indexer},
    rpc::MerkleTreeInfo,
};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::{
    assets::{Asset, Ownership},
    errors::BurnError,
    Result,
};

/// Everything the burn instruction needs, taken from one `getAsset` and one
/// `getAssetProof` answer fetched back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnArgs {
    pub asset_id: Pubkey,
    pub tree: Pubkey,
    pub root: [u8; 32],
    pub data_hash: [u8; 32],
    pub creator_hash: [u8; 32],
    pub nonce: u64,
    pub index: u32,
    pub ownership: Ownership,
    /// Sibling hashes from the leaf upwards.
    pub proof: Vec<Pubkey>,
}

impl BurnArgs {
    pub fn from_parts(asset: &Asset, proof: &AssetProof) -> Result<Self> {
        let invalid = |reason: String| BurnError::InvalidProof {
            asset: asset.id,
            reason,
        };

        let tree_id = decode_pubkey("tree_id", &proof.tree_id)?;
        if tree_id != asset.tree {
            return Err(invalid(format!(
                "proof is for tree {} but the asset lives in {}",
                tree_id, asset.tree
            )));
        }
        let index = u32::try_from(asset.leaf_index)
            .map_err(|_| invalid(format!("leaf index {} exceeds u32", asset.leaf_index)))?;

        let nodes = proof
            .proof
            .iter()
            .map(|node| decode_pubkey("proof", node))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // A full proof of depth d addresses node 2^d + leaf index.
        let expected_node_index = 1u64
            .checked_shl(nodes.len() as u32)
            .and_then(|base| base.checked_add(asset.leaf_index));
        if expected_node_index != Some(proof.node_index) {
            return Err(invalid(format!(
                "node index {} does not match leaf {} at depth {}",
                proof.node_index,
                asset.leaf_index,
                nodes.len()
            )));
        }

        Ok(Self {
            asset_id: asset.id,
            tree: asset.tree,
            root: decode_hash("root", &proof.root)?,
            data_hash: asset.data_hash,
            creator_hash: asset.creator_hash,
            nonce: asset.leaf_index,
            index,
            ownership: asset.ownership,
            proof: nodes,
        })
    }

    /// Drops the upper proof nodes the tree's canopy already stores.
    pub fn truncate_to_canopy(&mut self, tree: &MerkleTreeInfo) -> Result<()> {
        if self.proof.len() != tree.header.max_depth as usize {
            return Err(BurnError::InvalidProof {
                asset: self.asset_id,
                reason: format!(
                    "proof has {} nodes, tree depth is {}",
                    self.proof.len(),
                    tree.header.max_depth
                ),
            });
        }
        self.proof.truncate(tree.required_proof_len());
        Ok(())
    }
}

/// Fetches a fresh asset snapshot and its proof. Must run after any earlier
/// change to the same tree or the root will be stale.
pub async fn fetch_burn_args<I: Indexer + ?Sized>(indexer: &I, asset_id: &Pubkey) -> Result<BurnArgs> {
    let asset = crate::assets::fetch_asset(indexer, asset_id).await?;
    let proof = indexer.get_asset_proof(asset_id).await?;
    debug!(
        "Fetched proof for {}: {} nodes, node index {}",
        asset_id,
        proof.proof.len(),
        proof.node_index
    );
    BurnArgs::from_parts(&asset, &proof)
}
