use std::fmt;

use cnft_client::{
    constants::MAX_TRANSACTION_SIZE,
    indexer::Indexer,
    rpc::{MerkleTreeError, MerkleTreeInfo, Rpc},
};
use serde::Serialize;
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use tracing::{debug, warn};

use crate::{
    assets::{fetch_asset, Asset},
    config::TransactionConfig,
    instructions::{create_burn_instruction, with_compute_budget},
    lookup_tables::LookupTableResolver,
    proof::BurnArgs,
    transaction::{compile_message, estimate_transaction_size},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnFlow {
    /// The plain transaction fits.
    Direct,
    /// Only fits with the proof nodes moved into lookup tables.
    LookupTables,
    /// Does not fit, even with the tables the service knows about.
    TooLarge,
}

impl fmt::Display for BurnFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BurnFlow::Direct => write!(f, "direct burn"),
            BurnFlow::LookupTables => write!(f, "burn with address lookup tables"),
            BurnFlow::TooLarge => write!(f, "not burnable in one transaction"),
        }
    }
}

/// Dry run of a burn: what would be sent, without signing or sending it.
#[derive(Debug, Clone, Serialize)]
pub struct BurnInspection {
    pub asset: Pubkey,
    pub name: String,
    pub owner: Pubkey,
    pub leaf_delegate: Pubkey,
    pub delegated: bool,
    pub payer: Pubkey,
    pub payer_can_burn: bool,
    pub tree: Pubkey,
    pub tree_account_size: usize,
    pub max_depth: u32,
    pub max_buffer_size: u32,
    pub canopy_depth: u32,
    pub proof_len: usize,
    pub truncated_proof_len: usize,
    pub transaction_size: usize,
    pub fits_without_lookup_tables: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_tables: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_with_lookup_tables: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_table_error: Option<String>,
    pub recommended_flow: BurnFlow,
}

impl BurnInspection {
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!("Asset:            {} ({})", self.name, self.asset),
            format!("Owner:            {}", self.owner),
            format!(
                "Leaf delegate:    {}{}",
                self.leaf_delegate,
                if self.delegated { " (delegated)" } else { "" }
            ),
            format!(
                "Payer:            {} ({})",
                self.payer,
                if self.payer_can_burn {
                    "can burn"
                } else {
                    "not owner or delegate"
                }
            ),
            format!("Tree:             {}", self.tree),
            format!("Account size:     {} bytes", self.tree_account_size),
            format!(
                "Depth / buffer:   {} / {}",
                self.max_depth, self.max_buffer_size
            ),
            format!("Canopy depth:     {}", self.canopy_depth),
            format!(
                "Proof nodes:      {} ({} after canopy)",
                self.proof_len, self.truncated_proof_len
            ),
            format!(
                "Transaction size: {} / {} bytes",
                self.transaction_size, MAX_TRANSACTION_SIZE
            ),
        ];
        if let Some(tables) = self.lookup_tables {
            lines.push(format!("Lookup tables:    {}", tables));
        }
        if let Some(size) = self.size_with_lookup_tables {
            lines.push(format!("Size with tables: {} bytes", size));
        }
        if let Some(error) = &self.lookup_table_error {
            lines.push(format!("Lookup tables:    unavailable ({})", error));
        }
        lines.push(format!("Recommended:      {}", self.recommended_flow));
        lines.join("\n")
    }
}

/// Builds the burn of `asset_id` as `payer` would and measures it. When the
/// payer is neither owner nor delegate, the owner stands in so the sizes are
/// still meaningful.
pub async fn inspect_asset<R: Rpc, I: Indexer + ?Sized>(
    rpc: &R,
    indexer: &I,
    resolver: Option<&LookupTableResolver<R>>,
    payer: Option<Pubkey>,
    asset_id: &Pubkey,
    config: &TransactionConfig,
) -> Result<BurnInspection> {
    let asset: Asset = fetch_asset(indexer, asset_id).await?;
    let proof = indexer.get_asset_proof(asset_id).await?;
    let mut args = BurnArgs::from_parts(&asset, &proof)?;
    let proof_len = args.proof.len();

    let account = rpc
        .get_account(args.tree)
        .await?
        .ok_or(MerkleTreeError::AccountNotFound(args.tree))?;
    let tree = MerkleTreeInfo::from_account_data(args.tree, &account.data)?;
    args.truncate_to_canopy(&tree)?;
    debug!(
        "Inspecting {}: {} proof nodes, {} after canopy",
        asset_id,
        proof_len,
        args.proof.len()
    );

    let payer = payer.unwrap_or(asset.ownership.owner);
    let payer_can_burn = asset.ownership.can_sign(&payer);
    let builder = if payer_can_burn {
        payer
    } else {
        asset.ownership.owner
    };
    let instructions = with_compute_budget(config, create_burn_instruction(&builder, &args)?);

    let message = compile_message(&builder, &instructions, &[], Hash::default())?;
    let transaction_size = estimate_transaction_size(&message)?;
    let fits_without_lookup_tables = transaction_size <= MAX_TRANSACTION_SIZE;

    let mut lookup_tables = None;
    let mut size_with_lookup_tables = None;
    let mut lookup_table_error = None;
    if !fits_without_lookup_tables {
        if let Some(resolver) = resolver {
            match resolver.resolve(&args.proof).await {
                Ok(accounts) => {
                    lookup_tables = Some(accounts.len());
                    if !accounts.is_empty() {
                        let message =
                            compile_message(&builder, &instructions, &accounts, Hash::default())?;
                        size_with_lookup_tables = Some(estimate_transaction_size(&message)?);
                    }
                }
                Err(e) => {
                    warn!("Lookup table resolution for {} failed: {}", asset_id, e);
                    lookup_table_error = Some(e.to_string());
                }
            }
        }
    }

    let recommended_flow = match (fits_without_lookup_tables, size_with_lookup_tables) {
        (true, _) => BurnFlow::Direct,
        (false, Some(size)) if size <= MAX_TRANSACTION_SIZE => BurnFlow::LookupTables,
        // Without a resolver the tables are the only way out.
        (false, None) if resolver.is_none() => BurnFlow::LookupTables,
        _ => BurnFlow::TooLarge,
    };

    Ok(BurnInspection {
        asset: asset.id,
        name: asset.display_name().to_string(),
        owner: asset.ownership.owner,
        leaf_delegate: asset.ownership.leaf_delegate(),
        delegated: asset.ownership.delegated,
        payer,
        payer_can_burn,
        tree: args.tree,
        tree_account_size: account.data.len(),
        max_depth: tree.header.max_depth,
        max_buffer_size: tree.header.max_buffer_size,
        canopy_depth: tree.canopy_depth,
        proof_len,
        truncated_proof_len: args.proof.len(),
        transaction_size,
        fits_without_lookup_tables,
        lookup_tables,
        size_with_lookup_tables,
        lookup_table_error,
        recommended_flow,
    })
}
