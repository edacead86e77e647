pub mod assets;
pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod inspect;
pub mod instructions;
pub mod lookup_tables;
pub mod proof;
pub mod slot_tracker;
pub mod telemetry;
pub mod transaction;

use std::sync::Arc;

use cnft_client::{
    indexer::{das_indexer::DasIndexer, Indexer},
    rpc::{Rpc, RpcConnectionConfig, SolanaRpc},
};
pub use config::BurnerConfig;
pub use errors::BurnError;
use serde_json::json;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use tracing::{info, warn};

use crate::{
    assets::{fetch_assets, fetch_delegated_asset, group_by_collection, select_assets, Asset},
    batch::{BatchBurner, BatchState},
    inspect::{inspect_asset, BurnInspection},
    lookup_tables::{HttpLookupTableService, LookupTableResolver, LookupTableService},
    transaction::{BurnResult, Burner},
};

pub type Result<T> = std::result::Result<T, BurnError>;

/// Which held assets a `burn` run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurnSelection {
    All,
    Assets {
        ids: Vec<Pubkey>,
        collection: Option<Pubkey>,
    },
}

pub fn connect_rpc(config: &BurnerConfig) -> SolanaRpc {
    SolanaRpc::new_with_retry(
        RpcConnectionConfig {
            url: config.external_services.rpc_url.to_string(),
            commitment_config: None,
        },
        Some(config.retry_config),
    )
}

pub fn connect_indexer(config: &BurnerConfig) -> Result<DasIndexer> {
    Ok(DasIndexer::new_with_config(
        config.external_services.indexer_url.to_string(),
        config.retry_config,
        config.request_timeout,
    )?)
}

pub fn connect_lookup_table_service(
    config: &BurnerConfig,
) -> Result<Option<Arc<dyn LookupTableService>>> {
    let Some(url) = &config.external_services.lookup_table_service_url else {
        return Ok(None);
    };
    let service = HttpLookupTableService::new(url.clone(), config.lookup_table_config.timeout)?;
    Ok(Some(Arc::new(service)))
}

pub async fn run_list(
    config: Arc<BurnerConfig>,
    owner: Pubkey,
    delegated_only: bool,
    json: bool,
) -> Result<Vec<Asset>> {
    let indexer = connect_indexer(&config)?;
    let mut assets = fetch_assets(&indexer, &owner).await?;
    if delegated_only {
        assets.retain(|a| a.ownership.delegated);
    }

    if json {
        let items: Vec<_> = assets.iter().map(Asset::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&items).map_err(BurnError::general)?);
        return Ok(assets);
    }

    println!("{} compressed NFTs held by {}", assets.len(), owner);
    for group in group_by_collection(&assets) {
        println!("\n{} ({})", group.name, group.assets.len());
        for asset in &group.assets {
            let delegate = if asset.ownership.delegated {
                format!("  delegate {}", asset.ownership.leaf_delegate())
            } else {
                String::new()
            };
            println!(
                "  {}  {}  leaf {}{}",
                asset.id,
                asset.display_name(),
                asset.leaf_index,
                delegate
            );
        }
    }
    Ok(assets)
}

pub async fn run_inspect(
    config: Arc<BurnerConfig>,
    asset_id: Pubkey,
    json: bool,
) -> Result<BurnInspection> {
    let rpc = Arc::new(connect_rpc(&config));
    let indexer = connect_indexer(&config)?;
    let resolver = connect_lookup_table_service(&config)?
        .map(|service| LookupTableResolver::new(rpc.clone(), service, config.lookup_table_config));

    let inspection = inspect_asset(
        rpc.as_ref(),
        &indexer,
        resolver.as_ref(),
        config.payer_pubkey(),
        &asset_id,
        &config.transaction_config,
    )
    .await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&inspection).map_err(BurnError::general)?
        );
    } else {
        println!("{}", inspection.report());
    }
    Ok(inspection)
}

pub async fn run_burn(
    config: Arc<BurnerConfig>,
    selection: BurnSelection,
    json: bool,
) -> Result<Vec<(Pubkey, BurnResult)>> {
    let rpc = Arc::new(connect_rpc(&config));
    let indexer = Arc::new(connect_indexer(&config)?);
    let service = connect_lookup_table_service(&config)?;

    let results = burn_selection(rpc, indexer, service, &config, &selection).await?;

    if json {
        let report: Vec<_> = results
            .iter()
            .map(|(id, result)| json!({ "asset": id.to_string(), "result": result }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(BurnError::general)?
        );
    } else {
        for (id, result) in &results {
            match (result.success, result.explorer_url()) {
                (true, Some(url)) => println!("burned  {}  {}", id, url),
                (true, None) => println!("burned  {}", id),
                (false, _) => println!(
                    "failed  {}  {}",
                    id,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
        let burned = results.iter().filter(|(_, r)| r.success).count();
        println!("\n{} of {} burned", burned, results.len());
    }
    Ok(results)
}

/// Resolves `selection` against the wallet's holdings and burns it in
/// batches. Requested ids the wallet does not hold are burned if it is their
/// active delegate, and reported and skipped otherwise.
pub async fn burn_selection<R: Rpc, I: Indexer>(
    rpc: Arc<R>,
    indexer: Arc<I>,
    lookup_table_service: Option<Arc<dyn LookupTableService>>,
    config: &BurnerConfig,
    selection: &BurnSelection,
) -> Result<Vec<(Pubkey, BurnResult)>> {
    let signer: Arc<Keypair> = config
        .payer_keypair
        .as_ref()
        .map(|k| Arc::new(k.insecure_clone()))
        .ok_or(BurnError::NoWallet)?;
    let owner = signer.pubkey();

    let held = fetch_assets(indexer.as_ref(), &owner).await?;
    let selected = match selection {
        BurnSelection::All => held,
        BurnSelection::Assets { ids, collection } => {
            let (mut selected, missing) = select_assets(&held, ids, collection.as_ref());
            for id in missing {
                match fetch_delegated_asset(indexer.as_ref(), &id, &owner).await {
                    Ok(Some(asset)) => {
                        info!("Asset {} is delegated to {}", id, owner);
                        selected.push(asset);
                    }
                    Ok(None) => warn!("Asset {} is not held by {}, skipping", id, owner),
                    Err(e) => warn!("Asset {} is not held by {}, skipping: {}", id, owner, e),
                }
            }
            selected
        }
    };
    if selected.is_empty() {
        info!("Nothing to burn");
        return Ok(vec![]);
    }
    info!(
        "Burning {} assets in groups of {}",
        selected.len(),
        config.batch_config.batch_size
    );

    let mut burner = Burner::new(
        rpc.clone(),
        indexer,
        Some(signer),
        config.transaction_config,
    );
    if let Some(service) = lookup_table_service {
        burner = burner.with_lookup_tables(LookupTableResolver::new(
            rpc,
            service,
            config.lookup_table_config,
        ));
    }
    let batch = BatchBurner::new(Arc::new(burner), config.batch_config);

    let mut progress = batch.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = *progress.borrow_and_update();
            if let BatchState::Running { group, groups } = p.state {
                info!(
                    "Group {}/{}: {}/{} done, {} burned, {} failed",
                    group, groups, p.current, p.total, p.success, p.failed
                );
            }
        }
    });

    let results = batch.burn_all(&selected).await;
    drop(batch);
    if let Err(e) = reporter.await {
        warn!("Progress reporter failed: {}", e);
    }
    Ok(results)
}
