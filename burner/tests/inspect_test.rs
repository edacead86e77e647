use std::sync::Arc;

use cnft_burner::{
    config::{LookupTableConfig, TransactionConfig},
    inspect::{inspect_asset, BurnFlow},
    lookup_tables::{LookupTableResolver, LookupTableService},
};
use cnft_client::constants::MAX_TRANSACTION_SIZE;
use solana_sdk::pubkey::Pubkey;
use test_utils::{proof_node, MockCluster, MockLookupTableService};

mod test_utils;

#[tokio::test]
async fn small_canopy_gap_burns_directly() {
    let cluster = MockCluster::new();
    let owner = Pubkey::new_unique();
    let tree = cluster.create_tree(14, 10);
    let id = cluster.mint(tree, owner, None, None);

    let inspection = inspect_asset(
        &cluster,
        &cluster,
        None,
        None,
        &id,
        &TransactionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(inspection.payer, owner);
    assert!(inspection.payer_can_burn);
    assert_eq!(inspection.leaf_delegate, owner);
    assert_eq!(inspection.max_depth, 14);
    assert_eq!(inspection.canopy_depth, 10);
    assert_eq!(inspection.proof_len, 14);
    assert_eq!(inspection.truncated_proof_len, 4);
    assert!(inspection.fits_without_lookup_tables);
    assert!(inspection.transaction_size <= MAX_TRANSACTION_SIZE);
    assert_eq!(inspection.recommended_flow, BurnFlow::Direct);
    assert!(inspection.report().contains("after canopy"));
    assert!(cluster.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deep_tree_needs_lookup_tables() {
    let cluster = MockCluster::new();
    let owner = Pubkey::new_unique();
    let delegate = Pubkey::new_unique();
    let tree = cluster.create_tree(30, 0);
    let id = cluster.mint(tree, owner, Some(delegate), None);

    let nodes: Vec<Pubkey> = (0..30).map(|level| proof_node(&tree, level)).collect();
    let table = cluster.create_lookup_table(owner, &nodes);
    let service = Arc::new(MockLookupTableService::new(0));
    service.register(table, &nodes);
    let resolver = LookupTableResolver::new(
        Arc::new(cluster.clone()),
        service.clone() as Arc<dyn LookupTableService>,
        LookupTableConfig::default(),
    );

    let inspection = inspect_asset(
        &cluster,
        &cluster,
        Some(&resolver),
        Some(delegate),
        &id,
        &TransactionConfig::default(),
    )
    .await
    .unwrap();

    assert!(inspection.delegated);
    assert_eq!(inspection.leaf_delegate, delegate);
    assert!(inspection.payer_can_burn);
    assert!(!inspection.fits_without_lookup_tables);
    assert_eq!(inspection.lookup_tables, Some(1));
    assert!(inspection.size_with_lookup_tables.unwrap() <= MAX_TRANSACTION_SIZE);
    assert_eq!(inspection.recommended_flow, BurnFlow::LookupTables);
    assert_eq!(service.calls(), 1);

    let json = serde_json::to_value(&inspection).unwrap();
    assert_eq!(json["recommended_flow"], "lookup_tables");
}

#[tokio::test]
async fn deep_tree_without_known_tables_is_too_large() {
    let cluster = MockCluster::new();
    let owner = Pubkey::new_unique();
    let tree = cluster.create_tree(30, 0);
    let id = cluster.mint(tree, owner, None, None);

    let resolver = LookupTableResolver::new(
        Arc::new(cluster.clone()),
        Arc::new(MockLookupTableService::new(0)) as Arc<dyn LookupTableService>,
        LookupTableConfig::default(),
    );
    let inspection = inspect_asset(
        &cluster,
        &cluster,
        Some(&resolver),
        Some(Pubkey::new_unique()),
        &id,
        &TransactionConfig::default(),
    )
    .await
    .unwrap();

    assert!(!inspection.payer_can_burn);
    assert_eq!(inspection.lookup_tables, Some(0));
    assert_eq!(inspection.recommended_flow, BurnFlow::TooLarge);
}
