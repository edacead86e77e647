use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use borsh::BorshDeserialize;
use cnft_burner::{
    config::{BatchConfig, BurnerConfig, ExternalServicesConfig, LookupTableConfig, TransactionConfig},
    errors::LookupTableError,
    instructions::BurnInstructionData,
    lookup_tables::{LookupTableService, ProofTableMapping},
};
use cnft_client::{
    constants::{ACCOUNT_COMPRESSION_PROGRAM_ID, BUBBLEGUM_PROGRAM_ID, MAX_TRANSACTION_SIZE},
    indexer::{
        AssetList, AssetProof, Compression, Content, DasAsset, Group, Indexer, IndexerError,
        Metadata, Ownership,
    },
    retry::RetryConfig,
    rpc::{merkle_tree::MERKLE_TREE_HEADER_SIZE, MerkleTreeHeader, Rpc, RpcError},
};
use reqwest::Url;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::InstructionError,
    pubkey,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::{TransactionError, VersionedTransaction},
};

const ADDRESS_LOOKUP_TABLE_PROGRAM_ID: Pubkey =
    pubkey!("AddressLookupTab1e1111111111111111111111111");

/// Index of the burn among the compute budget instructions.
const BURN_INSTRUCTION_INDEX: u8 = 2;
/// Bubblegum `LeafAuthorityMustSign`.
const LEAF_AUTHORITY_MUST_SIGN: u32 = 6025;
/// Bubblegum `AssetOwnerMismatch`, what replaying a spent leaf ends in.
const ASSET_OWNER_MISMATCH: u32 = 6007;
/// Blocks a blockhash stays valid for.
const BLOCKHASH_VALIDITY: u64 = 150;

/// Address lookup table program instructions the cluster was sent.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTableInstruction {
    Deactivate,
    Close,
    Other(u32),
}

/// What the cluster saw of one accepted transaction.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SentBurn {
    pub signature: Signature,
    pub size: usize,
    pub lookup_tables: usize,
    pub proof_len: usize,
    pub leaf_owner: Pubkey,
    pub leaf_delegate: Pubkey,
    pub delegate_signed: bool,
}

#[derive(Debug, Clone)]
struct MintedAsset {
    asset: DasAsset,
    tree: Pubkey,
    leaf_index: u32,
}

#[derive(Debug, Default)]
struct ClusterState {
    accounts: HashMap<Pubkey, Account>,
    trees: HashMap<Pubkey, (u32, u32)>,
    assets: Vec<MintedAsset>,
    burned: HashSet<(Pubkey, u32)>,
    statuses: HashMap<Signature, Result<(), TransactionError>>,
    logs: HashMap<Signature, Vec<String>>,
    sent: Vec<SentBurn>,
    failing_sends: usize,
    dropped_sends: usize,
    confirmation_delay: Option<u64>,
    /// Block height from which a delayed status becomes visible.
    visible_at: HashMap<Signature, u64>,
    table_instructions: Vec<(Pubkey, LookupTableInstruction)>,
    slot: u64,
    block_height: u64,
}

/// In-memory validator with a DAS indexer over the same state. Burns are
/// decoded from the submitted transactions, and a leaf can be burned once.
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    state: Arc<Mutex<ClusterState>>,
}

#[allow(dead_code)]
impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }

    /// Creates a tree account of `max_depth` whose canopy caches
    /// `canopy_depth` levels.
    pub fn create_tree(&self, max_depth: u32, canopy_depth: u32) -> Pubkey {
        let tree = Pubkey::new_unique();
        let data = merkle_tree_account_data(max_depth, 64, canopy_depth);
        let mut state = self.state();
        state.accounts.insert(tree, account(data, ACCOUNT_COMPRESSION_PROGRAM_ID));
        state.trees.insert(tree, (max_depth, canopy_depth));
        tree
    }

    /// Mints a compressed NFT to `owner` in the next free leaf of `tree`.
    pub fn mint(
        &self,
        tree: Pubkey,
        owner: Pubkey,
        delegate: Option<Pubkey>,
        collection: Option<Pubkey>,
    ) -> Pubkey {
        let id = Pubkey::new_unique();
        let mut state = self.state();
        let leaf_index = state.assets.iter().filter(|a| a.tree == tree).count() as u32;
        let asset = DasAsset {
            id: id.to_string(),
            interface: Some("V1_NFT".to_string()),
            content: Some(Content {
                metadata: Some(Metadata {
                    name: format!("Drop #{}", leaf_index),
                    symbol: "DROP".to_string(),
                }),
                ..Default::default()
            }),
            compression: Some(Compression {
                compressed: true,
                tree: tree.to_string(),
                leaf_id: leaf_index as u64,
                data_hash: bs58::encode(Pubkey::new_unique()).into_string(),
                creator_hash: bs58::encode(Pubkey::new_unique()).into_string(),
                asset_hash: bs58::encode(Pubkey::new_unique()).into_string(),
                ..Default::default()
            }),
            grouping: collection
                .map(|c| {
                    vec![Group {
                        group_key: "collection".to_string(),
                        group_value: Some(c.to_string()),
                        collection_metadata: None,
                    }]
                })
                .unwrap_or_default(),
            ownership: Ownership {
                owner: owner.to_string(),
                delegated: delegate.is_some(),
                delegate: delegate.map(|d| d.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        state.assets.push(MintedAsset {
            asset,
            tree,
            leaf_index,
        });
        id
    }

    /// Stores an active lookup table owned by `authority`.
    pub fn create_lookup_table(&self, authority: Pubkey, addresses: &[Pubkey]) -> Pubkey {
        let table = Pubkey::new_unique();
        let data = lookup_table_account_data(u64::MAX, Some(authority), addresses);
        self.state()
            .accounts
            .insert(table, account(data, ADDRESS_LOOKUP_TABLE_PROGRAM_ID));
        table
    }

    /// Marks `table` as deactivated at `slot`.
    pub fn deactivate_lookup_table(&self, table: &Pubkey, slot: u64) {
        if let Some(account) = self.state().accounts.get_mut(table) {
            account.data[4..12].copy_from_slice(&slot.to_le_bytes());
        }
    }

    pub fn lookup_table_instructions(&self) -> Vec<(Pubkey, LookupTableInstruction)> {
        self.state().table_instructions.clone()
    }

    /// The next `count` sends fail with a connection reset.
    pub fn fail_next_sends(&self, count: usize) {
        self.state().failing_sends = count;
    }

    /// The next `count` sends are accepted but never reach a leader.
    pub fn drop_next_sends(&self, count: usize) {
        self.state().dropped_sends = count;
    }

    /// The next accepted transaction executes right away, but its status
    /// only shows up `blocks` block heights later.
    pub fn delay_next_confirmation(&self, blocks: u64) {
        self.state().confirmation_delay = Some(blocks);
    }

    pub fn sent(&self) -> Vec<SentBurn> {
        self.state().sent.clone()
    }

    pub fn is_burned(&self, asset: &Pubkey) -> bool {
        let state = self.state();
        state
            .assets
            .iter()
            .find(|a| a.asset.id == asset.to_string())
            .is_some_and(|a| state.burned.contains(&(a.tree, a.leaf_index)))
    }

    fn find_asset(&self, id: &Pubkey) -> Result<MintedAsset, IndexerError> {
        let id = id.to_string();
        self.state()
            .assets
            .iter()
            .find(|a| a.asset.id == id)
            .cloned()
            .ok_or(IndexerError::AssetNotFound(id))
    }

    /// Executes the Bubblegum burn in `transaction`, if it carries one.
    fn execute(
        state: &mut ClusterState,
        transaction: &VersionedTransaction,
        size: usize,
    ) -> (Result<(), TransactionError>, Option<SentBurn>) {
        let signature = transaction.signatures[0];
        let keys = transaction.message.static_account_keys();
        let num_signers = transaction.message.header().num_required_signatures as usize;
        let Some(burn) = transaction
            .message
            .instructions()
            .iter()
            .find(|ix| keys.get(ix.program_id_index as usize) == Some(&BUBBLEGUM_PROGRAM_ID))
        else {
            for ix in transaction.message.instructions() {
                if keys.get(ix.program_id_index as usize) != Some(&ADDRESS_LOOKUP_TABLE_PROGRAM_ID) {
                    continue;
                }
                let mut tag = [0u8; 4];
                tag.copy_from_slice(&ix.data[..4]);
                let instruction = match u32::from_le_bytes(tag) {
                    3 => LookupTableInstruction::Deactivate,
                    4 => LookupTableInstruction::Close,
                    other => LookupTableInstruction::Other(other),
                };
                let table = keys[ix.accounts[0] as usize];
                state.table_instructions.push((table, instruction));
            }
            return (Ok(()), None);
        };

        let failed = |code: u32| -> Result<(), TransactionError> {
            Err(TransactionError::InstructionError(
                BURN_INSTRUCTION_INDEX,
                InstructionError::Custom(code),
            ))
        };
        let Ok(data) = BurnInstructionData::try_from_slice(&burn.data[8..]) else {
            return (
                Err(TransactionError::InstructionError(
                    BURN_INSTRUCTION_INDEX,
                    InstructionError::InvalidInstructionData,
                )),
                None,
            );
        };
        let key = |position: usize| keys[burn.accounts[position] as usize];
        let is_signer = |position: usize| (burn.accounts[position] as usize) < num_signers;
        let tree = key(3);
        let sent = SentBurn {
            signature,
            size,
            lookup_tables: transaction
                .message
                .address_table_lookups()
                .map(|lookups| lookups.len())
                .unwrap_or_default(),
            proof_len: burn.accounts.len() - 7,
            leaf_owner: key(1),
            leaf_delegate: key(2),
            delegate_signed: is_signer(2),
        };

        let Some((depth, canopy)) = state.trees.get(&tree).copied() else {
            return (failed(ASSET_OWNER_MISMATCH), Some(sent));
        };
        if sent.proof_len != (depth - canopy) as usize {
            return (
                Err(TransactionError::InstructionError(
                    BURN_INSTRUCTION_INDEX,
                    InstructionError::NotEnoughAccountKeys,
                )),
                Some(sent),
            );
        }
        if !is_signer(1) && !is_signer(2) {
            return (failed(LEAF_AUTHORITY_MUST_SIGN), Some(sent));
        }
        let leaf = state
            .assets
            .iter()
            .find(|a| a.tree == tree && a.leaf_index == data.index)
            .cloned();
        let owner_matches = leaf
            .as_ref()
            .is_some_and(|a| a.asset.ownership.owner == sent.leaf_owner.to_string());
        if !owner_matches || !state.burned.insert((tree, data.index)) {
            return (failed(ASSET_OWNER_MISMATCH), Some(sent));
        }
        if let Some(minted) = state
            .assets
            .iter_mut()
            .find(|a| a.tree == tree && a.leaf_index == data.index)
        {
            minted.asset.burnt = true;
        }
        (Ok(()), Some(sent))
    }
}

#[async_trait]
impl Rpc for MockCluster {
    fn get_url(&self) -> String {
        "mock://cluster".to_string()
    }

    async fn get_account(&self, address: Pubkey) -> Result<Option<Account>, RpcError> {
        Ok(self.state().accounts.get(&address).cloned())
    }

    async fn get_slot(&self) -> Result<u64, RpcError> {
        let mut state = self.state();
        state.slot += 1;
        Ok(state.slot)
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), RpcError> {
        let state = self.state();
        Ok((Hash::new_unique(), state.block_height + BLOCKHASH_VALIDITY))
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        let mut state = self.state();
        state.block_height += 1;
        Ok(state.block_height)
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        _config: RpcSendTransactionConfig,
    ) -> Result<Signature, RpcError> {
        let mut state = self.state();
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset").into());
        }
        let size = bincode::serialized_size(transaction)
            .map_err(|e| RpcError::CustomError(e.to_string()))? as usize;
        if size > MAX_TRANSACTION_SIZE {
            return Err(RpcError::CustomError(format!(
                "transaction too large: {} bytes (max: {})",
                size, MAX_TRANSACTION_SIZE
            )));
        }
        if transaction.verify_with_results().iter().any(|ok| !ok) {
            return Err(RpcError::CustomError("invalid signature".to_string()));
        }

        let signature = transaction.signatures[0];
        if state.dropped_sends > 0 {
            state.dropped_sends -= 1;
            return Ok(signature);
        }
        if let Some(blocks) = state.confirmation_delay.take() {
            let visible_at = state.block_height + blocks;
            state.visible_at.insert(signature, visible_at);
        }
        let (status, sent) = Self::execute(&mut state, transaction, size);
        if status.is_err() {
            state.logs.insert(
                signature,
                vec![
                    format!("Program {} invoke [1]", BUBBLEGUM_PROGRAM_ID),
                    format!("Program {} failed", BUBBLEGUM_PROGRAM_ID),
                ],
            );
        }
        state.statuses.insert(signature, status);
        state.sent.extend(sent);
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, RpcError> {
        let state = self.state();
        if state
            .visible_at
            .get(signature)
            .is_some_and(|height| state.block_height < *height)
        {
            return Ok(None);
        }
        Ok(state.statuses.get(signature).cloned())
    }

    async fn get_transaction_logs(&self, signature: &Signature) -> Result<Vec<String>, RpcError> {
        Ok(self.state().logs.get(signature).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Indexer for MockCluster {
    async fn get_assets_by_owner(
        &self,
        owner: &Pubkey,
        page: u32,
        limit: u32,
    ) -> Result<AssetList, IndexerError> {
        let owner = owner.to_string();
        let owned: Vec<DasAsset> = self
            .state()
            .assets
            .iter()
            .filter(|a| a.asset.ownership.owner == owner)
            .map(|a| a.asset.clone())
            .collect();
        let items: Vec<DasAsset> = owned
            .into_iter()
            .skip((page.saturating_sub(1) * limit) as usize)
            .take(limit as usize)
            .collect();
        Ok(AssetList {
            total: items.len() as u64,
            limit: limit as u64,
            page: Some(page as u64),
            items,
        })
    }

    async fn get_asset(&self, id: &Pubkey) -> Result<DasAsset, IndexerError> {
        Ok(self.find_asset(id)?.asset)
    }

    async fn get_asset_proof(&self, id: &Pubkey) -> Result<AssetProof, IndexerError> {
        let minted = self.find_asset(id)?;
        let (depth, _) = self
            .state()
            .trees
            .get(&minted.tree)
            .copied()
            .ok_or_else(|| IndexerError::InvalidResponseData("unknown tree".to_string()))?;
        Ok(proof_for(&minted.tree, minted.leaf_index, depth))
    }
}

/// Proof nodes are derived from the tree and level so the same node always
/// has the same hash, which is what lets lookup tables be prepared ahead.
pub fn proof_for(tree: &Pubkey, leaf_index: u32, depth: u32) -> AssetProof {
    AssetProof {
        root: bs58::encode([7u8; 32]).into_string(),
        proof: (0..depth)
            .map(|level| proof_node(tree, level).to_string())
            .collect(),
        node_index: (1u64 << depth) + leaf_index as u64,
        leaf: bs58::encode([8u8; 32]).into_string(),
        tree_id: tree.to_string(),
    }
}

pub fn proof_node(tree: &Pubkey, level: u32) -> Pubkey {
    Pubkey::create_with_seed(tree, &format!("node-{}", level), &BUBBLEGUM_PROGRAM_ID)
        .unwrap_or_default()
}

/// Mapping service backed by a fixed node to table map. Counts its calls.
#[derive(Debug, Default)]
pub struct MockLookupTableService {
    mapping: Mutex<HashMap<String, Option<String>>>,
    min_slot: u64,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockLookupTableService {
    pub fn new(min_slot: u64) -> Self {
        Self {
            min_slot,
            ..Default::default()
        }
    }

    pub fn register(&self, table: Pubkey, nodes: &[Pubkey]) {
        let mut mapping = self.mapping.lock().unwrap();
        for node in nodes {
            mapping.insert(node.to_string(), Some(table.to_string()));
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LookupTableService for MockLookupTableService {
    async fn fetch_mapping(&self, proof: &[String]) -> Result<ProofTableMapping, LookupTableError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let known = self.mapping.lock().unwrap();
        let mapping = proof
            .iter()
            .map(|node| (node.clone(), known.get(node).cloned().flatten()))
            .collect();
        Ok(ProofTableMapping {
            mapping,
            min_slot: self.min_slot,
        })
    }
}

fn account(data: Vec<u8>, owner: Pubkey) -> Account {
    Account {
        lamports: 1_000_000_000,
        data,
        owner,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn merkle_tree_account_data(max_depth: u32, max_buffer_size: u32, canopy_depth: u32) -> Vec<u8> {
    let header = MerkleTreeHeader {
        max_buffer_size,
        max_depth,
        authority: Pubkey::new_unique(),
        creation_slot: 0,
    };
    let mut data = vec![1u8, 0u8];
    data.extend_from_slice(&max_buffer_size.to_le_bytes());
    data.extend_from_slice(&max_depth.to_le_bytes());
    data.extend_from_slice(header.authority.as_ref());
    data.extend_from_slice(&0u64.to_le_bytes());
    data.resize(MERKLE_TREE_HEADER_SIZE, 0);
    let canopy_nodes = (1usize << (canopy_depth + 1)) - 2;
    data.resize(MERKLE_TREE_HEADER_SIZE + header.tree_size() + canopy_nodes * 32, 0);
    data
}

pub fn lookup_table_account_data(
    deactivation_slot: u64,
    authority: Option<Pubkey>,
    addresses: &[Pubkey],
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&deactivation_slot.to_le_bytes());
    data.extend_from_slice(&0u64.to_le_bytes());
    data.push(0);
    match authority {
        Some(authority) => {
            data.push(1);
            data.extend_from_slice(authority.as_ref());
        }
        None => data.extend_from_slice(&[0u8; 33]),
    }
    data.extend_from_slice(&[0u8; 2]);
    for address in addresses {
        data.extend_from_slice(address.as_ref());
    }
    data
}

/// Burner configuration pointing nowhere, for use with the mocks.
#[allow(dead_code)]
pub fn burner_config(payer: Option<&Keypair>) -> BurnerConfig {
    let url = Url::parse("http://127.0.0.1:8899").unwrap();
    BurnerConfig {
        external_services: ExternalServicesConfig {
            rpc_url: url.clone(),
            indexer_url: url,
            lookup_table_service_url: None,
        },
        payer_keypair: payer.map(Keypair::insecure_clone),
        retry_config: RetryConfig::new(3, Duration::from_millis(10)),
        request_timeout: Duration::from_secs(5),
        transaction_config: TransactionConfig {
            confirm_timeout: Duration::from_secs(5),
            confirm_poll_interval: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
            ..TransactionConfig::default()
        },
        batch_config: BatchConfig {
            batch_size: 2,
            batch_delay: Duration::from_millis(50),
        },
        lookup_table_config: LookupTableConfig {
            timeout: Duration::from_secs(5),
            retry: RetryConfig::new(2, Duration::from_millis(10)),
            max_slot_wait: Duration::from_secs(10),
        },
    }
}
