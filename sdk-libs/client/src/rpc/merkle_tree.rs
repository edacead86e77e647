use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use super::{Rpc, RpcError};

/// Account type tag of an initialized concurrent Merkle tree.
const CONCURRENT_MERKLE_TREE_ACCOUNT_TYPE: u8 = 1;
const HEADER_VERSION_V1: u8 = 0;
/// Account type and version bytes followed by the 54 byte V1 header.
pub const MERKLE_TREE_HEADER_SIZE: usize = 2 + 54;

#[derive(Error, Debug)]
pub enum MerkleTreeError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Merkle tree account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("Account {address} is not a concurrent Merkle tree: {reason}")]
    InvalidAccount { address: Pubkey, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleTreeHeader {
    pub max_buffer_size: u32,
    pub max_depth: u32,
    pub authority: Pubkey,
    pub creation_slot: u64,
}

impl MerkleTreeHeader {
    pub fn deserialize(data: &[u8]) -> Result<Self, String> {
        if data.len() < MERKLE_TREE_HEADER_SIZE {
            return Err(format!(
                "account data is {} bytes, header needs {}",
                data.len(),
                MERKLE_TREE_HEADER_SIZE
            ));
        }
        if data[0] != CONCURRENT_MERKLE_TREE_ACCOUNT_TYPE {
            return Err(format!("unexpected account type {}", data[0]));
        }
        if data[1] != HEADER_VERSION_V1 {
            return Err(format!("unsupported header version {}", data[1]));
        }
        let max_buffer_size = read_u32(data, 2);
        let max_depth = read_u32(data, 6);
        let mut authority = [0u8; 32];
        authority.copy_from_slice(&data[10..42]);
        let creation_slot = read_u64(data, 42);
        Ok(Self {
            max_buffer_size,
            max_depth,
            authority: Pubkey::new_from_array(authority),
            creation_slot,
        })
    }

    /// Size of the tree body: sequence number, active index and buffer size,
    /// the changelog ring buffer, then the rightmost proof.
    pub fn tree_size(&self) -> usize {
        let depth = self.max_depth as usize;
        let changelog = 32 + 32 * depth + 4 + 4;
        let rightmost_proof = 32 * depth + 32 + 4 + 4;
        8 + 8 + 8 + self.max_buffer_size as usize * changelog + rightmost_proof
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleTreeInfo {
    pub header: MerkleTreeHeader,
    /// Number of upper tree levels cached on-chain.
    pub canopy_depth: u32,
}

impl MerkleTreeInfo {
    pub fn from_account_data(address: Pubkey, data: &[u8]) -> Result<Self, MerkleTreeError> {
        let header =
            MerkleTreeHeader::deserialize(data).map_err(|reason| MerkleTreeError::InvalidAccount {
                address,
                reason,
            })?;
        let body = MERKLE_TREE_HEADER_SIZE + header.tree_size();
        if data.len() < body {
            return Err(MerkleTreeError::InvalidAccount {
                address,
                reason: format!(
                    "account data is {} bytes, tree of depth {} needs {}",
                    data.len(),
                    header.max_depth,
                    body
                ),
            });
        }
        let canopy_depth = canopy_depth_from_bytes(data.len() - body);
        Ok(Self {
            header,
            canopy_depth,
        })
    }

    /// Proof nodes a transaction must still carry for a leaf of this tree.
    pub fn required_proof_len(&self) -> usize {
        self.header.max_depth.saturating_sub(self.canopy_depth) as usize
    }
}

/// A canopy of depth `d` stores `2^(d+1) - 2` nodes of 32 bytes each.
pub fn canopy_depth_from_bytes(canopy_bytes: usize) -> u32 {
    let nodes = canopy_bytes / 32;
    if nodes == 0 {
        return 0;
    }
    (nodes + 2).ilog2() - 1
}

/// Extension to the RPC connection for reading concurrent Merkle tree
/// accounts.
#[async_trait]
pub trait MerkleTreeExt: Rpc {
    async fn get_merkle_tree_info(&self, address: Pubkey) -> Result<MerkleTreeInfo, MerkleTreeError> {
        let account = self
            .get_account(address)
            .await?
            .ok_or(MerkleTreeError::AccountNotFound(address))?;
        MerkleTreeInfo::from_account_data(address, &account.data)
    }
}

impl<T: Rpc + ?Sized> MerkleTreeExt for T {}
