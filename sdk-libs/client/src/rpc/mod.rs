pub mod errors;
pub mod lut;
pub mod merkle_tree;
mod rpc_trait;
pub mod solana_rpc;

pub use errors::RpcError;
pub use lut::{LookupTableExt, LookupTableState};
pub use merkle_tree::{MerkleTreeError, MerkleTreeExt, MerkleTreeHeader, MerkleTreeInfo};
pub use rpc_trait::{Rpc, RpcConnectionConfig};
pub use solana_rpc::{SolanaRpc, SolanaRpcUrl};
