pub mod das_indexer;

mod base58;
mod error;
mod indexer_trait;
mod request;
mod types;

pub use base58::{
    decode_base58_option_to_pubkey, decode_base58_to_fixed_array, decode_hash, decode_pubkey,
    Base58Conversions,
};
pub use das_indexer::DasIndexer;
pub use error::IndexerError;
pub use indexer_trait::Indexer;
pub use request::{
    AssetIdParams, DisplayOptions, GetAssetsByOwnerParams, RpcErrorObject, RpcRequest,
    RpcResponse,
};
pub use types::{
    AssetList, AssetProof, CollectionMetadata, Compression, Content, DasAsset, Group, Links,
    Metadata, Ownership,
};
