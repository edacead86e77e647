//! Wire types of the Digital Asset Standard (DAS) read API, as returned by
//! `getAsset`, `getAssetsByOwner` and `getAssetProof`.
//!
//! Fields stay base58 strings here. Decoding into keys and hashes happens
//! where they are used so one malformed asset cannot fail a whole page.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DasAsset {
    pub id: String,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub compression: Option<Compression>,
    #[serde(default)]
    pub grouping: Vec<Group>,
    pub ownership: Ownership,
    #[serde(default)]
    pub burnt: bool,
    #[serde(default)]
    pub mutable: bool,
}

impl DasAsset {
    pub fn is_compressed(&self) -> bool {
        self.compression.as_ref().is_some_and(|c| c.compressed)
    }

    pub fn name(&self) -> &str {
        self.metadata().map(|m| m.name.as_str()).unwrap_or_default()
    }

    pub fn symbol(&self) -> &str {
        self.metadata().map(|m| m.symbol.as_str()).unwrap_or_default()
    }

    pub fn image(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.links.as_ref())
            .and_then(|l| l.image.as_deref())
    }

    pub fn collection(&self) -> Option<&Group> {
        self.grouping
            .iter()
            .find(|g| g.group_key == "collection" && g.group_value.is_some())
    }

    fn metadata(&self) -> Option<&Metadata> {
        self.content.as_ref().and_then(|c| c.metadata.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub json_uri: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_key: String,
    #[serde(default)]
    pub group_value: Option<String>,
    #[serde(default)]
    pub collection_metadata: Option<CollectionMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compression {
    #[serde(default)]
    pub compressed: bool,
    #[serde(default)]
    pub eligible: bool,
    #[serde(default)]
    pub tree: String,
    #[serde(default)]
    pub leaf_id: u64,
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub data_hash: String,
    #[serde(default)]
    pub creator_hash: String,
    #[serde(default)]
    pub asset_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub owner: String,
    #[serde(default)]
    pub delegated: bool,
    #[serde(default)]
    pub delegate: Option<String>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub ownership_model: Option<String>,
}

/// One page of `getAssetsByOwner`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub items: Vec<DasAsset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetProof {
    pub root: String,
    pub proof: Vec<String>,
    pub node_index: u64,
    #[serde(default)]
    pub leaf: String,
    pub tree_id: String,
}
