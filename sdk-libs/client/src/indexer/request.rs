use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcRequest<T> {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    #[serde(rename = "params")]
    pub parameters: T,
}

impl<T> RpcRequest<T> {
    pub fn new(method: impl Into<String>, parameters: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: "cnft-burner".to_string(),
            method: method.into(),
            parameters,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetAssetsByOwnerParams {
    pub owner_address: String,
    pub page: u32,
    pub limit: u32,
    pub display_options: DisplayOptions,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    pub show_unverified_collections: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AssetIdParams {
    pub id: String,
}
