pub mod constants;
pub mod indexer;
pub mod retry;
pub mod rpc;
