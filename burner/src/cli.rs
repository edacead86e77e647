use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cnft_client::constants::DEFAULT_RPC_URL;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub log: LogArgs,
}

#[derive(Args, Clone, Debug)]
pub struct LogArgs {
    /// Debug output on the console.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, env = "CNFT_BURNER_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    #[arg(long, global = true)]
    pub no_log_file: bool,
}

#[allow(clippy::large_enum_variant)]
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the compressed NFTs held by a wallet, grouped by collection.
    List(ListArgs),
    /// Show how a burn of one asset would be built.
    Inspect(InspectArgs),
    /// Burn selected compressed NFTs in rate limited batches.
    Burn(BurnArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
    #[arg(long, env = "CNFT_BURNER_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// DAS endpoint. Defaults to the RPC URL.
    #[arg(long, env = "CNFT_BURNER_INDEXER_URL")]
    pub indexer_url: Option<String>,

    #[arg(long, env = "CNFT_BURNER_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// Base delay in milliseconds between retries of read requests.
    #[arg(long, env = "CNFT_BURNER_RETRY_DELAY", default_value = "500")]
    pub retry_delay: u64,

    #[arg(long, env = "CNFT_BURNER_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout_seconds: u64,
}

#[derive(Args, Clone, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Wallet to list. Defaults to the keypair's public key.
    #[arg(long, env = "CNFT_BURNER_OWNER")]
    pub owner: Option<String>,

    /// Keypair file or JSON byte array.
    #[arg(long, env = "CNFT_BURNER_KEYPAIR")]
    pub keypair: Option<String>,

    /// Only show assets with an active delegate.
    #[arg(long)]
    pub delegated: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long)]
    pub asset: String,

    #[arg(long, env = "CNFT_BURNER_KEYPAIR")]
    pub keypair: Option<String>,

    #[arg(long, env = "CNFT_BURNER_LOOKUP_TABLE_SERVICE_URL")]
    pub lookup_table_service_url: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct BurnArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long, env = "CNFT_BURNER_KEYPAIR")]
    pub keypair: Option<String>,

    /// Asset id to burn. Repeat for several assets.
    #[arg(long = "asset")]
    pub assets: Vec<String>,

    /// Burn every held asset of this collection.
    #[arg(long)]
    pub collection: Option<String>,

    /// Burn every compressed NFT the wallet holds.
    #[arg(long, conflicts_with_all = ["assets", "collection"])]
    pub all: bool,

    #[arg(long, env = "CNFT_BURNER_BATCH_SIZE", default_value = "2")]
    pub batch_size: usize,

    /// Milliseconds to wait between batches.
    #[arg(long, env = "CNFT_BURNER_BATCH_DELAY", default_value = "1000")]
    pub batch_delay: u64,

    /// Compute unit price in micro-lamports.
    #[arg(long, env = "CNFT_BURNER_CU_PRICE", default_value = "1000")]
    pub cu_price: u64,

    #[arg(long, env = "CNFT_BURNER_CU_LIMIT", default_value = "300000")]
    pub cu_limit: u32,

    #[arg(long, env = "CNFT_BURNER_MAX_SEND_ATTEMPTS", default_value = "3")]
    pub max_send_attempts: u32,

    #[arg(long, env = "CNFT_BURNER_SKIP_PREFLIGHT")]
    pub skip_preflight: bool,

    #[arg(long, env = "CNFT_BURNER_CONFIRM_TIMEOUT", default_value = "60")]
    pub confirm_timeout_seconds: u64,

    #[arg(long, env = "CNFT_BURNER_LOOKUP_TABLE_SERVICE_URL")]
    pub lookup_table_service_url: Option<String>,

    #[arg(long, env = "CNFT_BURNER_LOOKUP_TABLE_TIMEOUT", default_value = "30")]
    pub lookup_table_timeout_seconds: u64,

    /// Deactivate and close the lookup tables used by a burn once it lands.
    #[arg(long, env = "CNFT_BURNER_CLOSE_LOOKUP_TABLES")]
    pub close_lookup_tables: bool,

    /// Skip re-fetching the asset after a burn.
    #[arg(long)]
    pub no_verify: bool,

    #[arg(long)]
    pub json: bool,
}
