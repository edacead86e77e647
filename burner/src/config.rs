use std::{path::Path, str::FromStr, time::Duration};

use cnft_client::retry::RetryConfig;
use reqwest::Url;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
};

use crate::{
    cli::{BurnArgs, ConnectionArgs, InspectArgs, ListArgs},
    errors::ConfigError,
};

#[derive(Debug, Clone)]
pub struct ExternalServicesConfig {
    pub rpc_url: Url,
    pub indexer_url: Url,
    pub lookup_table_service_url: Option<Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Micro-lamports per compute unit.
    pub compute_unit_price: u64,
    pub compute_unit_limit: u32,
    pub max_send_attempts: u32,
    pub skip_preflight: bool,
    pub confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,
    pub retry_delay: Duration,
    pub verify_burn: bool,
    pub close_lookup_tables: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            compute_unit_price: 1_000,
            compute_unit_limit: 300_000,
            max_send_attempts: 3,
            skip_preflight: false,
            confirm_timeout: Duration::from_secs(60),
            confirm_poll_interval: Duration::from_millis(500),
            retry_delay: Duration::from_secs(1),
            verify_burn: true,
            close_lookup_tables: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Burns submitted concurrently per group.
    pub batch_size: usize,
    /// Pause between two groups.
    pub batch_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            batch_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTableConfig {
    /// Upper bound for a single service or table request.
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Longest wait for the RPC to reach the slot the mapping service reports.
    pub max_slot_wait: Duration,
}

impl Default for LookupTableConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryConfig::new(3, Duration::from_millis(500)),
            max_slot_wait: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct BurnerConfig {
    pub external_services: ExternalServicesConfig,
    pub payer_keypair: Option<Keypair>,
    pub retry_config: RetryConfig,
    pub request_timeout: Duration,
    pub transaction_config: TransactionConfig,
    pub batch_config: BatchConfig,
    pub lookup_table_config: LookupTableConfig,
}

impl Clone for BurnerConfig {
    fn clone(&self) -> Self {
        Self {
            external_services: self.external_services.clone(),
            payer_keypair: self.payer_keypair.as_ref().map(Keypair::insecure_clone),
            retry_config: self.retry_config,
            request_timeout: self.request_timeout,
            transaction_config: self.transaction_config,
            batch_config: self.batch_config,
            lookup_table_config: self.lookup_table_config,
        }
    }
}

impl BurnerConfig {
    fn from_connection(
        connection: &ConnectionArgs,
        keypair: Option<&str>,
        lookup_table_service_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let rpc_url = parse_url("rpc_url", &connection.rpc_url)?;
        let indexer_url = match connection.indexer_url.as_deref() {
            Some(url) => parse_url("indexer_url", url)?,
            None => rpc_url.clone(),
        };
        let lookup_table_service_url = lookup_table_service_url
            .map(|url| parse_url("lookup_table_service_url", url))
            .transpose()?;
        if connection.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                error: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            external_services: ExternalServicesConfig {
                rpc_url,
                indexer_url,
                lookup_table_service_url,
            },
            payer_keypair: keypair.map(parse_keypair).transpose()?,
            retry_config: RetryConfig::new(
                connection.max_retries,
                Duration::from_millis(connection.retry_delay),
            ),
            request_timeout: Duration::from_secs(connection.request_timeout_seconds),
            transaction_config: TransactionConfig::default(),
            batch_config: BatchConfig::default(),
            lookup_table_config: LookupTableConfig::default(),
        })
    }

    pub fn new_for_list(args: &ListArgs) -> Result<Self, ConfigError> {
        Self::from_connection(&args.connection, args.keypair.as_deref(), None)
    }

    pub fn new_for_inspect(args: &InspectArgs) -> Result<Self, ConfigError> {
        Self::from_connection(
            &args.connection,
            args.keypair.as_deref(),
            args.lookup_table_service_url.as_deref(),
        )
    }

    pub fn new_for_burn(args: &BurnArgs) -> Result<Self, ConfigError> {
        if args.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                error: "must be at least 1".to_string(),
            });
        }
        if args.max_send_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_send_attempts",
                error: "must be at least 1".to_string(),
            });
        }
        let mut config = Self::from_connection(
            &args.connection,
            args.keypair.as_deref(),
            args.lookup_table_service_url.as_deref(),
        )?;
        config.transaction_config = TransactionConfig {
            compute_unit_price: args.cu_price,
            compute_unit_limit: args.cu_limit,
            max_send_attempts: args.max_send_attempts,
            skip_preflight: args.skip_preflight,
            confirm_timeout: Duration::from_secs(args.confirm_timeout_seconds),
            verify_burn: !args.no_verify,
            close_lookup_tables: args.close_lookup_tables,
            ..TransactionConfig::default()
        };
        config.batch_config = BatchConfig {
            batch_size: args.batch_size,
            batch_delay: Duration::from_millis(args.batch_delay),
        };
        config.lookup_table_config.timeout =
            Duration::from_secs(args.lookup_table_timeout_seconds);
        Ok(config)
    }

    pub fn payer_pubkey(&self) -> Option<Pubkey> {
        self.payer_keypair.as_ref().map(|k| k.pubkey())
    }
}

pub fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        error: e.to_string(),
    })
}

pub fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, ConfigError> {
    Pubkey::from_str(value).map_err(|e| ConfigError::InvalidPubkey {
        field,
        error: e.to_string(),
    })
}

/// Accepts either a JSON byte array or the path of a keypair file.
pub fn parse_keypair(value: &str) -> Result<Keypair, ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with('[') {
        let bytes: Vec<u8> = serde_json::from_str(trimmed)
            .map_err(|e| ConfigError::InvalidKeypair(e.to_string()))?;
        return Keypair::from_bytes(&bytes).map_err(|e| ConfigError::InvalidKeypair(e.to_string()));
    }
    if !Path::new(trimmed).exists() {
        return Err(ConfigError::InvalidKeypair(format!(
            "keypair file {} does not exist",
            trimmed
        )));
    }
    read_keypair_file(trimmed).map_err(|e| ConfigError::InvalidKeypair(e.to_string()))
}
