use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use cnft_client::{
    constants::{EXPLORER_TX_URL, MAX_TRANSACTION_SIZE},
    indexer::Indexer,
    rpc::{MerkleTreeExt, Rpc, RpcError},
};
use serde::{Deserialize, Serialize};
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentLevel,
    hash::Hash,
    instruction::Instruction,
    message::{v0, AddressLookupTableAccount, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::{TransactionError, VersionedTransaction},
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    assets::Asset,
    config::TransactionConfig,
    errors::BurnError,
    instructions::{create_burn_instruction, with_compute_budget},
    lookup_tables::LookupTableResolver,
    proof::fetch_burn_args,
    Result,
};

/// Outcome of one attempted burn. Built once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnResult {
    pub signature: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl BurnResult {
    pub fn success(signature: &Signature, logs: Vec<String>) -> Self {
        Self {
            signature: signature.to_string(),
            success: true,
            error: None,
            logs,
        }
    }

    pub fn failure(error: &BurnError, logs: Vec<String>) -> Self {
        let signature = match error {
            BurnError::TransactionFailed { signature, .. }
            | BurnError::ConfirmationTimeout { signature, .. } => signature.to_string(),
            _ => String::new(),
        };
        Self {
            signature,
            success: false,
            error: Some(error.to_string()),
            logs,
        }
    }

    pub fn explorer_url(&self) -> Option<String> {
        (self.success && !self.signature.is_empty())
            .then(|| format!("{}/{}", EXPLORER_TX_URL, self.signature))
    }
}

/// A signed burn and what it was compiled against.
#[derive(Debug, Clone)]
pub struct SignedBurn {
    pub transaction: VersionedTransaction,
    pub lookup_tables: Vec<Pubkey>,
    /// Past this block height the transaction can no longer land.
    pub last_valid_block_height: u64,
}

/// Log lines of a single burn. Every line is also emitted through `tracing`.
#[derive(Debug)]
pub struct BurnLog {
    asset: Pubkey,
    lines: Vec<String>,
}

impl BurnLog {
    pub fn new(asset: Pubkey) -> Self {
        Self {
            asset,
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("[{}] {}", self.asset, line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Seam between the batch orchestrator and whatever burns one asset.
#[async_trait]
pub trait BurnExecutor: Send + Sync + 'static {
    /// Never fails: every error ends up in the returned result.
    async fn burn_asset(&self, asset: &Asset) -> BurnResult;
}

/// Compiles a v0 message paying from `payer`.
pub fn compile_message(
    payer: &Pubkey,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> Result<VersionedMessage> {
    let message = v0::Message::try_compile(payer, instructions, lookup_tables, blockhash)
        .map_err(RpcError::from)?;
    Ok(VersionedMessage::V0(message))
}

/// Wire size of `message` once signed. Signatures are fixed size, so
/// placeholder ones give the exact figure.
pub fn estimate_transaction_size(message: &VersionedMessage) -> Result<usize> {
    let signatures = message.header().num_required_signatures as usize;
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default(); signatures],
        message: message.clone(),
    };
    bincode::serialized_size(&transaction)
        .map(|size| size as usize)
        .map_err(BurnError::general)
}

pub struct Burner<R: Rpc, I: Indexer> {
    rpc: Arc<R>,
    indexer: Arc<I>,
    signer: Option<Arc<Keypair>>,
    resolver: Option<LookupTableResolver<R>>,
    config: TransactionConfig,
}

impl<R: Rpc, I: Indexer> Debug for Burner<R, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Burner")
            .field("rpc", &self.rpc)
            .field("indexer", &self.indexer)
            .field("signer", &self.signer.as_ref().map(|s| s.pubkey()))
            .field("lookup_tables", &self.resolver.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<R: Rpc, I: Indexer> Burner<R, I> {
    pub fn new(
        rpc: Arc<R>,
        indexer: Arc<I>,
        signer: Option<Arc<Keypair>>,
        config: TransactionConfig,
    ) -> Self {
        Self {
            rpc,
            indexer,
            signer,
            resolver: None,
            config,
        }
    }

    pub fn with_lookup_tables(mut self, resolver: LookupTableResolver<R>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Fetches a fresh proof, builds, signs and submits the burn of `asset`.
    pub async fn try_burn(&self, asset: &Asset, log: &mut BurnLog) -> Result<Signature> {
        let signer = self.signer.clone().ok_or(BurnError::NoWallet)?;

        log.push(format!("Burning {} ({})", asset.display_name(), asset.id));
        let mut args = fetch_burn_args(self.indexer.as_ref(), &asset.id).await?;
        log.push(format!(
            "Fetched proof: {} nodes, leaf {}",
            args.proof.len(),
            args.index
        ));

        let tree = self.rpc.get_merkle_tree_info(args.tree).await?;
        args.truncate_to_canopy(&tree)?;
        log.push(format!(
            "Tree {} depth {} canopy {}: sending {} proof nodes",
            args.tree,
            tree.header.max_depth,
            tree.canopy_depth,
            args.proof.len()
        ));
        if args.ownership.delegated {
            log.push(format!(
                "Asset is delegated to {}",
                args.ownership.leaf_delegate()
            ));
        }

        let instruction = create_burn_instruction(&signer.pubkey(), &args)?;
        let instructions = with_compute_budget(&self.config, instruction);
        let (signature, tables) = self
            .send_with_retry(&signer, &instructions, &args.proof, log)
            .await?;
        log.push(format!("Confirmed: {}", signature));

        if self.config.verify_burn {
            self.verify_burn(&asset.id, log).await;
        }
        if self.config.close_lookup_tables && !tables.is_empty() {
            if let Some(resolver) = &self.resolver {
                let closed = resolver.close_tables(&signer, &tables).await;
                log.push(format!(
                    "Sent {} lookup table cleanup transactions",
                    closed.len()
                ));
            }
        }
        Ok(signature)
    }

    /// Compiles and signs the burn. Falls back to lookup tables when the
    /// plain transaction exceeds the packet size.
    pub async fn build_transaction(
        &self,
        signer: &Keypair,
        instructions: &[Instruction],
        proof: &[Pubkey],
        log: &mut BurnLog,
    ) -> Result<SignedBurn> {
        let (blockhash, last_valid_block_height) = self.rpc.get_latest_blockhash().await?;
        let payer = signer.pubkey();

        let mut message = compile_message(&payer, instructions, &[], blockhash)?;
        let mut size = estimate_transaction_size(&message)?;
        let mut tables = Vec::new();

        if size > MAX_TRANSACTION_SIZE {
            let Some(resolver) = &self.resolver else {
                return Err(BurnError::TransactionTooLarge {
                    size,
                    max: MAX_TRANSACTION_SIZE,
                });
            };
            log.push(format!(
                "Transaction is {} bytes, resolving lookup tables",
                size
            ));
            let accounts = resolver.resolve(proof).await?;
            if accounts.is_empty() {
                return Err(BurnError::TransactionTooLarge {
                    size,
                    max: MAX_TRANSACTION_SIZE,
                });
            }
            message = compile_message(&payer, instructions, &accounts, blockhash)?;
            size = estimate_transaction_size(&message)?;
            tables = accounts.iter().map(|a| a.key).collect();
            log.push(format!(
                "Using {} lookup tables, transaction is {} bytes",
                tables.len(),
                size
            ));
            if size > MAX_TRANSACTION_SIZE {
                return Err(BurnError::TransactionTooLarge {
                    size,
                    max: MAX_TRANSACTION_SIZE,
                });
            }
        }

        let transaction = VersionedTransaction::try_new(message, &[signer])?;
        Ok(SignedBurn {
            transaction,
            lookup_tables: tables,
            last_valid_block_height,
        })
    }

    /// Up to `max_send_attempts` build-send-confirm rounds, each with a fresh
    /// blockhash. Only transport failures and expired confirmations are
    /// retried. A sent transaction that was not confirmed in time is only
    /// replaced once its blockhash has expired.
    async fn send_with_retry(
        &self,
        signer: &Keypair,
        instructions: &[Instruction],
        proof: &[Pubkey],
        log: &mut BurnLog,
    ) -> Result<(Signature, Vec<Pubkey>)> {
        let max_attempts = self.config.max_send_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let signed = self
                .build_transaction(signer, instructions, proof, log)
                .await?;
            log.push(format!("Sending attempt {}/{}", attempt, max_attempts));
            let error = match self.send(&signed.transaction).await {
                Ok(signature) => match self.confirm(signature).await {
                    Ok(()) => return Ok((signature, signed.lookup_tables)),
                    Err(e) if e.is_retryable() => {
                        warn!("{}, waiting for its blockhash to expire", e);
                        log.push(format!(
                            "{}, waiting until block height {}",
                            e, signed.last_valid_block_height
                        ));
                        if self
                            .await_landing_or_expiry(
                                &signature,
                                signed.last_valid_block_height,
                                log,
                            )
                            .await?
                        {
                            return Ok((signature, signed.lookup_tables));
                        }
                        e
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => e,
            };
            if error.is_retryable() && attempt < max_attempts {
                warn!(
                    "Attempt {}/{} failed, retrying in {:?}: {}",
                    attempt, max_attempts, self.config.retry_delay, error
                );
                log.push(format!("Attempt {} failed: {}", attempt, error));
                sleep(self.config.retry_delay).await;
            } else {
                return Err(error);
            }
        }
    }

    async fn send(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let send_config = RpcSendTransactionConfig {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            max_retries: Some(0),
            ..Default::default()
        };
        let signature = self.rpc.send_transaction(transaction, send_config).await?;
        debug!("Sent {}", signature);
        Ok(signature)
    }

    async fn confirm(&self, signature: Signature) -> Result<()> {
        match self
            .rpc
            .confirm_transaction(
                &signature,
                self.config.confirm_timeout,
                self.config.confirm_poll_interval,
            )
            .await?
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.transaction_failed(signature, e).await),
        }
    }

    /// Polls `signature` until it lands or the cluster has moved past
    /// `last_valid_block_height`. Returns whether it landed.
    ///
    /// The block height is read before the status, so an expired answer
    /// means the transaction can no longer land.
    pub async fn await_landing_or_expiry(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
        log: &mut BurnLog,
    ) -> Result<bool> {
        loop {
            let block_height = self.rpc.get_block_height().await?;
            match self.rpc.get_signature_status(signature).await? {
                Some(Ok(())) => {
                    log.push(format!("{} landed after the confirmation timeout", signature));
                    return Ok(true);
                }
                Some(Err(e)) => return Err(self.transaction_failed(*signature, e).await),
                None if block_height > last_valid_block_height => {
                    log.push(format!(
                        "Blockhash of {} expired at block height {}",
                        signature, block_height
                    ));
                    return Ok(false);
                }
                None => sleep(self.config.confirm_poll_interval).await,
            }
        }
    }

    async fn transaction_failed(&self, signature: Signature, error: TransactionError) -> BurnError {
        let logs = match self.rpc.get_transaction_logs(&signature).await {
            Ok(logs) => logs,
            Err(log_error) => {
                warn!("Failed to fetch logs of {}: {}", signature, log_error);
                vec![]
            }
        };
        BurnError::TransactionFailed {
            signature,
            message: error.to_string(),
            logs,
        }
    }

    /// Re-fetches the asset and records whether the indexer saw the burn.
    /// Indexers lag, so a live answer is only a warning.
    pub async fn verify_burn(&self, asset_id: &Pubkey, log: &mut BurnLog) {
        match self.indexer.get_asset(asset_id).await {
            Ok(asset) if asset.burnt => log.push("Indexer reports the asset as burnt"),
            Ok(_) => {
                warn!("Indexer still reports {} as live", asset_id);
                log.push("Indexer has not caught up with the burn yet");
            }
            Err(e) => {
                warn!("Failed to verify burn of {}: {}", asset_id, e);
                log.push(format!("Verification skipped: {}", e));
            }
        }
    }
}

#[async_trait]
impl<R: Rpc, I: Indexer> BurnExecutor for Burner<R, I> {
    async fn burn_asset(&self, asset: &Asset) -> BurnResult {
        let mut log = BurnLog::new(asset.id);
        match self.try_burn(asset, &mut log).await {
            Ok(signature) => {
                info!(
                    "Burned {}: {}/{}",
                    asset.id, EXPLORER_TX_URL, signature
                );
                BurnResult::success(&signature, log.into_lines())
            }
            Err(e) => {
                warn!("Failed to burn {}: {}", asset.id, e);
                log.push(format!("Error: {}", e));
                for line in e.logs() {
                    log.push(line.clone());
                }
                BurnResult::failure(&e, log.into_lines())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cnft_client::constants::BUBBLEGUM_PROGRAM_ID;
    use solana_sdk::instruction::AccountMeta;

    use super::*;

    fn instruction(accounts: usize) -> Instruction {
        Instruction {
            program_id: BUBBLEGUM_PROGRAM_ID,
            accounts: (0..accounts)
                .map(|_| AccountMeta::new_readonly(Pubkey::new_unique(), false))
                .collect(),
            data: vec![0; 16],
        }
    }

    #[test]
    fn estimate_matches_signed_size() {
        let payer = Keypair::new();
        let message =
            compile_message(&payer.pubkey(), &[instruction(4)], &[], Hash::default()).unwrap();
        let estimate = estimate_transaction_size(&message).unwrap();
        let signed = VersionedTransaction::try_new(message, &[&payer]).unwrap();
        assert_eq!(
            estimate,
            bincode::serialized_size(&signed).unwrap() as usize
        );
    }

    #[test]
    fn lookup_tables_shrink_messages() {
        let payer = Keypair::new();
        let ix = instruction(40);
        let plain = compile_message(&payer.pubkey(), &[ix.clone()], &[], Hash::default()).unwrap();
        let plain_size = estimate_transaction_size(&plain).unwrap();
        assert!(plain_size > MAX_TRANSACTION_SIZE);

        let table = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: ix.accounts.iter().map(|a| a.pubkey).collect(),
        };
        let compressed =
            compile_message(&payer.pubkey(), &[ix], &[table], Hash::default()).unwrap();
        let compressed_size = estimate_transaction_size(&compressed).unwrap();
        assert!(compressed_size <= MAX_TRANSACTION_SIZE);
        assert!(compressed_size < plain_size);
    }

    #[test]
    fn failure_results_keep_signature_and_message() {
        let signature = Signature::from([7u8; 64]);
        let err = BurnError::TransactionFailed {
            signature,
            message: "custom program error: 0x1771".to_string(),
            logs: vec![],
        };
        let result = BurnResult::failure(&err, vec!["Sending attempt 1/3".to_string()]);
        assert!(!result.success);
        assert_eq!(result.signature, signature.to_string());
        assert!(result.error.unwrap().contains("0x1771"));
        assert!(BurnResult::failure(&BurnError::NoWallet, vec![]).signature.is_empty());
    }

    #[test]
    fn success_results_link_to_explorer() {
        let signature = Signature::from([1u8; 64]);
        let result = BurnResult::success(&signature, vec![]);
        assert_eq!(
            result.explorer_url(),
            Some(format!("https://solscan.io/tx/{}", signature))
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }
}
