use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    assets::Asset,
    config::BatchConfig,
    transaction::{BurnExecutor, BurnResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BatchState {
    #[default]
    Idle,
    /// `group` is 1-based.
    Running { group: usize, groups: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BurnProgress {
    pub total: usize,
    pub current: usize,
    pub success: usize,
    pub failed: usize,
    pub state: BatchState,
}

/// Burns a selection in groups of `batch_size`. Burns of one group run
/// concurrently; groups run one after another with `batch_delay` between
/// them.
pub struct BatchBurner<E: BurnExecutor + ?Sized> {
    executor: Arc<E>,
    config: BatchConfig,
    progress: watch::Sender<BurnProgress>,
}

impl<E: BurnExecutor + ?Sized> BatchBurner<E> {
    pub fn new(executor: Arc<E>, config: BatchConfig) -> Self {
        let (progress, _) = watch::channel(BurnProgress::default());
        Self {
            executor,
            config,
            progress,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Progress updates, published at group boundaries.
    pub fn subscribe(&self) -> watch::Receiver<BurnProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> BurnProgress {
        *self.progress.borrow()
    }

    /// Returns one result per asset, in input order. Each asset is judged on
    /// its own result, so one failed burn does not fail its group.
    pub async fn burn_all(&self, assets: &[Asset]) -> Vec<(Pubkey, BurnResult)> {
        let batch_size = self.config.batch_size.max(1);
        let groups = assets.len().div_ceil(batch_size);
        self.progress.send_replace(BurnProgress {
            total: assets.len(),
            ..Default::default()
        });

        let mut results = Vec::with_capacity(assets.len());
        for (index, group) in assets.chunks(batch_size).enumerate() {
            let group_number = index + 1;
            self.progress.send_modify(|p| {
                p.state = BatchState::Running {
                    group: group_number,
                    groups,
                }
            });
            info!(
                "Processing group {}/{} ({} assets)",
                group_number,
                groups,
                group.len()
            );

            let outcomes = join_all(group.iter().map(|asset| self.executor.burn_asset(asset))).await;

            let succeeded = outcomes.iter().filter(|r| r.success).count();
            let failed = outcomes.len() - succeeded;
            if failed > 0 {
                warn!("Group {}/{}: {} of {} burns failed", group_number, groups, failed, outcomes.len());
            }
            self.progress.send_modify(|p| {
                p.current += outcomes.len();
                p.success += succeeded;
                p.failed += failed;
            });
            results.extend(group.iter().map(|a| a.id).zip(outcomes));

            if group_number < groups {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        self.progress.send_modify(|p| p.state = BatchState::Idle);
        let progress = self.progress();
        info!(
            "Batch finished: {} burned, {} failed, {} total",
            progress.success, progress.failed, progress.total
        );
        results
    }
}
