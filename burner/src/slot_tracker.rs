use cnft_client::rpc::Rpc;
use tokio::time::{sleep, Duration, Instant};
use tracing::trace;

use crate::errors::LookupTableError;

pub fn slot_duration() -> Duration {
    Duration::from_nanos(solana_sdk::genesis_config::GenesisConfig::default().ns_per_slot() as u64)
}

/// Polls the connection until it reports `target_slot`, sleeping at most
/// `MAX_SLEEP_SLOTS` slots between checks. Returns the slot observed.
pub async fn wait_until_slot_reached<R: Rpc + ?Sized>(
    rpc: &R,
    target_slot: u64,
    max_wait: Duration,
) -> Result<u64, LookupTableError> {
    trace!("Waiting for slot {}", target_slot);

    const MAX_SLEEP_SLOTS: u64 = 5;

    let start = Instant::now();
    loop {
        let actual_slot = rpc
            .get_slot()
            .await
            .map_err(|e| LookupTableError::rpc("wait for lookup table slot", e))?;

        if actual_slot >= target_slot {
            trace!("Slot {} reached (actual: {})", target_slot, actual_slot);
            return Ok(actual_slot);
        }
        if start.elapsed() >= max_wait {
            return Err(LookupTableError::SlotNotReached {
                target: target_slot,
                current: actual_slot,
                after: max_wait,
            });
        }

        let slots_remaining = target_slot.saturating_sub(actual_slot);
        let sleep_slots = slots_remaining.min(MAX_SLEEP_SLOTS);
        let sleep_duration = slot_duration().saturating_mul(sleep_slots as u32);

        trace!(
            "Current slot: {}, target slot: {}, sleeping for {} slots ({:.1} seconds)",
            actual_slot,
            target_slot,
            sleep_slots,
            sleep_duration.as_secs_f64()
        );

        sleep(sleep_duration).await;
    }
}
