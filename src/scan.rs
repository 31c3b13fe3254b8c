//! The block-range scanning algorithm shared by the getter (§4.2) and every
//! AMB collector (§4.3): walk forward from a cursor in bounded chunks,
//! fetching logs for each chunk and handing them to a callback.
//!
//! Deliberately blocks forever on RPC failure rather than skip a range: spec
//! §4.2 calls this out explicitly — silently skipping a range would miss
//! bounties or proofs with no way to recover, so a failed range is retried
//! on a fixed interval until it succeeds.

use alloy_network::Network;
use alloy_primitives::Address;
use alloy_rpc_types::{Filter, Log};
use tracing::{debug, warn};

use crate::traits::{BlockchainProvider, Clock};

/// One forward step of the scan: `[from_block, to_block]` inclusive, capped
/// at `max_block_range`, never reaching past `chain_head - confirmations`
/// (spec §4.1's confirmation-depth requirement), and never past
/// `stopping_block` when one is configured (spec §4.2:
/// `toBlock = min(currentHead, startingBlock + maxBlocks, stoppingBlock)`).
pub fn next_range(
    cursor: u64,
    chain_head: u64,
    confirmations: u64,
    max_block_range: u64,
    stopping_block: Option<u64>,
) -> Option<(u64, u64)> {
    let safe_head = chain_head.saturating_sub(confirmations);
    let safe_head = stopping_block.map_or(safe_head, |stop| safe_head.min(stop));
    if cursor > safe_head {
        return None;
    }
    let to_block = (cursor + max_block_range - 1).min(safe_head);
    Some((cursor, to_block))
}

/// Fetches logs for `[from_block, to_block]` from `address`, topic-filtered
/// by `topics`, retrying indefinitely on provider error with `retry_interval`
/// between attempts.
pub async fn fetch_range_logs<N, P, C>(
    provider: &P,
    clock: &C,
    address: Address,
    topics: &[alloy_primitives::B256],
    from_block: u64,
    to_block: u64,
    retry_interval: std::time::Duration,
) -> Vec<Log>
where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    loop {
        let filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block)
            .event_signature(topics.to_vec());

        match provider.get_logs(&filter).await {
            Ok(logs) => {
                debug!(from_block, to_block, count = logs.len(), "range scanned");
                return logs;
            }
            Err(err) => {
                warn!(from_block, to_block, error = %err, "range scan failed, retrying");
                clock.sleep(retry_interval).await;
            }
        }
    }
}

/// Resolves the current chain head, retrying indefinitely on failure for the
/// same reason range fetches do: a scanner with no head to scan toward must
/// not give up, it must wait and try again.
pub async fn chain_head_with_retry<N, P, C>(provider: &P, clock: &C, retry_interval: std::time::Duration) -> u64
where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    loop {
        match provider.get_block_number().await {
            Ok(head) => return head,
            Err(err) => {
                warn!(error = %err, "failed to fetch chain head, retrying");
                clock.sleep(retry_interval).await;
            }
        }
    }
}
