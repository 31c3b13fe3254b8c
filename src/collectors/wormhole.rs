//! The Wormhole collector (spec §4.3.3), split into three cooperating
//! pieces, each responsible for one concern a single generic poller can't
//! cover at once:
//!
//! - [`VaaSpyClient`] asks a guardian spy for the VAA covering a message.
//!   The spy's own wire protocol is behind [`ProofSource`]; see
//!   [`super::polymer`] for the same reasoning applied to Polymer's prover.
//! - [`MessageSniffer`] watches the source chain's `LogMessagePublished`
//!   events directly, independent of the getter's own bounty-event scan,
//!   and correlates each sighting to a [`MessageIdentifier`] by transaction
//!   hash via [`Store::messages_for_tx_hash`]. [`WormholeCollector`] only
//!   asks the spy for a VAA once the sniffer has confirmed Wormhole itself
//!   has seen the message — asking earlier just wastes a spy round trip.
//! - [`run_recovery`] backfills that correlation once at startup over a
//!   historical block range, so messages published before the relayer
//!   started aren't stuck waiting on [`run_sniffer`], which only watches
//!   forward from the moment it's spawned.
//!
//! [`run_recovery`] and [`run_sniffer`] are spawned as their own tasks in
//! the supervisor binary, both writing into the same shared
//! [`MessageSniffer`] that [`WormholeCollector`] reads from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy_network::Network;
use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use tracing::{info, instrument, Instrument};

use crate::contracts::wormhole::IWormholeCoreBridge;
use crate::error::Result;
use crate::model::{AMBMessage, AMBProof, ChainId, MessageIdentifier, ProofAux};
use crate::scan;
use crate::spans;
use crate::store::Store;
use crate::traits::{BlockchainProvider, Clock, ProofSource};

use super::Collector;

const DEFAULT_MAX_PENDING_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// Fetches the guardian-signed VAA covering a message from a configured spy
/// endpoint, keyed by the escrow's own message id (the spy's exact lookup
/// key is out of scope per spec's non-goal on per-bridge ABI decoding
/// detail).
pub struct VaaSpyClient<S: ProofSource> {
    proof_source: Arc<S>,
}

impl<S: ProofSource> VaaSpyClient<S> {
    pub fn new(proof_source: Arc<S>) -> Self {
        Self { proof_source }
    }

    async fn fetch_vaa(&self, message: &AMBMessage) -> Result<Option<AMBProof>> {
        let request = message.identifier.message_id.as_slice();
        let Some(vaa) = self.proof_source.fetch_proof(request).await? else {
            return Ok(None);
        };
        Ok(Some(AMBProof {
            identifier: message.identifier,
            message: message.clone(),
            aux: ProofAux::Wormhole { vaa },
        }))
    }
}

/// Tracks which messages have had their source-side `LogMessagePublished`
/// event directly observed, fed by [`run_sniffer`] and [`run_recovery`] as
/// they scan. Entries older than `max_pending_age` are pruned so a message
/// that's stuck elsewhere in the pipeline doesn't leak memory forever.
#[derive(Default)]
pub struct MessageSniffer {
    observed: Mutex<HashMap<MessageIdentifier, Instant>>,
}

impl MessageSniffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_observed(&self, identifier: MessageIdentifier, now: Instant) {
        self.observed.lock().unwrap().insert(identifier, now);
    }

    pub fn is_observed(&self, identifier: &MessageIdentifier) -> bool {
        self.observed.lock().unwrap().contains_key(identifier)
    }

    pub fn prune(&self, now: Instant, max_age: Duration) {
        self.observed
            .lock()
            .unwrap()
            .retain(|_, seen_at| now.duration_since(*seen_at) < max_age);
    }
}

/// Composes [`VaaSpyClient`] and [`MessageSniffer`] into the [`Collector`]
/// the registry spawns: a message is only handed to the spy once Wormhole's
/// own source-side event has been directly observed for it.
pub struct WormholeCollector<S: ProofSource> {
    spy: VaaSpyClient<S>,
    sniffer: Arc<MessageSniffer>,
}

impl<S: ProofSource> WormholeCollector<S> {
    pub fn new(proof_source: Arc<S>, sniffer: Arc<MessageSniffer>) -> Self {
        Self {
            spy: VaaSpyClient::new(proof_source),
            sniffer,
        }
    }
}

#[async_trait]
impl<S: ProofSource> Collector for WormholeCollector<S> {
    async fn collect_proof(&self, message: &AMBMessage) -> Result<Option<AMBProof>> {
        if !self.sniffer.is_observed(&message.identifier) {
            return Ok(None);
        }
        self.spy.fetch_vaa(message).await
    }
}

/// Scans `[from_block, to_block]` for `LogMessagePublished` on
/// `wormhole_core_address` and records every message it correlates to (by
/// transaction hash, via [`Store::messages_for_tx_hash`]) as observed.
/// Shared by [`run_recovery`] and [`run_sniffer`], which differ only in
/// which range they scan and whether they loop.
async fn scan_and_record<N, P, C>(
    provider: &P,
    clock: &C,
    store: &Store,
    sniffer: &MessageSniffer,
    wormhole_core_address: Address,
    from_block: u64,
    to_block: u64,
    retry_interval: Duration,
    now: Instant,
) where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    let topics = [IWormholeCoreBridge::LogMessagePublished::SIGNATURE_HASH];
    let logs = scan::fetch_range_logs::<N, _, _>(
        provider,
        clock,
        wormhole_core_address,
        &topics,
        from_block,
        to_block,
        retry_interval,
    )
    .await;

    for log in &logs {
        let Some(tx_hash) = log.transaction_hash else {
            continue;
        };
        for message in store.messages_for_tx_hash(&tx_hash) {
            sniffer.record_observed(message.identifier, now);
        }
    }
}

/// One-shot backfill (spec §4.3.3): on startup, scans the last
/// `recovery_blocks` blocks for `LogMessagePublished` so messages sent while
/// the relayer was offline aren't stuck waiting on [`run_sniffer`], which
/// only watches forward from the moment it starts. Returns once the scan
/// completes; unlike [`run_sniffer`] this is not a loop.
#[instrument(skip(provider, clock, store, sniffer), fields(chain = %chain_id))]
pub async fn run_recovery<N, P, C>(
    chain_id: ChainId,
    wormhole_core_address: Address,
    provider: Arc<P>,
    clock: Arc<C>,
    store: Store,
    sniffer: Arc<MessageSniffer>,
    recovery_blocks: u64,
    retry_interval: Duration,
) where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    let head = scan::chain_head_with_retry::<N, _, _>(provider.as_ref(), clock.as_ref(), retry_interval).await;
    let from_block = head.saturating_sub(recovery_blocks);
    info!(from_block, to_block = head, "wormhole recovery scan starting");
    scan_and_record::<N, _, _>(
        provider.as_ref(),
        clock.as_ref(),
        &store,
        sniffer.as_ref(),
        wormhole_core_address,
        from_block,
        head,
        retry_interval,
        clock.now(),
    )
    .await;
    info!("wormhole recovery scan complete");
}

/// Ongoing forward scan feeding [`MessageSniffer`] (spec §4.3.3's
/// source-side message sniffer), structured like [`crate::getter::run`]'s
/// scan loop but against the Wormhole core contract instead of the escrow.
#[instrument(skip(provider, clock, store, sniffer), fields(chain = %chain_id))]
pub async fn run_sniffer<N, P, C>(
    chain_id: ChainId,
    wormhole_core_address: Address,
    provider: Arc<P>,
    clock: Arc<C>,
    store: Store,
    sniffer: Arc<MessageSniffer>,
    confirmations: u64,
    max_block_range: u64,
    poll_interval: Duration,
    retry_interval: Duration,
) where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    let mut cursor = scan::chain_head_with_retry::<N, _, _>(provider.as_ref(), clock.as_ref(), retry_interval).await;

    loop {
        let head = scan::chain_head_with_retry::<N, _, _>(provider.as_ref(), clock.as_ref(), retry_interval).await;

        match scan::next_range(cursor, head, confirmations, max_block_range, None) {
            None => {
                sniffer.prune(clock.now(), DEFAULT_MAX_PENDING_AGE);
                clock.sleep(poll_interval).await;
                continue;
            }
            Some((from_block, to_block)) => {
                scan_and_record::<N, _, _>(
                    provider.as_ref(),
                    clock.as_ref(),
                    &store,
                    sniffer.as_ref(),
                    wormhole_core_address,
                    from_block,
                    to_block,
                    retry_interval,
                    clock.now(),
                )
                .instrument(spans::wormhole_sniffer_scan_range(chain_id, from_block, to_block))
                .await;
                cursor = to_block + 1;
            }
        }
    }
}
