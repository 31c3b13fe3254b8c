//! Structured tracing span helpers for the relayer's main loops.
//!
//! Mirrors the teacher crate's `spans` module: static span names, structured
//! attributes, kept separate from business logic so instrumentation doesn't
//! clutter the algorithms in `scan`, `getter`, `collectors`, and `submitter`.

use alloy_primitives::{hex, FixedBytes};
use tracing::Span;

use crate::model::{BridgeKind, ChainId, MessageIdentifier};

/// Span for one getter block-range scan pass.
///
/// Parent: the getter's worker loop span (auto-attached).
/// Children: provider RPC call spans (from alloy's own instrumentation).
#[inline]
pub fn getter_scan_range(chain: ChainId, from_block: u64, to_block: u64) -> Span {
    tracing::info_span!(
        "relayer.getter.scan_range",
        chain = %chain,
        from_block,
        to_block,
    )
}

/// Span for one collector's proof-collection attempt on a single message.
///
/// Parent: the collector's worker loop span.
/// Children: `ProofSource::fetch_proof` call spans.
#[inline]
pub fn collector_collect_proof(identifier: &MessageIdentifier, bridge: BridgeKind) -> Span {
    tracing::info_span!(
        "relayer.collector.collect_proof",
        identifier = %identifier,
        bridge = %bridge,
    )
}

/// Span for one Wormhole message-sniffer block-range scan pass (spec
/// §4.3.3's source-side sniffer), distinct from `getter_scan_range` since it
/// watches the Wormhole core contract rather than the escrow.
#[inline]
pub fn wormhole_sniffer_scan_range(chain: ChainId, from_block: u64, to_block: u64) -> Span {
    tracing::info_span!(
        "relayer.collector.wormhole.sniffer_scan_range",
        chain = %chain,
        from_block,
        to_block,
    )
}

/// Span for a LayerZero destination-side `PayloadVerified` correlation
/// attempt, keyed by the computed payload hash rather than the message
/// identifier (which isn't known until correlation succeeds).
#[inline]
pub fn layerzero_correlate(payload_hash: &FixedBytes<32>) -> Span {
    tracing::debug_span!(
        "relayer.collector.layerzero.correlate",
        payload_hash = %hex::encode(payload_hash),
    )
}

/// Span for a single submitter pipeline stage pass (pending/eval/submit/
/// confirm).
///
/// Parent: the submitter worker's per-chain loop span.
/// Children: queue::drain's per-item handler spans.
#[inline]
pub fn submitter_stage(stage: &'static str, chain: ChainId) -> Span {
    tracing::info_span!("relayer.submitter.stage", stage, chain = %chain)
}

/// Span for one delivery transaction submission attempt.
///
/// Parent: relayer.submitter.stage ("submit").
/// Children: `Signer::sign_transaction`, `BlockchainProvider::send_raw_transaction`.
#[inline]
pub fn submit_delivery(identifier: &MessageIdentifier, attempt: u32) -> Span {
    tracing::info_span!(
        "relayer.submitter.submit_delivery",
        identifier = %identifier,
        attempt,
    )
}
