//! Channel and key naming conventions for the [`super::Store`].
//!
//! Centralised here so every component derives channel names the same way
//! instead of hand-formatting strings at call sites.

use crate::model::{BridgeKind, ChainId};

pub fn bounty_channel() -> String {
    "bounties".to_string()
}

pub fn proof_channel() -> String {
    "proofs".to_string()
}

/// Per-chain channel the monitor publishes head updates on (spec §4.1).
pub fn head_channel(chain: ChainId) -> String {
    format!("head:{chain}")
}

/// Per-(chain, bridge) channel used by a collector to publish proofs it
/// assembles, so a submitter interested only in one bridge on one chain
/// doesn't have to filter the global `proof_channel`.
pub fn collector_channel(chain: ChainId, bridge: BridgeKind) -> String {
    format!("collector:{chain}:{bridge}")
}
