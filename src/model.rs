//! Core data model shared by every component: chain identity, message
//! identifiers, bounties, and the AMB proof records collectors produce.
//!
//! These types are the nouns the rest of the crate operates on. They carry no
//! I/O; `Store` persists them, `getter`/`collectors` produce them,
//! `submitter` consumes them.

use std::fmt;

use alloy_primitives::{Address, FixedBytes, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Uniquely identifies a chain the relayer talks to. Distinct from
/// `alloy_chains::NamedChain` because the protocol family this relayer
/// targets runs on chains (and testnets, and L2s) that don't all have a
/// `NamedChain` variant; the chain identifier is whatever the deployment's
/// escrow contract uses (a chain id, in practice, but kept opaque here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The bridge a message travels over. Used both as config input (which
/// collector to spawn) and as part of a message's identity (two messages with
/// the same escrow message id but different bridges are different AMB
/// messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeKind {
    Mock,
    Polymer,
    Wormhole,
    LayerZero,
}

impl fmt::Display for BridgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BridgeKind::Mock => "mock",
            BridgeKind::Polymer => "polymer",
            BridgeKind::Wormhole => "wormhole",
            BridgeKind::LayerZero => "layerzero",
        };
        write!(f, "{s}")
    }
}

/// Identifies a single cross-chain message: the chain it originated on and
/// the 32-byte id the escrow contract assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageIdentifier {
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub message_id: FixedBytes<32>,
}

impl fmt::Display for MessageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}:{}",
            self.source_chain, self.destination_chain, self.message_id
        )
    }
}

/// Lifecycle state of a bounty as observed by the getter. Ordered by
/// "progress" so a monotonic merge can pick `max(current, incoming)` and
/// never regress a bounty that has already moved forward (see
/// `Bounty::merge`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BountyStatus {
    Placed,
    Claimed,
    Delivered,
    SubmissionFailed,
}

/// A bounty posted on the source chain's escrow contract for relaying one
/// message. Fields mirror the escrow contract's `BountyPlaced` /
/// `BountyClaimed` / `BountyIncreased` event payloads plus the status derived
/// by the getter from which events have been observed so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    pub identifier: MessageIdentifier,
    pub status: BountyStatus,
    pub bridge: BridgeKind,
    pub priority_fee: U256,
    pub gas_limit: u64,
    pub max_gas_delivery: u64,
    pub source_tx_hash: TxHash,
    pub claimer: Option<Address>,
}

impl Bounty {
    /// Merges an incoming observation into the current record, keeping the
    /// most advanced `status` and summing priority fee top-ups
    /// (`BountyIncreased` events add to, never replace, the existing fee).
    /// Returns `true` if the merge changed anything observable, so callers
    /// can decide whether to publish a store update.
    pub fn merge(&mut self, incoming: &Bounty) -> bool {
        debug_assert_eq!(self.identifier, incoming.identifier);
        let mut changed = false;

        if incoming.status > self.status {
            self.status = incoming.status;
            changed = true;
        }
        if incoming.priority_fee > self.priority_fee {
            self.priority_fee = incoming.priority_fee;
            changed = true;
        }
        if incoming.claimer.is_some() && self.claimer != incoming.claimer {
            self.claimer = incoming.claimer;
            changed = true;
        }
        changed
    }
}

/// A bridge-agnostic view of a relayed message: the payload plus whatever
/// fields every collector agrees on. Bridge-specific auxiliary data (Wormhole
/// VAA bytes, LayerZero GUID, Polymer packet sequence) lives in
/// `AMBProof::aux`, not here, so the submitter can work uniformly across
/// bridges.
///
/// Carries the source-chain event's own coordinates (`block_number`,
/// `block_hash`, `transaction_hash`) plus `l1_block_number`, the same event
/// resolved through [`crate::chain::BlockNumberResolver`] — distinct from
/// `block_number` only on rollups whose own numbering doesn't line up with
/// L1 (spec §3/§4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AMBMessage {
    pub identifier: MessageIdentifier,
    pub bridge: BridgeKind,
    pub payload: Vec<u8>,
    pub block_number: u64,
    pub block_hash: FixedBytes<32>,
    pub transaction_hash: TxHash,
    pub l1_block_number: u64,
}

/// Bridge-specific auxiliary data a collector attaches to a proof before the
/// submitter can call the destination chain's delivery entrypoint. Kept as a
/// tagged enum (not a trait object) per the "encode polymorphism as a tagged
/// variant, not a capability set" design note: every bridge kind's aux record
/// is known up front and the submitter can match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofAux {
    Mock,
    Polymer {
        packet_sequence: u64,
        proof: Vec<u8>,
    },
    Wormhole {
        vaa: Vec<u8>,
    },
    LayerZero {
        guid: FixedBytes<32>,
        verifying_dvns: Vec<Address>,
    },
}

/// An attestation/proof a collector has assembled for a message, ready to be
/// handed to the submitter's delivery call. Set-once per `MessageIdentifier`:
/// once a proof exists for a message it is never replaced, only read (see
/// spec §4.4's idempotence invariant on `AMBProof`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AMBProof {
    pub identifier: MessageIdentifier,
    pub message: AMBMessage,
    pub aux: ProofAux,
}
