//! Shared, typed key-value store with a pub/sub layer on top.
//!
//! Every component talks to the rest of the system only through the
//! [`Store`]: the getter writes bounties, collectors write proofs and
//! auxiliary bridge records, the submitter reads both and writes submission
//! state, and the admin HTTP surface reads everything. There is no direct
//! component-to-component call anywhere in the system; this is the
//! "pub/sub over direct calls" design note from the spec made concrete.
//!
//! Two operations matter more than the rest:
//! - [`Store::merge_bounty`] implements the bounty's monotonic-merge
//!   semantics (see [`crate::model::Bounty::merge`]) so replays and
//!   out-of-order getter scans never regress a bounty's status.
//! - [`Store::put_proof`] is set-once: once a proof exists for a message id
//!   it is never overwritten, matching the spec's idempotence invariant on
//!   `AMBProof`.

pub mod keys;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{instrument, trace};

use crate::model::{AMBMessage, AMBProof, Bounty, MessageIdentifier};

/// An event published on a store channel. Channels are named dynamically
/// (see [`keys`]) so new channel kinds don't require touching this enum;
/// what travels over them does.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    BountyUpdated(Bounty),
    ProofReady(AMBProof),
    HeadUpdated(crate::monitor::MonitorStatus),
}

/// The store's own bookkeeping error. Never surfaced across a component
/// boundary: `merge_bounty`/`put_proof` report outcomes as `bool`, not
/// `Result`, per the spec's note that store conflicts are resolved
/// internally, not propagated as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Merged,
    Unchanged,
}

/// Shared store: a typed KV side plus a named-channel pub/sub side.
///
/// Pub/sub is at-most-once and per-subscriber-channel: a publish with no
/// subscriber is simply dropped (grounded on `tokio::sync::broadcast`'s own
/// semantics, exactly how the teacher pack's `shared-bus` crate wraps it).
/// Subscribers that lag far enough to miss a broadcast slot see the
/// corresponding `Lagged` error from the channel itself; the store does not
/// paper over that, callers resubscribe and re-read from the KV side if they
/// need to catch up.
#[derive(Clone)]
pub struct Store {
    bounties: Arc<DashMap<MessageIdentifier, Bounty>>,
    proofs: Arc<DashMap<MessageIdentifier, AMBProof>>,
    messages: Arc<DashMap<MessageIdentifier, AMBMessage>>,
    priority: Arc<DashMap<MessageIdentifier, bool>>,
    tx_index: Arc<DashMap<alloy_primitives::TxHash, Vec<MessageIdentifier>>>,
    channels: Arc<DashMap<String, broadcast::Sender<StoreEvent>>>,
    channel_capacity: usize,
}

impl Store {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            bounties: Arc::new(DashMap::new()),
            proofs: Arc::new(DashMap::new()),
            messages: Arc::new(DashMap::new()),
            priority: Arc::new(DashMap::new()),
            tx_index: Arc::new(DashMap::new()),
            channels: Arc::new(DashMap::new()),
            channel_capacity,
        }
    }

    /// Records a collector's source-side AMBMessage. Write-once per
    /// identifier, same as the spec's `setAMBMessage` (§4.4): later calls for
    /// an identifier already present are no-ops, since the fields a collector
    /// observes from one `SendPacket`/`Message`/`PacketSent` event never
    /// change. Also registers the message's own transaction hash in the
    /// tx-hash index (`registerTxHashIndex`, spec §3/§6): every AMBMessage's
    /// identifier must be reachable from the tx hash that created it, not
    /// only from whatever tx hash later delivers it.
    pub fn put_message(&self, message: AMBMessage) {
        let identifier = message.identifier;
        let transaction_hash = message.transaction_hash;
        self.messages.entry(identifier).or_insert(message);
        self.index_tx_hash(transaction_hash, identifier);
    }

    pub fn get_message(&self, identifier: &MessageIdentifier) -> Option<AMBMessage> {
        self.messages.get(identifier).map(|m| m.clone())
    }

    /// Every recorded AMBMessage for a chain pair/tx hash combination the
    /// admin HTTP surface's `GET /getAMBs` endpoint needs, resolved through
    /// the tx-hash index. A single transaction can emit more than one
    /// AMBMessage, so this returns all of them, not just the first.
    pub fn messages_for_tx_hash(&self, tx_hash: &alloy_primitives::TxHash) -> Vec<AMBMessage> {
        self.resolve_tx_hash(tx_hash)
            .into_iter()
            .filter_map(|id| self.get_message(&id))
            .collect()
    }

    pub fn messages_for_chain(&self, chain: crate::model::ChainId) -> Vec<AMBMessage> {
        self.messages
            .iter()
            .filter(|m| m.identifier.source_chain == chain)
            .map(|m| m.clone())
            .collect()
    }

    /// Sets a message's priority flag, per `POST /prioritiseAMBMessage`
    /// (spec §6). A priority message skips the pending queue's delay.
    pub fn set_priority(&self, identifier: MessageIdentifier, priority: bool) {
        self.priority.insert(identifier, priority);
    }

    pub fn is_priority(&self, identifier: &MessageIdentifier) -> bool {
        self.priority.get(identifier).map(|p| *p).unwrap_or(false)
    }

    /// Merges an observed bounty into the store, advancing its status
    /// monotonically (see [`crate::model::Bounty::merge`]). Publishes a
    /// [`StoreEvent::BountyUpdated`] on `keys::bounty_channel` only when the
    /// merge actually changed something, so idempotent replays of the same
    /// event are silent.
    #[instrument(skip(self, incoming), fields(identifier = %incoming.identifier))]
    pub fn merge_bounty(&self, incoming: Bounty) -> PutOutcome {
        let outcome = match self.bounties.entry(incoming.identifier) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(incoming.clone());
                PutOutcome::Inserted
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                if slot.get_mut().merge(&incoming) {
                    PutOutcome::Merged
                } else {
                    PutOutcome::Unchanged
                }
            }
        };

        if outcome != PutOutcome::Unchanged {
            let current = self.bounties.get(&incoming.identifier).unwrap().clone();
            self.publish(&keys::bounty_channel(), StoreEvent::BountyUpdated(current));
        }
        trace!(?outcome, "bounty merged");
        outcome
    }

    pub fn get_bounty(&self, identifier: &MessageIdentifier) -> Option<Bounty> {
        self.bounties.get(identifier).map(|b| b.clone())
    }

    pub fn all_bounties(&self) -> Vec<Bounty> {
        self.bounties.iter().map(|b| b.clone()).collect()
    }

    /// Inserts a proof if (and only if) one doesn't already exist for this
    /// message. Returns `true` the first time, `false` on every subsequent
    /// call for the same identifier — the set-once guarantee collectors rely
    /// on when multiple DVNs/guardians/relayers race to deliver the same
    /// proof.
    #[instrument(skip(self, proof), fields(identifier = %proof.identifier))]
    pub fn put_proof(&self, proof: AMBProof) -> bool {
        let identifier = proof.identifier;
        let inserted = match self.proofs.entry(identifier) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(proof.clone());
                true
            }
            dashmap::mapref::entry::Entry::Occupied(_) => false,
        };

        if inserted {
            self.publish(&keys::proof_channel(), StoreEvent::ProofReady(proof));
        }
        trace!(inserted, "proof insertion attempted");
        inserted
    }

    pub fn get_proof(&self, identifier: &MessageIdentifier) -> Option<AMBProof> {
        self.proofs.get(identifier).map(|p| p.clone())
    }

    /// Appends to the tx-hash -> message-ids reverse index
    /// (`hashAmbMap:<chainId>:<txHash>`, spec §3/§6). A single transaction
    /// can emit multiple AMBMessages (e.g. a batched send), so this is an
    /// array, not a single value; appending the same identifier twice is a
    /// no-op.
    pub fn index_tx_hash(&self, tx_hash: alloy_primitives::TxHash, identifier: MessageIdentifier) {
        let mut identifiers = self.tx_index.entry(tx_hash).or_default();
        if !identifiers.contains(&identifier) {
            identifiers.push(identifier);
        }
    }

    pub fn resolve_tx_hash(&self, tx_hash: &alloy_primitives::TxHash) -> Vec<MessageIdentifier> {
        self.tx_index.get(tx_hash).map(|v| v.clone()).unwrap_or_default()
    }

    /// Subscribes to a named channel, creating it with this store's default
    /// capacity if it doesn't exist yet.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<StoreEvent> {
        self.channel(channel).subscribe()
    }

    /// Publishes an arbitrary [`StoreEvent`] on a named channel. Exposed (vs.
    /// the private `publish`) for components outside this module, like
    /// [`crate::monitor`], that own a `StoreEvent` variant but not the
    /// channel-naming internals.
    pub fn publish_raw(&self, channel: &str, event: StoreEvent) {
        self.publish(channel, event);
    }

    fn publish(&self, channel: &str, event: StoreEvent) {
        // A send with no subscribers returns an error we intentionally
        // discard: at-most-once delivery means a publish nobody is listening
        // for is simply lost, not buffered.
        let _ = self.channel(channel).send(event);
    }

    fn channel(&self, name: &str) -> broadcast::Sender<StoreEvent> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .clone()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of every bounty, keyed by message identifier.
/// Used by the admin HTTP surface's `GET /getAMBs`-style read endpoints.
pub fn snapshot_by_status(store: &Store) -> HashMap<crate::model::BountyStatus, Vec<Bounty>> {
    let mut grouped: HashMap<crate::model::BountyStatus, Vec<Bounty>> = HashMap::new();
    for bounty in store.all_bounties() {
        grouped.entry(bounty.status).or_default().push(bounty);
    }
    grouped
}
