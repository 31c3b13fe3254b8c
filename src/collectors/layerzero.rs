//! The LayerZero collector: correlates a source `PacketSent` with one or
//! more destination `PayloadVerified` events (one per DVN) by
//! `payloadHash = keccak256(guid || message)`, then confirms the
//! correlation with a real on-chain read rather than trusting the event
//! stream alone.
//!
//! `PayloadVerified` events arrive independently of the collector asking for
//! them — a separate scan task feeds them in via
//! [`LayerZeroCollector::record_payload_verified`] as they're observed on
//! the destination chain, carrying the DVN address and the packet header
//! it verified. Once `correlation_delay` has elapsed since the first
//! sighting for a payload hash (giving slower DVNs time to catch up), the
//! collector asks the destination ULN itself whether the packet is
//! verifiable: `getUlnConfig(dvn, dstEid)` followed by
//! `verifiable(config, keccak256(header), payloadHash)` (spec §4.3.4). The
//! ULN's own `verifiable` predicate encodes its DVN quorum threshold, so the
//! collector stops at the first DVN that comes back verified rather than
//! recomputing a threshold itself.
//!
//! Pending entries older than `max_pending_age` are pruned so a payload hash
//! that never verifies doesn't leak memory forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy_primitives::{keccak256, Address, FixedBytes};
use async_trait::async_trait;
use tracing::warn;

use crate::contracts::layerzero::payload_hash;
use crate::error::Result;
use crate::model::{AMBMessage, AMBProof, ProofAux};
use crate::traits::UlnVerifier;

use super::Collector;

const DEFAULT_CORRELATION_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_MAX_PENDING_AGE: Duration = Duration::from_secs(6 * 60 * 60);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const MAX_VERIFY_ATTEMPTS: u32 = 3;

struct PendingEntry {
    header: Vec<u8>,
    verifying_dvns: Vec<Address>,
    first_seen: Instant,
}

pub struct LayerZeroCollector {
    pending: Mutex<HashMap<FixedBytes<32>, PendingEntry>>,
    verifier: Arc<dyn UlnVerifier>,
    dst_eid: u32,
    correlation_delay: Duration,
    max_pending_age: Duration,
    retry_interval: Duration,
}

impl LayerZeroCollector {
    pub fn new(verifier: Arc<dyn UlnVerifier>, dst_eid: u32) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            verifier,
            dst_eid,
            correlation_delay: DEFAULT_CORRELATION_DELAY,
            max_pending_age: DEFAULT_MAX_PENDING_AGE,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_timing(
        verifier: Arc<dyn UlnVerifier>,
        dst_eid: u32,
        correlation_delay: Duration,
        max_pending_age: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            verifier,
            dst_eid,
            correlation_delay,
            max_pending_age,
            retry_interval,
        }
    }

    /// Feeds in one destination-chain `PayloadVerified` observation. Called
    /// by the collector's own scan task as events arrive, independent of
    /// which message they'll end up correlating with.
    pub fn record_payload_verified(&self, hash: FixedBytes<32>, dvn: Address, header: Vec<u8>, now: Instant) {
        let mut pending = self.pending.lock().unwrap();
        self.prune_locked(&mut pending, now);

        let entry = pending.entry(hash).or_insert_with(|| PendingEntry {
            header: header.clone(),
            verifying_dvns: Vec::new(),
            first_seen: now,
        });
        if entry.header.is_empty() {
            entry.header = header;
        }
        if !entry.verifying_dvns.contains(&dvn) {
            entry.verifying_dvns.push(dvn);
        }
    }

    fn prune_locked(&self, pending: &mut HashMap<FixedBytes<32>, PendingEntry>, now: Instant) {
        pending.retain(|_, entry| now.duration_since(entry.first_seen) < self.max_pending_age);
    }

    /// The observed DVNs and packet header for a payload hash, once
    /// `correlation_delay` has elapsed since the first sighting.
    fn candidate(&self, hash: &FixedBytes<32>, now: Instant) -> Option<(Vec<Address>, Vec<u8>)> {
        let pending = self.pending.lock().unwrap();
        let entry = pending.get(hash)?;
        if entry.verifying_dvns.is_empty() {
            return None;
        }
        if now.duration_since(entry.first_seen) < self.correlation_delay {
            return None;
        }
        Some((entry.verifying_dvns.clone(), entry.header.clone()))
    }

    /// Calls `getUlnConfig` then `verifiable` for one DVN, retrying transient
    /// RPC failures up to [`MAX_VERIFY_ATTEMPTS`] times with `retry_interval`
    /// backoff (spec §4.3.4).
    async fn verify_dvn(&self, dvn: Address, header_hash: FixedBytes<32>, payload_hash: FixedBytes<32>) -> Result<bool> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = async {
                let config = self.verifier.get_uln_config(dvn, self.dst_eid).await?;
                self.verifier.verifiable(config, header_hash, payload_hash).await
            }
            .await;

            match outcome {
                Ok(verified) => return Ok(verified),
                Err(err) if attempt < MAX_VERIFY_ATTEMPTS => {
                    warn!(%dvn, attempt, error = %err, "ULN verification call failed, retrying");
                    tokio::time::sleep(self.retry_interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl Collector for LayerZeroCollector {
    async fn collect_proof(&self, message: &AMBMessage) -> Result<Option<AMBProof>> {
        let guid = message.identifier.message_id;
        let hash = payload_hash(guid, &message.payload);
        let now = Instant::now();

        let Some((dvns, header)) = self.candidate(&hash, now) else {
            return Ok(None);
        };
        let header_hash = keccak256(&header);

        for dvn in &dvns {
            if self.verify_dvn(*dvn, header_hash, hash).await? {
                return Ok(Some(AMBProof {
                    identifier: message.identifier,
                    message: message.clone(),
                    aux: ProofAux::LayerZero {
                        guid,
                        verifying_dvns: dvns,
                    },
                }));
            }
        }

        Ok(None)
    }
}
