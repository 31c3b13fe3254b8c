//! The Polymer collector: fetches a proof for a `SendPacket` event from
//! Polymer's prover endpoint, keyed by packet sequence. The prover's wire
//! protocol lives behind [`ProofSource`], out of scope per spec's non-goal
//! on per-bridge ABI/wire decoding detail.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AMBMessage, AMBProof, ProofAux};
use crate::traits::ProofSource;

use super::Collector;

pub struct PolymerCollector<S: ProofSource> {
    proof_source: Arc<S>,
    packet_sequence_of: Box<dyn Fn(&AMBMessage) -> u64 + Send + Sync>,
}

impl<S: ProofSource> PolymerCollector<S> {
    pub fn new(
        proof_source: Arc<S>,
        packet_sequence_of: impl Fn(&AMBMessage) -> u64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            proof_source,
            packet_sequence_of: Box::new(packet_sequence_of),
        }
    }
}

#[async_trait]
impl<S: ProofSource> Collector for PolymerCollector<S> {
    async fn collect_proof(&self, message: &AMBMessage) -> Result<Option<AMBProof>> {
        let sequence = (self.packet_sequence_of)(message);
        let request = sequence.to_be_bytes();

        let Some(proof_bytes) = self.proof_source.fetch_proof(&request).await? else {
            return Ok(None);
        };

        Ok(Some(AMBProof {
            identifier: message.identifier,
            message: message.clone(),
            aux: ProofAux::Polymer {
                packet_sequence: sequence,
                proof: proof_bytes,
            },
        }))
    }
}
