//! The Mock collector: no real bridge consensus to wait on, a configured
//! attester signs the message immediately. Exists purely so integration
//! tests and local development can exercise the full getter -> collector ->
//! submitter pipeline without a real bridge's latency.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AMBMessage, AMBProof, ProofAux};

use super::Collector;

/// Always produces a proof on the first call: there's nothing to wait for.
#[derive(Debug, Clone, Default)]
pub struct MockCollector;

#[async_trait]
impl Collector for MockCollector {
    async fn collect_proof(&self, message: &AMBMessage) -> Result<Option<AMBProof>> {
        Ok(Some(AMBProof {
            identifier: message.identifier,
            message: message.clone(),
            aux: ProofAux::Mock,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BridgeKind, ChainId, MessageIdentifier};
    use alloy_primitives::FixedBytes;

    #[tokio::test]
    async fn mock_collector_produces_a_proof_immediately() {
        let collector = MockCollector;
        let message = AMBMessage {
            identifier: MessageIdentifier {
                source_chain: ChainId(1),
                destination_chain: ChainId(10),
                message_id: FixedBytes::from([1u8; 32]),
            },
            bridge: BridgeKind::Mock,
            payload: vec![1, 2, 3],
            block_number: 1,
            block_hash: FixedBytes::from([0u8; 32]),
            transaction_hash: alloy_primitives::TxHash::from([0u8; 32]),
            l1_block_number: 1,
        };

        let proof = collector.collect_proof(&message).await.unwrap();
        assert!(matches!(proof, Some(AMBProof { aux: ProofAux::Mock, .. })));
    }
}
