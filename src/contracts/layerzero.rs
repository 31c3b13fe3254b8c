//! LayerZero's v2 endpoint and ULN DVN contracts (spec §4.3.4 LayerZero
//! collector): `PacketSent` on the source `EndpointV2`, `PayloadVerified`
//! per-DVN on the destination `ReceiveUln302`. The collector correlates the
//! two by `payloadHash = keccak256(guid || message)`, then confirms each
//! observed DVN's verification is real by reading the DVN's `UlnConfig` off
//! the destination ULN and asking it whether the packet is `verifiable` —
//! the same two-call sequence LayerZero's own off-chain executor performs.
//!
//! Calldata is built and decoded by hand with the generated `sol!` types
//! rather than through an Alloy contract instance, matching
//! [`crate::contracts::escrow::EscrowCalldata`]'s pattern: reads go through
//! [`crate::traits::BlockchainProvider::call`], not Alloy's own
//! `Provider<N>::call` builder.

use std::sync::Arc;

use alloy_network::Network;
use alloy_primitives::{keccak256, Address, Bytes, FixedBytes};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;

use crate::error::Result;
use crate::traits::{BlockchainProvider, UlnVerifier};

sol! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UlnConfig {
        uint64 confirmations;
        uint8 requiredDVNCount;
        uint8 optionalDVNCount;
        uint8 optionalDVNThreshold;
        address[] requiredDVNs;
        address[] optionalDVNs;
    }

    #[derive(Debug)]
    interface IEndpointV2 {
        event PacketSent(bytes encodedPayload, bytes options, address sendLibrary);
    }

    #[derive(Debug)]
    interface IReceiveUln302 {
        event PayloadVerified(address indexed dvn, bytes header, uint256 confirmations, bytes32 proofHash);

        function getUlnConfig(address oapp, uint32 remoteEid) external view returns (UlnConfig memory rtnConfig);

        function verifiable(UlnConfig memory config, bytes32 headerHash, bytes32 payloadHash) external view returns (bool);
    }
}

/// Computes the payload hash LayerZero DVNs sign over, used to correlate a
/// source `PacketSent` with its destination `PayloadVerified` events.
pub fn payload_hash(guid: FixedBytes<32>, message: &[u8]) -> FixedBytes<32> {
    let mut buf = Vec::with_capacity(32 + message.len());
    buf.extend_from_slice(guid.as_slice());
    buf.extend_from_slice(message);
    keccak256(buf)
}

/// Builds the calldata for `getUlnConfig(oapp, remoteEid)` against the
/// destination ULN, keyed by the verifying DVN's own address (the ULN
/// tracks one config per DVN).
pub fn get_uln_config_calldata(dvn: Address, dst_eid: u32) -> Bytes {
    IReceiveUln302::getUlnConfigCall {
        oapp: dvn,
        remoteEid: dst_eid,
    }
    .abi_encode()
    .into()
}

/// Decodes the return data of a `getUlnConfig` call.
pub fn decode_uln_config(data: &[u8]) -> Result<UlnConfig> {
    let ret = IReceiveUln302::getUlnConfigCall::abi_decode_returns(data)?;
    Ok(ret)
}

/// Builds the calldata for `verifiable(config, headerHash, payloadHash)`,
/// the predicate LayerZero's own verification is gated on. The ULN encodes
/// its own DVN quorum threshold internally, so the collector doesn't
/// recompute one.
pub fn verifiable_calldata(
    config: UlnConfig,
    header_hash: FixedBytes<32>,
    payload_hash: FixedBytes<32>,
) -> Bytes {
    IReceiveUln302::verifiableCall {
        config,
        headerHash: header_hash,
        payloadHash: payload_hash,
    }
    .abi_encode()
    .into()
}

/// Decodes the return data of a `verifiable` call.
pub fn decode_verifiable(data: &[u8]) -> Result<bool> {
    let ret = IReceiveUln302::verifiableCall::abi_decode_returns(data)?;
    Ok(ret)
}

/// [`UlnVerifier`] backed by a live [`BlockchainProvider`]: builds the two
/// calls' calldata by hand and decodes the raw return bytes, rather than
/// going through an Alloy contract instance.
pub struct AlloyUlnVerifier<N: Network> {
    provider: Arc<dyn BlockchainProvider<N>>,
    uln_address: Address,
}

impl<N: Network> AlloyUlnVerifier<N> {
    pub fn new(provider: Arc<dyn BlockchainProvider<N>>, uln_address: Address) -> Self {
        Self { provider, uln_address }
    }
}

#[async_trait]
impl<N: Network> UlnVerifier for AlloyUlnVerifier<N> {
    async fn get_uln_config(&self, dvn: Address, dst_eid: u32) -> Result<UlnConfig> {
        let calldata = get_uln_config_calldata(dvn, dst_eid);
        let data = self.provider.call(self.uln_address, &calldata).await?;
        decode_uln_config(&data)
    }

    async fn verifiable(
        &self,
        config: UlnConfig,
        header_hash: FixedBytes<32>,
        payload_hash: FixedBytes<32>,
    ) -> Result<bool> {
        let calldata = verifiable_calldata(config, header_hash, payload_hash);
        let data = self.provider.call(self.uln_address, &calldata).await?;
        decode_verifiable(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_hash_is_deterministic_and_input_sensitive() {
        let guid = FixedBytes::from([1u8; 32]);
        let a = payload_hash(guid, b"message-a");
        let b = payload_hash(guid, b"message-a");
        let c = payload_hash(guid, b"message-b");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn get_uln_config_calldata_nonempty() {
        let calldata = get_uln_config_calldata(Address::repeat_byte(0xAA), 30_101);
        assert!(calldata.len() > 4);
    }

    #[test]
    fn verifiable_calldata_nonempty() {
        let config = UlnConfig {
            confirmations: 15,
            requiredDVNCount: 1,
            optionalDVNCount: 0,
            optionalDVNThreshold: 0,
            requiredDVNs: vec![Address::repeat_byte(0xBB)],
            optionalDVNs: vec![],
        };
        let calldata = verifiable_calldata(config, FixedBytes::from([2u8; 32]), FixedBytes::from([3u8; 32]));
        assert!(calldata.len() > 4);
    }
}
