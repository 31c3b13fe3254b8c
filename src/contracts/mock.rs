//! The `Mock` AMB: a single trusted off-chain signer attests to messages
//! instead of a real bridge's consensus mechanism. Used for local
//! development and integration tests (spec §4.3 Mock collector).

use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_sol_types::sol;

use alloy_network::Network;

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IMockBridge {
        event MessageSent(bytes32 indexed messageId, bytes message);

        function verifyAndDeliver(
            bytes32 messageId,
            bytes calldata message,
            bytes calldata attesterSignature
        ) external;
    }
}

#[derive(Debug, Clone)]
pub struct MockBridgeContract<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    instance: IMockBridge::IMockBridgeInstance<(), P, N>,
}

impl<N, P> MockBridgeContract<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: IMockBridge::new(address, provider),
        }
    }

    pub fn address(&self) -> &Address {
        self.instance.address()
    }
}

pub fn verify_and_deliver_calldata(
    message_id: alloy_primitives::FixedBytes<32>,
    message: &[u8],
    attester_signature: &[u8],
) -> alloy_primitives::Bytes {
    IMockBridge::verifyAndDeliverCall {
        messageId: message_id,
        message: message.to_vec().into(),
        attesterSignature: attester_signature.to_vec().into(),
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::FixedBytes;

    #[test]
    fn verify_and_deliver_calldata_includes_signature_bytes() {
        let calldata = verify_and_deliver_calldata(FixedBytes::from([1u8; 32]), b"msg", b"sig");
        assert!(calldata.len() > 4);
    }
}
