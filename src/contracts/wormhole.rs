//! Wormhole's core bridge contract (spec §4.3 Wormhole collector):
//! `LogMessagePublished` on the source, the destination verifies a VAA
//! (Verified Action Approval) assembled from guardian signatures fetched
//! through a guardian spy — the spy's own wire protocol is behind
//! [`crate::traits::ProofSource`], not modelled here.

use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_sol_types::sol;

use alloy_network::Network;

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IWormholeCoreBridge {
        event LogMessagePublished(
            address indexed sender,
            uint64 sequence,
            uint32 nonce,
            bytes payload,
            uint8 consistencyLevel
        );
    }
}

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IWormholeReceiver {
        function receiveMessage(bytes calldata vaa) external;
    }
}

#[derive(Debug, Clone)]
pub struct WormholeCoreBridgeContract<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    instance: IWormholeCoreBridge::IWormholeCoreBridgeInstance<(), P, N>,
}

impl<N, P> WormholeCoreBridgeContract<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: IWormholeCoreBridge::new(address, provider),
        }
    }

    pub fn address(&self) -> &Address {
        self.instance.address()
    }
}

pub fn receive_message_calldata(vaa: &[u8]) -> alloy_primitives::Bytes {
    IWormholeReceiver::receiveMessageCall {
        vaa: vaa.to_vec().into(),
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_message_calldata_wraps_vaa_bytes() {
        let calldata = receive_message_calldata(b"fake-vaa-bytes");
        assert!(calldata.len() > 4);
    }
}
