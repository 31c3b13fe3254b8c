//! Polymer's cross-chain packet contracts (spec §4.3 Polymer collector):
//! `SendPacket` on the source dispatcher, proofs fetched from Polymer's
//! prover API and submitted alongside the packet to the destination.

use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_sol_types::sol;

use alloy_network::Network;

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IPolymerDispatcher {
        event SendPacket(
            address indexed sender,
            uint64 indexed destinationChainId,
            bytes payload,
            uint64 sequence
        );
    }
}

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    interface IPolymerReceiver {
        function receivePacket(
            bytes calldata proof,
            bytes calldata payload,
            uint64 sequence
        ) external;
    }
}

#[derive(Debug, Clone)]
pub struct PolymerDispatcherContract<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    instance: IPolymerDispatcher::IPolymerDispatcherInstance<(), P, N>,
}

impl<N, P> PolymerDispatcherContract<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: IPolymerDispatcher::new(address, provider),
        }
    }

    pub fn address(&self) -> &Address {
        self.instance.address()
    }
}

pub fn receive_packet_calldata(proof: &[u8], payload: &[u8], sequence: u64) -> alloy_primitives::Bytes {
    IPolymerReceiver::receivePacketCall {
        proof: proof.to_vec().into(),
        payload: payload.to_vec().into(),
        sequence,
    }
    .abi_encode()
    .into()
}
