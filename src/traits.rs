//! Core trait abstractions the relayer is built against.
//!
//! Every external dependency (chain RPC, wall-clock time, transaction
//! signing, gas pricing) is pushed behind a trait so components can be
//! exercised with fakes (see [`crate::testing`]) instead of a live chain.
//! This mirrors the teacher crate's trait-based v2 architecture: components
//! take `impl Trait` or generic `T: Trait` parameters, never a concrete
//! provider type, so adversarial scenarios (timeouts, reorgs, stalled
//! nonces) are expressible as plain fakes.

use std::time::{Duration, Instant};

use alloy_network::Network;
use alloy_primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use async_trait::async_trait;

use crate::contracts::layerzero::UlnConfig;
use crate::error::Result;

/// Trait for blockchain RPC operations used by the monitor, getter, and AMB
/// collectors to read chain state, and by the submitter to write
/// transactions.
///
/// Generic over `N: Network` so the same abstraction covers every EVM chain
/// the relayer is configured for, not just one.
#[async_trait]
pub trait BlockchainProvider<N: Network>: Send + Sync {
    /// Fetches the transaction receipt for a given transaction hash. Returns
    /// `None` if not found or not yet mined.
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<N::ReceiptResponse>>;

    /// Gets the current block number.
    async fn get_block_number(&self) -> Result<u64>;

    /// Fetches logs matching the given filter. Used by the getter and AMB
    /// collectors to scan a block range for escrow/bridge events.
    async fn get_logs(&self, filter: &alloy_rpc_types::Filter) -> Result<Vec<alloy_rpc_types::Log>>;

    /// Current EIP-1559 base fee, if the chain supports it (`None` on
    /// legacy-fee-only chains).
    async fn get_base_fee(&self) -> Result<Option<u128>>;

    /// Suggested `max_priority_fee_per_gas` from the node.
    async fn get_max_priority_fee_per_gas(&self) -> Result<u128>;

    /// Legacy `eth_gasPrice`, used on chains without EIP-1559.
    async fn get_gas_price(&self) -> Result<u128>;

    /// Estimates gas for a call, used before submission to size the
    /// transaction's gas limit.
    async fn estimate_gas(&self, from: Address, to: Address, data: &Bytes, value: U256)
        -> Result<u64>;

    /// Next nonce to use for `address`, including pending transactions.
    async fn get_transaction_count(&self, address: Address) -> Result<u64>;

    /// Broadcasts a signed, raw transaction and returns its hash.
    async fn send_raw_transaction(&self, raw_tx: &Bytes) -> Result<TxHash>;

    /// Performs a read-only `eth_call` against `to` with pre-encoded
    /// calldata, returning the raw return data. Used for contract reads that
    /// don't warrant their own dedicated method (e.g. the LayerZero
    /// collector's `getUlnConfig`/`verifiable` calls), encoded and decoded by
    /// the caller via the matching `sol!`-generated types.
    async fn call(&self, to: Address, data: &Bytes) -> Result<Bytes>;
}

/// Trait for time-based operations. Abstracts sleep and time queries so
/// tests can fast-forward through polling loops, retry backoffs, and
/// timeouts without actually waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> Instant;
}

/// Trait for transaction signing. Deliberately minimal: the relayer core
/// only needs "sign this payload for this chain", not key management,
/// custody, or HSM integration, all of which are out of scope per the spec's
/// non-goals and are the concern of whatever `Signer` implementation is
/// wired in at startup.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The address this signer signs for.
    fn address(&self) -> Address;

    /// Signs and RLP-encodes a transaction request, returning the raw bytes
    /// ready for `BlockchainProvider::send_raw_transaction`.
    async fn sign_transaction(
        &self,
        chain_id: u64,
        to: Address,
        nonce: u64,
        gas_limit: u64,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
        value: U256,
        data: Bytes,
    ) -> Result<Bytes>;
}

/// Abstracts LayerZero's on-chain DVN verification predicate (spec §4.3.4):
/// reading a DVN's `UlnConfig` off the destination ULN, then asking whether a
/// packet is `verifiable` under it. A trait rather than a concrete RPC
/// wrapper so the LayerZero collector's tests can stage verification results
/// the same way [`BlockchainProvider`] is faked for the submitter.
#[async_trait]
pub trait UlnVerifier: Send + Sync {
    async fn get_uln_config(&self, dvn: Address, dst_eid: u32) -> Result<UlnConfig>;

    async fn verifiable(
        &self,
        config: UlnConfig,
        header_hash: FixedBytes<32>,
        payload_hash: FixedBytes<32>,
    ) -> Result<bool>;
}

/// Trait abstracting a bridge's attestation/proof source: Circle-style HTTP
/// polling, a Wormhole guardian spy, a LayerZero DVN confirmation, or a
/// Polymer proof endpoint all reduce to "ask for a proof of this event, get
/// one eventually or an error". Exact wire protocols are explicitly out of
/// scope (spec's non-goal on per-bridge ABI decoding detail); collectors
/// depend on this trait rather than hand-rolling HTTP/gRPC clients inline.
#[async_trait]
pub trait ProofSource: Send + Sync {
    /// Opaque proof request key (message hash, VAA id, packet sequence...);
    /// the concrete collector interprets it.
    async fn fetch_proof(&self, request: &[u8]) -> Result<Option<Vec<u8>>>;
}
