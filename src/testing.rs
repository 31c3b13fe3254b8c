//! Fake implementations of every trait abstraction, for exercising
//! components without a live chain or bridge. Mirrors the teacher crate's
//! `FakeBlockchainProvider`/`FakeAttestationProvider`/`FakeClock` pattern:
//! `Arc<Mutex<...>>`-backed state with a fluent `add_*` builder API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy_network::{Ethereum, Network};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types::{Filter, Log};
use async_trait::async_trait;

use crate::error::{RelayerError, Result};
use crate::traits::{BlockchainProvider, Clock, ProofSource, Signer};

// ============================================================================
// Fake Blockchain Provider
// ============================================================================

/// A fake blockchain provider with pre-configured responses for every
/// [`BlockchainProvider`] method, letting tests simulate RPC failures,
/// stalled nonces, and fee spikes without a live chain.
#[derive(Clone, Default)]
pub struct FakeBlockchainProvider {
    receipts: Arc<Mutex<HashMap<TxHash, Option<<Ethereum as Network>::ReceiptResponse>>>>,
    failures: Arc<Mutex<std::collections::HashSet<TxHash>>>,
    block_number: Arc<Mutex<u64>>,
    logs: Arc<Mutex<Vec<Log>>>,
    base_fee: Arc<Mutex<Option<u128>>>,
    priority_fee: Arc<Mutex<u128>>,
    gas_price: Arc<Mutex<u128>>,
    gas_estimate: Arc<Mutex<u64>>,
    nonces: Arc<Mutex<HashMap<Address, u64>>>,
    sent_transactions: Arc<Mutex<Vec<Bytes>>>,
    next_tx_hash: Arc<Mutex<TxHash>>,
    call_responses: Arc<Mutex<HashMap<(Address, Bytes), Bytes>>>,
}

impl FakeBlockchainProvider {
    pub fn new() -> Self {
        Self {
            block_number: Arc::new(Mutex::new(1)),
            priority_fee: Arc::new(Mutex::new(1_000_000_000)),
            gas_price: Arc::new(Mutex::new(1_000_000_000)),
            gas_estimate: Arc::new(Mutex::new(100_000)),
            ..Default::default()
        }
    }

    pub fn set_block_number(&self, block_number: u64) {
        *self.block_number.lock().unwrap() = block_number;
    }

    pub fn add_logs(&self, logs: Vec<Log>) {
        self.logs.lock().unwrap().extend(logs);
    }

    pub fn add_failure(&self, tx_hash: TxHash) {
        self.failures.lock().unwrap().insert(tx_hash);
    }

    pub fn set_base_fee(&self, base_fee: Option<u128>) {
        *self.base_fee.lock().unwrap() = base_fee;
    }

    pub fn set_priority_fee(&self, fee: u128) {
        *self.priority_fee.lock().unwrap() = fee;
    }

    pub fn set_gas_price(&self, price: u128) {
        *self.gas_price.lock().unwrap() = price;
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.lock().unwrap().insert(address, nonce);
    }

    pub fn sent_transactions(&self) -> Vec<Bytes> {
        self.sent_transactions.lock().unwrap().clone()
    }

    pub fn set_next_tx_hash(&self, hash: TxHash) {
        *self.next_tx_hash.lock().unwrap() = hash;
    }

    /// Stages the return data for a future `call(to, data)`, keyed by the
    /// exact `(to, data)` pair a caller will pass in.
    pub fn set_call_response(&self, to: Address, data: Bytes, response: Bytes) {
        self.call_responses.lock().unwrap().insert((to, data), response);
    }
}

#[async_trait]
impl BlockchainProvider<Ethereum> for FakeBlockchainProvider {
    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<<Ethereum as Network>::ReceiptResponse>> {
        if self.failures.lock().unwrap().contains(&tx_hash) {
            return Err(RelayerError::Provider("simulated RPC error".to_string()));
        }
        Ok(self.receipts.lock().unwrap().get(&tx_hash).cloned().flatten())
    }

    async fn get_block_number(&self) -> Result<u64> {
        Ok(*self.block_number.lock().unwrap())
    }

    async fn get_logs(&self, _filter: &Filter) -> Result<Vec<Log>> {
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn get_base_fee(&self) -> Result<Option<u128>> {
        Ok(*self.base_fee.lock().unwrap())
    }

    async fn get_max_priority_fee_per_gas(&self) -> Result<u128> {
        Ok(*self.priority_fee.lock().unwrap())
    }

    async fn get_gas_price(&self) -> Result<u128> {
        Ok(*self.gas_price.lock().unwrap())
    }

    async fn estimate_gas(&self, _from: Address, _to: Address, _data: &Bytes, _value: U256) -> Result<u64> {
        Ok(*self.gas_estimate.lock().unwrap())
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        Ok(self.nonces.lock().unwrap().get(&address).copied().unwrap_or(0))
    }

    async fn send_raw_transaction(&self, raw_tx: &Bytes) -> Result<TxHash> {
        self.sent_transactions.lock().unwrap().push(raw_tx.clone());
        Ok(*self.next_tx_hash.lock().unwrap())
    }

    async fn call(&self, to: Address, data: &Bytes) -> Result<Bytes> {
        Ok(self
            .call_responses
            .lock()
            .unwrap()
            .get(&(to, data.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A fake clock that allows fast-forwarding time in tests without waiting.
#[derive(Clone)]
pub struct FakeClock {
    current_time: Arc<Mutex<Instant>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock().unwrap();
        *time += duration;
    }

    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }

    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }
}

// ============================================================================
// Fake Proof Source
// ============================================================================

/// A fake [`ProofSource`] keyed by the raw request bytes a collector passes
/// in, letting tests simulate a proof arriving asynchronously after a
/// collector has already polled once and gotten `None`.
#[derive(Clone, Default)]
pub struct FakeProofSource {
    proofs: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl FakeProofSource {
    pub fn add_proof(&self, request: &[u8], proof: Vec<u8>) {
        self.proofs.lock().unwrap().insert(request.to_vec(), proof);
    }
}

#[async_trait]
impl ProofSource for FakeProofSource {
    async fn fetch_proof(&self, request: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.proofs.lock().unwrap().get(request).cloned())
    }
}

// ============================================================================
// Fake Signer
// ============================================================================

/// A fake [`Signer`] that returns deterministic, non-cryptographic "signed"
/// bytes — enough to drive the submitter's pipeline in tests without pulling
/// in a real signing key.
#[derive(Clone)]
pub struct FakeSigner {
    address: Address,
}

impl FakeSigner {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

#[async_trait]
impl Signer for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

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
    ) -> Result<Bytes> {
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&chain_id.to_be_bytes());
        encoded.extend_from_slice(to.as_slice());
        encoded.extend_from_slice(&nonce.to_be_bytes());
        encoded.extend_from_slice(&gas_limit.to_be_bytes());
        encoded.extend_from_slice(&max_fee_per_gas.to_be_bytes());
        encoded.extend_from_slice(&max_priority_fee_per_gas.to_be_bytes());
        encoded.extend_from_slice(&value.to_be_bytes::<32>());
        encoded.extend_from_slice(&data);
        Ok(encoded.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_clock_tracks_sleep_calls() {
        let clock = FakeClock::new();
        clock.sleep(Duration::from_secs(60)).await;
        clock.sleep(Duration::from_secs(120)).await;

        assert_eq!(clock.sleep_count(), 2);
        assert_eq!(clock.total_sleep_time(), Duration::from_secs(180));
    }

    #[tokio::test]
    async fn fake_blockchain_provider_reports_configured_failure() {
        let provider = FakeBlockchainProvider::new();
        let tx_hash = TxHash::from([1u8; 32]);
        provider.add_failure(tx_hash);

        let result = provider.get_transaction_receipt(tx_hash).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fake_proof_source_returns_none_until_proof_added() {
        let source = FakeProofSource::default();
        assert!(source.fetch_proof(b"x").await.unwrap().is_none());

        source.add_proof(b"x", vec![1, 2, 3]);
        assert_eq!(source.fetch_proof(b"x").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn fake_signer_produces_deterministic_output() {
        let signer = FakeSigner::new(Address::ZERO);
        let a = signer
            .sign_transaction(1, Address::ZERO, 0, 21_000, 100, 10, U256::ZERO, Bytes::new())
            .await
            .unwrap();
        let b = signer
            .sign_transaction(1, Address::ZERO, 0, 21_000, 100, 10, U256::ZERO, Bytes::new())
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
