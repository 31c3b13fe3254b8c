//! Alloy-based blockchain provider implementation.

use alloy_network::Network;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{Filter, Log};
use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::error::{RelayerError, Result};
use crate::traits::BlockchainProvider;

/// Production blockchain provider wrapping Alloy's [`Provider`] trait.
///
/// Adapts Alloy's provider interface to [`BlockchainProvider`], giving
/// uniform access to blockchain operations across every network the relayer
/// is configured for.
#[derive(Debug, Clone)]
pub struct AlloyProvider<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    provider: P,
    _network: std::marker::PhantomData<N>,
}

impl<N, P> AlloyProvider<N, P>
where
    N: Network,
    P: Provider<N> + Clone,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            _network: std::marker::PhantomData,
        }
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<N, P> BlockchainProvider<N> for AlloyProvider<N, P>
where
    N: Network,
    P: Provider<N> + Clone + Send + Sync,
{
    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<N::ReceiptResponse>> {
        trace!("fetching transaction receipt");
        let result = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))?;

        debug!(found = result.is_some(), "transaction receipt lookup");
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_block_number(&self) -> Result<u64> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))?;
        trace!(block_number, "current block number");
        Ok(block_number)
    }

    #[instrument(skip(self, filter))]
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        let logs = self
            .provider
            .get_logs(filter)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))?;
        trace!(count = logs.len(), "logs fetched");
        Ok(logs)
    }

    async fn get_base_fee(&self) -> Result<Option<u128>> {
        let block = self
            .provider
            .get_block_by_number(alloy_rpc_types::BlockNumberOrTag::Latest)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))?
            .ok_or_else(|| RelayerError::Provider("latest block not found".into()))?;
        Ok(block.header.base_fee_per_gas().map(u128::from))
    }

    async fn get_max_priority_fee_per_gas(&self) -> Result<u128> {
        self.provider
            .get_max_priority_fee_per_gas()
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))
    }

    async fn get_gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))
    }

    #[instrument(skip(self, data))]
    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &Bytes,
        value: U256,
    ) -> Result<u64> {
        let tx = alloy_rpc_types::TransactionRequest::default()
            .from(from)
            .to(to)
            .input(data.clone().into())
            .value(value);
        self.provider
            .estimate_gas(tx)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))
    }

    #[instrument(skip(self, raw_tx))]
    async fn send_raw_transaction(&self, raw_tx: &Bytes) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(raw_tx)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self, data))]
    async fn call(&self, to: Address, data: &Bytes) -> Result<Bytes> {
        let tx = alloy_rpc_types::TransactionRequest::default()
            .to(to)
            .input(data.clone().into());
        self.provider
            .call(tx)
            .await
            .map_err(|e| RelayerError::Provider(e.to_string()))
    }
}
