//! The wallet/nonce/fee helper (spec §4.5): single-writer nonce allocation
//! per chain plus EIP-1559/legacy fee computation with adjustment-factor
//! clamping for repricing stalled submissions.
//!
//! Nonce allocation is the one place in this crate where shared mutable
//! state is unavoidable (the spec's design note calls this out explicitly):
//! a chain has exactly one nonce sequence per signer address, so exactly one
//! [`NonceManager`] must own it. Every other component goes through the
//! [`Store`](crate::store::Store)'s pub/sub instead.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{RelayerError, Result};
use crate::traits::BlockchainProvider;

pub const DEFAULT_GAS_BUFFER_PERCENT: u64 = 20;

/// Single-writer nonce sequence for one (chain, signer) pair. `next()` hands
/// out nonces monotonically in-process; `resync` reconciles against the
/// chain's view after a stall or an external transaction changes the
/// account's nonce out from under us.
pub struct NonceManager {
    next_nonce: Mutex<Option<u64>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self {
            next_nonce: Mutex::new(None),
        }
    }

    /// Returns the next nonce to use, fetching the current on-chain count on
    /// first use.
    #[instrument(skip(self, provider))]
    pub async fn next<N, P>(&self, provider: &P, address: alloy_primitives::Address) -> Result<u64>
    where
        N: alloy_network::Network,
        P: BlockchainProvider<N>,
    {
        let mut guard = self.next_nonce.lock().unwrap();
        let nonce = match *guard {
            Some(n) => n,
            None => provider.get_transaction_count(address).await?,
        };
        *guard = Some(nonce + 1);
        debug!(nonce, "allocated nonce");
        Ok(nonce)
    }

    /// Reconciles the local nonce sequence against the chain's view.
    /// Returns [`RelayerError::NonceDesync`] if the chain is *behind* what we
    /// expect to have used (which would mean we double-allocated), never if
    /// it's merely caught up.
    pub fn resync(&self, chain_name: &str, on_chain_count: u64) -> Result<()> {
        let mut guard = self.next_nonce.lock().unwrap();
        match *guard {
            Some(local) if local < on_chain_count => Err(RelayerError::NonceDesync {
                chain: chain_name.to_string(),
                local,
                on_chain: on_chain_count,
            }),
            _ => {
                *guard = Some(on_chain_count);
                Ok(())
            }
        }
    }
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A computed fee quote ready to pass to a [`crate::traits::Signer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeQuote {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

/// Bounds applied to a [`FeeQuote`] so a misbehaving fee oracle or a
/// runaway repricing loop can't submit an unboundedly expensive
/// transaction.
#[derive(Debug, Clone, Copy)]
pub struct FeeBounds {
    pub max_allowed_priority_fee_per_gas: Option<u128>,
    pub max_allowed_gas_price: Option<u128>,
}

/// Computes the fee to use for a chain's next submission attempt.
///
/// `adjustment_factor` scales the provider's suggested fee up (for
/// repricing a stalled transaction) or is left at `1.0` for a first attempt;
/// config validation (spec §10.3) already ensures callers only pass values
/// in `[1, 5]`.
#[instrument(skip(provider))]
pub async fn quote_fee<N, P>(
    provider: &P,
    is_eip1559: bool,
    adjustment_factor: f64,
    bounds: FeeBounds,
) -> Result<FeeQuote>
where
    N: alloy_network::Network,
    P: BlockchainProvider<N>,
{
    if is_eip1559 {
        let base_fee = provider.get_base_fee().await?.unwrap_or(0);
        let suggested_priority = provider.get_max_priority_fee_per_gas().await?;
        let priority = scale(suggested_priority, adjustment_factor);
        let priority = clamp(priority, bounds.max_allowed_priority_fee_per_gas);
        let max_fee = base_fee.saturating_mul(2).saturating_add(priority);

        Ok(FeeQuote::Eip1559 {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority,
        })
    } else {
        let suggested = provider.get_gas_price().await?;
        let price = scale(suggested, adjustment_factor);
        let price = clamp(price, bounds.max_allowed_gas_price);
        Ok(FeeQuote::Legacy { gas_price: price })
    }
}

fn scale(value: u128, factor: f64) -> u128 {
    ((value as f64) * factor).round() as u128
}

fn clamp(value: u128, max: Option<u128>) -> u128 {
    match max {
        Some(max) => value.min(max),
        None => value,
    }
}

/// Applies [`DEFAULT_GAS_BUFFER_PERCENT`] headroom on top of an estimate, so
/// small chain-state changes between estimation and submission don't cause
/// an out-of-gas revert.
pub fn buffered_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(100 + DEFAULT_GAS_BUFFER_PERCENT) / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBlockchainProvider;
    use alloy_network::Ethereum;
    use alloy_primitives::Address;

    #[tokio::test]
    async fn nonce_manager_fetches_once_then_increments_locally() {
        let provider = FakeBlockchainProvider::new();
        provider.set_nonce(Address::ZERO, 5);
        let manager = NonceManager::new();

        assert_eq!(
            manager.next::<Ethereum, _>(&provider, Address::ZERO).await.unwrap(),
            5
        );
        assert_eq!(
            manager.next::<Ethereum, _>(&provider, Address::ZERO).await.unwrap(),
            6
        );

        // Chain-side nonce never changes in this fake; manager must not
        // re-fetch once it's initialised.
        provider.set_nonce(Address::ZERO, 100);
        assert_eq!(
            manager.next::<Ethereum, _>(&provider, Address::ZERO).await.unwrap(),
            7
        );
    }

    #[test]
    fn resync_errors_when_chain_is_behind_local_view() {
        let manager = NonceManager::new();
        *manager.next_nonce.lock().unwrap() = Some(10);

        let err = manager.resync("testchain", 5).unwrap_err();
        assert!(matches!(err, RelayerError::NonceDesync { .. }));
    }

    #[test]
    fn resync_accepts_chain_catching_up_or_ahead() {
        let manager = NonceManager::new();
        *manager.next_nonce.lock().unwrap() = Some(5);
        assert!(manager.resync("testchain", 10).is_ok());
    }

    #[tokio::test]
    async fn eip1559_quote_applies_adjustment_and_clamp() {
        let provider = FakeBlockchainProvider::new();
        provider.set_base_fee(Some(1_000));
        provider.set_priority_fee(100);

        let quote = quote_fee::<Ethereum, _>(
            &provider,
            true,
            2.0,
            FeeBounds {
                max_allowed_priority_fee_per_gas: Some(150),
                max_allowed_gas_price: None,
            },
        )
        .await
        .unwrap();

        match quote {
            FeeQuote::Eip1559 { max_priority_fee_per_gas, .. } => {
                assert_eq!(max_priority_fee_per_gas, 150); // clamped from 200
            }
            _ => panic!("expected eip1559 quote"),
        }
    }

    #[tokio::test]
    async fn legacy_quote_scales_gas_price() {
        let provider = FakeBlockchainProvider::new();
        provider.set_gas_price(1_000);

        let quote = quote_fee::<Ethereum, _>(
            &provider,
            false,
            1.5,
            FeeBounds {
                max_allowed_priority_fee_per_gas: None,
                max_allowed_gas_price: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(quote, FeeQuote::Legacy { gas_price: 1_500 });
    }

    #[test]
    fn buffered_gas_limit_adds_default_headroom() {
        assert_eq!(buffered_gas_limit(100_000), 120_000);
    }
}
