//! Chain descriptors and the resolver that turns a [`ChainId`] into the
//! concrete contract addresses and RPC endpoint a component needs.

pub mod resolver;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{RelayerError, Result};
use crate::model::ChainId;

/// Static, per-chain configuration: everything a worker needs to know about
/// a chain before it can start scanning or submitting on it. Loaded from
/// [`crate::config::RelayerConfig`], never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub escrow_address: Address,
    pub start_block: Option<i64>,
    pub stopping_block: Option<u64>,
    pub confirmations: u64,
    pub max_block_range: u64,
    pub is_eip1559: bool,
}

impl ChainConfig {
    /// Resolves `start_block` against the current chain head (spec §4.2):
    /// unset starts from the head, a non-negative value is used as the
    /// literal starting block, a negative value means "`head` minus this
    /// many blocks". Errors if that resolves to a negative block number.
    pub fn resolve_start_block(&self, head: u64) -> Result<u64> {
        match self.start_block {
            None => Ok(head),
            Some(value) if value >= 0 => Ok(value as u64),
            Some(offset) => {
                let resolved = head as i64 + offset;
                if resolved < 0 {
                    return Err(RelayerError::InvalidConfig(format!(
                        "chain {}: start_block {offset} relative to head {head} is negative",
                        self.chain_id
                    )));
                }
                Ok(resolved as u64)
            }
        }
    }
}

pub use resolver::{BlockNumberResolver, IdentityResolver};

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(start_block: Option<i64>) -> ChainConfig {
        ChainConfig {
            chain_id: ChainId(1),
            name: "test".into(),
            rpc_url: "http://localhost".into(),
            escrow_address: Address::ZERO,
            start_block,
            stopping_block: None,
            confirmations: 1,
            max_block_range: 1000,
            is_eip1559: true,
        }
    }

    #[test]
    fn unset_start_block_resolves_to_head() {
        assert_eq!(chain(None).resolve_start_block(12_345).unwrap(), 12_345);
    }

    #[test]
    fn positive_start_block_is_used_literally() {
        assert_eq!(chain(Some(100)).resolve_start_block(12_345).unwrap(), 100);
    }

    #[test]
    fn negative_start_block_is_head_relative() {
        assert_eq!(chain(Some(-100)).resolve_start_block(1_000).unwrap(), 900);
    }

    #[test]
    fn negative_start_block_errors_when_it_overflows_below_zero() {
        assert!(chain(Some(-1_000)).resolve_start_block(10).is_err());
    }
}
