//! Pricing/evaluator (spec §4.6 eval queue): decides whether delivering a
//! message is worth the destination-chain gas cost, gated by a configurable
//! `profitability_factor`.

use alloy_primitives::U256;
use tracing::instrument;

use crate::model::Bounty;

/// Estimated cost to deliver a message on the destination chain, in the same
/// unit as `Bounty::priority_fee` (wei).
#[derive(Debug, Clone, Copy)]
pub struct DeliveryCostEstimate {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
}

impl DeliveryCostEstimate {
    pub fn total_wei(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.max_fee_per_gas)
    }
}

/// Returns `true` if the bounty's priority fee covers the estimated delivery
/// cost scaled by `profitability_factor` (a factor above `1.0` requires a
/// margin above break-even; `profitability_factor` is validated at startup
/// to lie in `[1, 5]`, same as the submitter's fee adjustment factors, so
/// evaluation can't be configured into rejecting everything or accepting
/// negative margins). Priority items skip the gate entirely: a negative
/// evaluation reward must still proceed when `priority` is true.
#[instrument(skip(bounty, cost))]
pub fn is_profitable(bounty: &Bounty, cost: &DeliveryCostEstimate, profitability_factor: f64, priority: bool) -> bool {
    if priority {
        return true;
    }
    let required = scale(cost.total_wei(), profitability_factor);
    bounty.priority_fee >= required
}

fn scale(value: U256, factor: f64) -> U256 {
    // U256 has no native float multiply; scale by a fixed-point factor
    // instead of converting to f64 and losing precision on large values.
    let scaled_factor = (factor * 1_000_000.0).round() as u64;
    (value * U256::from(scaled_factor)) / U256::from(1_000_000u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BridgeKind, ChainId, MessageIdentifier, BountyStatus};
    use alloy_primitives::{FixedBytes, TxHash};

    fn bounty(priority_fee: u64) -> Bounty {
        Bounty {
            identifier: MessageIdentifier {
                source_chain: ChainId(1),
                destination_chain: ChainId(10),
                message_id: FixedBytes::from([1u8; 32]),
            },
            status: BountyStatus::Claimed,
            bridge: BridgeKind::Mock,
            priority_fee: U256::from(priority_fee),
            gas_limit: 200_000,
            max_gas_delivery: 200_000,
            source_tx_hash: TxHash::from([0u8; 32]),
            claimer: None,
        }
    }

    #[test]
    fn profitable_when_fee_covers_cost_with_margin() {
        let cost = DeliveryCostEstimate {
            gas_limit: 100_000,
            max_fee_per_gas: 10,
        };
        // cost = 1_000_000 wei
        assert!(is_profitable(&bounty(1_000_000), &cost, 1.0, false));
        assert!(!is_profitable(&bounty(1_000_000), &cost, 1.5, false));
        assert!(is_profitable(&bounty(1_500_000), &cost, 1.5, false));
    }

    #[test]
    fn unprofitable_below_break_even() {
        let cost = DeliveryCostEstimate {
            gas_limit: 100_000,
            max_fee_per_gas: 10,
        };
        assert!(!is_profitable(&bounty(999_999), &cost, 1.0, false));
    }

    #[test]
    fn priority_bypasses_the_profitability_gate() {
        let cost = DeliveryCostEstimate {
            gas_limit: 100_000,
            max_fee_per_gas: 10,
        };
        assert!(is_profitable(&bounty(0), &cost, 1.0, true));
    }
}
