//! The block-number resolver (spec §4.8): maps a chain's own block number to
//! an L1 reference block number, for rollups whose L2 block numbers don't
//! line up with L1 (used to normalise bounty accounting across chains).
//! Defaults to identity for chains that don't need this.

/// `getTransactionBlockNumber(l2BlockNumber) -> l1BlockNumber` from spec
/// §4.8. A trait rather than a bare function so a rollup-specific mapping
/// (reading an L1 block reference off the rollup's precompile or batch
/// inbox) can be swapped in per chain without touching callers.
pub trait BlockNumberResolver: Send + Sync {
    fn resolve_l1_block(&self, l2_block_number: u64) -> u64;
}

/// The default resolver: every chain is assumed to already report L1 block
/// numbers unless a rollup-specific resolver says otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl BlockNumberResolver for IdentityResolver {
    fn resolve_l1_block(&self, l2_block_number: u64) -> u64 {
        l2_block_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_resolver_returns_its_input() {
        assert_eq!(IdentityResolver.resolve_l1_block(12_345), 12_345);
    }
}
