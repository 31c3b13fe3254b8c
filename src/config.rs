//! Configuration loading: a TOML file layered with `RELAYER_`-prefixed
//! environment variable overrides, validated once at startup.
//!
//! Loading config from files/env is explicitly out of scope per the spec's
//! non-goals as a *feature* to design ("bring your own config loader"), but
//! a complete binary still needs one; this follows the teacher pack's
//! production services (`config` crate, file + env layering) rather than
//! hand-rolling an env-var reader.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::Deserialize;

use crate::chain::ChainConfig;
use crate::error::{RelayerError, Result};
use crate::model::{BridgeKind, ChainId};

/// Tunables for the getter's block-range scan loop (spec §4.2).
#[derive(Debug, Clone, Deserialize)]
pub struct GetterConfig {
    #[serde(default = "default_processing_interval")]
    pub processing_interval_secs: u64,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_max_blocks")]
    pub max_blocks: u64,
}

fn default_processing_interval() -> u64 {
    5
}
fn default_retry_interval() -> u64 {
    5
}
fn default_max_blocks() -> u64 {
    1000
}

impl Default for GetterConfig {
    fn default() -> Self {
        Self {
            processing_interval_secs: default_processing_interval(),
            retry_interval_secs: default_retry_interval(),
            max_blocks: default_max_blocks(),
        }
    }
}

/// Tunables for the pricing/evaluator component (spec §4.6's eval queue).
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_eval_retry_interval")]
    pub evaluation_retry_interval_secs: u64,
    #[serde(default = "default_max_eval_duration")]
    pub max_evaluation_duration_secs: u64,
    #[serde(default = "default_profitability_factor")]
    pub profitability_factor: f64,
}

fn default_eval_retry_interval() -> u64 {
    10
}
fn default_max_eval_duration() -> u64 {
    24 * 60 * 60
}
fn default_profitability_factor() -> f64 {
    1.0
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            evaluation_retry_interval_secs: default_eval_retry_interval(),
            max_evaluation_duration_secs: default_max_eval_duration(),
            profitability_factor: default_profitability_factor(),
        }
    }
}

/// Tunables for the submitter pipeline (spec §4.5, §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterConfig {
    #[serde(default = "default_new_orders_delay")]
    pub new_orders_delay_secs: u64,
    #[serde(default = "default_max_pending")]
    pub max_pending_transactions: usize,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_secs: u64,
    #[serde(default = "default_priority_adjustment")]
    pub max_priority_fee_adjustment_factor: f64,
    pub max_allowed_priority_fee_per_gas: Option<u128>,
    #[serde(default = "default_gas_adjustment")]
    pub gas_price_adjustment_factor: f64,
    pub max_allowed_gas_price: Option<u128>,
    #[serde(default = "default_priority_adjustment")]
    pub priority_adjustment_factor: f64,
}

fn default_new_orders_delay() -> u64 {
    0
}
fn default_max_pending() -> usize {
    50
}
fn default_max_tries() -> u32 {
    3
}
fn default_confirmation_timeout() -> u64 {
    300
}
fn default_transaction_timeout() -> u64 {
    300
}
fn default_priority_adjustment() -> f64 {
    1.1
}
fn default_gas_adjustment() -> f64 {
    1.1
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            new_orders_delay_secs: default_new_orders_delay(),
            max_pending_transactions: default_max_pending(),
            max_tries: default_max_tries(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            transaction_timeout_secs: default_transaction_timeout(),
            max_priority_fee_adjustment_factor: default_priority_adjustment(),
            max_allowed_priority_fee_per_gas: None,
            gas_price_adjustment_factor: default_gas_adjustment(),
            max_allowed_gas_price: None,
            priority_adjustment_factor: default_priority_adjustment(),
        }
    }
}

/// Which bridge collectors to spawn and any bridge-specific settings
/// (grounded on the spec §9 note to encode bridge kind as a tagged variant,
/// resolved at startup through [`crate::registry::BridgeRegistry`]).
#[derive(Debug, Clone, Deserialize)]
pub struct AmbConfig {
    pub bridge: BridgeKind,
    pub bridge_address: Address,
    /// For [`BridgeKind::LayerZero`] only: the LayerZero endpoint id the
    /// destination ULN uses to key this chain's DVN configs. Ignored by
    /// every other bridge kind. Defaults to the chain's own numeric id,
    /// which holds for most LayerZero deployments.
    #[serde(default)]
    pub layerzero_dst_eid: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_bind")]
    pub bind_address: String,
}

fn default_admin_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_address: default_admin_bind(),
        }
    }
}

/// Raw, deserialisable chain entry; converted to [`ChainConfig`] plus its
/// [`AmbConfig`] list during [`RelayerConfig::validate`].
#[derive(Debug, Clone, Deserialize)]
struct ChainEntry {
    chain_id: u64,
    name: String,
    rpc_url: String,
    escrow_address: Address,
    #[serde(default)]
    start_block: Option<i64>,
    #[serde(default)]
    stopping_block: Option<u64>,
    #[serde(default = "default_confirmations")]
    confirmations: u64,
    #[serde(default = "default_max_blocks")]
    max_block_range: u64,
    #[serde(default)]
    is_eip1559: bool,
    #[serde(default)]
    ambs: Vec<AmbConfig>,
}

fn default_confirmations() -> u64 {
    1
}

/// Tunables shared by every AMB collector worker.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_processing_interval")]
    pub poll_interval_secs: u64,
    /// Base URL of the HTTP attestation/prover endpoint backing the Polymer
    /// and Wormhole collectors (see [`crate::providers::HttpProofSource`]).
    /// `None` leaves those two bridge kinds unusable at startup.
    pub proof_source_base_url: Option<String>,
    /// Backoff between retried `getUlnConfig`/`verifiable` RPC calls in the
    /// LayerZero collector (spec §4.3.4). Each verification attempt gets up
    /// to 3 tries total.
    #[serde(default = "default_layerzero_retry_interval")]
    pub layerzero_retry_interval_secs: u64,
    /// How many blocks back the Wormhole sniffer's one-shot startup recovery
    /// scan (spec §4.3.3) looks for `LogMessagePublished` events published
    /// before the relayer started.
    #[serde(default = "default_wormhole_recovery_blocks")]
    pub wormhole_recovery_blocks: u64,
}

fn default_layerzero_retry_interval() -> u64 {
    5
}
fn default_wormhole_recovery_blocks() -> u64 {
    50_000
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_processing_interval(),
            proof_source_base_url: None,
            layerzero_retry_interval_secs: default_layerzero_retry_interval(),
            wormhole_recovery_blocks: default_wormhole_recovery_blocks(),
        }
    }
}

/// Top-level configuration, the root of the TOML file / `RELAYER_*` env
/// layering.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    chains: Vec<ChainEntry>,
    #[serde(default)]
    pub getter: GetterConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub submitter: SubmitterConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Hex-encoded private key for the relayer's hot wallet, one signer
    /// shared across every configured chain (an EOA's address is chain-
    /// independent; only the signed `chain_id` field differs per chain).
    /// Wallet-key management beyond accepting this one key at startup
    /// (custody, rotation, HSMs) is out of scope.
    pub signer_private_key: String,
}

impl RelayerConfig {
    /// Loads configuration from `path` (TOML) layered with `RELAYER_`
    /// prefixed environment variables, then validates it.
    pub fn load(path: &str) -> Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("RELAYER").separator("__"))
            .build()?;
        let parsed: RelayerConfig = raw.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Fails fast (spec §7 item 7) on configuration that would otherwise
    /// only surface as a confusing runtime error deep in the submitter:
    /// adjustment factors out of their sane `[1, 5]` bound, chain ids that
    /// collide, and a `start_block` offset that can't resolve to a valid
    /// block against any possible head (a negative offset whose magnitude
    /// alone already overflows `i64`/`u64` arithmetic).
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(RelayerError::InvalidConfig(
                "no chains configured".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(RelayerError::InvalidConfig(format!(
                    "duplicate chain id {}",
                    chain.chain_id
                )));
            }
            if chain.start_block == Some(i64::MIN) {
                return Err(RelayerError::InvalidConfig(format!(
                    "chain {}: start_block {} cannot be resolved against any head without overflow",
                    chain.chain_id,
                    i64::MIN
                )));
            }
        }

        for (name, factor) in [
            (
                "submitter.max_priority_fee_adjustment_factor",
                self.submitter.max_priority_fee_adjustment_factor,
            ),
            (
                "submitter.gas_price_adjustment_factor",
                self.submitter.gas_price_adjustment_factor,
            ),
            (
                "submitter.priority_adjustment_factor",
                self.submitter.priority_adjustment_factor,
            ),
        ] {
            if !(1.0..=5.0).contains(&factor) {
                return Err(RelayerError::InvalidConfig(format!(
                    "{name} must be within [1, 5], got {factor}"
                )));
            }
        }

        Ok(())
    }

    pub fn chain_configs(&self) -> Vec<ChainConfig> {
        self.chains
            .iter()
            .map(|c| ChainConfig {
                chain_id: ChainId(c.chain_id),
                name: c.name.clone(),
                rpc_url: c.rpc_url.clone(),
                escrow_address: c.escrow_address,
                start_block: c.start_block,
                stopping_block: c.stopping_block,
                confirmations: c.confirmations,
                max_block_range: c.max_block_range,
                is_eip1559: c.is_eip1559,
            })
            .collect()
    }

    pub fn ambs_by_chain(&self) -> HashMap<ChainId, Vec<AmbConfig>> {
        self.chains
            .iter()
            .map(|c| (ChainId(c.chain_id), c.ambs.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_chain() -> ChainEntry {
        ChainEntry {
            chain_id: 1,
            name: "mainnet".into(),
            rpc_url: "http://localhost:8545".into(),
            escrow_address: Address::ZERO,
            start_block: None,
            stopping_block: None,
            confirmations: 1,
            max_block_range: 1000,
            is_eip1559: true,
            ambs: vec![],
        }
    }

    fn minimal_config() -> RelayerConfig {
        RelayerConfig {
            chains: vec![minimal_chain()],
            getter: GetterConfig::default(),
            evaluator: EvaluatorConfig::default(),
            submitter: SubmitterConfig::default(),
            admin: AdminConfig::default(),
            collector: CollectorConfig::default(),
            signer_private_key: "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
                .to_string(),
        }
    }

    #[test]
    fn validate_rejects_no_chains() {
        let mut config = minimal_config();
        config.chains.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_chain_ids() {
        let mut config = minimal_config();
        config.chains.push(minimal_chain());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_adjustment_factor_out_of_bounds() {
        let mut config = minimal_config();
        config.submitter.gas_price_adjustment_factor = 10.0;
        assert!(config.validate().is_err());

        config.submitter.gas_price_adjustment_factor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unresolvable_start_block_offset() {
        let mut config = minimal_config();
        config.chains[0].start_block = Some(i64::MIN);
        assert!(config.validate().is_err());
    }
}
