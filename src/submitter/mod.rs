//! The submitter pipeline (spec §4.6): four stages — pending, eval, submit,
//! confirm — each an instance of [`queue`]'s processing-queue abstraction,
//! connected by the shared [`Store`] rather than direct calls between
//! stages.
//!
//! - **Pending**: claimed bounties with a ready proof, waiting
//!   `new_orders_delay` before their first submission attempt.
//! - **Eval**: profitability gate (see [`crate::pricing`]); rejected items
//!   are re-evaluated on `evaluation_retry_interval` until
//!   `max_evaluation_duration` elapses, at which point they're dropped.
//! - **Submit**: builds, signs, and broadcasts the delivery transaction,
//!   pricing it via [`crate::wallet::quote_fee`] and escalating the
//!   adjustment factor on each retry (stall recovery).
//! - **Confirm**: waits for a receipt up to `confirmation_timeout`; no
//!   receipt in time re-enters submit with a higher fee, a revert that
//!   decodes as "already relayed" is a terminal success (someone else
//!   delivered it first), anything else retries up to `max_tries`.

pub mod queue;

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use alloy_network::Network;
use alloy_primitives::{Address, TxHash};
use tracing::{info, instrument, warn, Instrument};

use crate::chain::ChainConfig;
use crate::config::SubmitterConfig;
use crate::contracts::escrow::{Escrow, EscrowCalldata};
use crate::error::RelayerError;
use crate::model::{AMBProof, Bounty, BountyStatus, MessageIdentifier};
use crate::pricing::{self, DeliveryCostEstimate};
use crate::spans;
use crate::store::Store;
use crate::traits::{BlockchainProvider, Clock, Signer};
use crate::wallet::{self, FeeBounds, FeeQuote, NonceManager};

use self::queue::Outcome;
#[cfg(test)]
use self::queue::drain;

/// Per-message submission bookkeeping carried across retries: how many
/// attempts have been made and what fee adjustment to use next (escalates
/// each retry, per spec §4.6's stall-recovery state machine).
#[derive(Debug, Clone)]
pub(crate) struct SubmissionState {
    identifier: MessageIdentifier,
    attempts: u32,
    adjustment_factor: f64,
    first_seen: Instant,
}

impl SubmissionState {
    /// The message this state tracks, so a driver wiring `stage_pending`
    /// through to `submit_one` can look up its proof without reaching into
    /// the struct's otherwise-private fields.
    pub fn identifier(&self) -> MessageIdentifier {
        self.identifier
    }
}

/// Result of a successful `submit` stage attempt, carried into `confirm`.
pub(crate) struct Submitted {
    identifier: MessageIdentifier,
    tx_hash: TxHash,
    attempts: u32,
}

/// Finds claimed bounties with a ready proof that have cleared
/// `new_orders_delay_secs` since first observed, and hands them to `eval` as
/// fresh [`SubmissionState`]s. `first_seen` tracks when each identifier was
/// first noticed so the delay is measured once, not reset on every pass.
/// Priority items (spec §4.6.1) skip the delay entirely. Admission is capped
/// by `capacity = max_pending_transactions - |eval| - |submit|` so the
/// pending queue never over-dispatches into a saturated pipeline; items held
/// back by capacity stay undispatched and are reconsidered next pass.
#[instrument(skip(store, first_seen))]
pub fn stage_pending(
    store: &Store,
    config: &SubmitterConfig,
    first_seen: &mut HashMap<MessageIdentifier, Instant>,
    dispatched: &mut HashSet<MessageIdentifier>,
    in_flight: usize,
    now: Instant,
) -> Vec<SubmissionState> {
    let delay = Duration::from_secs(config.new_orders_delay_secs);
    let mut capacity = config.max_pending_transactions.saturating_sub(in_flight);
    let mut ready = Vec::new();

    for bounty in store.all_bounties() {
        if capacity == 0 {
            break;
        }
        if bounty.status != BountyStatus::Claimed || dispatched.contains(&bounty.identifier) {
            continue;
        }
        if store.get_proof(&bounty.identifier).is_none() {
            continue;
        }

        let priority = store.is_priority(&bounty.identifier);
        let seen_at = *first_seen.entry(bounty.identifier).or_insert(now);
        if !priority && now.duration_since(seen_at) < delay {
            continue;
        }

        dispatched.insert(bounty.identifier);
        capacity -= 1;
        ready.push(SubmissionState {
            identifier: bounty.identifier,
            attempts: 0,
            adjustment_factor: 1.0,
            first_seen: seen_at,
        });
    }

    ready
}

/// Drives one pass of the eval stage: bounties ready to be priced. Items
/// failing profitability are retried until `max_evaluation_duration_secs`
/// has elapsed since they were first seen, then dropped — a bounty that
/// never becomes profitable should not retry forever.
#[instrument(skip(store, cost_of))]
pub fn stage_eval(
    new_items: &mut VecDeque<SubmissionState>,
    retry_items: &mut VecDeque<SubmissionState>,
    store: &Store,
    cost_of: impl Fn(&Bounty) -> DeliveryCostEstimate,
    evaluator_profitability_factor: f64,
    max_evaluation_duration: Duration,
    now: Instant,
) -> Vec<SubmissionState> {
    let mut accepted = Vec::new();
    let mut pending_new = VecDeque::new();
    let mut pending_retry = VecDeque::new();
    std::mem::swap(new_items, &mut pending_new);
    std::mem::swap(retry_items, &mut pending_retry);

    for mut state in pending_new.into_iter().chain(pending_retry) {
        let Some(bounty) = store.get_bounty(&state.identifier) else {
            continue;
        };
        let priority = store.is_priority(&state.identifier);
        let cost = cost_of(&bounty);
        if pricing::is_profitable(&bounty, &cost, evaluator_profitability_factor, priority) {
            accepted.push(state);
            continue;
        }

        if now.duration_since(state.first_seen) >= max_evaluation_duration {
            warn!(identifier = %state.identifier, "dropping bounty, never became profitable");
            continue;
        }

        state.attempts += 1;
        retry_items.push_back(state);
    }

    accepted
}

/// Builds, signs, and broadcasts the delivery transaction for one proof.
/// Escalates the fee adjustment factor by `priority_adjustment_factor`
/// (capped by the configured absolute ceilings) on each retry.
#[instrument(skip(provider, signer, nonce_manager, proof))]
pub async fn submit_one<N, P, S>(
    chain: &ChainConfig,
    escrow_address: Address,
    provider: &P,
    signer: &S,
    nonce_manager: &NonceManager,
    proof: &AMBProof,
    state: &SubmissionState,
    config: &SubmitterConfig,
) -> Outcome<SubmissionState, Submitted>
where
    N: Network,
    P: BlockchainProvider<N>,
    S: Signer,
{
    let span = spans::submit_delivery(&state.identifier, state.attempts + 1);

    let adjustment = state.adjustment_factor;
    let fee = match wallet::quote_fee::<N, _>(
        provider,
        chain.is_eip1559,
        adjustment,
        FeeBounds {
            max_allowed_priority_fee_per_gas: config.max_allowed_priority_fee_per_gas,
            max_allowed_gas_price: config.max_allowed_gas_price,
        },
    )
    .await
    {
        Ok(fee) => fee,
        Err(err) => return retry_or_drop(state.clone(), err, config.max_tries),
    };

    let nonce = match nonce_manager.next::<N, _>(provider, signer.address()).await {
        Ok(nonce) => nonce,
        Err(err) => return retry_or_drop(state.clone(), err, config.max_tries),
    };

    let calldata = Escrow::deliver_message_calldata(
        proof.identifier.message_id,
        &proof.message.payload,
        proof_bytes(proof),
    );

    let (max_fee_per_gas, max_priority_fee_per_gas) = match fee {
        FeeQuote::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => (max_fee_per_gas, max_priority_fee_per_gas),
        FeeQuote::Legacy { gas_price } => (gas_price, 0),
    };

    let signed = match signer
        .sign_transaction(
            chain.chain_id.0,
            escrow_address,
            nonce,
            wallet::buffered_gas_limit(300_000),
            max_fee_per_gas,
            max_priority_fee_per_gas,
            alloy_primitives::U256::ZERO,
            calldata,
        )
        .instrument(span.clone())
        .await
    {
        Ok(signed) => signed,
        Err(err) => return retry_or_drop(state.clone(), err, config.max_tries),
    };

    match provider.send_raw_transaction(&signed).instrument(span).await {
        Ok(tx_hash) => {
            info!(%tx_hash, attempts = state.attempts + 1, "delivery transaction submitted");
            Outcome::Success(Submitted {
                identifier: state.identifier,
                tx_hash,
                attempts: state.attempts + 1,
            })
        }
        Err(err) if err.is_already_relayed() => {
            info!("message already relayed by a competing party");
            Outcome::Skip
        }
        Err(err) => retry_or_drop(state.clone(), err, config.max_tries),
    }
}

fn proof_bytes(proof: &AMBProof) -> &[u8] {
    match &proof.aux {
        crate::model::ProofAux::Mock => &[],
        crate::model::ProofAux::Polymer { proof, .. } => proof,
        crate::model::ProofAux::Wormhole { vaa } => vaa,
        crate::model::ProofAux::LayerZero { .. } => &[],
    }
}

fn retry_or_drop(
    mut state: SubmissionState,
    err: RelayerError,
    max_tries: u32,
) -> Outcome<SubmissionState, Submitted> {
    state.attempts += 1;
    state.adjustment_factor = (state.adjustment_factor * 1.1).min(5.0);
    warn!(error = %err, attempts = state.attempts, "submission attempt failed");

    let retry = err.is_transient() && state.attempts < max_tries;
    Outcome::Retry { item: state, retry }
}

/// Waits for a submitted transaction's receipt, bounded by
/// `confirmation_timeout_secs`. A receipt found marks the bounty
/// `Delivered` in the store; a timeout resubmits through `submit` again
/// (stall recovery) up to `max_tries`.
#[instrument(skip(provider, clock))]
pub async fn confirm_one<N, P, C>(
    provider: &P,
    clock: &C,
    submitted: Submitted,
    store: &Store,
    confirmation_timeout: Duration,
) -> bool
where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    let deadline = clock.now() + confirmation_timeout;

    while clock.now() < deadline {
        match provider.get_transaction_receipt(submitted.tx_hash).await {
            Ok(Some(_receipt)) => {
                store.index_tx_hash(submitted.tx_hash, submitted.identifier);
                if let Some(mut bounty) = store.get_bounty(&submitted.identifier) {
                    bounty.status = BountyStatus::Delivered;
                    store.merge_bounty(bounty);
                }
                return true;
            }
            Ok(None) => clock.sleep(Duration::from_secs(5)).await,
            Err(err) => {
                warn!(error = %err, "receipt lookup failed, retrying");
                clock.sleep(Duration::from_secs(5)).await;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BridgeKind, ChainId};
    use alloy_primitives::{FixedBytes, U256};

    fn new_state(id: MessageIdentifier) -> SubmissionState {
        SubmissionState {
            identifier: id,
            attempts: 0,
            adjustment_factor: 1.0,
            first_seen: Instant::now(),
        }
    }

    fn bounty(identifier: MessageIdentifier, fee: u64) -> Bounty {
        Bounty {
            identifier,
            status: BountyStatus::Claimed,
            bridge: BridgeKind::Mock,
            priority_fee: U256::from(fee),
            gas_limit: 200_000,
            max_gas_delivery: 200_000,
            source_tx_hash: TxHash::from([1u8; 32]),
            claimer: None,
        }
    }

    fn identifier() -> MessageIdentifier {
        MessageIdentifier {
            source_chain: ChainId(1),
            destination_chain: ChainId(10),
            message_id: FixedBytes::from([4u8; 32]),
        }
    }

    #[test]
    fn stage_pending_waits_out_new_orders_delay() {
        let store = Store::new();
        let mut claimed = bounty(identifier(), 10);
        claimed.status = BountyStatus::Claimed;
        store.merge_bounty(claimed);
        store.put_proof(AMBProof {
            identifier: identifier(),
            message: crate::model::AMBMessage {
                identifier: identifier(),
                bridge: BridgeKind::Mock,
                payload: vec![],
                block_number: 1,
                block_hash: FixedBytes::from([0u8; 32]),
                transaction_hash: TxHash::from([0u8; 32]),
                l1_block_number: 1,
            },
            aux: crate::model::ProofAux::Mock,
        });

        let mut config = SubmitterConfig::default();
        config.new_orders_delay_secs = 60;
        let mut first_seen = HashMap::new();
        let mut dispatched = HashSet::new();
        let t0 = Instant::now();

        assert!(stage_pending(&store, &config, &mut first_seen, &mut dispatched, 0, t0).is_empty());

        let later = t0 + Duration::from_secs(61);
        let ready = stage_pending(&store, &config, &mut first_seen, &mut dispatched, 0, later);
        assert_eq!(ready.len(), 1);

        // Already dispatched; must not be handed out again.
        assert!(stage_pending(&store, &config, &mut first_seen, &mut dispatched, 0, later).is_empty());
    }

    #[test]
    fn stage_pending_skips_bounty_without_proof() {
        let store = Store::new();
        let mut claimed = bounty(identifier(), 10);
        claimed.status = BountyStatus::Claimed;
        store.merge_bounty(claimed);

        let config = SubmitterConfig::default();
        let mut first_seen = HashMap::new();
        let mut dispatched = HashSet::new();

        let ready = stage_pending(
            &store,
            &config,
            &mut first_seen,
            &mut dispatched,
            0,
            Instant::now() + Duration::from_secs(3600),
        );
        assert!(ready.is_empty());
    }

    #[test]
    fn stage_pending_skips_new_orders_delay_for_priority_items() {
        let store = Store::new();
        let mut claimed = bounty(identifier(), 10);
        claimed.status = BountyStatus::Claimed;
        store.merge_bounty(claimed);
        store.put_proof(AMBProof {
            identifier: identifier(),
            message: crate::model::AMBMessage {
                identifier: identifier(),
                bridge: BridgeKind::Mock,
                payload: vec![],
                block_number: 1,
                block_hash: FixedBytes::from([0u8; 32]),
                transaction_hash: TxHash::from([0u8; 32]),
                l1_block_number: 1,
            },
            aux: crate::model::ProofAux::Mock,
        });
        store.set_priority(identifier(), true);

        let mut config = SubmitterConfig::default();
        config.new_orders_delay_secs = 3600;
        let mut first_seen = HashMap::new();
        let mut dispatched = HashSet::new();

        let ready = stage_pending(&store, &config, &mut first_seen, &mut dispatched, 0, Instant::now());
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn stage_pending_respects_remaining_capacity() {
        let store = Store::new();
        let mut claimed = bounty(identifier(), 10);
        claimed.status = BountyStatus::Claimed;
        store.merge_bounty(claimed);
        store.put_proof(AMBProof {
            identifier: identifier(),
            message: crate::model::AMBMessage {
                identifier: identifier(),
                bridge: BridgeKind::Mock,
                payload: vec![],
                block_number: 1,
                block_hash: FixedBytes::from([0u8; 32]),
                transaction_hash: TxHash::from([0u8; 32]),
                l1_block_number: 1,
            },
            aux: crate::model::ProofAux::Mock,
        });

        let config = SubmitterConfig::default();
        let mut first_seen = HashMap::new();
        let mut dispatched = HashSet::new();

        // in_flight already equals max_pending_transactions: no capacity left.
        let ready = stage_pending(
            &store,
            &config,
            &mut first_seen,
            &mut dispatched,
            config.max_pending_transactions,
            Instant::now(),
        );
        assert!(ready.is_empty());
    }

    #[test]
    fn stage_eval_accepts_profitable_bounty() {
        let store = Store::new();
        store.merge_bounty(bounty(identifier(), 1_000_000));

        let mut new_items = VecDeque::from([new_state(identifier())]);
        let mut retry_items = VecDeque::new();

        let accepted = stage_eval(
            &mut new_items,
            &mut retry_items,
            &store,
            |_| DeliveryCostEstimate {
                gas_limit: 100_000,
                max_fee_per_gas: 1,
            },
            1.0,
            Duration::from_secs(3600),
            Instant::now(),
        );

        assert_eq!(accepted.len(), 1);
        assert!(retry_items.is_empty());
    }

    #[test]
    fn stage_eval_retries_unprofitable_bounty() {
        let store = Store::new();
        store.merge_bounty(bounty(identifier(), 1));

        let mut new_items = VecDeque::from([new_state(identifier())]);
        let mut retry_items = VecDeque::new();

        let accepted = stage_eval(
            &mut new_items,
            &mut retry_items,
            &store,
            |_| DeliveryCostEstimate {
                gas_limit: 100_000,
                max_fee_per_gas: 1_000,
            },
            1.0,
            Duration::from_secs(3600),
            Instant::now(),
        );

        assert!(accepted.is_empty());
        assert_eq!(retry_items.len(), 1);
    }

    #[tokio::test]
    async fn drain_wraps_submit_one_and_advances_to_confirm() {
        use crate::testing::{FakeBlockchainProvider, FakeSigner};
        use alloy_network::Ethereum;

        let provider = FakeBlockchainProvider::new();
        provider.set_next_tx_hash(TxHash::from([2u8; 32]));
        let signer = FakeSigner::new(Address::ZERO);
        let nonce_manager = NonceManager::new();
        let chain = ChainConfig {
            chain_id: ChainId(1),
            name: "test".into(),
            rpc_url: "http://localhost".into(),
            escrow_address: Address::ZERO,
            start_block: None,
            stopping_block: None,
            confirmations: 1,
            max_block_range: 1000,
            is_eip1559: true,
        };
        let config = SubmitterConfig::default();
        let proof = AMBProof {
            identifier: identifier(),
            message: crate::model::AMBMessage {
                identifier: identifier(),
                bridge: BridgeKind::Mock,
                payload: vec![1, 2, 3],
                block_number: 1,
                block_hash: FixedBytes::from([0u8; 32]),
                transaction_hash: TxHash::from([0u8; 32]),
                l1_block_number: 1,
            },
            aux: crate::model::ProofAux::Mock,
        };

        let mut new_items = VecDeque::from([new_state(identifier())]);
        let mut retry_items = VecDeque::new();

        let results: Vec<Submitted> = drain(&mut new_items, &mut retry_items, 1, |state| {
            let provider = &provider;
            let signer = &signer;
            let nonce_manager = &nonce_manager;
            let proof = &proof;
            let chain = &chain;
            let config = &config;
            async move {
                submit_one::<Ethereum, _, _>(
                    chain,
                    chain.escrow_address,
                    provider,
                    signer,
                    nonce_manager,
                    proof,
                    &state,
                    config,
                )
                .await
            }
        })
        .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tx_hash, TxHash::from([2u8; 32]));
    }
}
