//! Supervisor binary (spec §10.5): loads configuration, builds the shared
//! store, and spawns one task per (chain, role) worker — monitor, getter,
//! collector, submitter — plus the admin HTTP surface, all wired through
//! [`Store`] rather than to each other directly.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use alloy_network::Ethereum;
use alloy_provider::ProviderBuilder;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use incentive_relayer::chain::{ChainConfig, IdentityResolver};
use incentive_relayer::collectors::wormhole::{self, MessageSniffer};
use incentive_relayer::collectors::{self, Collector};
use incentive_relayer::config::RelayerConfig;
use incentive_relayer::contracts::layerzero::AlloyUlnVerifier;
use incentive_relayer::error::RelayerError;
use incentive_relayer::model::{BridgeKind, ChainId};
use incentive_relayer::pricing::DeliveryCostEstimate;
use incentive_relayer::providers::{AlloyProvider, HttpProofSource, LocalSigner, TokioClock};
use incentive_relayer::registry::{BridgeRegistry, PacketSequenceOf};
use incentive_relayer::store::Store;
use incentive_relayer::submitter::queue::{drain, Outcome};
use incentive_relayer::submitter::{confirm_one, stage_eval, stage_pending, submit_one};
use incentive_relayer::traits::{BlockchainProvider, Clock};
use incentive_relayer::wallet::NonceManager;
use incentive_relayer::{admin, getter, monitor};

/// Every chain's provider is boxed behind [`BlockchainProvider`] so this
/// binary never has to name Alloy's concrete, heavily-generic fill-stack
/// provider type — the same reason the teacher pack's own tests never
/// annotate what `ProviderBuilder::connect_http` returns either.
type DynProvider = dyn BlockchainProvider<Ethereum>;

#[tokio::main]
async fn main() -> incentive_relayer::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("RELAYER_CONFIG").unwrap_or_else(|_| "config".to_string());
    let config = RelayerConfig::load(&config_path)?;
    info!(path = %config_path, "configuration loaded");

    let store = Store::new();
    let clock = Arc::new(TokioClock::new());

    let chains = config.chain_configs();
    let ambs_by_chain = config.ambs_by_chain();

    let mut providers: HashMap<ChainId, Arc<DynProvider>> = HashMap::new();
    let mut signers: HashMap<ChainId, Arc<LocalSigner>> = HashMap::new();
    for chain in &chains {
        let url: url::Url = chain
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| RelayerError::InvalidUrl { reason: e.to_string() })?;
        let root = ProviderBuilder::new().connect_http(url);
        let provider: Arc<DynProvider> = Arc::new(AlloyProvider::new(root));
        providers.insert(chain.chain_id, provider);
        signers.insert(
            chain.chain_id,
            Arc::new(LocalSigner::from_private_key(&config.signer_private_key, chain.is_eip1559)?),
        );
    }

    let proof_source = Arc::new(HttpProofSource::new(
        config
            .collector
            .proof_source_base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:9000".to_string()),
    ));
    let registry = BridgeRegistry::new(proof_source);

    let mut tasks = JoinSet::new();

    // No configured chain in this deployment needs a rollup-specific L1
    // block reference yet, so every getter normalises block numbers through
    // the identity mapping (spec §4.8's default).
    let block_resolver: Arc<dyn incentive_relayer::chain::BlockNumberResolver> = Arc::new(IdentityResolver);

    for chain in &chains {
        tasks.spawn(monitor::run::<Ethereum, _, _>(
            chain.chain_id,
            providers[&chain.chain_id].clone(),
            clock.clone(),
            store.clone(),
            Duration::from_secs(config.getter.processing_interval_secs),
        ));
    }

    // Escrow events don't carry a destination chain, so every ordered pair
    // of configured chains gets its own getter instance scanning the source
    // side for bounties headed to that specific destination.
    for source in &chains {
        for destination in &chains {
            if source.chain_id == destination.chain_id {
                continue;
            }
            tasks.spawn(getter::run::<Ethereum, _, _>(
                source.clone(),
                destination.chain_id,
                providers[&source.chain_id].clone(),
                clock.clone(),
                store.clone(),
                Duration::from_secs(config.getter.processing_interval_secs),
                Duration::from_secs(config.getter.retry_interval_secs),
                block_resolver.clone(),
            ));
        }
    }

    // Polymer packet sequences are derived from the source-side SendPacket
    // event; decoding that event is per-bridge ABI detail out of scope here,
    // so every collector this binary spawns resolves it to a fixed 0 instead
    // of a real sequence number.
    let packet_sequence_of: PacketSequenceOf = Arc::new(|_msg| 0);

    for chain in &chains {
        let Some(ambs) = ambs_by_chain.get(&chain.chain_id) else {
            continue;
        };
        for amb in ambs {
            // The LayerZero collector verifies DVN confirmations against the
            // ULN deployed at this AMB entry's `bridge_address`, on this same
            // chain's provider; every other bridge kind ignores these two
            // arguments.
            let layerzero_verifier = Arc::new(AlloyUlnVerifier::new(
                providers[&chain.chain_id].clone(),
                amb.bridge_address,
            ));
            let layerzero_dst_eid = amb.layerzero_dst_eid.unwrap_or(chain.chain_id.0 as u32);

            // Wormhole's `bridge_address` names the core bridge contract this
            // AMB entry's messages are published through. The sniffer is
            // shared between the collector and its feeding recovery/forward
            // scan tasks spawned just below.
            let wormhole_sniffer = Arc::new(MessageSniffer::new());
            if amb.bridge == BridgeKind::Wormhole {
                tasks.spawn(wormhole::run_recovery::<Ethereum, _, _>(
                    chain.chain_id,
                    amb.bridge_address,
                    providers[&chain.chain_id].clone(),
                    clock.clone(),
                    store.clone(),
                    wormhole_sniffer.clone(),
                    config.collector.wormhole_recovery_blocks,
                    Duration::from_secs(config.getter.retry_interval_secs),
                ));
                tasks.spawn(wormhole::run_sniffer::<Ethereum, _, _>(
                    chain.chain_id,
                    amb.bridge_address,
                    providers[&chain.chain_id].clone(),
                    clock.clone(),
                    store.clone(),
                    wormhole_sniffer.clone(),
                    chain.confirmations,
                    chain.max_block_range,
                    Duration::from_secs(config.getter.processing_interval_secs),
                    Duration::from_secs(config.getter.retry_interval_secs),
                ));
            }

            let collector: Arc<dyn Collector> = registry.build(
                amb.bridge,
                packet_sequence_of.clone(),
                layerzero_verifier,
                layerzero_dst_eid,
                wormhole_sniffer,
            );
            tasks.spawn(collectors::run(
                chain.chain_id,
                collector,
                store.clone(),
                clock.clone(),
                Duration::from_secs(config.collector.poll_interval_secs),
            ));
        }
    }

    for chain in chains.clone() {
        let provider = providers[&chain.chain_id].clone();
        let signer = signers[&chain.chain_id].clone();
        let clock = clock.clone();
        let store = store.clone();
        let config = config.clone();
        tasks.spawn(submitter_loop(chain, provider, clock, signer, store, config));
    }

    let admin_app = admin::router(store.clone());
    let bind_address = config.admin.bind_address.clone();
    tasks.spawn(async move {
        let listener = match tokio::net::TcpListener::bind(bind_address.as_str()).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(%err, address = %bind_address, "failed to bind admin listener");
                return;
            }
        };
        info!(address = %bind_address, "admin surface listening");
        if let Err(err) = axum::serve(listener, admin_app).await {
            error!(%err, "admin surface stopped");
        }
    });

    while let Some(result) = tasks.join_next().await {
        if let Err(err) = result {
            error!(%err, "worker task panicked");
        }
    }

    Ok(())
}

/// Drives one chain's pending/eval/submit/confirm pipeline forever. Unlike
/// the monitor/getter/collector loops, which each own one [`Store`]
/// relationship, the submitter needs all four stages' in-memory queues kept
/// together in one task, since they hand items to each other directly
/// between passes rather than through the store.
async fn submitter_loop(
    chain: ChainConfig,
    provider: Arc<DynProvider>,
    clock: Arc<TokioClock>,
    signer: Arc<LocalSigner>,
    store: Store,
    config: RelayerConfig,
) {
    let nonce_manager = NonceManager::new();
    let mut first_seen = HashMap::new();
    let mut dispatched = HashSet::new();
    let mut eval_new = VecDeque::new();
    let mut eval_retry = VecDeque::new();
    let mut submit_new = VecDeque::new();
    let mut submit_retry = VecDeque::new();
    let max_eval_duration = Duration::from_secs(config.evaluator.max_evaluation_duration_secs);
    let chain_id = chain.chain_id;

    loop {
        // spec §4.6.1's admission formula: the pending queue only dispatches
        // as many items as there is room for downstream, in eval and submit
        // combined, under `maxPendingTransactions`.
        let in_flight = eval_new.len() + eval_retry.len() + submit_new.len() + submit_retry.len();
        let ready = {
            let _span = incentive_relayer::spans::submitter_stage("pending", chain_id).entered();
            stage_pending(&store, &config.submitter, &mut first_seen, &mut dispatched, in_flight, clock.now())
        };
        eval_new.extend(ready);

        let gas_price = provider.get_gas_price().await.unwrap_or(1_000_000_000);
        let accepted = {
            let _span = incentive_relayer::spans::submitter_stage("eval", chain_id).entered();
            stage_eval(
                &mut eval_new,
                &mut eval_retry,
                &store,
                |bounty| DeliveryCostEstimate {
                    gas_limit: bounty.max_gas_delivery,
                    max_fee_per_gas: gas_price,
                },
                config.evaluator.profitability_factor,
                max_eval_duration,
                clock.now(),
            )
        };
        submit_new.extend(accepted);

        // `maxPendingTransactions` already bounded how much entered the
        // pipeline back in `stage_pending`; the submit drain itself processes
        // whatever is queued rather than imposing a second, unrelated cap.
        let submit_batch_size = submit_new.len() + submit_retry.len();
        let submitted = drain(
            &mut submit_new,
            &mut submit_retry,
            submit_batch_size,
            |state| {
                let provider = provider.as_ref();
                let signer = signer.as_ref();
                let nonce_manager = &nonce_manager;
                let store = &store;
                let config = &config.submitter;
                let chain = &chain;
                async move {
                    let Some(proof) = store.get_proof(&state.identifier()) else {
                        return Outcome::Retry { item: state, retry: true };
                    };
                    submit_one::<Ethereum, _, _>(
                        chain,
                        chain.escrow_address,
                        provider,
                        signer,
                        nonce_manager,
                        &proof,
                        &state,
                        config,
                    )
                    .await
                }
            },
        )
        .await;

        for submitted in submitted {
            let provider = provider.clone();
            let clock = clock.clone();
            let store = store.clone();
            let timeout = Duration::from_secs(config.submitter.confirmation_timeout_secs);
            tokio::spawn(async move {
                if !confirm_one::<Ethereum, _, _>(provider.as_ref(), clock.as_ref(), submitted, &store, timeout).await
                {
                    warn!(%chain_id, "delivery transaction did not confirm in time");
                }
            });
        }

        clock.sleep(Duration::from_secs(config.getter.processing_interval_secs)).await;
    }
}
