//! Chain Monitor (spec §4.1): tracks the observed head block per chain and
//! broadcasts updates to subscribers at a configured cadence. The head is
//! allowed to lag the true tip but must never go backwards within one
//! monitor's lifetime; an RPC failure just means the next tick retries,
//! never that the last known head is discarded.

use std::sync::Arc;
use std::time::Duration;

use alloy_network::Network;
use tracing::{instrument, warn};

use crate::model::ChainId;
use crate::store::keys;
use crate::store::{Store, StoreEvent};
use crate::traits::{BlockchainProvider, Clock};

/// A tick of the monitor, published on `keys::head_channel(chain)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    pub chain: ChainId,
    pub block_number: u64,
}

/// Runs the monitor loop for one chain until the process shuts down. Each
/// tick fetches the current block number and, if it has advanced, publishes
/// a [`MonitorStatus`]; a query failure is logged and simply retried on the
/// next tick, never escalated — the spec explicitly allows staleness here.
#[instrument(skip(provider, clock, store))]
pub async fn run<N, P, C>(
    chain: ChainId,
    provider: Arc<P>,
    clock: Arc<C>,
    store: Store,
    poll_interval: Duration,
) where
    N: Network,
    P: BlockchainProvider<N>,
    C: Clock,
{
    let mut last_head: Option<u64> = None;

    loop {
        match provider.get_block_number().await {
            Ok(head) => {
                let advanced = match last_head {
                    Some(last) => head > last,
                    None => true,
                };
                if advanced {
                    last_head = Some(head);
                    store.publish_monitor(chain, head);
                }
            }
            Err(err) => {
                warn!(%chain, error = %err, "monitor: block number query failed, retaining last head");
            }
        }

        clock.sleep(poll_interval).await;
    }
}

impl Store {
    /// Publishes a [`MonitorStatus`] on this chain's head-update channel.
    /// Lives here rather than in `store::mod` since `MonitorStatus` is a
    /// monitor-owned type; the store only needs to know how to carry it.
    pub fn publish_monitor(&self, chain: ChainId, block_number: u64) {
        self.publish_raw(
            &keys::head_channel(chain),
            StoreEvent::HeadUpdated(MonitorStatus { chain, block_number }),
        );
    }

    /// Subscribes to head updates for one chain.
    pub fn subscribe_head(&self, chain: ChainId) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.subscribe(&keys::head_channel(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBlockchainProvider, FakeClock};

    #[tokio::test]
    async fn monitor_publishes_on_head_advance_and_skips_on_failure() {
        use alloy_network::Ethereum;

        let provider = Arc::new(FakeBlockchainProvider::new());
        provider.set_block_number(10);
        let clock = Arc::new(FakeClock::new());
        let store = Store::new();
        let mut rx = store.subscribe_head(ChainId(1));

        let provider_clone = provider.clone();
        let clock_clone = clock.clone();
        let store_clone = store.clone();
        let handle = tokio::spawn(async move {
            run::<Ethereum, _, _>(
                ChainId(1),
                provider_clone,
                clock_clone,
                store_clone,
                Duration::from_millis(1),
            )
            .await;
        });

        let event = rx.recv().await.unwrap();
        match event {
            StoreEvent::HeadUpdated(status) => {
                assert_eq!(status.chain, ChainId(1));
                assert_eq!(status.block_number, 10);
            }
            _ => panic!("expected head update"),
        }

        handle.abort();
    }
}
