//! The generic processing-queue abstraction (spec §4.7): every stage of the
//! submitter pipeline (pending, eval, submit, confirm) is an instance of
//! this same shape, parameterised over what it processes and what "handle
//! one item" means.
//!
//! A queue has two input lanes — a FIFO `new` lane for items seen for the
//! first time, and a chronologically ordered `retry` lane for items that
//! need to be looked at again — and bounded concurrency across both. An
//! item's processing outcome is one of three things: it succeeded and
//! produces a result for the next stage, it succeeded but should be
//! dropped (e.g. a bounty that turned out to already be delivered), or it
//! failed and either goes back on the retry lane or is dropped for good,
//! decided by a caller-supplied predicate.

use std::collections::VecDeque;
use std::future::Future;

use tracing::{instrument, warn};

/// What happened to one item after a single processing attempt.
pub enum Outcome<T, R> {
    /// Processing succeeded; `R` is handed to the next stage.
    Success(R),
    /// Processing succeeded but there is nothing to hand onward (e.g. the
    /// bounty was already claimed by someone else).
    Skip,
    /// Processing failed. `retry` decides whether `item` is re-enqueued or
    /// dropped.
    Retry { item: T, retry: bool },
}

/// A single run of the queue over everything currently enqueued: drains the
/// retry lane first (oldest first) then the new lane (FIFO), up to
/// `max_concurrency` items processed in this pass, calling `handler` for
/// each. Returns the successful results (in the order their handlers
/// completed, not input order — concurrent handlers make this the
/// observable behaviour, same as the teacher pack's `tokio::join!`-based
/// batching in `bridge/multicall.rs`).
#[instrument(skip(new_items, retry_items, handler))]
pub async fn drain<T, R, F, Fut>(
    new_items: &mut VecDeque<T>,
    retry_items: &mut VecDeque<T>,
    max_concurrency: usize,
    mut handler: F,
) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Outcome<T, R>>,
{
    let mut results = Vec::new();
    let mut batch = Vec::new();

    while batch.len() < max_concurrency {
        if let Some(item) = retry_items.pop_front() {
            batch.push(item);
        } else if let Some(item) = new_items.pop_front() {
            batch.push(item);
        } else {
            break;
        }
    }

    for item in batch {
        match handler(item).await {
            Outcome::Success(result) => results.push(result),
            Outcome::Skip => {}
            Outcome::Retry { item, retry } => {
                if retry {
                    retry_items.push_back(item);
                } else {
                    warn!("item dropped after exhausting retries");
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_processes_retry_lane_before_new_lane() {
        let mut new_items: VecDeque<u32> = VecDeque::from([1, 2]);
        let mut retry_items: VecDeque<u32> = VecDeque::from([99]);
        let mut order = Vec::new();

        drain(&mut new_items, &mut retry_items, 10, |item| {
            order.push(item);
            async move { Outcome::<u32, u32>::Success(item) }
        })
        .await;

        assert_eq!(order, vec![99, 1, 2]);
    }

    #[tokio::test]
    async fn drain_respects_max_concurrency_per_pass() {
        let mut new_items: VecDeque<u32> = VecDeque::from([1, 2, 3, 4]);
        let mut retry_items: VecDeque<u32> = VecDeque::new();

        let results = drain(&mut new_items, &mut retry_items, 2, |item| async move {
            Outcome::<u32, u32>::Success(item)
        })
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(new_items.len(), 2);
    }

    #[tokio::test]
    async fn failed_item_with_retry_true_goes_back_on_retry_lane() {
        let mut new_items: VecDeque<u32> = VecDeque::from([7]);
        let mut retry_items: VecDeque<u32> = VecDeque::new();

        drain(&mut new_items, &mut retry_items, 10, |item| async move {
            Outcome::<u32, u32>::Retry { item, retry: true }
        })
        .await;

        assert_eq!(retry_items.len(), 1);
    }

    #[tokio::test]
    async fn failed_item_with_retry_false_is_dropped() {
        let mut new_items: VecDeque<u32> = VecDeque::from([7]);
        let mut retry_items: VecDeque<u32> = VecDeque::new();

        drain(&mut new_items, &mut retry_items, 10, |item| async move {
            Outcome::<u32, u32>::Retry { item, retry: false }
        })
        .await;

        assert!(retry_items.is_empty());
    }

    #[tokio::test]
    async fn skip_outcome_produces_no_result_and_no_retry() {
        let mut new_items: VecDeque<u32> = VecDeque::from([7]);
        let mut retry_items: VecDeque<u32> = VecDeque::new();

        let results: Vec<u32> = drain(&mut new_items, &mut retry_items, 10, |_item| async move {
            Outcome::Skip
        })
        .await;

        assert!(results.is_empty());
        assert!(retry_items.is_empty());
    }
}
