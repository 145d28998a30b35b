use std::future::Future;

use futures::future::join_all;

/// Run `fetch` over `inputs` in consecutive groups of at most `batch_size`.
///
/// Every operation of a group is started before any is awaited, and the next
/// group only starts once the whole current group has finished. `open` is
/// called once per group to produce the resource (typically an HTTP client)
/// shared by that group's operations; it is dropped when the group completes.
///
/// Output position `i` always holds the result for input position `i`.
/// Operations are expected to report their own failures in `R`, so a failing
/// operation never cuts a group short.
pub async fn run_batched<T, C, R, Fut>(
    inputs: Vec<T>,
    batch_size: usize,
    mut open: impl FnMut() -> C,
    fetch: impl Fn(C, T) -> Fut,
) -> Vec<R>
where
    C: Clone,
    Fut: Future<Output = R>,
{
    let batch_size = batch_size.max(1);
    let total = inputs.len();
    let mut results = Vec::with_capacity(total);
    let mut remaining = inputs.into_iter();

    loop {
        let chunk: Vec<T> = remaining.by_ref().take(batch_size).collect();
        if chunk.is_empty() {
            break;
        }
        tracing::debug!(
            "Fetching batch of {} ({} of {} done)",
            chunk.len(),
            results.len(),
            total
        );
        let shared = open();
        let futures: Vec<_> = chunk
            .into_iter()
            .map(|item| fetch(shared.clone(), item))
            .collect();
        results.extend(join_all(futures).await);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    async fn tracked(gauge: Arc<Gauge>, value: usize) -> usize {
        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.peak.fetch_max(now, Ordering::SeqCst);
        // Later inputs finish first so ordering cannot come from completion order.
        tokio::time::sleep(Duration::from_millis(((10 - value % 10) * 3) as u64)).await;
        gauge.current.fetch_sub(1, Ordering::SeqCst);
        value * 10
    }

    #[tokio::test]
    async fn test_preserves_input_order_across_batches() {
        let gauge = Arc::new(Gauge::default());
        let inputs: Vec<usize> = (0..12).collect();
        let results = run_batched(inputs, 5, || gauge.clone(), tracked).await;
        assert_eq!(results, (0..12).map(|v| v * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_batch_size() {
        let gauge = Arc::new(Gauge::default());
        let results = run_batched((0..13).collect(), 4, || gauge.clone(), tracked).await;
        assert_eq!(results.len(), 13);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_opens_one_resource_per_batch() {
        let opened = AtomicUsize::new(0);
        let results = run_batched(
            (0..11).collect::<Vec<u32>>(),
            5,
            || opened.fetch_add(1, Ordering::SeqCst),
            |batch, item| async move { (batch, item) },
        )
        .await;
        assert_eq!(opened.load(Ordering::SeqCst), 3);
        assert_eq!(results[4], (0, 4));
        assert_eq!(results[5], (1, 5));
        assert_eq!(results[10], (2, 10));
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let results: Vec<Result<u32, String>> = run_batched(
            vec![1u32, 2, 3, 4, 5, 6],
            2,
            || (),
            |_, item| async move {
                if item % 3 == 0 {
                    Err(format!("item {} failed", item))
                } else {
                    Ok(item)
                }
            },
        )
        .await;
        assert_eq!(results.len(), 6);
        assert_eq!(results[2], Err("item 3 failed".to_string()));
        assert_eq!(results[3], Ok(4));
        assert_eq!(results[5], Err("item 6 failed".to_string()));
    }

    #[tokio::test]
    async fn test_empty_input_and_zero_batch_size() {
        let empty: Vec<u8> = run_batched(Vec::<u8>::new(), 5, || (), |_, v| async move { v }).await;
        assert!(empty.is_empty());

        let results = run_batched(vec![1u8, 2, 3], 0, || (), |_, v| async move { v + 1 }).await;
        assert_eq!(results, vec![2, 3, 4]);
    }
}
