//! One outstanding subprocess/blocking-I/O task per unit of work,
//! capped at a configurable concurrency (§5: "reasonable default:
//! number of cores"). `loadOrder` and other order-dependent structures
//! are never built here; callers collect results back into a map keyed
//! by whatever the work item's caller-supplied identity was.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::CoreError;

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Runs `f` over every item in `items`, each on a blocking-pool thread,
/// with at most `cap` outstanding at once. Preserves input order in the
/// returned vec regardless of completion order.
pub async fn parallel_map<T, R, F>(items: Vec<T>, cap: usize, f: F) -> Result<Vec<R>, CoreError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, CoreError> + Send + Sync + 'static,
{
    let len = items.len();
    let f = Arc::new(f);
    let semaphore = Arc::new(Semaphore::new(cap.max(1)));
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let f = f.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let result = tokio::task::spawn_blocking(move || f(item))
                .await
                .expect("blocking task never panics under normal operation");
            (index, result)
        });
    }

    let mut slots: Vec<Option<R>> = (0..len).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (index, result) = joined.expect("task join never fails; spawn_blocking panics are surfaced above");
        slots[index] = Some(result?);
    }
    Ok(slots.into_iter().map(|slot| slot.expect("every index was populated by exactly one task")).collect())
}
