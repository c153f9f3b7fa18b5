//! Grouped concurrent fetching.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;

/// Grouping and pacing for [`batch_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Items fetched concurrently per group. `0` is treated as `1`.
    pub batch_size: usize,
    /// Pause between consecutive groups.
    pub batch_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(250),
        }
    }
}

/// Fetches every item in groups of `batch_size`, pausing between groups.
///
/// Each group runs concurrently on the current task. Failed items are logged
/// at `debug` and left out of the returned map.
pub async fn batch_fetch<T, R, F, Fut>(
    items: &[T],
    options: BatchOptions,
    fetch: F,
) -> HashMap<T, R>
where
    T: Clone + Eq + Hash + fmt::Debug,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let mut results = HashMap::with_capacity(items.len());
    let mut groups = items.chunks(options.batch_size.max(1)).peekable();

    while let Some(group) = groups.next() {
        let outcomes = join_all(group.iter().map(|item| {
            let fut = fetch(item.clone());
            async move { (item, fut.await) }
        }))
        .await;

        for (item, outcome) in outcomes {
            match outcome {
                Ok(value) => {
                    results.insert(item.clone(), value);
                }
                Err(e) => {
                    tracing::debug!(?item, error = %e, "batch item failed");
                }
            }
        }

        if groups.peek().is_some() && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    results
}
