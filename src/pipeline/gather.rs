//! Fan-out/gather combinators.
//!
//! The pipeline has two levels of concurrency with opposite failure rules:
//!
//! * inside one image the three ensemble calls are all-or-nothing
//!   ([`gather_all`]): the judge needs every transcription;
//! * across images every outcome is kept ([`gather_settled`]): one bad
//!   photo must not cost the rest of the batch.
//!
//! Both run their futures on the caller's task; nothing is spawned.

use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run all futures concurrently; fail fast on the first error.
///
/// Outputs are returned in input order regardless of completion order.
/// Remaining futures are dropped once one fails.
pub async fn gather_all<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(futures).await
}

/// Run all futures to completion and collect every output in input order.
///
/// `limit` caps how many run at once; `None` starts them all together.
pub async fn gather_settled<I, F, T>(futures: I, limit: Option<usize>) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    let futures: Vec<F> = futures.into_iter().collect();
    let limit = limit.unwrap_or(futures.len()).max(1);
    stream::iter(futures).buffered(limit).collect().await
}
