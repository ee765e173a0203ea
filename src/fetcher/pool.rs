//! Bounded-concurrency metadata fetching.
//!
//! Distinct URLs fan out over a semaphore-limited task set, each with the
//! client's own timeout, and results land in a write-once map keyed by
//! URL. There is exactly one slot per URL, so the join point needs no
//! locking discipline beyond the map insert.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::fetcher::{
    client::fetch_page,
    errors::FetchError,
    metadata::{PageMetadata, extract_metadata},
};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Fetch metadata for every distinct URL, at most `concurrency` requests
/// in flight. A slow host costs one timeout, never the batch; the result
/// map records the per-URL outcome either way.
#[instrument(skip_all, fields(urls = urls.len(), concurrency))]
pub async fn fetch_all(
    urls: &[Url],
    concurrency: usize,
) -> HashMap<Url, Result<PageMetadata, FetchError>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut seen = HashSet::new();

    for url in urls {
        if !seen.insert(url.clone()) {
            continue;
        }
        let url = url.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (url, Err(FetchError::Unknown("fetch pool closed".into()))),
            };
            debug!(%url, "fetching page metadata");
            let result = fetch_page(&url).await.map(|doc| extract_metadata(&doc.body));
            if let Err(err) = &result {
                warn!(%url, error = %err, "metadata fetch failed");
            }
            (url, result)
        });
    }

    let mut results = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((url, result)) => {
                results.insert(url, result);
            }
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            // Aborted during cancellation; the whole map is discarded.
            Err(_) => {}
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_url_list() {
        let results = fetch_all(&[], DEFAULT_CONCURRENCY).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_urls_fetch_once() {
        // Unroutable port; both entries collapse to a single errored slot.
        let url = Url::parse("http://127.0.0.1:1/x").unwrap();
        let results = fetch_all(&[url.clone(), url.clone()], 2).await;
        assert_eq!(results.len(), 1);
        assert!(results.get(&url).unwrap().is_err());
    }
}
