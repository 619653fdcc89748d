//! Bounded concurrent chunking of document batches.
//!
//! Chunking is CPU-bound, so each document runs on the blocking pool; a
//! semaphore caps how many run at once.

use crate::chunker::Chunker;
use crate::error::{ChunkerError, Result};
use crate::types::{Chunk, Document};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const MAX_CHUNK_CONCURRENCY: usize = 32;
const CONCURRENCY_ENV: &str = "STRUCTURED_CHUNKER_CONCURRENCY";

fn default_chunk_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_chunk_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CHUNK_CONCURRENCY)
}

/// Concurrency limit for [`Chunker::chunk_documents`]
#[must_use]
pub fn chunk_concurrency_from_env() -> usize {
    let raw = std::env::var(CONCURRENCY_ENV).ok();
    parse_chunk_concurrency(raw.as_deref(), default_chunk_concurrency())
}

impl Chunker {
    /// Chunk documents concurrently. Results are in input order, one per
    /// document; a failing document does not affect the others.
    pub async fn chunk_documents(&self, documents: Vec<Document>) -> Vec<Result<Vec<Chunk>>> {
        self.chunk_documents_with_limit(documents, chunk_concurrency_from_env())
            .await
    }

    /// Like [`Chunker::chunk_documents`] with an explicit concurrency limit
    pub async fn chunk_documents_with_limit(
        &self,
        documents: Vec<Document>,
        limit: usize,
    ) -> Vec<Result<Vec<Chunk>>> {
        log::debug!("chunking {} documents", documents.len());
        let chunker = self.clone();
        run_bounded(documents, limit, move |document: Document| {
            chunker.chunk_document(&document)
        })
        .await
    }
}

/// Run `work` on the blocking pool for every item, at most `limit` at a time.
///
/// Tasks live in a [`JoinSet`], so dropping the returned future aborts every
/// item that has not started yet. Results are in input order.
async fn run_bounded<T, R, F>(items: Vec<T>, limit: usize, work: F) -> Vec<Result<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R> + Send + Sync + 'static,
{
    let limit = limit.clamp(1, MAX_CHUNK_CONCURRENCY);
    let semaphore = Arc::new(Semaphore::new(limit));
    let work = Arc::new(work);
    let count = items.len();

    let mut tasks = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(permit) => tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    (*work)(item)
                })
                .await
                .unwrap_or_else(|err| {
                    Err(ChunkerError::worker(format!("chunking task failed: {err}")))
                }),
                Err(err) => Err(ChunkerError::worker(err.to_string())),
            };
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<R>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(err) => log::warn!("chunking task did not finish: {err}"),
        }
    }
    results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(ChunkerError::worker("chunking task did not finish")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn parse_chunk_concurrency_defaults_and_clamps() {
        assert_eq!(parse_chunk_concurrency(None, 4), 4);
        assert_eq!(parse_chunk_concurrency(Some(""), 4), 4);
        assert_eq!(parse_chunk_concurrency(Some("  "), 4), 4);
        assert_eq!(parse_chunk_concurrency(Some("nope"), 4), 4);
        assert_eq!(parse_chunk_concurrency(Some("2"), 4), 2);
        assert_eq!(parse_chunk_concurrency(Some("0"), 4), 1);
        assert_eq!(
            parse_chunk_concurrency(Some("999"), 4),
            MAX_CHUNK_CONCURRENCY
        );
    }

    #[tokio::test]
    async fn batch_results_keep_input_order() {
        let chunker = Chunker::default();
        let documents: Vec<_> = (0..12)
            .map(|i| {
                Document::new(format!("# Doc {i}\n\nBody of document {i}."))
                    .with_metadata("doc_id", i.to_string())
            })
            .collect();

        let results = chunker.chunk_documents_with_limit(documents, 3).await;
        assert_eq!(results.len(), 12);
        for (i, result) in results.into_iter().enumerate() {
            let chunks = result.unwrap();
            assert_eq!(chunks[0].metadata.source["doc_id"], i.to_string());
            assert_eq!(chunks[0].metadata.section_title, Some(format!("Doc {i}")));
        }
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let chunker = Chunker::default();
        let documents = vec![
            Document::new("fine"),
            Document::new("bad\0bytes"),
            Document::new(""),
        ];

        let results = chunker.chunk_documents(documents).await;
        assert_eq!(results[0].as_ref().map(Vec::len).ok(), Some(1));
        assert!(matches!(results[1], Err(ChunkerError::Decode { offset: 3, .. })));
        assert!(results[2].as_ref().is_ok_and(Vec::is_empty));
    }

    #[tokio::test]
    async fn dropping_the_batch_stops_queued_work() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let batch = run_bounded((0..8).collect::<Vec<usize>>(), 1, move |item| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            Ok(item)
        });

        let outcome = tokio::time::timeout(Duration::from_millis(10), batch).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(started.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn run_bounded_keeps_order_under_contention() {
        let results = run_bounded((0..20).collect::<Vec<u64>>(), 4, |item| {
            std::thread::sleep(Duration::from_millis(20 - item));
            Ok(item * 2)
        })
        .await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..20).map(|i| i * 2).collect::<Vec<_>>());
    }
}
