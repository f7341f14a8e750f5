use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};

use crate::common::cancel::CancelToken;
use crate::common::http::HttpClient;
use crate::common::types::{HeaderMap, ProgressCallback};
use crate::error::{Error, Result};
use crate::writer::OutputWriter;

use super::fetcher::fetch_segment;
use super::keycache::KeyCache;
use super::types::Segment;

/// Concurrency is clamped to this range regardless of what the caller asks
/// for, regardless of what the caller asks.
pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 32;

pub struct SchedulerOutcome {
    pub completed_segments: usize,
    pub total_segments: usize,
    pub bytes_written: u64,
}

/// Drives up to `concurrency` concurrent [`fetch_segment`] workers over
/// `segments`, writing plaintext to `writer` in strict index order
/// regardless of completion order, and returns once every segment is
/// written, a fatal error occurs, or `cancel` fires.
///
/// A worker's semaphore permit is held past fetch completion, through the
/// channel send, and is only dropped once the writer actually commits that
/// segment's bytes. This keeps the reorder window — completed-but-unwritten
/// buffers sitting in `pending` — bounded by `concurrency`: a lagging
/// `next_write` throttles new fetches via the semaphore instead of letting
/// `pending` grow without bound.
pub async fn download_segments(
    client: HttpClient,
    keycache: KeyCache,
    segments: Vec<Segment>,
    headers: HeaderMap,
    concurrency: usize,
    writer: &mut OutputWriter,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
) -> Result<SchedulerOutcome> {
    let concurrency = concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
    let total = segments.len();

    if total == 0 {
        return Ok(SchedulerOutcome { completed_segments: 0, total_segments: 0, bytes_written: 0 });
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    type WorkerMsg = (usize, Result<Vec<u8>>, OwnedSemaphorePermit);
    let (tx, mut rx) = mpsc::channel::<WorkerMsg>(concurrency);
    let headers = Arc::new(headers);

    for segment in segments {
        let semaphore = semaphore.clone();
        let client = client.clone();
        let keycache = keycache.clone();
        let headers = headers.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(permit) = semaphore.acquire_owned().await else {
                return;
            };
            let index = segment.index;
            if cancel.is_cancelled() {
                let _ = tx.send((index, Err(Error::Cancelled), permit)).await;
                return;
            }
            let result = tokio::select! {
                r = fetch_segment(&client, &keycache, &segment, &headers) => r,
                _ = cancel.cancelled() => Err(Error::Cancelled),
            };
            let _ = tx.send((index, result, permit)).await;
        });
    }
    drop(tx);

    let mut pending: HashMap<usize, (Vec<u8>, OwnedSemaphorePermit)> = HashMap::new();
    let mut next_write = 0usize;
    let mut completed = 0usize;
    let mut bytes_written = 0u64;
    let mut first_error: Option<Error> = None;

    while let Some((index, result, permit)) = rx.recv().await {
        match result {
            Ok(bytes) => {
                pending.insert(index, (bytes, permit));
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                    cancel.cancel();
                }
                drop(permit);
                continue;
            }
        }

        while let Some((bytes, permit)) = pending.remove(&next_write) {
            writer.write(&bytes).await?;
            bytes_written += bytes.len() as u64;
            next_write += 1;
            completed += 1;
            drop(permit);
            if let Some(cb) = &progress {
                cb(completed, total, bytes_written);
            }
        }
    }

    let flush_result = writer.flush().await;

    if let Some(e) = first_error {
        return Err(e);
    }
    flush_result?;

    Ok(SchedulerOutcome { completed_segments: completed, total_segments: total, bytes_written })
}
