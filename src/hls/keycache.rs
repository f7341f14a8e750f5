use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::common::http::HttpClient;
use crate::common::types::HeaderMap;
use crate::error::{Error, Result};

/// Maps key URIs to fetched 16-byte key material, shared across segment
/// workers. Concurrent misses for the same URI coalesce onto a single
/// underlying fetch via a per-key [`OnceCell`] — no single mutex
/// serializes unrelated keys.
#[derive(Clone)]
pub struct KeyCache {
    client: HttpClient,
    entries: Arc<DashMap<String, Arc<OnceCell<[u8; 16]>>>>,
}

impl KeyCache {
    pub fn new(client: HttpClient) -> Self {
        Self { client, entries: Arc::new(DashMap::new()) }
    }

    /// Returns the 16-byte key for `key_uri`, fetching it at most once for
    /// the lifetime of this cache.
    pub async fn get(&self, key_uri: &str, headers: &HeaderMap) -> Result<[u8; 16]> {
        let cell = self
            .entries
            .entry(key_uri.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_try_init(|| async {
            let bytes = self.client.get_bytes(key_uri, headers, None).await?;
            if bytes.len() != 16 {
                return Err(Error::Key {
                    key_uri: key_uri.to_string(),
                    message: format!("expected 16-byte key, got {} bytes", bytes.len()),
                });
            }
            let mut key = [0u8; 16];
            key.copy_from_slice(&bytes);
            Ok(key)
        })
        .await
        .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn coalesces_concurrent_misses_for_the_same_uri() {
        // This exercises single-flight coalescing logic directly against the
        // OnceCell primitive, without a real HTTP server: many concurrent
        // initializers racing on the same cell must run the init closure
        // exactly once.
        let hits = Arc::new(AtomicUsize::new(0));
        let cell: Arc<OnceCell<u32>> = Arc::new(OnceCell::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let hits = hits.clone();
            let cell = cell.clone();
            handles.push(tokio::spawn(async move {
                *cell
                    .get_or_try_init(|| async {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Error>(7u32)
                    })
                    .await
                    .unwrap()
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), 7);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
