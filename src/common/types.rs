use std::collections::HashMap;
use std::sync::Arc;

/// User-supplied request headers, forwarded verbatim by the HTTP client.
pub type HeaderMap = HashMap<String, String>;

/// Invoked by the download scheduler after each committed write:
/// `(completed_segments, total_segments, bytes_written)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, u64) + Send + Sync>;
