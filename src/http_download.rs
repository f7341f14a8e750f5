use std::path::Path;

use tracing::{info, warn};

use crate::common::cancel::CancelToken;
use crate::common::http::HttpClient;
use crate::common::retry::{MAX_ATTEMPTS, backoff_delay};
use crate::common::types::{HeaderMap, ProgressCallback};
use crate::error::{Error, Result};
use crate::writer::OutputWriter;

/// Upper bound on a single write to the output file; larger responses are
/// split across multiple writes as they stream in.
const MAX_CHUNK_BYTES: usize = 1024 * 1024;

pub struct HttpDownloadOutcome {
    pub bytes_written: u64,
}

/// Streams a single non-playlist URL to `output`, resuming a prior partial
/// download when the server advertises range support. Retries transient
/// failures by restarting the chunk loop from the file's current size
/// rather than from scratch.
pub async fn download_file(
    client: &HttpClient,
    url: &str,
    headers: &HeaderMap,
    output: &Path,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> Result<HttpDownloadOutcome> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let existing_size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        let range_from = if existing_size > 0 { Some(existing_size) } else { None };

        let response = match client.get_stream(url, headers, range_from).await {
            Ok(resp) => resp,
            Err(e) if attempt < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt, None);
                warn!(url, attempt, ?delay, "download stream open failed, retrying: {e}");
                tokio::time::sleep(delay).await;
                continue;
            }
            Err(e) => return Err(e),
        };

        let resumed = range_from.is_some() && response.status().as_u16() == 206;
        let mut writer = if resumed {
            info!(url, offset = existing_size, "resuming partial download");
            OutputWriter::append_at(output, existing_size).await?
        } else {
            OutputWriter::create(output).await?
        };

        match stream_to_writer(response, &mut writer, progress.as_ref(), cancel).await {
            Ok(()) => {
                writer.flush().await?;
                return Ok(HttpDownloadOutcome { bytes_written: writer.bytes_written() });
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) if attempt < MAX_ATTEMPTS => {
                writer.flush().await.ok();
                let delay = backoff_delay(attempt, None);
                warn!(url, attempt, ?delay, "download interrupted, retrying: {e}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn stream_to_writer(
    mut response: reqwest::Response,
    writer: &mut OutputWriter,
    progress: Option<&ProgressCallback>,
    cancel: &CancelToken,
) -> Result<()> {
    loop {
        let next = tokio::select! {
            chunk = response.chunk() => chunk.map_err(|e| Error::network(response.url().as_str(), e))?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };

        let Some(bytes) = next else {
            return Ok(());
        };

        for piece in bytes.chunks(MAX_CHUNK_BYTES) {
            writer.write(piece).await?;
        }
        if let Some(cb) = progress {
            cb(0, 0, writer.bytes_written());
        }
    }
}
