use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::common::retry::{MAX_ATTEMPTS, backoff_delay, honors_retry_after, is_retryable_status};
use crate::common::types::HeaderMap;
use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around a pooled [`reqwest::Client`] implementing the job-wide
/// retry policy. Cheap to clone: `reqwest::Client` is internally
/// reference-counted, so every segment worker shares one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub const DEFAULT_USER_AGENT: &'static str = "Mozilla/5.0 (compatible; hlsgrab/0.1.0)";

    pub fn new() -> Result<Self> {
        let inner = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| Error::network("<client-build>", e))?;
        Ok(Self { inner })
    }

    fn build_request(
        &self,
        url: &str,
        headers: &HeaderMap,
        byte_range: Option<(u64, u64)>,
    ) -> reqwest::RequestBuilder {
        let mut req = self.inner.get(url);

        if !headers.contains_key("User-Agent") && !headers.contains_key("user-agent") {
            req = req.header("User-Agent", Self::DEFAULT_USER_AGENT);
        }
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some((length, offset)) = byte_range {
            let end = offset + length - 1;
            req = req.header("Range", format!("bytes={}-{}", offset, end));
        }
        req
    }

    /// GET `url` and return the decoded body as a `String`. Retries up to
    /// the shared attempt budget; fails with [`Error::Network`] /
    /// [`Error::HttpStatus`] once it is exhausted.
    pub async fn get_text(&self, url: &str, headers: &HeaderMap) -> Result<String> {
        let bytes = self.get_bytes(url, headers, None).await?;
        String::from_utf8(bytes).map_err(|e| Error::Parse(format!("{url} is not valid UTF-8: {e}")))
    }

    /// GET `url` (optionally with a byte range) and return the full body.
    /// Retries transient failures up to [`MAX_ATTEMPTS`] times total, with
    /// exponential backoff and jitter between attempts.
    pub async fn get_bytes(
        &self,
        url: &str,
        headers: &HeaderMap,
        byte_range: Option<(u64, u64)>,
    ) -> Result<Vec<u8>> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_err: Option<reqwest::Error> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let req = self.build_request(url, headers, byte_range);
            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await.map_err(|e| Error::network(url, e))?;
                        return Ok(bytes.to_vec());
                    }
                    if attempt == MAX_ATTEMPTS || !is_retryable_status(status.as_u16()) {
                        return Err(Error::HttpStatus {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    let retry_after = if honors_retry_after(status.as_u16()) {
                        resp.headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                    } else {
                        None
                    };
                    last_status = Some(status);
                    let delay = backoff_delay(attempt, retry_after);
                    warn!(url, status = status.as_u16(), attempt, ?delay, "retrying after status");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if attempt < MAX_ATTEMPTS && (e.is_timeout() || e.is_connect() || e.is_request()) => {
                    let delay = backoff_delay(attempt, None);
                    warn!(url, attempt, ?delay, "transient error, retrying: {e}");
                    last_err = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(Error::network(url, e)),
            }
        }

        // Only reachable if the loop exhausted on a retryable status.
        Err(last_err
            .map(|e| Error::network(url, e))
            .unwrap_or(Error::HttpStatus {
                url: url.to_string(),
                status: last_status.map(|s| s.as_u16()).unwrap_or(0),
            }))
    }

    /// Probes `url`'s `Content-Type` without downloading the full body, by
    /// requesting a single byte via `Range`. Used by `--mode auto` to
    /// disambiguate a URL that doesn't end in `.m3u8`. Servers that ignore
    /// the range hint and send the whole body are tolerated: the response is
    /// dropped unread once the header is inspected.
    pub async fn probe_content_type(&self, url: &str, headers: &HeaderMap) -> Result<String> {
        let req = self.build_request(url, headers, Some((1, 0)));
        let resp = req.send().await.map_err(|e| Error::network(url, e))?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        Ok(content_type)
    }

    /// Open a streaming response for `url`, resuming from `range_from` bytes
    /// when set. Used by the plain-HTTP file downloader, which drives its
    /// own retry loop restarting from the current file size.
    pub async fn get_stream(
        &self,
        url: &str,
        headers: &HeaderMap,
        range_from: Option<u64>,
    ) -> Result<reqwest::Response> {
        let mut req = self.inner.get(url);
        if !headers.contains_key("User-Agent") && !headers.contains_key("user-agent") {
            req = req.header("User-Agent", Self::DEFAULT_USER_AGENT);
        }
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(offset) = range_from {
            req = req.header("Range", format!("bytes={}-", offset));
        }
        let resp = req.send().await.map_err(|e| Error::network(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        debug!(url, status = status.as_u16(), "opened stream");
        Ok(resp)
    }
}
