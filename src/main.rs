// Copyright (c) 2026 contributors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};

use hlsgrab::common::cancel::CancelToken;
use hlsgrab::common::http::HttpClient;
use hlsgrab::common::types::HeaderMap;
use hlsgrab::error::{Error, Result};
use hlsgrab::hls::{self, KeyCache, Playlist, Preference, Resolution};
use hlsgrab::http_download;
use hlsgrab::remux;
use hlsgrab::writer::OutputWriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Auto,
    Http,
    Hls,
}

/// Build metadata embedded by `build.rs`, surfaced through `--version`.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_BRANCH"),
    "@",
    env!("GIT_COMMIT"),
    ")",
);

/// Concurrent HLS and plain-HTTP media downloader.
#[derive(Parser, Debug)]
#[command(name = "hlsgrab", version, long_version = LONG_VERSION, about)]
struct Cli {
    /// Playlist (`.m3u8`) or direct media URL to download.
    url: String,

    /// Output file path. Defaults to the URL's basename in `./downloads`.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Routing mode: `auto` inspects the URL suffix and, failing that, the
    /// response `Content-Type`.
    #[arg(long, value_enum, default_value = "auto")]
    mode: Mode,

    /// Preferred resolution as `WxH`, e.g. `1280x720`.
    #[arg(long = "res")]
    resolution: Option<String>,

    /// Preferred bandwidth in bits per second.
    #[arg(long = "bw")]
    bandwidth: Option<u64>,

    /// Number of concurrent segment fetches.
    #[arg(long = "conc", default_value_t = 4)]
    concurrency: usize,

    /// `User-Agent` header to send with every request.
    #[arg(long = "ua")]
    user_agent: Option<String>,

    /// `Referer` header to send with every request.
    #[arg(long = "ref")]
    referer: Option<String>,

    /// Raw `Cookie` header value to send with every request.
    #[arg(long)]
    cookies: Option<String>,

    /// Skip the remux step and keep the raw transport stream.
    #[arg(long)]
    no_remux: bool,

    /// Default log verbosity when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit progress and the final summary as newline-delimited JSON on
    /// stdout instead of human-readable text.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ua) = &self.user_agent {
            headers.insert("User-Agent".to_string(), ua.clone());
        }
        if let Some(referer) = &self.referer {
            headers.insert("Referer".to_string(), referer.clone());
        }
        if let Some(cookies) = &self.cookies {
            headers.insert("Cookie".to_string(), cookies.clone());
        }
        headers
    }

    fn preference(&self) -> Result<Preference> {
        let resolution = self
            .resolution
            .as_deref()
            .map(parse_resolution_flag)
            .transpose()?;
        Ok(Preference { resolution, bandwidth: self.bandwidth })
    }
}

/// A single progress update, serialized to one JSON line when `--json` is
/// set. Mirrors the scheduler's `(completed, total, bytes_written)` tuple.
#[derive(Serialize)]
struct ProgressEvent {
    completed: usize,
    total: usize,
    bytes_written: u64,
}

/// The final machine-readable result, printed once to stdout when `--json`
/// is set, in place of the human-readable summary lines.
#[derive(Serialize)]
struct JobSummary {
    ok: bool,
    output: String,
    bytes_written: u64,
    remuxed: bool,
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("failed to serialize JSON output: {e}"),
    }
}

fn parse_resolution_flag(value: &str) -> Result<Resolution> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| Error::Usage(format!("--res must be WxH, got {value:?}")))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| Error::Usage(format!("invalid width in --res {value:?}")))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| Error::Usage(format!("invalid height in --res {value:?}")))?;
    Ok(Resolution { width, height })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    hlsgrab::common::logger::init(&cli.log_level);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let headers = cli.headers();
    let preference = cli.preference()?;
    let client = HttpClient::new()?;
    let cancel = CancelToken::new();
    spawn_ctrlc_handler(cancel.clone());

    let mode = resolve_mode(cli.mode, &cli.url, &client, &headers).await?;

    match mode {
        Mode::Http => run_http(&client, &cli.url, &headers, cli.out.as_deref(), &cancel, cli.json).await,
        Mode::Hls => {
            run_hls(
                &client,
                &cli.url,
                &headers,
                preference,
                cli.concurrency,
                cli.out.as_deref(),
                cli.no_remux,
                &cancel,
                cli.json,
            )
            .await
        }
        Mode::Auto => unreachable!("resolve_mode never returns Auto"),
    }
}

/// Installs a `Ctrl-C` handler that fires `cancel` exactly once. The
/// scheduler and downloader thread `cancel` through every suspension point,
/// so this is the only place the process reacts to the signal.
fn spawn_ctrlc_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt, cancelling");
            cancel.cancel();
        }
    });
}

async fn resolve_mode(mode: Mode, url: &str, client: &HttpClient, headers: &HeaderMap) -> Result<Mode> {
    match mode {
        Mode::Http | Mode::Hls => Ok(mode),
        Mode::Auto => {
            if url.split(['?', '#']).next().unwrap_or(url).ends_with(".m3u8") {
                return Ok(Mode::Hls);
            }
            let content_type = client.probe_content_type(url, headers).await.unwrap_or_default();
            if content_type.contains("mpegurl") || content_type.contains("m3u8") {
                Ok(Mode::Hls)
            } else {
                Ok(Mode::Http)
            }
        }
    }
}

async fn run_http(
    client: &HttpClient,
    url: &str,
    headers: &HeaderMap,
    out: Option<&Path>,
    cancel: &CancelToken,
    json: bool,
) -> Result<i32> {
    let output = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(url, "bin"));
    ensure_parent_dir(&output).await?;

    info!(url, out = %output.display(), "starting plain HTTP download");
    let outcome = http_download::download_file(client, url, headers, &output, None, cancel).await?;
    info!(bytes = outcome.bytes_written, out = %output.display(), "download complete");

    if json {
        print_json(&JobSummary {
            ok: true,
            output: output.display().to_string(),
            bytes_written: outcome.bytes_written,
            remuxed: false,
        });
    } else {
        println!("saved {} bytes to {}", outcome.bytes_written, output.display());
    }
    Ok(0)
}

#[allow(clippy::too_many_arguments)]
async fn run_hls(
    client: &HttpClient,
    url: &str,
    headers: &HeaderMap,
    preference: Preference,
    concurrency: usize,
    out: Option<&Path>,
    no_remux: bool,
    cancel: &CancelToken,
    json: bool,
) -> Result<i32> {
    let media_url = resolve_media_playlist_url(client, url, headers, preference).await?;

    info!(media_url, "fetching media playlist");
    let text = client.get_text(&media_url, headers).await?;
    let playlist = hls::parser::parse_playlist(&text, &media_url)?;
    let media = match playlist {
        Playlist::Media(media) => media,
        Playlist::Master(_) => {
            return Err(Error::Parse(
                "variant playlist unexpectedly resolved to another master playlist".into(),
            ));
        }
    };

    if !media.end_list {
        warn!("playlist has no #EXT-X-ENDLIST; downloading the current snapshot only");
    }

    let ts_output = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(url, "ts"));
    ensure_parent_dir(&ts_output).await?;

    let keycache = KeyCache::new(client.clone());
    let mut writer = OutputWriter::create(&ts_output).await?;

    let progress: hlsgrab::common::types::ProgressCallback = Arc::new(move |completed, total, bytes| {
        use std::io::Write;
        if json {
            print_json(&ProgressEvent { completed, total, bytes_written: bytes });
        } else {
            print!("\rdownloading segment {completed}/{total} ({bytes} bytes written)");
            let _ = std::io::stdout().flush();
        }
    });

    info!(total = media.segments.len(), out = %ts_output.display(), concurrency, "starting HLS segment download");
    let result = hls::download_segments(
        client.clone(),
        keycache,
        media.segments,
        headers.clone(),
        concurrency,
        &mut writer,
        Some(progress),
        cancel.clone(),
    )
    .await;
    if !json {
        println!();
    }

    let outcome = result?;
    info!(
        completed = outcome.completed_segments,
        total = outcome.total_segments,
        bytes = outcome.bytes_written,
        "HLS download complete"
    );

    if no_remux {
        if json {
            print_json(&JobSummary {
                ok: true,
                output: ts_output.display().to_string(),
                bytes_written: outcome.bytes_written,
                remuxed: false,
            });
        } else {
            println!("saved transport stream to {}", ts_output.display());
        }
        return Ok(0);
    }

    let mp4_output = ts_output.with_extension("mp4");
    match remux::remux_to_mp4(&ts_output, &mp4_output).await {
        Ok(()) => {
            if json {
                print_json(&JobSummary {
                    ok: true,
                    output: mp4_output.display().to_string(),
                    bytes_written: outcome.bytes_written,
                    remuxed: true,
                });
            } else {
                println!("saved {}", mp4_output.display());
            }
            Ok(0)
        }
        Err(Error::RemuxUnavailable(reason)) => {
            warn!(reason, "remux unavailable, keeping transport stream");
            if json {
                print_json(&JobSummary {
                    ok: true,
                    output: ts_output.display().to_string(),
                    bytes_written: outcome.bytes_written,
                    remuxed: false,
                });
            } else {
                println!("remux unavailable ({reason}); kept {}", ts_output.display());
            }
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

/// Fetches `url`, and if it is a master playlist, resolves `preference` into
/// the chosen variant's URL. If it is already a media playlist, returns
/// `url` unchanged.
async fn resolve_media_playlist_url(
    client: &HttpClient,
    url: &str,
    headers: &HeaderMap,
    preference: Preference,
) -> Result<String> {
    info!(url, "fetching playlist");
    let text = client.get_text(url, headers).await?;
    match hls::parser::parse_playlist(&text, url)? {
        Playlist::Media(_) => Ok(url.to_string()),
        Playlist::Master(master) => {
            let chosen = hls::select_variant(&master, preference)?;
            info!(variant = chosen, "selected variant");
            Ok(chosen)
        }
    }
}

fn default_output_path(url: &str, extension: &str) -> PathBuf {
    let clean = url.split(['?', '#']).next().unwrap_or(url);
    let basename = clean.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("download");
    let stem = Path::new(basename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("download");
    PathBuf::from("downloads").join(format!("{stem}.{extension}"))
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wxh_resolution() {
        let r = parse_resolution_flag("1280x720").unwrap();
        assert_eq!(r, Resolution { width: 1280, height: 720 });
        assert!(parse_resolution_flag("bogus").is_err());
    }

    #[test]
    fn derives_default_output_from_url_basename() {
        let path = default_output_path("https://cdn.example.com/video/index.m3u8?token=abc", "ts");
        assert_eq!(path, PathBuf::from("downloads/index.ts"));

        let path = default_output_path("https://cdn.example.com/clip.mp4", "bin");
        assert_eq!(path, PathBuf::from("downloads/clip.bin"));
    }
}
