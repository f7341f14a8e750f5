use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{Error, Result};

const STDERR_TAIL_LIMIT: usize = 4096;

/// Resolves the muxer binary: `FFMPEG_PATH` if set, otherwise `ffmpeg` on
/// the OS search path.
fn muxer_path() -> String {
    std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string())
}

/// Runs the configured muxer to copy the TS at `input` into an MP4 at
/// `output` without re-encoding. A missing binary is reported as
/// [`Error::RemuxUnavailable`] so the caller can fall back to keeping the
/// TS; a non-zero exit is [`Error::RemuxFailed`] with a bounded stderr tail.
pub async fn remux_to_mp4(input: &Path, output: &Path) -> Result<()> {
    let binary = muxer_path();

    let mut command = Command::new(&binary);
    command
        .arg("-y")
        .arg("-i")
        .arg(input)
        .arg("-c")
        .arg("copy")
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    info!(binary, input = %input.display(), output = %output.display(), "invoking remux");

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(binary, "muxer binary not found, keeping source file");
            return Err(Error::RemuxUnavailable(format!("{binary} not found on PATH")));
        }
        Err(e) => return Err(Error::RemuxUnavailable(format!("failed to spawn {binary}: {e}"))),
    };

    let output_result = child
        .wait_with_output()
        .await
        .map_err(|e| Error::RemuxUnavailable(format!("failed to wait on {binary}: {e}")))?;

    if output_result.status.success() {
        info!("remux completed");
        return Ok(());
    }

    let stderr_tail = tail_bytes(&output_result.stderr, STDERR_TAIL_LIMIT);
    Err(Error::RemuxFailed { exit_code: output_result.status.code(), stderr_tail })
}

fn tail_bytes(bytes: &[u8], limit: usize) -> String {
    let start = bytes.len().saturating_sub(limit);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_bytes_keeps_only_the_last_chunk() {
        let data = vec![b'x'; STDERR_TAIL_LIMIT + 100];
        let tail = tail_bytes(&data, STDERR_TAIL_LIMIT);
        assert_eq!(tail.len(), STDERR_TAIL_LIMIT);
    }

    #[test]
    fn tail_bytes_passes_through_short_input() {
        let tail = tail_bytes(b"short error", STDERR_TAIL_LIMIT);
        assert_eq!(tail, "short error");
    }

    #[tokio::test]
    async fn missing_binary_reports_unavailable_not_fatal() {
        // SAFETY: test process is single-threaded for the duration of this
        // env mutation and nothing else reads FFMPEG_PATH concurrently.
        unsafe {
            std::env::set_var("FFMPEG_PATH", "hlsgrab-definitely-not-a-real-binary");
        }
        let result = remux_to_mp4(Path::new("in.ts"), Path::new("out.mp4")).await;
        unsafe {
            std::env::remove_var("FFMPEG_PATH");
        }
        assert!(matches!(result, Err(Error::RemuxUnavailable(_))));
    }
}
