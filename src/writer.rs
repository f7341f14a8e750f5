use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::Result;

/// Append-only sink for decoded media bytes. The target file is truncated
/// on creation and writes land strictly in the order they are handed in;
/// callers (the download scheduler, the plain-HTTP downloader) are
/// responsible for ordering what they pass to [`OutputWriter::write`].
pub struct OutputWriter {
    inner: BufWriter<File>,
    bytes_written: u64,
}

impl OutputWriter {
    /// Opens `path` for writing, truncating any existing contents.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).await?;
        Ok(Self { inner: BufWriter::new(file), bytes_written: 0 })
    }

    /// Opens `path` for appending past `offset` bytes, used by the
    /// plain-HTTP downloader's resume path.
    pub async fn append_at(path: &Path, offset: u64) -> Result<Self> {
        use tokio::io::AsyncSeekExt;

        let mut file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(offset).await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        Ok(Self { inner: BufWriter::new(file), bytes_written: offset })
    }

    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).await?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hlsgrab-writer-test-{}-{}", std::process::id(), name));
        path
    }

    #[tokio::test]
    async fn writes_are_appended_in_call_order() {
        let path = temp_path("order");
        {
            let mut writer = OutputWriter::create(&path).await.unwrap();
            writer.write(b"abc").await.unwrap();
            writer.write(b"def").await.unwrap();
            writer.flush().await.unwrap();
            assert_eq!(writer.bytes_written(), 6);
        }
        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"abcdef");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn create_truncates_existing_contents() {
        let path = temp_path("truncate");
        tokio::fs::write(&path, b"stale-data-that-should-vanish").await.unwrap();
        {
            let mut writer = OutputWriter::create(&path).await.unwrap();
            writer.write(b"fresh").await.unwrap();
            writer.flush().await.unwrap();
        }
        let contents = tokio::fs::read(&path).await.unwrap();
        assert_eq!(contents, b"fresh");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
