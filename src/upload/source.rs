//! Upload sources
//!
//! An [`UploadSource`] is the selected file handle passed explicitly into the
//! uploader. It is read by range, once for transmission and once more for the
//! checksum pass.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::ChunkRange;

/// Readable byte source of known size
#[async_trait]
pub trait UploadSource: Send + Sync {
    /// Total size in bytes
    fn size(&self) -> u64;

    /// File name sent with each chunk
    fn name(&self) -> &str;

    /// Read exactly `range.len()` bytes starting at `range.start`
    async fn read_range(&self, range: ChunkRange) -> io::Result<Bytes>;
}

/// Local file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    size: u64,
}

impl FileSource {
    /// Open a regular file and record its size
    pub async fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UploadSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn read_range(&self, range: ChunkRange) -> io::Result<Bytes> {
        let len = usize::try_from(range.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk too large"))?;

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(io::SeekFrom::Start(range.start)).await?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// In-memory buffer
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Bytes,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl UploadSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn read_range(&self, range: ChunkRange) -> io::Result<Bytes> {
        let start = usize::try_from(range.start).unwrap_or(usize::MAX);
        let end = usize::try_from(range.end).unwrap_or(usize::MAX);
        if start > end || end > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range {}..{} outside {} bytes", start, end, self.data.len()),
            ));
        }
        Ok(self.data.slice(start..end))
    }
}
