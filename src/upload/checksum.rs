//! Whole-file MD5 for upload completion
//!
//! The digest is folded incrementally over a second pass through the source,
//! so it reflects the original bytes regardless of what was retransmitted.

use md5::{Digest, Md5};
use std::io;
use std::time::Instant;

use super::source::UploadSource;
use super::ChunkRange;
use crate::metrics;

/// Stream `source` in `chunk_size` pieces and return the lowercase hex MD5
#[tracing::instrument(
    name = "upload.checksum",
    skip(source),
    fields(upload.name = %source.name(), upload.bytes = source.size()),
    err
)]
pub async fn md5_hex(source: &dyn UploadSource, chunk_size: u64) -> io::Result<String> {
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chunk size must be greater than zero",
        ));
    }

    let started = Instant::now();
    let mut hasher = Md5::new();
    for range in ChunkRange::split(source.size(), chunk_size) {
        let data = source.read_range(range).await?;
        hasher.update(&data);
    }
    let digest = hex::encode(hasher.finalize());

    metrics::record_checksum_duration(started.elapsed().as_secs_f64());
    tracing::debug!(md5 = %digest, "Checksum computed");

    Ok(digest)
}

/// MD5 of an in-memory buffer
pub fn md5_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::MemorySource;

    #[test]
    fn test_md5_bytes_known_vectors() {
        assert_eq!(md5_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_bytes(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn test_md5_independent_of_chunk_size() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let expected = md5_bytes(&data);
        let source = MemorySource::new("data.bin", data);

        for chunk_size in [1, 7, 512, 4096, 9_999, 10_000, 1 << 20] {
            assert_eq!(md5_hex(&source, chunk_size).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_md5_rejects_zero_chunk_size() {
        let source = MemorySource::new("data.bin", &b"abc"[..]);
        assert!(md5_hex(&source, 0).await.is_err());
    }
}
