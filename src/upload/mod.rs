//! Upload module
//!
//! Resumable chunked uploads: the source is sent in bounded byte ranges, the
//! server tracks progress under an opaque `upload_id`, and a completion request
//! carrying a whole-file MD5 closes the session.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

pub mod checksum;
pub mod chunked;
pub mod progress;
pub mod source;

pub use chunked::{ChunkedUploader, UploadOptions};
pub use progress::{percent_done, ProgressFn};
pub use source::{FileSource, MemorySource, UploadSource};

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to read source: {0}")]
    Read(#[source] std::io::Error),

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Chunk rejected with status {status}: {body}")]
    ChunkRejected { status: u16, body: String },

    #[error("Completion rejected with status {status}: {body}")]
    CompletionRejected { status: u16, body: String },

    #[error("Malformed JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Source is empty")]
    EmptySource,

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("Server offset stuck at {offset} after {attempts} responses")]
    Stalled { offset: u64, attempts: u32 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Server view of an in-progress upload, returned after every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: String,
    /// Next byte the server expects
    pub offset: u64,
    #[serde(default)]
    pub expires: Option<String>,
}

impl UploadSession {
    /// Parse `expires` as an RFC 3339 timestamp
    pub fn expires_at(&self) -> Option<DateTime<FixedOffset>> {
        self.expires
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }
}

/// Half-open byte range `[start, end)` of a source of `total` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ChunkRange {
    /// The range beginning at `offset`, capped at `chunk_size` bytes and at `total`
    pub fn starting_at(offset: u64, chunk_size: u64, total: u64) -> Self {
        let start = offset.min(total);
        Self {
            start,
            end: start.saturating_add(chunk_size).min(total),
            total,
        }
    }

    /// Consecutive ranges covering `[0, total)`
    pub fn split(total: u64, chunk_size: u64) -> impl Iterator<Item = ChunkRange> {
        let step = chunk_size.max(1);
        (0..total)
            .step_by(usize::try_from(step).unwrap_or(usize::MAX))
            .map(move |start| ChunkRange::starting_at(start, step, total))
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `Content-Range` header value, e.g. `bytes 0-104857599/262144000`
    pub fn content_range(&self) -> String {
        format!(
            "bytes {}-{}/{}",
            self.start,
            self.end.saturating_sub(1),
            self.total
        )
    }
}

/// Caller-supplied fields sent with the completion request.
///
/// `upload_id` and `md5` are injected when the form is sent and replace any
/// caller values under those names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionForm {
    fields: Vec<(String, String)>,
}

impl CompletionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Final field list with `upload_id` and `md5` appended
    pub fn finalize(&self, upload_id: &str, md5: &str) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self
            .fields
            .iter()
            .filter(|(name, _)| name != "upload_id" && name != "md5")
            .cloned()
            .collect();
        fields.push(("upload_id".to_string(), upload_id.to_string()));
        fields.push(("md5".to_string(), md5.to_string()));
        fields
    }

    pub(crate) fn into_multipart(self, upload_id: &str, md5: &str) -> reqwest::multipart::Form {
        self.finalize(upload_id, md5)
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name, value)
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CompletionForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_content_range_scenario_250_mib() {
        let total = 250 * MIB;
        let ranges: Vec<String> = ChunkRange::split(total, 100 * MIB)
            .map(|r| r.content_range())
            .collect();

        assert_eq!(
            ranges,
            vec![
                "bytes 0-104857599/262144000",
                "bytes 104857600-209715199/262144000",
                "bytes 209715200-262143999/262144000",
            ]
        );
    }

    #[test]
    fn test_split_count_is_ceil() {
        assert_eq!(ChunkRange::split(10, 3).count(), 4);
        assert_eq!(ChunkRange::split(9, 3).count(), 3);
        assert_eq!(ChunkRange::split(1, 100).count(), 1);
        assert_eq!(ChunkRange::split(0, 100).count(), 0);
    }

    #[test]
    fn test_starting_at_clamps_to_total() {
        let range = ChunkRange::starting_at(95, 10, 100);
        assert_eq!((range.start, range.end), (95, 100));
        assert_eq!(range.len(), 5);
        assert!(!range.is_empty());
        assert_eq!(range.content_range(), "bytes 95-99/100");

        let past_end = ChunkRange::starting_at(120, 10, 100);
        assert_eq!((past_end.start, past_end.end), (100, 100));
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_completion_form_injects_fields() {
        let form = CompletionForm::new()
            .field("name", "GSE1234")
            .field("md5", "caller-value");
        assert_eq!(form.fields().len(), 2);

        assert_eq!(
            form.finalize("abc", "0123"),
            vec![
                ("name".to_string(), "GSE1234".to_string()),
                ("upload_id".to_string(), "abc".to_string()),
                ("md5".to_string(), "0123".to_string()),
            ]
        );
    }

    #[test]
    fn test_session_expires_at() {
        let session: UploadSession = serde_json::from_str(
            r#"{"upload_id": "u1", "offset": 10, "expires": "2026-10-18T12:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(session.offset, 10);
        assert!(session.expires_at().is_some());

        let bare: UploadSession =
            serde_json::from_str(r#"{"upload_id": "u1", "offset": 0}"#).unwrap();
        assert!(bare.expires_at().is_none());
    }
}
