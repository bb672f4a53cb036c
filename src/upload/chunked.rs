//! Resumable chunked uploader
//!
//! Drives the chunk protocol against the platform:
//!
//! 1. POST `[offset, offset + chunk_size)` as multipart `file_obj` with a
//!    `Content-Range` header (and `upload_id` after the first response).
//! 2. Continue from whatever `offset` the server reports, including a smaller
//!    one when it wants bytes resent.
//! 3. Once the offset reaches the source size, compute the MD5 in a second
//!    pass and POST the completion form exactly once.
//!
//! Only one chunk is in flight at a time and nothing is retried: the first
//! error ends the upload and the completion endpoint is never called.
//!
//! # Example
//!
//! ```no_run
//! use omics_uploadr::api::ApiClient;
//! use omics_uploadr::config::Config;
//! use omics_uploadr::upload::{ChunkedUploader, CompletionForm, FileSource, UploadOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let client = ApiClient::new(&config.api)?;
//! let uploader = ChunkedUploader::new(client, UploadOptions::from(&config.upload))?;
//!
//! let source = FileSource::open("expression.csv").await?;
//! let form = CompletionForm::new().field("name", "TCGA BRCA mRNA");
//! let progress = |pct: u8| println!("{}%", pct);
//! let record: serde_json::Value = uploader.upload_file(&source, form, Some(&progress)).await?;
//! println!("{}", record);
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Instant;
use url::Url;

use super::progress::{percent_done, ProgressFn};
use super::source::{FileSource, UploadSource};
use super::{checksum, ChunkRange, CompletionForm, UploadError, UploadSession};
use crate::api::{ApiClient, ApiError};
use crate::config::UploadConfig;
use crate::metrics;

/// Endpoints and sizing for chunked uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub chunk_url: String,
    pub complete_url: String,
    pub chunk_size: u64,
    /// Consecutive responses repeating the previous offset before the upload
    /// fails with [`UploadError::Stalled`]
    pub max_stalled_chunks: u32,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for UploadOptions {
    fn from(config: &UploadConfig) -> Self {
        Self {
            chunk_url: config.chunk_url.clone(),
            complete_url: config.complete_url.clone(),
            chunk_size: config.chunk_size,
            max_stalled_chunks: config.max_stalled_chunks,
        }
    }
}

/// Uploads sources through the chunk and completion endpoints
#[derive(Debug, Clone)]
pub struct ChunkedUploader {
    client: ApiClient,
    options: UploadOptions,
}

impl ChunkedUploader {
    /// Create a new uploader
    pub fn new(client: ApiClient, options: UploadOptions) -> Result<Self, UploadError> {
        if options.chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Open `path` and upload it
    pub async fn upload_path<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
        form: CompletionForm,
        on_chunk_upload: Option<&ProgressFn>,
    ) -> Result<T, UploadError> {
        let source = FileSource::open(path).await.map_err(UploadError::Read)?;
        self.upload_file(&source, form, on_chunk_upload).await
    }

    /// Upload `source` and return the parsed completion response
    #[tracing::instrument(
        name = "upload.chunked",
        skip_all,
        fields(
            upload.name = %source.name(),
            upload.bytes = source.size(),
            upload.chunk_size = self.options.chunk_size,
            upload_id = tracing::field::Empty
        ),
        err
    )]
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        source: &dyn UploadSource,
        form: CompletionForm,
        on_chunk_upload: Option<&ProgressFn>,
    ) -> Result<T, UploadError> {
        let started = Instant::now();
        let result = self.run(source, form, on_chunk_upload).await;

        metrics::record_upload_duration(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => metrics::record_upload_success(source.size()),
            Err(e) => {
                metrics::record_upload_failure();
                metrics::record_error(error_kind(e));
            }
        }

        result
    }

    async fn run<T: DeserializeOwned>(
        &self,
        source: &dyn UploadSource,
        form: CompletionForm,
        on_chunk_upload: Option<&ProgressFn>,
    ) -> Result<T, UploadError> {
        let total = source.size();
        if total == 0 {
            return Err(UploadError::EmptySource);
        }

        let chunk_url = self.client.resolve(&self.options.chunk_url)?;
        let complete_url = self.client.resolve(&self.options.complete_url)?;

        let mut upload_id: Option<String> = None;
        let mut offset = 0u64;
        let mut stalled = 0u32;

        let upload_id = loop {
            let range = ChunkRange::starting_at(offset, self.options.chunk_size, total);
            let data = source.read_range(range).await.map_err(UploadError::Read)?;

            let session = self
                .send_chunk(&chunk_url, source.name(), range, data, upload_id.as_deref())
                .await?;

            if session.offset < range.end && session.offset < total {
                tracing::warn!(
                    sent_end = range.end,
                    server_offset = session.offset,
                    "Server requested retransmission"
                );
                metrics::record_retransmission();
            }

            if session.offset == offset {
                stalled += 1;
                if stalled > self.options.max_stalled_chunks {
                    return Err(UploadError::Stalled {
                        offset: session.offset,
                        attempts: stalled,
                    });
                }
            } else {
                // A smaller offset is a resend request, not a stall.
                stalled = 0;
                if session.offset > offset {
                    metrics::record_bytes_acknowledged(session.offset.min(total) - offset);
                }
            }

            offset = session.offset;
            if upload_id.is_none() {
                tracing::Span::current().record("upload_id", session.upload_id.as_str());
            }

            let percent = percent_done(offset, total);
            tracing::debug!(offset, percent, "Chunk accepted");
            if let Some(callback) = on_chunk_upload {
                callback(percent);
            }

            if offset >= total {
                break session.upload_id;
            }
            upload_id = Some(session.upload_id);
        };

        let md5 = checksum::md5_hex(source, self.options.chunk_size)
            .await
            .map_err(UploadError::Read)?;

        self.complete(&complete_url, form, &upload_id, &md5).await
    }

    #[tracing::instrument(
        name = "upload.chunk",
        skip(self, url, file_name, data, upload_id),
        fields(
            http.method = "POST",
            http.content_range = %range.content_range(),
            upload.bytes = data.len(),
            http.status_code = tracing::field::Empty
        ),
        err
    )]
    async fn send_chunk(
        &self,
        url: &Url,
        file_name: &str,
        range: ChunkRange,
        data: Bytes,
        upload_id: Option<&str>,
    ) -> Result<UploadSession, UploadError> {
        let len = data.len() as u64;
        let part = Part::stream_with_length(Body::from(data), len).file_name(file_name.to_string());
        let mut form = Form::new().part("file_obj", part);
        if let Some(id) = upload_id {
            form = form.text("upload_id", id.to_string());
        }

        let mut headers = self.client.default_headers().clone();
        let content_range = HeaderValue::from_str(&range.content_range())
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        headers.insert(CONTENT_RANGE, content_range);

        let response = self
            .client
            .request_with_headers(Method::POST, url.clone(), headers)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());
        let body = response.bytes().await?;

        if !status.is_success() {
            metrics::record_chunk("rejected");
            return Err(UploadError::ChunkRejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        metrics::record_chunk("accepted");
        Ok(serde_json::from_slice(&body)?)
    }

    #[tracing::instrument(
        name = "upload.complete",
        skip(self, url, form),
        fields(http.method = "POST", http.status_code = tracing::field::Empty),
        err
    )]
    async fn complete<T: DeserializeOwned>(
        &self,
        url: &Url,
        form: CompletionForm,
        upload_id: &str,
        md5: &str,
    ) -> Result<T, UploadError> {
        let response = self
            .client
            .request_with_headers(
                Method::POST,
                url.clone(),
                self.client.default_headers().clone(),
            )
            .multipart(form.into_multipart(upload_id, md5))
            .send()
            .await?;

        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(UploadError::CompletionRejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        tracing::info!(upload_id, md5, "Upload completed");
        Ok(serde_json::from_slice(&body)?)
    }
}

fn error_kind(err: &UploadError) -> &'static str {
    match err {
        UploadError::Read(_) => "read",
        UploadError::Transport(_) => "transport",
        UploadError::ChunkRejected { .. } => "chunk_rejected",
        UploadError::CompletionRejected { .. } => "completion_rejected",
        UploadError::Parse(_) => "parse",
        UploadError::EmptySource => "empty_source",
        UploadError::InvalidChunkSize => "invalid_chunk_size",
        UploadError::Stalled { .. } => "stalled",
        UploadError::Api(_) => "api",
    }
}
