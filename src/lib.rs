//! Omics Uploadr Library
//!
//! Resumable chunked uploads of datasets to a biomarker discovery platform.
//!
//! # Features
//!
//! - **Resumable Chunks**: Server-tracked `upload_id`/`offset` sessions with `Content-Range`
//! - **Integrity**: Whole-file MD5 sent with the completion request
//! - **Progress**: Per-chunk percentage callbacks
//! - **REST Client**: Injected CSRF/auth headers, pagination and cancellation
//!
//! # Example
//!
//! ```no_run
//! use omics_uploadr::api::ApiClient;
//! use omics_uploadr::config::Config;
//! use omics_uploadr::upload::{ChunkedUploader, CompletionForm, UploadOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let client = ApiClient::new(&config.api)?;
//!     let uploader = ChunkedUploader::new(client, UploadOptions::from(&config.upload))?;
//!     let record: serde_json::Value = uploader
//!         .upload_path("clinical.csv", CompletionForm::new(), None)
//!         .await?;
//!     println!("{}", record);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod metrics;
pub mod telemetry;
pub mod upload;

// Re-export commonly used types
pub use api::ApiClient;
pub use config::Config;
pub use upload::{ChunkedUploader, CompletionForm, UploadError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
