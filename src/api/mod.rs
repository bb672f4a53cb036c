//! Platform REST client
//!
//! Thin wrapper around `reqwest` that carries the process-wide settings
//! (base URL, CSRF token, auth token, extra headers) injected at startup and
//! attaches them to every request.
//!
//! # Example
//!
//! ```no_run
//! use omics_uploadr::api::{ApiClient, PageQuery};
//! use omics_uploadr::config::Config;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let client = ApiClient::new(&config.api)?;
//!
//! let query = PageQuery::new().page(1).page_size(25).search("BRCA");
//! let token = CancellationToken::new();
//! let page: omics_uploadr::api::Page<serde_json::Value> =
//!     client.list("/api/biomarkers/", &query, &token).await?;
//! println!("{} biomarkers", page.count);
//! # Ok(())
//! # }
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ApiConfig;

pub mod query;
pub mod search;

pub use query::{Ordering, Page, PageQuery, SortDirection};
pub use search::SearchDebouncer;

/// Header carrying the Django CSRF token
pub const CSRF_HEADER: &str = "x-csrftoken";

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,
}

/// Client for the platform's REST endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    default_headers: HeaderMap,
}

impl ApiClient {
    /// Create a new API client from connection settings
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidHeader(format!("{}: {}", name, e)))?;
            default_headers.insert(name, header_value(value)?);
        }
        // Content-Range describes a single chunk and is set per request.
        if default_headers.remove(CONTENT_RANGE).is_some() {
            tracing::warn!("Ignoring configured Content-Range header");
        }

        if let Some(token) = &config.csrf_token {
            default_headers.insert(HeaderName::from_static(CSRF_HEADER), header_value(token)?);
        }

        if let Some(token) = &config.auth_token {
            default_headers.insert(AUTHORIZATION, header_value(&format!("Token {}", token))?);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url,
            http,
            default_headers,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers attached to every request
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Resolve a path against the base URL.
    ///
    /// Absolute `http(s)://` URLs are returned unchanged.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::InvalidUrl(e.to_string()));
        }
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Start a request with an explicit, complete header set.
    ///
    /// Callers that need to override a default header clone
    /// [`default_headers`](Self::default_headers), `insert` into it and pass
    /// the result here.
    pub(crate) fn request_with_headers(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
    ) -> RequestBuilder {
        self.http.request(method, url).headers(headers)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_with_headers(method, url, self.default_headers.clone())
    }

    /// GET a JSON resource
    #[tracing::instrument(
        name = "api.get_json",
        skip(self, query, cancel),
        fields(http.method = "GET", http.status_code = tracing::field::Empty),
        err
    )]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let url = self.resolve(path)?;
        let request = self.request(Method::GET, url).query(query);
        self.send(request, cancel).await
    }

    /// POST a JSON body and parse the JSON response
    #[tracing::instrument(
        name = "api.post_json",
        skip(self, body, cancel),
        fields(http.method = "POST", http.status_code = tracing::field::Empty),
        err
    )]
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let url = self.resolve(path)?;
        let request = self.request(Method::POST, url).json(body);
        self.send(request, cancel).await
    }

    /// Fetch one page of a paginated list endpoint
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &PageQuery,
        cancel: &CancellationToken,
    ) -> Result<Page<T>, ApiError> {
        self.get_json(path, &query.to_query_pairs(), cancel).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Request cancelled before response arrived");
                Err(ApiError::Cancelled)
            }
            result = Self::execute(request) => result,
        }
    }

    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());

        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader(e.to_string()))
}
