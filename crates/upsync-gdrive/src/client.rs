//! Google Drive v3 API client
//!
//! Provides a typed HTTP client for the Drive `files` collection. Handles
//! bearer authentication, query construction, pagination and
//! `Retry-After` back-off on throttling.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use upsync_gdrive::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::with_base_url("access-token-here", "http://localhost:8080")?;
//! let folders = client.find_folders_by_name("from_server").await?;
//! println!("{} match(es)", folders.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::TokenSource;
use crate::DriveError;

/// Base URL for Drive API v3 metadata requests
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for Drive API v3 media uploads
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for every file listing
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

/// Page size for file listings
const PAGE_SIZE: &str = "1000";

/// Default retry-after duration when header is missing
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Maximum number of retries for 429 / 5xx responses
const DEFAULT_MAX_RETRIES: u32 = 5;

// ============================================================================
// Drive API response types
// ============================================================================

/// A file or folder as returned by `files.list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Drive file ID
    pub id: String,
    /// File name (not unique within a folder)
    pub name: String,
    /// MIME type; folders use [`FOLDER_MIME_TYPE`]
    pub mime_type: Option<String>,
}

impl DriveFile {
    /// Whether this entry is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

/// One page of a `files.list` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

// ============================================================================
// Query helpers
// ============================================================================

/// Escapes a value for use inside a single-quoted Drive query literal
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query matching non-trashed folders named exactly `name`
pub fn folder_by_name_query(name: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query_value(name),
        FOLDER_MIME_TYPE
    )
}

/// Query matching the non-trashed direct children of `folder_id`
pub fn children_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and trashed = false",
        escape_query_value(folder_id)
    )
}

/// Parses a `Retry-After` header value (seconds or HTTP-date)
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive v3 calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. Redirects are not followed: the resumable upload protocol
/// answers intermediate chunks with `308 Resume Incomplete`.
#[derive(Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata requests
    base_url: String,
    /// Base URL for upload requests
    upload_url: String,
    /// Source of bearer tokens
    tokens: Arc<TokenSource>,
    /// Retries for 429 / 5xx responses
    max_retries: u32,
}

impl DriveClient {
    /// Creates a client against the public Drive endpoints
    pub fn new(tokens: TokenSource) -> Result<Self> {
        Self::build(tokens, DRIVE_BASE_URL, DRIVE_UPLOAD_URL)
    }

    /// Creates a client with a fixed token and a custom base URL (useful for testing)
    ///
    /// Uploads go to `{base_url}/upload`.
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let upload_url = format!("{base_url}/upload");
        Self::build(TokenSource::fixed(access_token), &base_url, &upload_url)
    }

    fn build(tokens: TokenSource, base_url: &str, upload_url: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build Drive HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            upload_url: upload_url.to_string(),
            tokens: Arc::new(tokens),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Overrides the number of 429 / 5xx retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns a valid bearer token
    pub async fn access_token(&self) -> Result<String> {
        self.tokens.access_token().await
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.access_token().await?;
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// Creates an authenticated request builder against the upload endpoint
    pub async fn upload_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.upload_url, path);
        let token = self.access_token().await?;
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// Sends a request, retrying 429 and 5xx responses
    ///
    /// `build` is invoked once per attempt so every attempt carries a fresh
    /// token. Non-retryable error statuses are turned into [`DriveError`]s.
    pub async fn execute_with_retry<F, Fut>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<RequestBuilder>>,
    {
        for attempt in 0..=self.max_retries {
            let response = build()
                .await?
                .send()
                .await
                .map_err(DriveError::from)
                .with_context(|| format!("Failed to send {what} request"))?;

            let status = response.status();
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

            if retryable && attempt < self.max_retries {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                info!(
                    what,
                    attempt,
                    %status,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Drive throttled the request, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if status.is_success() {
                if attempt > 0 {
                    info!(what, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            return Err(error_from_response(response).await)
                .with_context(|| format!("{what} request failed"));
        }

        Err(anyhow::anyhow!(
            "Request failed: retry loop exited unexpectedly for {what}"
        ))
    }

    /// Runs a `files.list` query, following every `nextPageToken`
    pub async fn find_files_by_query(&self, query: &str) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = page_token.clone();
            let response = self
                .execute_with_retry("files.list", || {
                    let token = token.clone();
                    async move {
                        let mut params = vec![
                            ("q", query.to_string()),
                            ("spaces", "drive".to_string()),
                            ("fields", LIST_FIELDS.to_string()),
                            ("pageSize", PAGE_SIZE.to_string()),
                        ];
                        if let Some(token) = token {
                            params.push(("pageToken", token));
                        }
                        Ok(self.request(Method::GET, "/files").await?.query(&params))
                    }
                })
                .await?;

            let page: FileListResponse = response
                .json()
                .await
                .context("Failed to parse files.list response")?;

            debug!(query, count = page.files.len(), "files.list page");
            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Finds every non-trashed folder named exactly `name`
    pub async fn find_folders_by_name(&self, name: &str) -> Result<Vec<DriveFile>> {
        self.find_files_by_query(&folder_by_name_query(name)).await
    }

    /// Lists the direct children of a folder
    pub async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        self.find_files_by_query(&children_query(folder_id)).await
    }

    /// Returns a reference to the underlying reqwest Client
    ///
    /// Upload session URLs are absolute and bypass the base URL.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Returns the base URL for metadata requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .field("upload_url", &self.upload_url)
            .finish_non_exhaustive()
    }
}

/// Turns an error response into a [`DriveError`]
pub(crate) async fn error_from_response(response: Response) -> DriveError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());
    DriveError::from_status(status, body)
}
