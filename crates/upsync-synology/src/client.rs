//! HTTP client for the Synology Web API
//!
//! Every DSM call goes through one of two CGI endpoints and answers with the
//! same envelope:
//!
//! ```json
//! { "success": true, "data": { … } }
//! { "success": false, "error": { "code": 408 } }
//! ```
//!
//! [`SynologyClient`] unwraps that envelope into `data` or a
//! [`SynologyError::Api`] carrying the code.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

use crate::SynologyError;

/// File Station listing API
pub const LIST_API: &str = "SYNO.FileStation.List";

/// File Station upload API
pub const UPLOAD_API: &str = "SYNO.FileStation.Upload";

/// Entries requested per `list` page
pub const PAGE_LIMIT: u64 = 1000;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
}

/// One entry of a File Station listing
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    /// Absolute path on the NAS
    pub path: String,
    /// Base name
    pub name: String,
    /// True for directories
    #[serde(default)]
    pub isdir: bool,
}

/// One page of a File Station listing
#[derive(Debug, Deserialize)]
pub struct ListPage {
    /// Number of entries in the whole folder
    pub total: u64,
    /// Offset of the first entry of this page
    #[serde(default)]
    pub offset: u64,
    /// The entries of this page
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    sid: String,
}

// ============================================================================
// SynologyClient
// ============================================================================

/// Thin client over the DSM Web API CGI endpoints
#[derive(Debug, Clone)]
pub struct SynologyClient {
    client: Client,
    base_url: String,
}

impl SynologyClient {
    /// Creates a client for the DSM instance at `base_url`
    pub fn new(base_url: &Url) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build NAS HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self) -> String {
        format!("{}/webapi/auth.cgi", self.base_url)
    }

    fn entry_url(&self) -> String {
        format!("{}/webapi/entry.cgi", self.base_url)
    }

    /// Sends a request and unwraps the response envelope
    async fn call<T: DeserializeOwned>(
        &self,
        api: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<T>, SynologyError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(SynologyError::UnexpectedStatus { status, body });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| SynologyError::InvalidResponse(format!("{api}: {e}")))?;

        if envelope.success {
            return Ok(envelope.data);
        }

        let code = envelope.error.map_or(100, |e| e.code);
        Err(SynologyError::Api { api, code })
    }

    /// Logs in and returns the session ID
    pub async fn login(&self, account: &str, passwd: &str, session: &str) -> Result<String> {
        let request = self.client.get(self.auth_url()).query(&[
            ("api", crate::session::AUTH_API),
            ("version", "3"),
            ("method", "login"),
            ("account", account),
            ("passwd", passwd),
            ("session", session),
            ("format", "sid"),
        ]);

        let data: LoginData = self
            .call(crate::session::AUTH_API, request)
            .await
            .context("Login failed")?
            .ok_or_else(|| SynologyError::InvalidResponse("login returned no sid".into()))?;

        Ok(data.sid)
    }

    /// Ends the session identified by `sid`
    pub async fn logout(&self, sid: &str, session: &str) -> Result<()> {
        let request = self.client.get(self.auth_url()).query(&[
            ("api", crate::session::AUTH_API),
            ("version", "1"),
            ("method", "logout"),
            ("session", session),
            ("_sid", sid),
        ]);

        self.call::<serde_json::Value>(crate::session::AUTH_API, request)
            .await
            .context("Logout failed")?;
        Ok(())
    }

    /// Fetches one page of the listing of `folder_path`
    pub async fn list_page(&self, sid: &str, folder_path: &str, offset: u64) -> Result<ListPage> {
        let offset = offset.to_string();
        let limit = PAGE_LIMIT.to_string();
        let request = self.client.get(self.entry_url()).query(&[
            ("api", LIST_API),
            ("version", "2"),
            ("method", "list"),
            ("folder_path", folder_path),
            ("offset", offset.as_str()),
            ("limit", limit.as_str()),
            ("_sid", sid),
        ]);

        let page = self
            .call::<ListPage>(LIST_API, request)
            .await
            .with_context(|| format!("Failed to list {folder_path}"))?
            .ok_or_else(|| SynologyError::InvalidResponse("list returned no data".into()))?;

        Ok(page)
    }

    /// Lists every direct child of `folder_path`, following pagination
    pub async fn list_folder(&self, sid: &str, folder_path: &str) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        loop {
            let page = self.list_page(sid, folder_path, entries.len() as u64).await?;
            let received = page.files.len();
            entries.extend(page.files);

            debug!(folder = folder_path, received, total = page.total, "list page");

            if received == 0 || entries.len() as u64 >= page.total {
                break;
            }
        }

        Ok(entries)
    }

    /// Uploads `source` into `dest_folder` as `name`
    ///
    /// Missing parent folders are created and an existing file of the same
    /// name is overwritten. The file body is streamed from disk.
    pub async fn upload(&self, sid: &str, dest_folder: &str, name: &str, source: &Path) -> Result<()> {
        let file = tokio::fs::File::open(source)
            .await
            .with_context(|| format!("Failed to open {}", source.display()))?;
        let len = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", source.display()))?
            .len();

        info!(name, dest = dest_folder, bytes = len, "Starting upload");

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(name.to_string())
            .mime_str("application/octet-stream")
            .context("Invalid upload MIME type")?;

        // File Station requires the file part to come last
        let form = Form::new()
            .text("api", UPLOAD_API)
            .text("version", "2")
            .text("method", "upload")
            .text("path", dest_folder.to_string())
            .text("create_parents", "true")
            .text("overwrite", "true")
            .part("file", part);

        let request = self
            .client
            .post(self.entry_url())
            .query(&[
                ("api", UPLOAD_API),
                ("version", "2"),
                ("method", "upload"),
                ("_sid", sid),
            ])
            .multipart(form);

        self.call::<serde_json::Value>(UPLOAD_API, request)
            .await
            .with_context(|| format!("Failed to upload {name} to {dest_folder}"))?;

        debug!(name, dest = dest_folder, "Upload completed");
        Ok(())
    }
}
