//! Resumable uploads for the Google Drive API
//!
//! Every file goes through a resumable upload session, whatever its size:
//! - [`create_upload_session`] - Opens a session for a named file in a folder
//! - [`upload_chunk`] - Sends one `Content-Range` slice to the session
//! - [`upload_file`] - Streams a local file through a session chunk by chunk
//!
//! The file is read from disk one chunk at a time, so memory use is bounded
//! by [`CHUNK_SIZE`] regardless of the file size.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::client::{error_from_response, DriveClient, DriveFile};

/// Chunk size for resumable uploads: 8 MiB
///
/// Drive requires every chunk but the last to be a multiple of 256 KiB.
pub const CHUNK_SIZE: usize = 32 * 256 * 1024;

/// Drive's "Resume Incomplete" status for accepted intermediate chunks
const RESUME_INCOMPLETE: u16 = 308;

// ============================================================================
// create_upload_session
// ============================================================================

/// Opens a resumable upload session
///
/// `POST {upload}/files?uploadType=resumable` with the file metadata as the
/// JSON body. The session URL comes back in the `Location` header.
pub async fn create_upload_session(
    client: &DriveClient,
    parent_id: &str,
    name: &str,
    total: u64,
) -> Result<String> {
    let metadata = json!({
        "name": name,
        "parents": [parent_id],
    });

    let response = client
        .execute_with_retry("create upload session", || {
            let metadata = metadata.clone();
            async move {
                Ok(client
                    .upload_request(Method::POST, "/files")
                    .await?
                    .query(&[("uploadType", "resumable"), ("fields", "id, name")])
                    .header("X-Upload-Content-Length", total.to_string())
                    .json(&metadata))
            }
        })
        .await?;

    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .context("Upload session response has no Location header")?
        .to_string();

    debug!(name, "Upload session created");
    Ok(location)
}

// ============================================================================
// upload_chunk
// ============================================================================

/// Formats the `Content-Range` header for a slice of the file
///
/// An empty file is announced as `bytes */0`.
pub fn content_range(offset: u64, len: u64, total: u64) -> String {
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{}", offset, offset + len - 1, total)
    }
}

/// Uploads a single chunk to a resumable upload session
///
/// # Returns
/// - `Some(DriveFile)` once Drive reports the upload complete (200/201)
/// - `None` for intermediate chunks (308 Resume Incomplete)
pub async fn upload_chunk(
    client: &DriveClient,
    session_url: &str,
    data: Vec<u8>,
    offset: u64,
    total: u64,
) -> Result<Option<DriveFile>> {
    let chunk_len = data.len() as u64;
    let range = content_range(offset, chunk_len, total);
    debug!(range = %range, "Uploading chunk");

    let token = client.access_token().await?;
    let response = client
        .http_client()
        .put(session_url)
        .bearer_auth(token)
        .header(reqwest::header::CONTENT_LENGTH, chunk_len.to_string())
        .header(reqwest::header::CONTENT_RANGE, &range)
        .body(data)
        .send()
        .await
        .context("Failed to send chunk upload request")?;

    let status = response.status();
    if status == StatusCode::OK || status == StatusCode::CREATED {
        let file: DriveFile = response
            .json()
            .await
            .context("Failed to parse final upload response")?;
        return Ok(Some(file));
    }

    if status.as_u16() == RESUME_INCOMPLETE {
        return Ok(None);
    }

    Err(error_from_response(response).await).with_context(|| format!("Chunk {range} rejected"))
}

// ============================================================================
// upload_file
// ============================================================================

/// Fills `buf` from `file`, stopping early only at end of file
async fn read_chunk(file: &mut tokio::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Uploads a local file into `parent_id` under `name`
///
/// Opens a session, then streams the file in [`CHUNK_SIZE`] slices. The
/// returned [`DriveFile`] is what Drive created; its `name` is the display
/// name reported back to the caller.
pub async fn upload_file(
    client: &DriveClient,
    parent_id: &str,
    name: &str,
    source: &Path,
) -> Result<DriveFile> {
    let mut file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("Failed to open {}", source.display()))?;
    let total = file
        .metadata()
        .await
        .with_context(|| format!("Failed to stat {}", source.display()))?
        .len();

    info!(
        name,
        bytes = total,
        chunks = total.div_ceil(CHUNK_SIZE as u64).max(1),
        "Starting upload"
    );

    let session_url = create_upload_session(client, parent_id, name, total).await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut offset: u64 = 0;

    loop {
        let n = read_chunk(&mut file, &mut buf)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?;

        let result = upload_chunk(client, &session_url, buf[..n].to_vec(), offset, total)
            .await
            .with_context(|| format!("Failed to upload chunk at offset {offset}/{total} for {name}"))?;

        offset += n as u64;

        if let Some(created) = result {
            debug!(id = %created.id, name = %created.name, "Upload completed");
            return Ok(created);
        }

        if n == 0 || offset >= total {
            anyhow::bail!("Upload session for {name} ended without a final response");
        }
    }
}
