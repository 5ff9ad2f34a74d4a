//! Integration tests for upsync-gdrive
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies root
//! resolution, recursive listing, resumable uploads and token refresh.

mod common;

mod test_listing;
mod test_root;
mod test_upload;
