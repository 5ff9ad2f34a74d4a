//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup for the Drive `files`
//! endpoints. Each helper mounts the necessary mock endpoints; the client
//! returned by [`setup_drive_mock`] points at the mock server.

use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use upsync_gdrive::client::{children_query, folder_by_name_query, DriveClient, FOLDER_MIME_TYPE};

/// Starts a mock server and a DriveClient pointing at it
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url("test-access-token", server.uri())
        .expect("failed to build Drive client");
    (server, client)
}

/// A folder entry as returned by files.list
pub fn folder(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "name": name, "mimeType": FOLDER_MIME_TYPE })
}

/// A plain file entry as returned by files.list
pub fn file(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "name": name, "mimeType": "text/plain" })
}

/// Mounts a single-page files.list response for the given query
pub async fn mount_query(server: &MockServer, q: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts the folder-by-name lookup
pub async fn mount_folder_lookup(server: &MockServer, name: &str, matches: serde_json::Value) {
    mount_query(server, &folder_by_name_query(name), matches).await;
}

/// Mounts the children listing of a folder
pub async fn mount_children(server: &MockServer, folder_id: &str, children: serde_json::Value) {
    mount_query(server, &children_query(folder_id), children).await;
}

/// Mounts a children listing split across two pages
pub async fn mount_children_paginated(
    server: &MockServer,
    folder_id: &str,
    page1: serde_json::Value,
    page2: serde_json::Value,
) {
    let q = children_query(folder_id);

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q.as_str()))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nextPageToken": "page-2",
            "files": page1
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q.as_str()))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page2
        })))
        .mount(server)
        .await;
}
