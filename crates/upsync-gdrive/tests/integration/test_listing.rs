//! Recursive listing of the Drive tree

use std::time::Duration;

use upsync_core::domain::newtypes::{FolderId, PathSet, RelativePath, RemotePath};
use upsync_core::domain::remote::RemoteRoot;
use upsync_core::ports::{RemoteStore, StoreError};
use upsync_gdrive::client::children_query;
use upsync_gdrive::GoogleDriveStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn set(paths: &[&str]) -> PathSet {
    paths.iter().map(|p| RelativePath::new(p).unwrap()).collect()
}

async fn connected(server: &wiremock::MockServer, client: upsync_gdrive::client::DriveClient) -> GoogleDriveStore {
    common::mount_folder_lookup(
        server,
        "from_server",
        serde_json::json!([common::folder("root", "from_server")]),
    )
    .await;
    GoogleDriveStore::connect(client, "from_server")
        .await
        .expect("connect failed")
}

#[tokio::test]
async fn test_list_empty_root() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;
    common::mount_children(&server, "root", serde_json::json!([])).await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_list_descends_into_subfolders() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;

    common::mount_children(
        &server,
        "root",
        serde_json::json!([
            common::file("f-a", "a.txt"),
            common::folder("d-scans", "scans"),
            common::folder("d-empty", "empty")
        ]),
    )
    .await;
    common::mount_children(
        &server,
        "d-scans",
        serde_json::json!([
            common::file("f-p1", "page-1.png"),
            common::folder("d-2024", "2024")
        ]),
    )
    .await;
    common::mount_children(
        &server,
        "d-2024",
        serde_json::json!([common::file("f-p2", "page-2.png")]),
    )
    .await;
    common::mount_children(&server, "d-empty", serde_json::json!([])).await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert_eq!(
        files,
        set(&["a.txt", "empty", "scans/2024/page-2.png", "scans/page-1.png"])
    );
}

#[tokio::test]
async fn test_list_follows_pagination() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;

    common::mount_children_paginated(
        &server,
        "root",
        serde_json::json!([common::file("1", "a.txt")]),
        serde_json::json!([common::file("2", "b.txt")]),
    )
    .await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert_eq!(files, set(&["a.txt", "b.txt"]));
}

#[tokio::test]
async fn test_list_rejects_path_root() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;

    let root = RemoteRoot::Path(RemotePath::new("/home").unwrap());
    let err = store.list_tree(&root).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidRoot(_)));
}

#[tokio::test]
async fn test_list_unknown_folder_is_unavailable() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", children_query("gone").as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found: gone"))
        .mount(&server)
        .await;

    let root = RemoteRoot::Folder(FolderId::new("gone").unwrap());
    let err = store.list_tree(&root).await.unwrap_err();
    assert!(matches!(err, StoreError::BackendUnavailable(_)));
}

#[tokio::test]
async fn test_list_retries_after_throttling() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;
    let q = children_query("root");

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q.as_str()))
        .respond_with(
            ResponseTemplate::new(429)
                .append_header("Retry-After", "0")
                .set_delay(Duration::from_millis(1)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    common::mount_children(
        &server,
        "root",
        serde_json::json!([common::file("1", "a.txt")]),
    )
    .await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert_eq!(files, set(&["a.txt"]));
}
