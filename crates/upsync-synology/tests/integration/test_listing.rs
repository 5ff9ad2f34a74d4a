//! Recursive listing of the NAS tree

use upsync_core::domain::newtypes::{PathSet, RelativePath, RemotePath};
use upsync_core::domain::remote::RemoteRoot;
use upsync_core::ports::{RemoteStore, StoreError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, entry, ROOT};

fn set(paths: &[&str]) -> PathSet {
    paths.iter().map(|p| RelativePath::new(p).unwrap()).collect()
}

#[tokio::test]
async fn test_list_empty_root() {
    let (server, store) = common::setup_nas_mock().await;
    common::mount_folder(&server, ROOT, vec![]).await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert!(files.is_empty());
    assert_eq!(common::logout_count(&server).await, 1);
}

#[tokio::test]
async fn test_list_descends_and_reports_empty_dirs() {
    let (server, store) = common::setup_nas_mock().await;

    common::mount_folder(
        &server,
        ROOT,
        vec![
            entry("/home/uploads/a.txt", false),
            entry("/home/uploads/scans", true),
            entry("/home/uploads/empty", true),
        ],
    )
    .await;
    common::mount_folder(
        &server,
        "/home/uploads/scans",
        vec![
            entry("/home/uploads/scans/page-1.png", false),
            entry("/home/uploads/scans/2024", true),
        ],
    )
    .await;
    common::mount_folder(
        &server,
        "/home/uploads/scans/2024",
        vec![entry("/home/uploads/scans/2024/page-2.png", false)],
    )
    .await;
    common::mount_folder(&server, "/home/uploads/empty", vec![]).await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert_eq!(
        files,
        set(&["a.txt", "empty", "scans/2024/page-2.png", "scans/page-1.png"])
    );
}

#[tokio::test]
async fn test_list_follows_offset_pagination() {
    let (server, store) = common::setup_nas_mock().await;

    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("folder_path", ROOT))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "total": 2, "offset": 0, "files": [entry("/home/uploads/a.txt", false)] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("folder_path", ROOT))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "total": 2, "offset": 1, "files": [entry("/home/uploads/b.txt", false)] }
        })))
        .mount(&server)
        .await;

    let files = store.list_tree(store.root()).await.unwrap();
    assert_eq!(files, set(&["a.txt", "b.txt"]));
}

#[tokio::test]
async fn test_list_rejects_folder_root() {
    let (_server, store) = common::setup_nas_mock().await;
    let root = RemoteRoot::Folder(upsync_core::domain::newtypes::FolderId::new("abc").unwrap());

    let err = store.list_tree(&root).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidRoot(_)));
}

#[tokio::test]
async fn test_list_other_root_path() {
    let (server, store) = common::setup_nas_mock().await;
    common::mount_folder(&server, "/volume1/other", vec![entry("/volume1/other/x.bin", false)]).await;

    let root = RemoteRoot::Path(RemotePath::new("/volume1/other").unwrap());
    let files = store.list_tree(&root).await.unwrap();
    assert_eq!(files, set(&["x.bin"]));
}

#[tokio::test]
async fn test_http_error_is_unavailable() {
    let (server, store) = common::setup_nas_mock().await;
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = store.list_tree(store.root()).await.unwrap_err();
    assert!(matches!(err, StoreError::BackendUnavailable(_)));
}
