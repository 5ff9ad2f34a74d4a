//! Resumable uploads and the upload stream

use futures_util::StreamExt;
use upsync_core::domain::newtypes::RelativePath;
use upsync_core::ports::{RemoteStore, StoreError, UploadTask};
use upsync_gdrive::upload;
use upsync_gdrive::GoogleDriveStore;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

async fn mount_session(server: &MockServer, name: &str, session: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "resumable"))
        .and(body_partial_json(serde_json::json!({ "name": name })))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Location", format!("{}/upload/session/{session}", server.uri())),
        )
        .mount(server)
        .await;
}

async fn mount_put(server: &MockServer, session: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("PUT"))
        .and(path(format!("/upload/session/{session}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer, client: upsync_gdrive::client::DriveClient) -> GoogleDriveStore {
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

fn task(local: &std::path::Path, store: &GoogleDriveStore, rel: &str) -> UploadTask {
    UploadTask::new(local, RelativePath::new(rel).unwrap(), store.root())
}

#[tokio::test]
async fn test_upload_file_small() {
    let (server, client) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.pdf");
    std::fs::write(&source, b"hello").unwrap();

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "resumable"))
        .and(header("X-Upload-Content-Length", "5"))
        .and(header("Authorization", "Bearer test-access-token"))
        .and(body_partial_json(serde_json::json!({
            "name": "report.pdf",
            "parents": ["root"]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Location", format!("{}/upload/session/abc", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/abc"))
        .and(header("Content-Range", "bytes 0-4/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-001",
            "name": "report.pdf",
            "mimeType": "application/pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = upload::upload_file(&client, "root", "report.pdf", &source)
        .await
        .expect("upload failed");

    assert_eq!(created.id, "file-001");
    assert_eq!(created.name, "report.pdf");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (server, client) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("empty.txt");
    std::fs::write(&source, b"").unwrap();

    mount_session(&server, "empty.txt", "empty").await;
    Mock::given(method("PUT"))
        .and(path("/upload/session/empty"))
        .and(header("Content-Range", "bytes */0"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "file-002",
            "name": "empty.txt"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = upload::upload_file(&client, "root", "empty.txt", &source)
        .await
        .expect("upload failed");
    assert_eq!(created.id, "file-002");
}

#[tokio::test]
async fn test_upload_missing_location_fails() {
    let (server, client) = common::setup_drive_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    std::fs::write(&source, b"a").unwrap();

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = upload::upload_file(&client, "root", "a.txt", &source)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Location"));
}

#[tokio::test]
async fn test_store_upload_stream_reports_each_file() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("scans")).unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
    std::fs::write(dir.path().join("scans/b.txt"), b"bb").unwrap();

    mount_session(&server, "a.txt", "s-a").await;
    mount_session(&server, "b.txt", "s-b").await;
    mount_put(
        &server,
        "s-a",
        200,
        serde_json::json!({ "id": "1", "name": "a.txt" }),
    )
    .await;
    mount_put(
        &server,
        "s-b",
        200,
        serde_json::json!({ "id": "2", "name": "b.txt" }),
    )
    .await;

    let batch = vec![
        task(dir.path(), &store, "a.txt"),
        task(dir.path(), &store, "scans/b.txt"),
    ];
    let results: Vec<_> = store.upload(batch).collect().await;

    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first.display_name, "a.txt");
    assert_eq!(first.source, dir.path().join("a.txt"));
    let second = results[1].as_ref().unwrap();
    assert_eq!(second.display_name, "b.txt");
    assert_eq!(second.relative.as_str(), "scans/b.txt");
}

#[tokio::test]
async fn test_store_upload_stream_stops_after_failure() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;

    let dir = tempfile::tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
    }

    mount_session(&server, "a.txt", "s-a").await;
    mount_session(&server, "b.txt", "s-b").await;
    mount_put(
        &server,
        "s-a",
        200,
        serde_json::json!({ "id": "1", "name": "a.txt" }),
    )
    .await;
    mount_put(
        &server,
        "s-b",
        403,
        serde_json::json!({ "error": { "code": 403, "message": "storageQuotaExceeded" } }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(body_partial_json(serde_json::json!({ "name": "c.txt" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let batch = vec![
        task(dir.path(), &store, "a.txt"),
        task(dir.path(), &store, "b.txt"),
        task(dir.path(), &store, "c.txt"),
    ];
    let results: Vec<_> = store.upload(batch).collect().await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(StoreError::UploadFailed { path, reason }) => {
            assert_eq!(path, &dir.path().join("b.txt"));
            assert!(reason.contains("storageQuotaExceeded"));
        }
        other => panic!("expected UploadFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_store_upload_missing_source_fails() {
    let (server, client) = common::setup_drive_mock().await;
    let store = connected(&server, client).await;
    let dir = tempfile::tempdir().unwrap();

    let results: Vec<_> = store
        .upload(vec![task(dir.path(), &store, "vanished.txt")])
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(StoreError::UploadFailed { .. })));
}
