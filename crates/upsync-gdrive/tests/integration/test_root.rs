//! Root folder resolution

use upsync_core::domain::newtypes::FolderId;
use upsync_core::domain::remote::RemoteRoot;
use upsync_core::ports::{RemoteStore, StoreError};
use upsync_gdrive::GoogleDriveStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_connect_resolves_unique_folder() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_folder_lookup(
        &server,
        "from_server",
        serde_json::json!([common::folder("root-001", "from_server")]),
    )
    .await;

    let store = GoogleDriveStore::connect(client, "from_server")
        .await
        .expect("connect failed");

    assert_eq!(
        store.root(),
        &RemoteRoot::Folder(FolderId::new("root-001").unwrap())
    );
    assert_eq!(store.name(), "google-drive");
}

#[tokio::test]
async fn test_connect_fails_when_folder_missing() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_folder_lookup(&server, "from_server", serde_json::json!([])).await;

    let err = GoogleDriveStore::connect(client, "from_server")
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::RootNotFound(ref name) if name == "from_server"));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_connect_fails_when_folder_ambiguous() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_folder_lookup(
        &server,
        "from_server",
        serde_json::json!([
            common::folder("root-001", "from_server"),
            common::folder("root-002", "from_server")
        ]),
    )
    .await;

    let err = GoogleDriveStore::connect(client, "from_server")
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::AmbiguousRoot { count: 2, .. }));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_connect_escapes_quotes_in_name() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_folder_lookup(
        &server,
        "bob's uploads",
        serde_json::json!([common::folder("root-009", "bob's uploads")]),
    )
    .await;

    let store = GoogleDriveStore::connect(client, "bob's uploads")
        .await
        .expect("connect failed");
    assert_eq!(
        store.root(),
        &RemoteRoot::Folder(FolderId::new("root-009").unwrap())
    );
}

#[tokio::test]
async fn test_connect_reports_unauthorized_as_unavailable() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .mount(&server)
        .await;

    let err = GoogleDriveStore::connect(client, "from_server")
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::BackendUnavailable(ref msg) if msg.contains("Unauthorized")));
}
