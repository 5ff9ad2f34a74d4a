//! Root checks performed when the store is connected

use upsync_core::domain::newtypes::RemotePath;
use upsync_core::domain::remote::RemoteRoot;
use upsync_core::ports::{RemoteStore, StoreError};
use upsync_synology::client::SynologyClient;
use upsync_synology::SynologyStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

async fn connect(server_uri: String, root: &str) -> Result<SynologyStore, StoreError> {
    SynologyStore::connect(
        SynologyClient::with_base_url(server_uri),
        common::credentials(),
        RemotePath::new(root).unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_connect_checks_root_and_logs_out() {
    let (server, _store) = common::setup_nas_mock().await;
    common::mount_folder(&server, common::ROOT, vec![common::entry("/home/uploads/a.txt", false)]).await;

    let store = connect(server.uri(), common::ROOT).await.expect("connect failed");

    assert_eq!(
        store.root(),
        &RemoteRoot::Path(RemotePath::new(common::ROOT).unwrap())
    );
    assert_eq!(common::logout_count(&server).await, 1);
}

#[tokio::test]
async fn test_connect_missing_root_is_root_not_found() {
    let (server, _store) = common::setup_nas_mock().await;
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("api", "SYNO.FileStation.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": { "code": 408 }
        })))
        .mount(&server)
        .await;

    let err = connect(server.uri(), "/does/not/exist")
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::RootNotFound(ref root) if root == "/does/not/exist"));
    assert!(err.is_configuration());
    assert_eq!(common::logout_count(&server).await, 1);
}

#[tokio::test]
async fn test_connect_unlistable_root_is_invalid_root() {
    let (server, _store) = common::setup_nas_mock().await;
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("api", "SYNO.FileStation.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": { "code": 407 }
        })))
        .mount(&server)
        .await;

    let err = connect(server.uri(), common::ROOT)
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::InvalidRoot(_)), "got {err:?}");
}

#[tokio::test]
async fn test_connect_unreachable_nas_is_unavailable() {
    let err = connect("http://127.0.0.1:1".to_string(), "/does/not/exist")
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::BackendUnavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_connect_rejected_login_is_session_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webapi/auth.cgi"))
        .and(query_param("method", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": { "code": 400 }
        })))
        .mount(&server)
        .await;

    let err = connect(server.uri(), common::ROOT)
        .await
        .err()
        .expect("expected an error");

    assert!(matches!(err, StoreError::Session(_)), "got {err:?}");
}
