//! Login failures and session scoping

use upsync_core::ports::{RemoteStore, StoreError};
use upsync_synology::client::SynologyClient;
use upsync_synology::session::Session;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_open_and_close_session() {
    let (server, _store) = common::setup_nas_mock().await;
    let client = SynologyClient::with_base_url(server.uri());

    let session = Session::open(&client, &common::credentials()).await.unwrap();
    assert_eq!(session.sid(), common::SID);
    session.close().await.unwrap();

    assert_eq!(common::logout_count(&server).await, 1);
}

#[tokio::test]
async fn test_wrong_password_is_a_session_error() {
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

    let store = upsync_synology::SynologyStore::with_client(
        SynologyClient::with_base_url(server.uri()),
        common::credentials(),
        upsync_core::domain::newtypes::RemotePath::new(common::ROOT).unwrap(),
    );

    let err = store.list_tree(store.root()).await.unwrap_err();
    match err {
        StoreError::Session(msg) => {
            assert!(msg.contains("No such account or incorrect password"), "{msg}")
        }
        other => panic!("expected Session error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_tree_logs_out_even_when_listing_fails() {
    let (server, store) = common::setup_nas_mock().await;
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("api", "SYNO.FileStation.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": { "code": 408 }
        })))
        .mount(&server)
        .await;

    let err = store.list_tree(store.root()).await.unwrap_err();
    assert!(
        matches!(err, StoreError::BackendUnavailable(ref msg) if msg.contains("No such file or directory"))
    );
    assert_eq!(common::logout_count(&server).await, 1);
}

#[tokio::test]
async fn test_dropped_session_is_logged_out() {
    let (server, _store) = common::setup_nas_mock().await;
    let client = SynologyClient::with_base_url(server.uri());

    let session = Session::open(&client, &common::credentials()).await.unwrap();
    drop(session);

    // The logout runs on a spawned task
    for _ in 0..50 {
        if common::logout_count(&server).await == 1 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("dropped session was never logged out");
}
