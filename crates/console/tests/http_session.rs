use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use kitchenhub_auth::{IdentityId, IdentityRecord, catalog};
use kitchenhub_console::{HttpPermissionSource, SqliteIdentityStore};
use kitchenhub_session::{
    FetchError, InitOutcome, PermissionSource, SessionConfig, SessionStore,
};

/// Answer a single HTTP request with `status` and `body`; yields the raw request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).into_owned();

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn fetches_with_bearer_token_and_envelope() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"data":{"permissions":[{"key":"admin.kitchen.view"},{"key":"admin.order.view","metadata":{"scope":"all"}}]}}"#,
    )
    .await;

    let source = HttpPermissionSource::with_token(url, "t0k");
    let resp = source
        .fetch_permissions(&IdentityId::new("5"))
        .await
        .unwrap();
    let set = resp.into_set();
    assert!(set.contains(&catalog::KITCHEN_VIEW));
    assert!(set.contains(&catalog::ORDER_VIEW));

    let request = server.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /identities/5/permissions "));
    assert!(request.contains("authorization: bearer t0k"));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let (url, _server) = serve_once("404 Not Found", r#"{"error":"no such identity"}"#).await;
    let err = HttpPermissionSource::new(url)
        .fetch_permissions(&IdentityId::new("9"))
        .await
        .unwrap_err();

    let FetchError::Status { status, message } = err else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(status, 404);
    assert!(message.contains("no such identity"));
}

#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
    let (url, _server) = serve_once("200 OK", r#"{"permissions":"nope"}"#).await;
    let err = HttpPermissionSource::new(url)
        .fetch_permissions(&IdentityId::new("9"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn session_loads_from_sqlite_identity_and_http_source() {
    let (url, _server) = serve_once(
        "200 OK",
        r#"{"data":{"permissions":[{"key":"admin.menu.view"}]}}"#,
    )
    .await;

    let identities = SqliteIdentityStore::in_memory().await.unwrap();
    identities.put_identity(&IdentityRecord::new("77")).await.unwrap();

    let store = SessionStore::new(
        identities.clone(),
        HttpPermissionSource::new(url),
        SessionConfig::default().with_reconcile_interval(Duration::from_millis(20)),
    );
    let InitOutcome::Fetching(task) = store.initialize().await else {
        panic!("expected a background fetch");
    };
    task.join().await.unwrap();
    assert!(store.snapshot().permissions.contains(&catalog::MENU_VIEW));

    // Logging out by deleting the record is picked up by the reconciler.
    let reconciler = store.spawn_reconciler();
    identities.remove_identity().await.unwrap();

    let mut rx = store.subscribe();
    let cleared = tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| s.identity_id.is_none() && s.permissions.is_empty()),
    )
    .await
    .is_ok();
    assert!(cleared);
    reconciler.shutdown().await;
}
