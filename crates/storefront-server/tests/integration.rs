//! End-to-end tests driving the router the way a browser would.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::ServiceExt;

use storefront_server::page::{HEADER_MARKUP, STORE_FAILURE_MESSAGE};
use storefront_server::{Bootstrap, StorefrontServer};
use storefront_session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use storefront_settings::{StorefrontSettings, load_settings_with};
use storefront_store::{
    MySqlConnector, StoreConnection, StoreConnectionHandle, StoreConnector, StoreError,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn settings_for(host: &str) -> StorefrontSettings {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DB_HOST", host.to_string()),
        ("DB_USER", "u".to_string()),
        ("DB_PASSWORD", "p".to_string()),
        ("DB_NAME", "d".to_string()),
        ("DB_CONNECT_TIMEOUT_MS", "2000".to_string()),
    ]);
    load_settings_with(|k| vars.get(k).cloned()).unwrap()
}

/// Stands in for a reachable store; counts opens and graceful closes.
#[derive(Default)]
struct ReachableStore {
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

struct ReachableConnection {
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreConnection for ReachableConnection {
    fn backend(&self) -> &'static str {
        "fake"
    }

    async fn ping(&mut self) -> storefront_store::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> storefront_store::Result<()> {
        let _ = self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl StoreConnector for ReachableStore {
    async fn acquire(&self) -> storefront_store::Result<StoreConnectionHandle> {
        let _ = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(StoreConnectionHandle::new(Box::new(ReachableConnection {
            closed: self.closed.clone(),
        })))
    }

    fn describe(&self) -> String {
        "fake://localhost/d".to_string()
    }
}

struct UnreachableStore {
    attempts: AtomicUsize,
}

#[async_trait]
impl StoreConnector for UnreachableStore {
    async fn acquire(&self) -> storefront_store::Result<StoreConnectionHandle> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Timeout(Duration::from_millis(5)))
    }

    fn describe(&self) -> String {
        "fake://nowhere/d".to_string()
    }
}

fn server_with(
    settings: &StorefrontSettings,
    sessions: Arc<dyn SessionStore>,
    connector: Arc<dyn StoreConnector>,
) -> StorefrontServer {
    let bootstrap = Bootstrap::new(sessions, connector, settings.session.ttl());
    StorefrontServer::new(
        settings.server.clone(),
        Arc::new(bootstrap),
        &settings.session.cookie_name,
    )
}

async fn get(server: &StorefrontServer, cookie: Option<&str>) -> Response {
    let mut req = Request::builder().uri("/");
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    tokio::time::timeout(TIMEOUT, server.router().oneshot(req.body(Body::empty()).unwrap()))
        .await
        .unwrap()
        .unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `NAME=value` from the response's Set-Cookie header.
fn cookie_pair(resp: &Response) -> String {
    let raw = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn invalid_host_yields_only_failure_message() {
    let settings = settings_for("invalid-host");
    let sessions = Arc::new(MemorySessionStore::new());
    let connector = Arc::new(MySqlConnector::new(&settings.store));
    let server = server_with(&settings, sessions.clone(), connector);

    let resp = get(&server, None).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_text(resp).await, STORE_FAILURE_MESSAGE);
    assert_eq!(sessions.count().await.unwrap(), 0);
}

#[tokio::test]
async fn unreachable_store_is_attempted_once_per_request() {
    let settings = settings_for("localhost");
    let connector = Arc::new(UnreachableStore {
        attempts: AtomicUsize::new(0),
    });
    let server = server_with(
        &settings,
        Arc::new(MemorySessionStore::new()),
        connector.clone(),
    );

    for _ in 0..3 {
        let resp = get(&server, None).await;
        assert_eq!(body_text(resp).await, STORE_FAILURE_MESSAGE);
    }
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn reachable_store_renders_header_and_sets_cookie() {
    let settings = settings_for("localhost");
    let store = Arc::new(ReachableStore::default());
    let server = server_with(&settings, Arc::new(MemorySessionStore::new()), store.clone());

    let resp = get(&server, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("STOREFRONT_SESSID="), "{set_cookie}");
    assert!(set_cookie.contains("HttpOnly"), "{set_cookie}");

    let body = body_text(resp).await;
    assert!(body.starts_with(HEADER_MARKUP));
    assert!(body.contains("<title>E-Commerce Store</title>"));
    assert!(body.contains(r#"<div class="container">"#));

    assert_eq!(store.opened.load(Ordering::SeqCst), 1);
    assert_eq!(store.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cookie_resumes_the_same_session() {
    let settings = settings_for("localhost");
    let sessions = Arc::new(MemorySessionStore::new());
    let server = server_with(&settings, sessions.clone(), Arc::new(ReachableStore::default()));

    let first = get(&server, None).await;
    let cookie = cookie_pair(&first);

    let second = get(&server, Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(cookie_pair(&second), cookie);
    assert_eq!(sessions.count().await.unwrap(), 1);
}

#[tokio::test]
async fn forged_cookie_is_not_adopted() {
    let settings = settings_for("localhost");
    let sessions = Arc::new(MemorySessionStore::new());
    let server = server_with(&settings, sessions.clone(), Arc::new(ReachableStore::default()));

    let forged = format!("STOREFRONT_SESSID={}", "A".repeat(43));
    let resp = get(&server, Some(&forged)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_ne!(cookie_pair(&resp), forged);
}

#[tokio::test]
async fn concurrent_requests_get_independent_sessions() {
    let settings = settings_for("localhost");
    let sessions = Arc::new(MemorySessionStore::new());
    let server = Arc::new(server_with(
        &settings,
        sessions.clone(),
        Arc::new(ReachableStore::default()),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let server = server.clone();
            tokio::spawn(async move { cookie_pair(&get(&server, None).await) })
        })
        .collect();
    let mut cookies = Vec::new();
    for t in tasks {
        cookies.push(t.await.unwrap());
    }
    cookies.sort();
    cookies.dedup();
    assert_eq!(cookies.len(), 8);
    assert_eq!(sessions.count().await.unwrap(), 8);
}

#[tokio::test]
async fn sqlite_sessions_survive_a_new_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.db");
    let settings = settings_for("localhost");
    let config = storefront_session::sqlite::ConnectionConfig::default();

    let cookie = {
        let sessions = Arc::new(SqliteSessionStore::open(&path, &config).unwrap());
        let server = server_with(&settings, sessions, Arc::new(ReachableStore::default()));
        cookie_pair(&get(&server, None).await)
    };

    let sessions = Arc::new(SqliteSessionStore::open(&path, &config).unwrap());
    let server = server_with(&settings, sessions, Arc::new(ReachableStore::default()));
    let resp = get(&server, Some(&cookie)).await;
    assert_eq!(cookie_pair(&resp), cookie);
}

#[tokio::test]
async fn live_listener_serves_health() {
    let settings = settings_for("localhost");
    let server = Arc::new(server_with(
        &settings,
        Arc::new(MemorySessionStore::new()),
        Arc::new(ReachableStore::default()),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let running = server.clone();
    let serve = tokio::spawn(async move { running.serve(listener).await });

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(json["status"], "ok");

    server.shutdown().shutdown();
    tokio::time::timeout(TIMEOUT, serve).await.unwrap().unwrap().unwrap();
}
