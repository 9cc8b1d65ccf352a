//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::compression::predicate::SizeAbove;
use tower_http::compression::CompressionLayer;

use profile_server::auth::{Role, SessionTokens};
use profile_server::config::ServerConfig;
use profile_server::services::{
    AppInfo, EngineError, IngestError, IngestInput, Ingester, InMemoryUserStore, QueryEngine,
    QueryKind, QueryOutput, QueryRequest, UserStore,
};
use profile_server::{Collaborators, HttpServer};

pub const SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "hunter2";

/// Config with a base path and nothing else turned on.
pub fn open_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.base_url = "/pyroscope".into();
    config.auth.jwt_secret = SECRET.into();
    config
}

/// Config with username/password auth, which gates query, browser and
/// secure diagnostic routes.
pub fn auth_config() -> ServerConfig {
    let mut config = open_config();
    config.auth.internal.enabled = true;
    config.auth.internal.signup_enabled = true;
    config
}

/// Store seeded with one user per role, named after the role.
pub async fn seeded_users() -> InMemoryUserStore {
    let users = InMemoryUserStore::new();
    for role in [Role::ReadOnly, Role::Agent, Role::Editor, Role::Admin] {
        users
            .create(&role.as_str().to_lowercase(), PASSWORD, role)
            .await
            .unwrap();
    }
    users
}

/// Session token signed the way the server signs its own.
pub fn token_for(config: &ServerConfig, user: &str, role: Role) -> String {
    SessionTokens::new(
        config.auth.jwt_secret.as_bytes(),
        Duration::from_secs(3600),
        config.auth.cookie_name.clone(),
    )
    .issue(user, role)
    .unwrap()
}

pub fn server(config: ServerConfig, collaborators: Collaborators) -> HttpServer {
    HttpServer::new(config, collaborators, None).unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Engine that counts calls and optionally stalls before answering.
#[derive(Default)]
pub struct CountingEngine {
    pub calls: AtomicUsize,
    pub delay: Duration,
    /// Extra bytes added to every query answer.
    pub padding: usize,
}

impl CountingEngine {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn padded(padding: usize) -> Self {
        Self {
            padding,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEngine for CountingEngine {
    async fn query(&self, kind: QueryKind, _request: QueryRequest) -> Result<QueryOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        QueryOutput::json(&serde_json::json!({
            "kind": kind.as_str(),
            "padding": "x".repeat(self.padding),
        }))
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![AppInfo {
            name: "checkout.cpu".into(),
        }])
    }

    async fn delete_app(&self, _name: &str) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn debug_export(&self, db: &str) -> Result<Bytes, EngineError> {
        Err(EngineError::NotFound(db.to_string()))
    }
}

/// Ingester that keeps every body it receives.
#[derive(Default)]
pub struct RecordingIngester {
    pub bodies: Mutex<Vec<Bytes>>,
}

#[async_trait]
impl Ingester for RecordingIngester {
    async fn ingest(&self, input: IngestInput) -> Result<(), IngestError> {
        self.bodies.lock().unwrap().push(input.body);
        Ok(())
    }
}

/// Gzip `payload` with the same encoder the server compresses with.
pub async fn gzip(payload: &'static [u8]) -> Bytes {
    let router = Router::new()
        .route("/", axum::routing::get(move || async move { payload }))
        .layer(CompressionLayer::new().compress_when(SizeAbove::new(0)));
    let request = Request::get("/")
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let response = send(router, request).await;
    assert_eq!(response.headers()["content-encoding"], "gzip");
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

/// Collaborators with the given engine and user store, noop elsewhere.
pub fn collaborators(engine: Arc<CountingEngine>, users: InMemoryUserStore) -> Collaborators {
    let mut collaborators = Collaborators::standalone(Arc::new(users));
    collaborators.engine = engine as Arc<dyn QueryEngine>;
    collaborators
}

/// Raw HTTP/1.1 upstream that answers every request with `status` and
/// `body`, and records each request head it received.
pub async fn start_mock_upstream(
    status: u16,
    body: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorder = recorder.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                recorder
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());

                let response = format!(
                    "HTTP/1.1 {status} Upstream\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
