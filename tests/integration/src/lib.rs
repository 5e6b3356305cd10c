//! Integration tests for the Waypost server stack.
//!
//! Each test starts an in-process server on an ephemeral port and talks to it
//! over real HTTP with `reqwest`.

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use waypost_accounts::{InMemoryAccountStore, LoginPayload, register_account_routes};
use waypost_auth::client::{format_date, insert_auth_headers};
use waypost_http::{AccessLogger, RouterBuilder, WaypostHttpService};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running server and a client pointed at it.
#[derive(Debug)]
pub struct TestServer {
    /// Address the server listens on.
    pub addr: SocketAddr,
    /// Shared HTTP client.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// POST `body` as JSON to `path`.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .body(body.to_string())
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {path} failed: {e}"))
    }

    /// Send a request to `path` signed with the given key pair.
    pub async fn signed(
        &self,
        method: http::Method,
        path: &str,
        public_key: &str,
        secret_key: &str,
    ) -> reqwest::Response {
        let uri: http::Uri = path.parse().expect("valid request path");
        let mut headers = http::HeaderMap::new();
        insert_auth_headers(
            &mut headers,
            &method,
            &uri,
            &format_date(chrono::Utc::now()),
            public_key,
            secret_key,
        )
        .expect("signable request");
        self.client
            .request(method, self.url(path))
            .headers(headers)
            .send()
            .await
            .unwrap_or_else(|e| panic!("signed {path} failed: {e}"))
    }

    /// Create an account and log in, returning its key pair.
    pub async fn sign_up(&self, email: &str, password: &str) -> LoginPayload {
        let created = self
            .post_json(
                "/api/v1/account/create",
                &serde_json::json!({"Name": "Test", "Email": email, "Password": password}),
            )
            .await;
        assert_eq!(created.status(), reqwest::StatusCode::OK, "sign up {email}");

        let login = self
            .post_json(
                "/api/v1/auth/login",
                &serde_json::json!({"Email": email, "Password": password}),
            )
            .await;
        assert_eq!(login.status(), reqwest::StatusCode::OK, "login {email}");
        let envelope: serde_json::Value = login.json().await.expect("login envelope");
        serde_json::from_value(envelope["Payloads"]["Login"][0].clone()).expect("login payload")
    }
}

/// Start a server with the account routes on an ephemeral port.
pub async fn spawn_server() -> TestServer {
    init_tracing();

    let store = Arc::new(InMemoryAccountStore::new());
    let mut builder = RouterBuilder::new("/api").post_processor(AccessLogger);
    register_account_routes(&mut builder, &store).expect("account routes register");
    let service = WaypostHttpService::new(Arc::new(builder.build().expect("router builds")));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");

    tokio::spawn(async move {
        let http = HttpConnBuilder::new(TokioExecutor::new());
        while let Ok((stream, peer)) = listener.accept().await {
            let conn = http
                .serve_connection(TokioIo::new(stream), service.for_peer(peer))
                .into_owned();
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::warn!(error = %e, "test connection error");
                }
            });
        }
    });

    TestServer {
        addr,
        client: reqwest::Client::new(),
    }
}

/// A unique email address for a test.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_owned();
    format!("{prefix}-{id}@example.com")
}

mod test_accounts;
mod test_routing;
