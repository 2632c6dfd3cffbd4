//! Exposes an in-process math service for use in integration tests.
//!
//! ```
//! use mathservice_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = TestServer::new().await;
//!     let response = server.get("/health").await.unwrap();
//!     assert!(response.status().is_success());
//! }
//! ```

use std::net::SocketAddr;

use mathservice_server::web::{self, App};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client, Response};
use serde::Serialize;

/// A math service running on a random port on localhost.
///
/// The server runs the full application including middleware and the real simulated delay. It
/// shares the runtime of the test and is aborted when dropped, without waiting for pending
/// requests.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    addr: SocketAddr,
    client: Client,
}

impl TestServer {
    /// Starts a new test server.
    pub async fn new() -> Self {
        let listener = web::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .expect("failed to bind test server");
        let addr = listener
            .local_addr()
            .expect("test server has no local address");

        let handle = tokio::spawn(async move {
            App::new()
                .serve(listener)
                .await
                .expect("test server failed");
        });

        Self {
            handle,
            addr,
            client: Client::new(),
        }
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://{}/{}", self.addr, path)
    }

    /// Sends `GET` to the given path.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.client.get(self.url(path)).send().await
    }

    /// Sends an addition request with the given value as JSON body.
    ///
    /// The value does not need to be a valid `AddRequest`, so this can send malformed operands too.
    pub async fn add<T: Serialize + ?Sized>(&self, body: &T) -> reqwest::Result<Response> {
        self.client.post(self.url("/")).json(body).send().await
    }

    /// Sends an addition request with a raw body and an optional `Content-Type` header.
    pub async fn add_raw(
        &self,
        content_type: Option<&str>,
        body: impl Into<Body>,
    ) -> reqwest::Result<Response> {
        let mut request = self.client.post(self.url("/")).body(body);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        request.send().await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
