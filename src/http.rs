//! HTTP client abstraction for talking to the marketplace API.
//!
//! This module defines the `HttpClient` trait to abstract request execution,
//! so the remote store can be tested against a mock without a server.

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Response from an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single call to the API, relative to a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: String,
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// JSON body, empty for none
    pub body: String,
}

impl ApiRequest {
    pub fn get(base_url: &str, path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            path: path.into(),
            query: Vec::new(),
            body: String::new(),
        }
    }

    pub fn post<T: Serialize>(base_url: &str, path: impl Into<String>, body: &T) -> Result<Self> {
        Self::with_json("POST", base_url, path, body)
    }

    pub fn put<T: Serialize>(base_url: &str, path: impl Into<String>, body: &T) -> Result<Self> {
        Self::with_json("PUT", base_url, path, body)
    }

    fn with_json<T: Serialize>(
        method: &str,
        base_url: &str,
        path: impl Into<String>,
        body: &T,
    ) -> Result<Self> {
        Ok(Self {
            method: method.to_string(),
            body: serde_json::to_string(body)?,
            ..Self::get(base_url, path)
        })
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}

/// Trait for executing HTTP requests.
///
/// # Example
/// ```ignore
/// let client = ReqwestHttpClient::new();
/// let response = client.execute(&request, "session-token", 10_000).await?;
/// println!("Status: {}, Body: {}", response.status, response.body);
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync + Clone {
    /// Execute an HTTP request.
    ///
    /// # Arguments
    /// * `request` - Method, URL, query and body
    /// * `token` - Session token sent as `Authorization: Bearer`; empty sends none
    /// * `timeout_ms` - Request timeout in milliseconds
    ///
    /// Only transport failures are errors here. Non-2xx responses are returned
    /// as-is and interpreted by the caller.
    async fn execute(&self, request: &ApiRequest, token: &str, timeout_ms: u64) -> Result<HttpResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already configured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request, token), fields(method = %request.method, path = %request.path))]
    async fn execute(&self, request: &ApiRequest, token: &str, timeout_ms: u64) -> Result<HttpResponse> {
        let url = request.url();

        tracing::debug!(url = %url, timeout_ms = timeout_ms, "Executing HTTP request");

        let method: reqwest::Method = request.method.parse().map_err(|e| {
            tracing::error!(method = %request.method, error = %e, "Invalid HTTP method");
            anyhow::anyhow!("Invalid HTTP method '{}': {}", request.method, e)
        })?;

        let mut req = self
            .client
            .request(method, &url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        if !token.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        if !request.body.is_empty() {
            req = req
                .header("Content-Type", "application/json")
                .body(request.body.clone());
            tracing::trace!(body_len = request.body.len(), "Added request body");
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "HTTP request failed");
            e
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status = status, response_len = body.len(), "HTTP request completed");

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Mock HTTP client for testing.
///
/// Responses are keyed by `"{method} {path}"`, without the query string.
///
/// # Example
/// ```ignore
/// let mock = MockHttpClient::new();
/// mock.add_response(
///     "GET /buyer/rental-requests",
///     Ok(HttpResponse { status: 200, body: "[]".to_string() }),
/// );
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

/// A mock response that can optionally wait for a trigger before completing.
enum MockResponse {
    Immediate(Result<HttpResponse>),
    Triggered {
        response: Result<HttpResponse>,
        trigger: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    },
}

/// Record of a call made to the mock HTTP client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: String,
    pub token: String,
    pub timeout_ms: u64,
}

impl MockCall {
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `key`. Responses for the same key are returned in FIFO order.
    pub fn add_response(&self, key: &str, response: Result<HttpResponse>) {
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Immediate(response));
    }

    /// Shorthand for a successful JSON response.
    pub fn add_json(&self, key: &str, status: u16, body: serde_json::Value) {
        self.add_response(
            key,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Queue a response that is held back until the returned sender fires (or is dropped).
    pub fn add_response_with_trigger(&self, key: &str, response: Result<HttpResponse>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Triggered {
                response,
                trigger: Arc::new(Mutex::new(Some(rx))),
            });
        tx
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of requests currently executing.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: &ApiRequest, token: &str, timeout_ms: u64) -> Result<HttpResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        self.calls.lock().push(MockCall {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            token: token.to_string(),
            timeout_ms,
        });

        let key = format!("{} {}", request.method, request.path);
        let mock_response = {
            let mut responses = self.responses.lock();
            match responses.get_mut(&key) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        match mock_response {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                let rx = trigger.lock().take();
                if let Some(rx) = rx {
                    // proceed whether triggered or dropped
                    let _ = rx.await;
                }
                response
            }
            None => Err(crate::error::ToolhireError::Other(anyhow::anyhow!(
                "No mock response configured for {}",
                key
            ))),
        }
    }
}

/// Decrements the in-flight counter when dropped, including on cancellation.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
