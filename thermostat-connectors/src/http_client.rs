//! HTTP client with a pluggable transport.
//!
//! Provides the request rules the agent relies on:
//! - GET never carries a body and does not follow redirects
//! - POST/PUT/DELETE carry the supplied body and follow redirects
//! - Every response body is collected into a fresh `ResponseBuffer`
//! - Every request is bounded by a timeout
//!
//! # Transport
//!
//! `HttpTransport` is the seam. `ReqwestTransport` is the production
//! implementation; tests swap in recording transports or point the real
//! one at a mock server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use thermostat_domain::HttpMethod;

// =============================================================================
// Constants
// =============================================================================

/// Default per-request bound, shorter than the default poll interval
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Redirect hops followed by mutating requests
const MAX_REDIRECTS: usize = 10;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the HTTP client.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// Underlying client could not be constructed
    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(String),

    /// Request could not be delivered (DNS, connect, reset)
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Request did not finish within its bound
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),
}

// =============================================================================
// Request / Response
// =============================================================================

/// Whether a request follows redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Follow up to a fixed number of hops
    Follow,
    /// Return the redirect response as-is
    None,
}

/// A fully resolved request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
    pub redirect: RedirectPolicy,
}

impl HttpRequest {
    /// Build a request applying the verb rules.
    ///
    /// A body handed to GET is dropped. Mutating verbs always carry a body,
    /// empty when none was given.
    pub fn new(method: HttpMethod, url: impl Into<String>, body: Option<&str>) -> Self {
        let url = url.into();

        if method.is_mutating() {
            Self {
                method,
                url,
                body: Some(body.unwrap_or_default().to_string()),
                redirect: RedirectPolicy::Follow,
            }
        } else {
            if body.is_some() {
                warn!(%url, "Ignoring body supplied for GET request");
            }
            Self {
                method,
                url,
                body: None,
                redirect: RedirectPolicy::None,
            }
        }
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

// =============================================================================
// Response Buffer
// =============================================================================

/// Accumulates a response body chunk by chunk.
///
/// One buffer is allocated per response and consumed by `into_text`, so
/// nothing received for one request can show up in another.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one received chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Bytes received so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Nothing received yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Release the buffer as text. Invalid UTF-8 is replaced, never dropped.
    pub fn into_text(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Sends a resolved request and returns the collected response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one request. Non-2xx statuses are errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Production transport on top of `reqwest`.
pub struct ReqwestTransport {
    /// Client for mutating verbs
    following: Client,
    /// Client for GET
    direct: Client,
    /// Per-request bound
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build both underlying clients.
    pub fn new(request_timeout: Duration) -> Result<Self, HttpError> {
        let following = Client::builder()
            .timeout(request_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| HttpError::ClientInit(e.to_string()))?;

        let direct = Client::builder()
            .timeout(request_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| HttpError::ClientInit(e.to_string()))?;

        Ok(Self {
            following,
            direct,
            timeout: request_timeout,
        })
    }

    fn client_for(&self, policy: RedirectPolicy) -> &Client {
        match policy {
            RedirectPolicy::Follow => &self.following,
            RedirectPolicy::None => &self.direct,
        }
    }

    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client_for(request.redirect).request(method, &request.url);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout)
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();

        let mut buffer = ResponseBuffer::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))?
        {
            buffer.extend(&chunk);
        }
        let body = buffer.into_text();

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        timeout(self.timeout, self.perform(request))
            .await
            .map_err(|_| HttpError::Timeout(self.timeout))?
    }
}

// =============================================================================
// HTTP Client
// =============================================================================

/// HTTP client issuing GET/POST/PUT/DELETE through a transport.
pub struct HttpClient<T: HttpTransport = ReqwestTransport> {
    transport: T,
}

impl HttpClient<ReqwestTransport> {
    /// Create a client on the production transport.
    pub fn new(request_timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            transport: ReqwestTransport::new(request_timeout)?,
        })
    }
}

impl<T: HttpTransport> HttpClient<T> {
    /// Create a client on a custom transport.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue one request of `method` to `url`.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::new(method, url, body);
        debug!(method = %request.method, url = %request.url, "Sending request");

        let response = self.transport.execute(request).await?;
        debug!(%method, %url, status = response.status, bytes = response.body.len(), "Request completed");
        Ok(response)
    }

    /// GET `url` and return the full body.
    pub async fn get(&self, url: &str) -> Result<String, HttpError> {
        Ok(self.request(HttpMethod::Get, url, None).await?.body)
    }

    /// POST `body` to `url`.
    pub async fn post(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError> {
        self.request(HttpMethod::Post, url, Some(body)).await
    }
}

// =============================================================================
// Recording transport (tests)
// =============================================================================


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::recording::RecordingTransport;
    use super::*;

    #[test]
    fn test_get_request_never_carries_body() {
        let request = HttpRequest::new(HttpMethod::Get, "http://x/status", Some("ignored"));
        assert_eq!(request.body, None);
        assert_eq!(request.redirect, RedirectPolicy::None);
    }

    #[test]
    fn test_mutating_request_carries_body_and_follows() {
        for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
            let request = HttpRequest::new(method, "http://x/m", Some("72.5"));
            assert_eq!(request.body.as_deref(), Some("72.5"));
            assert_eq!(request.redirect, RedirectPolicy::Follow);
        }

        let empty = HttpRequest::new(HttpMethod::Delete, "http://x/m", None);
        assert_eq!(empty.body.as_deref(), Some(""));
    }

    #[test]
    fn test_response_buffer_accumulates_chunks() {
        let mut buffer = ResponseBuffer::new();
        assert!(buffer.is_empty());

        buffer.extend(b"tr");
        buffer.extend(b"ue");
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.into_text(), "true");
    }

    #[test]
    fn test_response_buffer_lossy_utf8() {
        let mut buffer = ResponseBuffer::new();
        buffer.extend(&[b't', 0xff]);
        assert_eq!(buffer.into_text(), "t\u{fffd}");
    }

    #[tokio::test]
    async fn test_client_get_returns_body() {
        let client = HttpClient::with_transport(RecordingTransport::replying("false"));

        let body = client.get("http://x/status").await.unwrap();

        assert_eq!(body, "false");
        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "http://x/status");
    }

    #[tokio::test]
    async fn test_client_propagates_transport_error() {
        let transport = RecordingTransport::default();
        transport.push(Err(HttpError::RequestFailed("connection refused".to_string())));
        let client = HttpClient::with_transport(transport);

        let err = client.post("http://x/m", "1").await.unwrap_err();
        assert!(matches!(err, HttpError::RequestFailed(_)));
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT).is_ok());
    }
}
