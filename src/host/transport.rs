//! Transport Layer for the job client
//!
//! Abstracts HTTP access for testability. Provides:
//! - Transport trait: interface for submitting requests and fetching resources
//! - MockTransport: scripted in-process responses for tests
//! - HttpTransport: real HTTP client for production
//!
//! Timeouts belong here, not in the client. The client never retries.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Transport trait for WPS communication
pub trait Transport: Send + Sync {
    /// POST an Execute payload to the server and return the response body
    fn send(&self, server_address: &str, payload: &str) -> Result<String, TransportError>;

    /// GET a resource (status document or artifact) and return its bytes
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to read response: {0}")]
    Body(String),

    #[error("No response scripted for {0}")]
    NotScripted(String),
}

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Whole-request timeout in seconds
    pub timeout_seconds: u64,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: format!("wps-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP transport for production use
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    fn map_error(url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(url.to_string())
        } else {
            TransportError::ConnectionFailed(format!("{}: {}", url, err))
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, server_address: &str, payload: &str) -> Result<String, TransportError> {
        tracing::debug!(server = server_address, "Sending the request:\n{}", payload);

        let response = self
            .client
            .post(server_address)
            .header("Content-Type", "text/xml; charset=\"UTF-8\"")
            .body(payload.to_string())
            .send()
            .map_err(|e| Self::map_error(server_address, e))?;

        let status = response.status();
        tracing::debug!(status = %status, "Request info");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: server_address.to_string(),
            });
        }

        let body = response
            .text()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        tracing::debug!("Response:\n{}", body);
        Ok(body)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Self::map_error(url, e))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

/// Mock transport for testing - answers from scripted responses
///
/// `send` returns the scripted acknowledgement. `fetch` pops the next
/// scripted response for that URL; the last one is repeated once the queue
/// is down to a single entry.
#[derive(Default)]
pub struct MockTransport {
    ack: Mutex<Option<Result<String, TransportError>>>,
    responses: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, TransportError>>>>,
    sent: Mutex<Vec<(String, String)>>,
    fetched: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a new mock transport with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response to `send`
    pub fn with_ack(self, body: impl Into<String>) -> Self {
        *lock(&self.ack) = Some(Ok(body.into()));
        self
    }

    /// Make `send` fail
    pub fn with_send_error(self, err: TransportError) -> Self {
        *lock(&self.ack) = Some(Err(err));
        self
    }

    /// Queue a text response for `url`
    pub fn with_response(self, url: &str, body: impl Into<String>) -> Self {
        self.push(url, Ok(body.into().into_bytes()));
        self
    }

    /// Queue a binary response for `url`
    pub fn with_bytes(self, url: &str, body: Vec<u8>) -> Self {
        self.push(url, Ok(body));
        self
    }

    /// Queue a failure for `url`
    pub fn with_fetch_error(self, url: &str, err: TransportError) -> Self {
        self.push(url, Err(err));
        self
    }

    /// Queue a response after construction
    pub fn push(&self, url: &str, response: Result<Vec<u8>, TransportError>) {
        lock(&self.responses)
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Payloads passed to `send`, as (server, payload)
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }

    /// URLs passed to `fetch`, in order
    pub fn fetched(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }

    /// Number of fetches made for `url`
    pub fn fetch_count(&self, url: &str) -> usize {
        lock(&self.fetched).iter().filter(|u| *u == url).count()
    }
}

impl Transport for MockTransport {
    fn send(&self, server_address: &str, payload: &str) -> Result<String, TransportError> {
        lock(&self.sent).push((server_address.to_string(), payload.to_string()));
        lock(&self.ack)
            .clone()
            .unwrap_or_else(|| Err(TransportError::NotScripted(server_address.to_string())))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        lock(&self.fetched).push(url.to_string());
        let mut responses = lock(&self.responses);
        let queue = responses
            .get_mut(url)
            .ok_or_else(|| TransportError::NotScripted(url.to_string()))?;
        let entry = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        entry.unwrap_or_else(|| Err(TransportError::NotScripted(url.to_string())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
