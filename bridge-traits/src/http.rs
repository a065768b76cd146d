//! HTTP Client Abstraction
//!
//! Byte-oriented HTTP access used by the offline cache to pull audio streams
//! and cover images from the remote catalog API.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// GET request description
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Plain GET, the only verb the byte fetches need.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Bound the whole exchange, body included. Without it the request may
    /// run for as long as the server keeps sending.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Apply a timeout only when one is configured.
    pub fn maybe_timeout(self, duration: Option<Duration>) -> Self {
        match duration {
            Some(duration) => self.timeout(duration),
            None => self,
        }
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Async HTTP client trait
///
/// Implementations perform exactly one network attempt per call and report
/// non-2xx answers as a normal [`HttpResponse`]; only transport failures
/// (DNS, TLS, connection reset, timeout) become errors. Callers decide what
/// a 404 or 500 means for them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch(client: &dyn HttpClient) -> Result<bytes::Bytes> {
///     let response = client.execute(HttpRequest::get("https://api.example.com/a.mp3")).await?;
///     Ok(response.body)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// GET a resource and return the full response.
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse> {
        self.execute(HttpRequest::get(url).maybe_timeout(timeout))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://example.com/a.mp3")
            .header("User-Agent", "test")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/a.mp3");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_maybe_timeout() {
        let request = HttpRequest::get("https://example.com").maybe_timeout(None);
        assert!(request.timeout.is_none());

        let request =
            HttpRequest::get("https://example.com").maybe_timeout(Some(Duration::from_secs(5)));
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_http_response_status_checks() {
        assert!(HttpResponse::new(200, "test").is_success());
        assert!(HttpResponse::new(204, Bytes::new()).is_success());
        assert!(!HttpResponse::new(304, Bytes::new()).is_success());
        assert!(!HttpResponse::new(404, Bytes::new()).is_success());
        assert!(!HttpResponse::new(500, Bytes::new()).is_success());
    }
}
