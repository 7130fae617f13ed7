//! HTTP Transport
//!
//! HTTP client interface and implementations for Southbay API requests.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{NetworkError, ProtocolError, SouthbayError, SouthbayResult};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute request URL, query string included.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: RequestBody,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Path component of the URL.
    pub fn path(&self) -> String {
        url::Url::parse(&self.url)
            .map(|url| url.path().to_string())
            .unwrap_or_default()
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// A file sent as one `multipart/form-data` part.
#[derive(Clone, Debug)]
pub struct MultipartFile {
    /// Form field name.
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Request body.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized JSON document.
    Json(Bytes),
    Multipart(MultipartFile),
}

impl RequestBody {
    /// JSON body as a value, for assertions and logging.
    pub fn as_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Json(bytes) => serde_json::from_slice(bytes).ok(),
            _ => None,
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lower-cased names.
    pub headers: HashMap<String, String>,
    /// Response body.
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

    /// JSON response with the matching content type.
    pub fn json<T: serde::Serialize>(status: u16, body: &T) -> Self {
        Self::new(status, serde_json::to_vec(body).unwrap_or_default())
            .with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON.
    pub fn json_body<T: serde::de::DeserializeOwned>(&self) -> SouthbayResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            SouthbayError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })
    }
}

/// HTTP transport interface (for dependency injection).
///
/// Non-2xx statuses are returned as responses; only failures to exchange a
/// request at all are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> SouthbayResult<HttpResponse>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestHttpTransport {
    /// Create transport with the given default timeout.
    pub fn new(timeout: Duration) -> SouthbayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::RequestBuild {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    fn build_multipart(file: &MultipartFile) -> SouthbayResult<reqwest::multipart::Form> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.filename.clone());
        let part = if file.content_type.is_empty() {
            part
        } else {
            part.mime_str(&file.content_type)
                .map_err(|e| NetworkError::RequestBuild {
                    message: e.to_string(),
                })?
        };
        Ok(reqwest::multipart::Form::new().part(file.field.clone(), part))
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> SouthbayResult<HttpResponse> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        req_builder = match &request.body {
            RequestBody::Empty => req_builder,
            RequestBody::Json(bytes) => req_builder.body(bytes.clone()),
            RequestBody::Multipart(file) => req_builder.multipart(Self::build_multipart(file)?),
        };

        let response = req_builder.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                SouthbayError::Network(NetworkError::Timeout { timeout })
            } else if e.is_builder() {
                SouthbayError::Network(NetworkError::RequestBuild {
                    message: e.to_string(),
                })
            } else {
                SouthbayError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response.bytes().await.map_err(|e| {
            SouthbayError::Protocol(ProtocolError::InvalidResponse {
                message: e.to_string(),
            })
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[derive(Clone, Debug)]
enum MockReply {
    Response(HttpResponse),
    ConnectionFailed(String),
}

#[derive(Debug)]
struct MockRoute {
    path: String,
    replies: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

/// Mock HTTP transport for testing.
///
/// Replies can be registered per URL path (exact match); those are consumed
/// in order, then the path's fallback applies. Requests to unregistered
/// paths take from the global queue, then the global default.
#[derive(Default)]
pub struct MockHttpTransport {
    routes: Mutex<Vec<MockRoute>>,
    responses: Mutex<VecDeque<HttpResponse>>,
    default_response: Mutex<Option<HttpResponse>>,
    request_history: Mutex<Vec<HttpRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for any unrouted request.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Queue a JSON response for any unrouted request.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        self.queue_response(HttpResponse::json(status, body))
    }

    /// Set default response when nothing else matches.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *self.default_response.lock() = Some(response);
        self
    }

    /// Queue a response for one path.
    pub fn on_path(&self, path: &str, response: HttpResponse) -> &Self {
        self.push_route_reply(path, MockReply::Response(response));
        self
    }

    /// Queue a JSON response for one path.
    pub fn on_path_json<T: serde::Serialize>(&self, path: &str, status: u16, body: &T) -> &Self {
        self.on_path(path, HttpResponse::json(status, body))
    }

    /// Queue a connection failure for one path.
    pub fn fail_path(&self, path: &str, message: &str) -> &Self {
        self.push_route_reply(path, MockReply::ConnectionFailed(message.to_string()));
        self
    }

    /// Response for a path once its queue is drained.
    pub fn set_path_default(&self, path: &str, response: HttpResponse) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|route| route.path == path) {
            Some(route) => route.fallback = Some(MockReply::Response(response)),
            None => routes.push(MockRoute {
                path: path.to_string(),
                replies: VecDeque::new(),
                fallback: Some(MockReply::Response(response)),
            }),
        }
        self
    }

    /// Delay every reply, so concurrent callers overlap.
    pub fn set_latency(&self, latency: Duration) -> &Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().last().cloned()
    }

    /// Requests whose URL path equals `path`.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.request_history
            .lock()
            .iter()
            .filter(|request| request.path() == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.request_history.lock().len()
    }

    /// Clear request history.
    pub fn clear_history(&self) {
        self.request_history.lock().clear();
    }

    fn push_route_reply(&self, path: &str, reply: MockReply) {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|route| route.path == path) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(MockRoute {
                path: path.to_string(),
                replies: VecDeque::from([reply]),
                fallback: None,
            }),
        }
    }

    fn next_reply(&self, path: &str) -> Option<MockReply> {
        {
            let mut routes = self.routes.lock();
            if let Some(route) = routes.iter_mut().find(|route| route.path == path) {
                if let Some(reply) = route.replies.pop_front() {
                    return Some(reply);
                }
                if let Some(fallback) = &route.fallback {
                    return Some(fallback.clone());
                }
            }
        }

        self.responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.lock().clone())
            .map(MockReply::Response)
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> SouthbayResult<HttpResponse> {
        let path = request.path();
        self.request_history.lock().push(request);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.next_reply(&path) {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::ConnectionFailed(message)) => {
                Err(SouthbayError::Network(NetworkError::ConnectionFailed { message }))
            }
            None => Err(SouthbayError::Network(NetworkError::ConnectionFailed {
                message: format!("No mock response available for {}", path),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: HashMap::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_mock_transport() {
        let transport = MockHttpTransport::new();
        transport.queue_json_response(200, &serde_json::json!({"key": "value"}));

        let response = transport.send(get("https://example.com/v1/stores")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let history = transport.get_requests();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].path(), "/v1/stores");
    }

    #[tokio::test]
    async fn test_mock_routes_take_precedence_and_fall_back() {
        let transport = MockHttpTransport::new();
        transport
            .on_path_json("/auth/refresh", 200, &serde_json::json!({"token": "t"}))
            .set_path_default("/auth/refresh", HttpResponse::new(500, ""))
            .queue_response(HttpResponse::new(204, ""));

        let first = transport.send(get("http://api/auth/refresh")).await.unwrap();
        let second = transport.send(get("http://api/auth/refresh")).await.unwrap();
        let other = transport.send(get("http://api/v1/people")).await.unwrap();

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 500);
        assert_eq!(other.status, 204);
        assert_eq!(transport.requests_to("/auth/refresh").len(), 2);
    }

    #[tokio::test]
    async fn test_mock_failures_are_network_errors() {
        let transport = MockHttpTransport::new();
        transport.fail_path("/v1/stores", "connection reset");

        let error = transport.send(get("http://api/v1/stores")).await.unwrap_err();
        assert!(error.is_retryable());

        let error = transport.send(get("http://api/v1/stores")).await.unwrap_err();
        assert!(error.to_string().contains("No mock response"));
    }

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
