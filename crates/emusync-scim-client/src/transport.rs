//! HTTP transport abstraction.
//!
//! The protocol layer talks to a [`Transport`] rather than to `reqwest`
//! directly: the trait's one primitive sends an immutable [`RestRequest`]
//! and yields a [`RestResponse`] for *every* HTTP status, reserving `Err`
//! for transport failures. Status classification happens above, in
//! [`RestResponse::error_for_status`]. There is no shared serializer state;
//! each request carries its own JSON body and each response parses locally.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use emusync_connector::error::{ConnectorError, ConnectorResult};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Get the method name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable HTTP request description.
///
/// Requests are never mutated in place; deriving the next request (for
/// pagination, say) builds a new value.
#[derive(Debug, Clone)]
pub struct RestRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl RestRequest {
    /// Create a request with the given method and URL.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a query parameter, replacing any existing values for the name.
    pub fn replacing_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.retain(|(existing, _)| existing != name);
        self.query.push((name.to_string(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Derive a GET request against another URL, carrying this request's
    /// headers (used when a response announces the next page's URL).
    pub fn derive_get(&self, url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: self.headers.clone(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Get the method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the URL (without query parameters added via [`Self::with_query`]).
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get the query parameters.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Get the first value of a query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get the JSON body, if any.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

/// A received HTTP response: status, headers, raw body.
#[derive(Debug, Clone)]
pub struct RestResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RestResponse {
    /// Create a response (transport implementations and tests).
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the first value of a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status is in the success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the body as text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    pub fn parse<T: DeserializeOwned>(&self) -> ConnectorResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ConnectorError::io_with_source(
                format!("failed to parse response body (status {})", self.status),
                e,
            )
        })
    }

    /// Classify a non-success status into the domain error taxonomy.
    ///
    /// Rate-limit responses carry the parsed `Retry-After` value so callers
    /// can apply their own backoff.
    pub fn error_for_status(self) -> ConnectorResult<RestResponse> {
        if self.is_success() {
            return Ok(self);
        }
        if self.status == 429 {
            let retry_after_secs = self.header("Retry-After").and_then(|v| v.parse().ok());
            return Err(ConnectorError::RateLimited { retry_after_secs });
        }
        let detail = self.text();
        let detail = if detail.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            detail
        };
        Err(ConnectorError::from_status(Some(self.status), detail))
    }
}

/// The one primitive the protocol layer needs from HTTP.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response, whatever its status.
    ///
    /// `Err` means the request could not be delivered or the response could
    /// not be read; provider-level rejections come back as `Ok` with a
    /// non-success status.
    async fn send(&self, request: &RestRequest) -> ConnectorResult<RestResponse>;
}

/// Production transport over a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the given timeouts and TLS verification.
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        tls_verify: bool,
    ) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .danger_accept_invalid_certs(!tls_verify)
            .user_agent(concat!("emusync-scim-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RestRequest) -> ConnectorResult<RestResponse> {
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url().clone());
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            ConnectorError::io_with_source(format!("request to {} failed", request.url()), e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ConnectorError::io_with_source("failed to read response body", e))?
            .to_vec();

        Ok(RestResponse::new(status, headers, body))
    }
}
