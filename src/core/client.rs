//! Authenticated HTTP client for the translation service

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::config::ApiToken;
use crate::core::errors::{Result, SyncError};

/// Header carrying the API token
pub const TOKEN_HEADER: &str = "X-API-Token";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A fully resolved request handed to the transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response returned by the transport
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Sends requests over the wire.
///
/// The client owns timeouts and response shaping; a transport only moves bytes.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await.map_err(|e| SyncError::Network {
            message: e.to_string(),
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| SyncError::Network {
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub api_token: Option<ApiToken>,
    pub timeout: Duration,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(ApiToken::new(token));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shaped response: parsed JSON plus status line and headers
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub data: serde_json::Value,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
}

impl ApiResponse {
    /// Response returned without a network call when no token is configured
    pub fn unauthorized() -> Self {
        Self {
            data: serde_json::json!({}),
            status: 401,
            status_text: "Unauthorized".to_string(),
            headers: BTreeMap::new(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// HTTP client that authenticates with `X-API-Token` and enforces a timeout
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ApiClientConfig>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client over the default `reqwest` transport
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: ApiClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn has_token(&self) -> bool {
        self.config.api_token.is_some()
    }

    /// GET `path` relative to the base URL
    pub async fn authenticated_get(&self, path: &str, opts: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::Get, path, None, opts).await
    }

    /// POST a JSON body to `path` relative to the base URL
    pub async fn authenticated_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOptions,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.request(Method::Post, path, Some(body), opts).await
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        opts: RequestOptions,
    ) -> Result<ApiResponse> {
        let Some(token) = &self.config.api_token else {
            debug!("No API token configured, skipping {} {}", method, path);
            return Ok(ApiResponse::unauthorized());
        };

        let url = self.url_for(path);
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (TOKEN_HEADER.to_string(), token.expose().to_string()),
        ];
        headers.extend(opts.headers);

        let request = HttpRequest {
            method,
            url: url.clone(),
            headers,
            body,
        };

        let timeout = opts.timeout.unwrap_or(self.config.timeout);
        debug!("{} {}", method, url);

        let response = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| SyncError::Timeout { after: timeout })??;

        debug!("{} {} -> {}", method, url, response.status);

        if !(200..300).contains(&response.status) {
            return Err(SyncError::Server {
                status: response.status,
                message: if response.body.is_empty() {
                    response.status_text
                } else {
                    response.body
                },
            });
        }

        let data = if response.body.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&response.body).map_err(|e| {
                SyncError::malformed(response.status, format!("invalid JSON body: {}", e))
            })?
        };

        Ok(ApiResponse {
            data,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
        })
    }
}
