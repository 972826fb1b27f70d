use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

use super::{ApiError, ApiResult};

/// One outgoing HTTP call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// A raw response: status plus body bytes. Status interpretation and
/// envelope decoding happen in the client, not here.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The seam between the request wrapper and the wire.
///
/// Production uses [`ReqwestTransport`]; tests script responses through
/// their own implementations, which is how the refresh/retry behavior
/// is exercised without a server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

/// reqwest-backed transport with a cookie jar, so the session cookies
/// set by the auth endpoints ride along on every subsequent call
/// (`credentials: include` semantics). The client never sees token
/// values.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ApiResult<Arc<Self>> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(Arc::new(Self { client }))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
