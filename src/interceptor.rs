/*!
 * Network interception for caption payloads.
 *
 * `install` wraps the host's request primitive in an `InterceptingExchange`.
 * The wrapper is a silent observer: every request goes to the inner exchange
 * unchanged, every result (success or failure) comes back to the caller
 * unchanged, and completed responses whose URL carries the caption marker
 * are copied onto the bridge as a side effect.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{Client, Method};

use crate::bridge::{Bridge, CaptionPayload, Delivery};
use crate::errors::ProviderError;

/// Method and URL captured when a request is begun
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// HTTP method
    pub method: String,
    /// Request URL
    pub url: String,
}

/// A completed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, `None` when it could not be read as text
    pub body: Option<String>,
}

/// The host's request primitive: begin a request, then send it
#[async_trait]
pub trait HttpExchange: Send + Sync {
    /// Begin a request, capturing method and URL
    fn open(&self, method: &str, url: &str) -> RequestLine {
        RequestLine {
            method: method.to_string(),
            url: url.to_string(),
        }
    }

    /// Send a begun request and wait for completion
    async fn send(&self, request: &RequestLine, body: Option<String>) -> Result<ExchangeResponse, ProviderError>;
}

/// `HttpExchange` backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestExchange {
    /// HTTP client for requests
    client: Client,
}

impl ReqwestExchange {
    /// Create an exchange with the given request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn send(&self, request: &RequestLine, body: Option<String>) -> Result<ExchangeResponse, ProviderError> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid method {}: {}", request.method, e)))?;

        let mut builder = self.client.request(method, &request.url);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.ok();

        Ok(ExchangeResponse { status, body })
    }
}

/// Observer wrapped around an inner exchange
#[derive(Debug)]
pub struct InterceptingExchange<E> {
    inner: E,
    bridge: Bridge,
    marker: String,
}

/// Install interception around `inner`, forwarding caption payloads to `bridge`
///
/// `marker` is the substring that identifies caption-fetch URLs; it is
/// matched case-insensitively.
pub fn install<E: HttpExchange>(inner: E, bridge: Bridge, marker: &str) -> InterceptingExchange<E> {
    debug!("Installing caption interception for URLs containing '{}'", marker);
    InterceptingExchange {
        inner,
        bridge,
        marker: marker.to_lowercase(),
    }
}

impl<E> InterceptingExchange<E> {
    /// Whether a URL identifies a caption fetch
    pub fn is_caption_url(&self, url: &str) -> bool {
        url.to_lowercase().contains(&self.marker)
    }

    /// The wrapped exchange
    pub fn inner(&self) -> &E {
        &self.inner
    }

    fn observe(&self, request: &RequestLine, response: &ExchangeResponse) {
        if !self.is_caption_url(&request.url) {
            return;
        }

        let Some(body) = response.body.as_ref() else {
            debug!("Caption response from {} had no readable body", request.url);
            return;
        };

        let delivery = self.bridge.emit(CaptionPayload {
            data: body.clone(),
            url: request.url.clone(),
        });

        if delivery == Delivery::Delivered {
            debug!("Forwarded caption payload ({} bytes, status {}) from {}", body.len(), response.status, request.url);
        }
    }
}

#[async_trait]
impl<E: HttpExchange> HttpExchange for InterceptingExchange<E> {
    fn open(&self, method: &str, url: &str) -> RequestLine {
        let line = self.inner.open(method, url);
        trace!("Observed {} {}", line.method, line.url);
        line
    }

    async fn send(&self, request: &RequestLine, body: Option<String>) -> Result<ExchangeResponse, ProviderError> {
        let result = self.inner.send(request, body).await;

        if let Ok(response) = &result {
            self.observe(request, response);
        }

        result
    }
}
