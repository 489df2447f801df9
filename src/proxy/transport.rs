//! Single-call HTTP invoker.
//!
//! # Responsibilities
//! - Resolve an instance into a request URL once, at construction
//! - Perform exactly one outbound call per invocation
//! - Delegate body encoding/decoding to a [`Codec`]
//!
//! # Design Decisions
//! - One pooled client is shared by every instance; it speaks http and https
//! - A per-call timeout bounds each round trip, body included; retrying is not done here
//! - Non-2xx responses are transport errors (the body is not decoded)

use async_trait::async_trait;
use reqwest::header;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult};
use crate::proxy::instance::Instance;
use crate::proxy::invoker::Invoker;

/// Upper bound on a buffered upstream response body.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Pooled HTTP client used for outbound calls.
pub type HttpClient = reqwest::Client;

/// Build the shared outbound client. Instances are called directly;
/// proxy environment variables are ignored.
pub fn http_client() -> ProxyResult<HttpClient> {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .map_err(|e| ProxyError::Transport {
            instance: "outbound client".to_string(),
            message: e.to_string(),
        })
}

/// Serializes requests and deserializes responses for the wire.
pub trait Codec<Req, Resp>: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn encode(&self, request: &Req) -> ProxyResult<Vec<u8>>;
    fn decode(&self, body: &[u8]) -> ProxyResult<Resp>;
}

/// JSON bodies via serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<Req, Resp> Codec<Req, Resp> for JsonCodec
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, request: &Req) -> ProxyResult<Vec<u8>> {
        serde_json::to_vec(request).map_err(|e| ProxyError::Codec(e.to_string()))
    }

    fn decode(&self, body: &[u8]) -> ProxyResult<Resp> {
        serde_json::from_slice(body).map_err(|e| ProxyError::Codec(e.to_string()))
    }
}

/// Invokes one upstream instance over HTTP.
pub struct HttpInvoker<C = JsonCodec> {
    instance: Instance,
    url: Url,
    client: HttpClient,
    codec: C,
    timeout: Duration,
}

impl HttpInvoker<JsonCodec> {
    /// Create a JSON invoker. Fails if the instance address is malformed.
    pub fn new(
        instance: &Instance,
        default_path: &str,
        client: HttpClient,
        timeout: Duration,
    ) -> ProxyResult<Self> {
        Self::with_codec(instance, default_path, client, timeout, JsonCodec)
    }
}

impl<C> HttpInvoker<C> {
    /// Create an invoker with a custom codec.
    pub fn with_codec(
        instance: &Instance,
        default_path: &str,
        client: HttpClient,
        timeout: Duration,
        codec: C,
    ) -> ProxyResult<Self> {
        let url = instance.resolve(default_path)?;
        tracing::debug!(instance = %instance, url = %url, "HTTP invoker created");

        Ok(Self {
            instance: instance.clone(),
            url,
            client,
            codec,
            timeout,
        })
    }

    fn transport_error(&self, message: impl ToString) -> ProxyError {
        ProxyError::Transport {
            instance: self.instance.address().to_string(),
            message: message.to_string(),
        }
    }

    fn request_error(&self, error: reqwest::Error) -> ProxyError {
        if error.is_timeout() {
            ProxyError::Timeout {
                instance: self.instance.address().to_string(),
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            self.transport_error(error)
        }
    }
}

#[async_trait]
impl<Req, Resp, C> Invoker<Req, Resp> for HttpInvoker<C>
where
    C: Codec<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, request: Req) -> ProxyResult<Resp> {
        let body = self.codec.encode(&request)?;

        let mut response = self
            .client
            .get(self.url.clone())
            .header(header::CONTENT_TYPE, self.codec.content_type())
            .header(header::ACCEPT, self.codec.content_type())
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus {
                instance: self.instance.address().to_string(),
                status: status.as_u16(),
            });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.request_error(e))? {
            if bytes.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(self.transport_error("response body too large"));
            }
            bytes.extend_from_slice(&chunk);
        }

        self.codec.decode(&bytes)
    }
}
