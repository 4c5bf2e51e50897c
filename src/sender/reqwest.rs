//! Default [`Sender`] backed by `reqwest`.
//!
//! One pooled `reqwest::Client` is built from [`SenderConfig`] and shared by
//! every request. A pending request carrying a client certificate gets a
//! dedicated client with that identity, since reqwest binds identities per
//! client. Digest credentials are rejected as
//! [`TransportErrorKind::Unsupported`]; reqwest has no digest support.

use super::{RawResponse, Sender};
use crate::config::{ClientCertificate, SenderConfig};
use crate::error::{TransportError, TransportErrorKind};
use crate::request::PendingRequest;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Sender that performs requests with a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
    config: Arc<SenderConfig>,
}

impl ReqwestSender {
    /// Create a sender with default configuration
    pub fn new() -> Self {
        Self::with_config(SenderConfig::default())
    }

    /// Create a sender with custom configuration
    pub fn with_config(config: SenderConfig) -> Self {
        let client = Self::client_builder(&config).build().unwrap_or_default();

        ReqwestSender {
            client,
            config: Arc::new(config),
        }
    }

    fn client_builder(config: &SenderConfig) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(config.user_agent.as_str());

        if !config.proxy_url.is_empty() {
            if let Ok(proxy) = reqwest::Proxy::all(&config.proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        builder
    }

    /// Get the sender configuration
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    async fn client_with_identity(&self, certificate: &ClientCertificate) -> Result<reqwest::Client, TransportError> {
        let der = tokio::fs::read(&certificate.path).await.map_err(|e| {
            TransportError::new(
                TransportErrorKind::Other,
                format!("cannot read client certificate {}: {}", certificate.path.display(), e),
            )
        })?;
        let identity = reqwest::Identity::from_pkcs12_der(&der, certificate.passphrase.as_deref().unwrap_or(""))
            .map_err(|e| TransportError::new(TransportErrorKind::Other, format!("invalid client certificate: {}", e)))?;

        Self::client_builder(&self.config)
            .identity(identity)
            .build()
            .map_err(|e| into_transport_error(&e))
    }
}

impl Default for ReqwestSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sender for ReqwestSender {
    async fn send(&self, pending: &PendingRequest) -> Result<RawResponse, TransportError> {
        if pending.options().digest.is_some() {
            return Err(TransportError::new(
                TransportErrorKind::Unsupported,
                "digest authentication is not supported by the reqwest sender",
            ));
        }

        let client = match &pending.options().certificate {
            Some(certificate) => self.client_with_identity(certificate).await?,
            None => self.client.clone(),
        };

        let mut req_builder = client.request(pending.method().clone(), pending.url());

        if !pending.query().is_empty() {
            req_builder = req_builder.query(pending.query());
        }

        for (k, v) in pending.headers() {
            req_builder = req_builder.header(k.as_str(), v.as_str());
        }

        if !pending.body().is_empty() {
            req_builder = req_builder.body(pending.body().to_bytes());
        }

        if let Some(timeout) = pending.options().timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().await.map_err(|e| into_transport_error(&e))?;

        let status = response.status().as_u16();

        // Convert headers
        let mut headers = BTreeMap::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        // Read body
        let body = response.bytes().await.map_err(|e| into_transport_error(&e))?;

        Ok(RawResponse::new(status, headers, body))
    }
}

fn into_transport_error(err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Authenticator, Connector, Request};
    use http::Method;

    #[test]
    fn test_sender_creation() {
        let sender = ReqwestSender::new();
        assert_eq!(sender.config().request_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn test_sends_method_headers_query_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/users")
            .match_query(mockito::Matcher::UrlEncoded("team".into(), "core".into()))
            .match_header("x-client", "courier")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::JsonString(r#"{"name":"Ada"}"#.into()))
            .with_status(201)
            .with_header("X-Request-Id", "abc")
            .with_body(r#"{"id":1}"#)
            .create_async()
            .await;

        let connector = Connector::new(server.url()).with_header("X-Client", "courier");
        let request = Request::post("/users")
            .with_query("team", "core")
            .with_json(serde_json::json!({"name": "Ada"}));
        let pending = PendingRequest::build(&connector, &request, true).unwrap();

        let raw = ReqwestSender::new().send(&pending).await.unwrap();
        assert_eq!(raw.status, 201);
        assert_eq!(raw.headers.get("x-request-id").map(String::as_str), Some("abc"));
        assert_eq!(&raw.body[..], br#"{"id":1}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let pending = PendingRequest::detached(Method::GET, "http://127.0.0.1:9/unreachable");
        let err = ReqwestSender::new().send(&pending).await.unwrap_err();
        assert!(matches!(
            err.kind(),
            TransportErrorKind::Connect | TransportErrorKind::Other
        ));
    }

    #[tokio::test]
    async fn test_digest_is_unsupported() {
        let mut pending = PendingRequest::detached(Method::GET, "http://127.0.0.1:9/");
        pending.authenticate(Authenticator::digest("u", "p"));
        let err = ReqwestSender::new().send(&pending).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_missing_certificate_file_fails_without_sending() {
        let mut pending = PendingRequest::detached(Method::GET, "http://127.0.0.1:9/");
        pending.authenticate(Authenticator::certificate("/nonexistent/client.p12", None));
        let err = ReqwestSender::new().send(&pending).await.unwrap_err();
        assert!(err.message().contains("client certificate"));
    }
}
