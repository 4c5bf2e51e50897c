//! Transport configuration.
//!
//! [`SenderConfig`] configures the shared `reqwest` client behind a
//! [`ReqwestSender`](crate::ReqwestSender). [`TransportOptions`] is the
//! per-request option bag merged from connector and request and read by the
//! sender for every attempt.
//!
//! Both deserialize with serde, with every field defaulted:
//!
//! ```
//! use courier_http::SenderConfig;
//!
//! let config: SenderConfig = serde_json::from_str(r#"{"request_timeout_ms": 5000}"#).unwrap();
//! assert_eq!(config.request_timeout_ms, 5000);
//! assert_eq!(config.connect_timeout_ms, 10_000);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Options for building the underlying HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Total request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Idle pooled connections are closed after this many seconds
    pub pool_idle_timeout_secs: u64,
    /// Maximum idle connections kept per host
    pub max_idle_per_host: usize,
    /// Proxy for all traffic; empty disables
    pub proxy_url: String,
    /// `User-Agent` sent when a request does not set one
    pub user_agent: String,
    /// Emit retry warnings through `tracing`
    pub enable_logging: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            pool_idle_timeout_secs: 90,
            max_idle_per_host: 10,
            proxy_url: String::new(),
            user_agent: format!("courier-http/{}", env!("CARGO_PKG_VERSION")),
            enable_logging: true,
        }
    }
}

/// Credentials for HTTP digest authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DigestCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// PKCS#12 client certificate used for mutual TLS.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCertificate {
    pub path: PathBuf,
    pub passphrase: Option<String>,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("path", &self.path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Per-request transport options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Overrides the sender's total timeout for this request
    #[serde(with = "millis")]
    pub timeout: Option<Duration>,
    pub digest: Option<DigestCredentials>,
    pub certificate: Option<ClientCertificate>,
    /// Free-form options for custom senders
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TransportOptions {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merged(&self, overrides: &TransportOptions) -> TransportOptions {
        let mut extra = self.extra.clone();
        extra.extend(overrides.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        TransportOptions {
            timeout: overrides.timeout.or(self.timeout),
            digest: overrides.digest.clone().or_else(|| self.digest.clone()),
            certificate: overrides
                .certificate
                .clone()
                .or_else(|| self.certificate.clone()),
            extra,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
