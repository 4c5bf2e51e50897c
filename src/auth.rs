//! Authenticators.
//!
//! An authenticator mutates a [`PendingRequest`] right after it has been
//! merged, before middleware runs. Resolution is layered: the request's
//! authenticator wins, then the connector's, otherwise none.
//!
//! Applying an authenticator twice leaves the request as applying it once;
//! re-authenticating during a retry overwrites the previous credentials.
//!
//! | Variant | Effect |
//! |---------|--------|
//! | [`Authenticator::Token`] | `Authorization: {prefix} {token}` |
//! | [`Authenticator::Basic`] | `Authorization: Basic base64(user:pass)` |
//! | [`Authenticator::Digest`] | digest credentials in transport options |
//! | [`Authenticator::Query`] | query parameter |
//! | [`Authenticator::Header`] | arbitrary header |
//! | [`Authenticator::Certificate`] | client certificate in transport options |
//! | [`Authenticator::Custom`] | user implementation of [`Authenticate`] |

use crate::config::{ClientCertificate, DigestCredentials};
use crate::protocol::{self, constants};
use crate::request::PendingRequest;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Something that can authenticate an outgoing request.
pub trait Authenticate: Send + Sync {
    fn apply(&self, pending: &mut PendingRequest);
}

/// Built-in authentication strategies.
#[derive(Clone)]
pub enum Authenticator {
    Token { token: String, prefix: String },
    Basic { username: String, password: String },
    Digest { username: String, password: String },
    Query { parameter: String, value: String },
    Header { name: String, value: String },
    Certificate { path: PathBuf, passphrase: Option<String> },
    Custom(Arc<dyn Authenticate>),
}

impl Authenticator {
    /// Bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Authenticator::Token {
            token: token.into(),
            prefix: "Bearer".to_string(),
        }
    }

    /// Token with a custom scheme prefix (empty for none).
    pub fn token(token: impl Into<String>, prefix: impl Into<String>) -> Self {
        Authenticator::Token {
            token: token.into(),
            prefix: prefix.into(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Authenticator::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn digest(username: impl Into<String>, password: impl Into<String>) -> Self {
        Authenticator::Digest {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn query(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Authenticator::Query {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Authenticator::Header {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn certificate(path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Authenticator::Certificate {
            path: path.into(),
            passphrase,
        }
    }

    pub fn custom(authenticator: impl Authenticate + 'static) -> Self {
        Authenticator::Custom(Arc::new(authenticator))
    }
}

impl Authenticate for Authenticator {
    fn apply(&self, pending: &mut PendingRequest) {
        match self {
            Authenticator::Token { token, prefix } => {
                pending.set_header(constants::AUTHORIZATION, protocol::format_token_auth(prefix, token));
            }
            Authenticator::Basic { username, password } => {
                pending.set_header(constants::AUTHORIZATION, protocol::format_basic_auth(username, password));
            }
            Authenticator::Digest { username, password } => {
                pending.options_mut().digest = Some(DigestCredentials {
                    username: username.clone(),
                    password: password.clone(),
                });
            }
            Authenticator::Query { parameter, value } => {
                pending.query_mut().insert(parameter.clone(), value.clone());
            }
            Authenticator::Header { name, value } => {
                pending.set_header(name, value.clone());
            }
            Authenticator::Certificate { path, passphrase } => {
                pending.options_mut().certificate = Some(ClientCertificate {
                    path: path.clone(),
                    passphrase: passphrase.clone(),
                });
            }
            Authenticator::Custom(inner) => inner.apply(pending),
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HIDDEN: &str = "[REDACTED]";
        match self {
            Authenticator::Token { prefix, .. } => f
                .debug_struct("Token")
                .field("token", &HIDDEN)
                .field("prefix", prefix)
                .finish(),
            Authenticator::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &HIDDEN)
                .finish(),
            Authenticator::Digest { username, .. } => f
                .debug_struct("Digest")
                .field("username", username)
                .field("password", &HIDDEN)
                .finish(),
            Authenticator::Query { parameter, .. } => f
                .debug_struct("Query")
                .field("parameter", parameter)
                .field("value", &HIDDEN)
                .finish(),
            Authenticator::Header { name, .. } => f
                .debug_struct("Header")
                .field("name", name)
                .field("value", &HIDDEN)
                .finish(),
            Authenticator::Certificate { path, .. } => f
                .debug_struct("Certificate")
                .field("path", path)
                .finish_non_exhaustive(),
            Authenticator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn pending() -> PendingRequest {
        PendingRequest::detached(Method::GET, "https://api.test/me")
    }

    #[test]
    fn test_bearer_sets_authorization() {
        let mut p = pending();
        Authenticator::bearer("abc").apply(&mut p);
        assert_eq!(p.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_reapply_overwrites() {
        let mut p = pending();
        Authenticator::bearer("old").apply(&mut p);
        Authenticator::bearer("new").apply(&mut p);
        Authenticator::bearer("new").apply(&mut p);
        assert_eq!(p.header("authorization"), Some("Bearer new"));
        assert_eq!(p.headers().len(), 1);
    }

    #[test]
    fn test_basic() {
        let mut p = pending();
        Authenticator::basic("user", "pass").apply(&mut p);
        assert_eq!(p.header("authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_query_and_header() {
        let mut p = pending();
        Authenticator::query("api_key", "k1").apply(&mut p);
        Authenticator::header("X-Api-Key", "k2").apply(&mut p);
        assert_eq!(p.query().get("api_key").map(String::as_str), Some("k1"));
        assert_eq!(p.header("x-api-key"), Some("k2"));
    }

    #[test]
    fn test_digest_and_certificate_go_to_options() {
        let mut p = pending();
        Authenticator::digest("ops", "secret").apply(&mut p);
        Authenticator::certificate("/etc/client.p12", Some("pw".into())).apply(&mut p);
        assert_eq!(p.options().digest.as_ref().map(|d| d.username.as_str()), Some("ops"));
        assert_eq!(
            p.options().certificate.as_ref().map(|c| c.path.clone()),
            Some(PathBuf::from("/etc/client.p12"))
        );
        assert!(p.headers().is_empty());
    }

    #[test]
    fn test_custom() {
        struct Signed;
        impl Authenticate for Signed {
            fn apply(&self, pending: &mut PendingRequest) {
                let signature = format!("sig:{}", pending.url().len());
                pending.set_header("X-Signature", signature);
            }
        }

        let mut p = pending();
        Authenticator::custom(Signed).apply(&mut p);
        assert_eq!(p.header("x-signature"), Some("sig:19"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", Authenticator::basic("user", "pa55word"));
        assert!(!rendered.contains("pa55word"));
        assert!(rendered.contains("user"));
    }
}
