//! Response classification.
//!
//! A [`Classifier`] decides whether a completed response counts as a failure,
//! and [`StatusKind`] names the failure by status code.
//!
//! # Rules
//!
//! 1. A status on the `treat_as_success` whitelist is a success, whatever its code.
//! 2. Otherwise a custom failure predicate decides, if one is set.
//! 3. Otherwise `status >= 400` is a failure.
//!
//! Transport failures never reach the classifier; they are always fatal.

use crate::response::Response;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Custom "has this response failed?" predicate.
pub type FailurePredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Failure category chosen from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    Conflict,
    UnprocessableEntity,
    TooManyRequests,
    /// Any other 4xx
    ClientError,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    /// Any other 5xx
    ServerError,
    /// Failed by a custom rule outside 4xx/5xx
    Unknown,
}

impl StatusKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => StatusKind::Unauthorized,
            402 => StatusKind::PaymentRequired,
            403 => StatusKind::Forbidden,
            404 => StatusKind::NotFound,
            405 => StatusKind::MethodNotAllowed,
            408 => StatusKind::RequestTimeout,
            409 => StatusKind::Conflict,
            422 => StatusKind::UnprocessableEntity,
            429 => StatusKind::TooManyRequests,
            400..=499 => StatusKind::ClientError,
            500 => StatusKind::InternalServerError,
            502 => StatusKind::BadGateway,
            503 => StatusKind::ServiceUnavailable,
            504 => StatusKind::GatewayTimeout,
            500..=599 => StatusKind::ServerError,
            _ => StatusKind::Unknown,
        }
    }

    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            StatusKind::Unauthorized
                | StatusKind::PaymentRequired
                | StatusKind::Forbidden
                | StatusKind::NotFound
                | StatusKind::MethodNotAllowed
                | StatusKind::RequestTimeout
                | StatusKind::Conflict
                | StatusKind::UnprocessableEntity
                | StatusKind::TooManyRequests
                | StatusKind::ClientError
        )
    }

    pub fn is_server_error(self) -> bool {
        matches!(
            self,
            StatusKind::InternalServerError
                | StatusKind::BadGateway
                | StatusKind::ServiceUnavailable
                | StatusKind::GatewayTimeout
                | StatusKind::ServerError
        )
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Unauthorized => "unauthorized",
            StatusKind::PaymentRequired => "payment required",
            StatusKind::Forbidden => "forbidden",
            StatusKind::NotFound => "not found",
            StatusKind::MethodNotAllowed => "method not allowed",
            StatusKind::RequestTimeout => "request timeout",
            StatusKind::Conflict => "conflict",
            StatusKind::UnprocessableEntity => "unprocessable entity",
            StatusKind::TooManyRequests => "too many requests",
            StatusKind::ClientError => "client error",
            StatusKind::InternalServerError => "internal server error",
            StatusKind::BadGateway => "bad gateway",
            StatusKind::ServiceUnavailable => "service unavailable",
            StatusKind::GatewayTimeout => "gateway timeout",
            StatusKind::ServerError => "server error",
            StatusKind::Unknown => "request failed",
        };
        f.write_str(name)
    }
}

/// Success/failure rules for responses.
///
/// Connector and request classifiers are combined with [`Classifier::merged`]:
/// whitelists are unioned and the request's predicate replaces the connector's.
#[derive(Clone, Default)]
pub struct Classifier {
    treat_as_success: BTreeSet<u16>,
    failure_predicate: Option<FailurePredicate>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never treat `status` as a failure.
    pub fn treat_as_success(mut self, status: u16) -> Self {
        self.treat_as_success.insert(status);
        self
    }

    /// Replace the default `status >= 400` rule.
    pub fn with_failure_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.failure_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn add_success_status(&mut self, status: u16) {
        self.treat_as_success.insert(status);
    }

    pub fn set_failure_predicate(&mut self, predicate: FailurePredicate) {
        self.failure_predicate = Some(predicate);
    }

    pub fn is_whitelisted(&self, status: u16) -> bool {
        self.treat_as_success.contains(&status)
    }

    /// Layer `overrides` on top of `self`.
    pub fn merged(&self, overrides: &Classifier) -> Classifier {
        let mut treat_as_success = self.treat_as_success.clone();
        treat_as_success.extend(overrides.treat_as_success.iter().copied());

        Classifier {
            treat_as_success,
            failure_predicate: overrides
                .failure_predicate
                .clone()
                .or_else(|| self.failure_predicate.clone()),
        }
    }

    pub fn has_failed(&self, response: &Response) -> bool {
        let status = response.status();
        if self.is_whitelisted(status) {
            return false;
        }
        match &self.failure_predicate {
            Some(predicate) => predicate(response),
            None => status >= 400,
        }
    }

    /// `Some(kind)` when the response failed.
    pub fn classify(&self, response: &Response) -> Option<StatusKind> {
        self.has_failed(response)
            .then(|| StatusKind::from_status(response.status()))
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("treat_as_success", &self.treat_as_success)
            .field("custom_predicate", &self.failure_predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;

    #[test]
    fn test_status_kind_taxonomy() {
        assert_eq!(StatusKind::from_status(401), StatusKind::Unauthorized);
        assert_eq!(StatusKind::from_status(418), StatusKind::ClientError);
        assert_eq!(StatusKind::from_status(503), StatusKind::ServiceUnavailable);
        assert_eq!(StatusKind::from_status(599), StatusKind::ServerError);
        assert_eq!(StatusKind::from_status(302), StatusKind::Unknown);
        assert!(StatusKind::TooManyRequests.is_client_error());
        assert!(StatusKind::GatewayTimeout.is_server_error());
        assert!(!StatusKind::Unknown.is_client_error());
    }

    #[test]
    fn test_default_rule() {
        let classifier = Classifier::new();
        assert!(!classifier.has_failed(&Response::fake(200, "")));
        assert!(!classifier.has_failed(&Response::fake(399, "")));
        assert_eq!(
            classifier.classify(&Response::fake(500, "")),
            Some(StatusKind::InternalServerError)
        );
    }

    #[test]
    fn test_whitelist_beats_predicate() {
        let classifier = Classifier::new()
            .treat_as_success(404)
            .with_failure_predicate(|_| true);
        assert!(!classifier.has_failed(&Response::fake(404, "")));
        assert!(classifier.has_failed(&Response::fake(200, "")));
    }

    #[test]
    fn test_predicate_can_fail_on_body() {
        let classifier =
            Classifier::new().with_failure_predicate(|r| r.text().contains("\"error\""));
        assert_eq!(
            classifier.classify(&Response::fake(200, r#"{"error":"quota"}"#)),
            Some(StatusKind::Unknown)
        );
    }

    #[test]
    fn test_merge_unions_whitelists() {
        let connector = Classifier::new().treat_as_success(404);
        let request = Classifier::new().treat_as_success(409);
        let merged = connector.merged(&request);
        assert!(merged.is_whitelisted(404));
        assert!(merged.is_whitelisted(409));
        assert!(merged.has_failed(&Response::fake(500, "")));
    }
}
