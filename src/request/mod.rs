//! Requests and pending requests.
//!
//! A [`Request`] is the caller's declarative description of one call. Before
//! every attempt it is merged with its connector's defaults into a
//! [`PendingRequest`], which is what authenticators, middleware and senders see.
//!
//! # Module Organization
//!
//! ```text
//! request/
//! ├── body     - request bodies and their merge rules
//! └── pending  - merged, send-ready snapshot of one attempt
//! ```
//!
//! # Examples
//!
//! ```
//! use courier_http::{Authenticator, Request, RetryPolicy};
//! use serde_json::json;
//!
//! let request = Request::post("/users/{org}")
//!     .with_path_param("org", "acme")
//!     .with_header("Accept", "application/json")
//!     .with_json(json!({"name": "Ada"}))
//!     .with_authenticator(Authenticator::bearer("token"))
//!     .with_retry(RetryPolicy::new(3).with_interval_ms(250))
//!     .treat_as_success(409);
//!
//! assert_eq!(request.endpoint(), "/users/{org}");
//! ```

mod body;
mod pending;

pub use body::Body;
pub use pending::PendingRequest;

use crate::auth::Authenticator;
use crate::classify::Classifier;
use crate::config::TransportOptions;
use crate::connector::Connector;
use crate::error::{Error, RequestError, Result};
use crate::middleware::MiddlewarePipeline;
use crate::protocol::HeaderMapExt;
use crate::response::Response;
use crate::retry::{RetryHandler, RetryPolicy};
use http::Method;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Declarative description of one HTTP call.
#[derive(Clone)]
pub struct Request {
    method: Method,
    endpoint: String,
    name: Option<String>,
    path_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    body: Body,
    options: TransportOptions,
    authenticator: Option<Authenticator>,
    retry: Option<RetryPolicy>,
    retry_handler: Option<RetryHandler>,
    classifier: Classifier,
    middleware: MiddlewarePipeline,
    connector: Option<Arc<Connector>>,
}

impl Request {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            name: None,
            path_params: BTreeMap::new(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: Body::Empty,
            options: TransportOptions::default(),
            authenticator: None,
            retry: None,
            retry_handler: None,
            classifier: Classifier::new(),
            middleware: MiddlewarePipeline::new(),
            connector: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    // ========== Fluent setters ==========

    /// Name used to look up keyed mock responses.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.insert(name.into(), value.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set_header(name, value);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.with_body(Body::Json(value))
    }

    pub fn with_form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.extra.insert(key.into(), value);
        self
    }

    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Replace the connector's retry policy for this request.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_retry_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestError, &mut Request) -> Result<bool> + Send + Sync + 'static,
    {
        self.retry_handler = Some(Arc::new(handler));
        self
    }

    /// Never classify `status` as a failure for this request.
    pub fn treat_as_success(mut self, status: u16) -> Self {
        self.classifier.add_success_status(status);
        self
    }

    pub fn with_failure_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.classifier.set_failure_predicate(Arc::new(predicate));
        self
    }

    pub fn with_middleware(mut self, middleware: MiddlewarePipeline) -> Self {
        self.middleware = middleware;
        self
    }

    /// Bind a connector so the request can be sent on its own.
    pub fn with_connector(mut self, connector: Arc<Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    // ========== In-place mutation (retry handlers) ==========

    /// Replace the authenticator; used by retry handlers to refresh credentials.
    pub fn authenticate(&mut self, authenticator: Authenticator) {
        self.authenticator = Some(authenticator);
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set_header(name, value);
    }

    pub fn headers_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.headers
    }

    pub fn query_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.query
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn options_mut(&mut self) -> &mut TransportOptions {
        &mut self.options
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewarePipeline {
        &mut self.middleware
    }

    // ========== Accessors ==========

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_header(name)
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    pub fn retry_handler(&self) -> Option<&RetryHandler> {
        self.retry_handler.as_ref()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn middleware(&self) -> &MiddlewarePipeline {
        &self.middleware
    }

    pub fn connector(&self) -> Option<&Arc<Connector>> {
        self.connector.as_ref()
    }

    // ========== Standalone sending ==========

    fn bound_connector(&self) -> Result<Arc<Connector>> {
        self.connector
            .clone()
            .ok_or_else(|| Error::Configuration(format!("no connector bound to {} {}", self.method, self.endpoint)))
    }

    /// Send through the bound connector.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when no connector is bound, otherwise whatever
    /// [`Connector::send`] returns.
    pub async fn send(&mut self) -> Result<Response> {
        let connector = self.bound_connector()?;
        connector.send(self).await
    }

    /// Blocking variant of [`Request::send`].
    pub fn send_blocking(&mut self) -> Result<Response> {
        let connector = self.bound_connector()?;
        connector.send_blocking(self)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("name", &self.name)
            .field("query", &self.query)
            .field("authenticator", &self.authenticator)
            .field("retry", &self.retry)
            .field("retry_handler", &self.retry_handler.is_some())
            .field("classifier", &self.classifier)
            .field("bound", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluent_builder() {
        let request = Request::get("/search")
            .with_name("search")
            .with_query("q", "rust")
            .with_query("page", 2)
            .with_header("X-Trace", "1")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.name(), Some("search"));
        assert_eq!(request.query().get("page").map(String::as_str), Some("2"));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.options().timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_form_body() {
        let request = Request::post("/login").with_form([("user", "ada"), ("pass", "x")]);
        match request.body() {
            Body::Form(fields) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_authenticate_replaces() {
        let mut request = Request::get("/").with_authenticator(Authenticator::bearer("a"));
        request.authenticate(Authenticator::bearer("b"));
        assert!(matches!(
            request.authenticator(),
            Some(Authenticator::Token { token, .. }) if token == "b"
        ));
    }

    #[tokio::test]
    async fn test_send_without_connector_is_configuration_error() {
        let mut request = Request::get("/users");
        let err = tokio_test::assert_err!(request.send().await);
        assert!(matches!(err, Error::Configuration(_)));
    }
}
