//! Connectors.
//!
//! A [`Connector`] owns everything shared by the requests sent to one API:
//! base URL, default headers/query/body/options, default authenticator, retry
//! defaults, classification rules, middleware and the [`Sender`]. It is
//! read-only while sending; every attempt gets its own merged
//! [`PendingRequest`], so one connector can serve many concurrent requests.
//!
//! # Module Organization
//!
//! ```text
//! connector/
//! └── send - the per-request retry state machine
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use courier_http::{Authenticator, Connector, Request, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Connector::new("https://api.example.com")
//!         .with_header("Accept", "application/json")
//!         .with_authenticator(Authenticator::bearer("token"))
//!         .with_retry(RetryPolicy::new(3).with_interval_ms(200));
//!
//!     let mut request = Request::get("/users/{id}").with_path_param("id", 1);
//!     let response = connector.send(&mut request).await?;
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod send;

pub(crate) use send::SendRequest;

use crate::auth::Authenticator;
use crate::classify::Classifier;
use crate::config::{SenderConfig, TransportOptions};
use crate::error::{Error, RequestError, Result};
use crate::middleware::MiddlewarePipeline;
use crate::mock::MockClient;
use crate::pool::{Pool, PoolItem};
use crate::protocol::HeaderMapExt;
use crate::request::{Body, PendingRequest, Request};
use crate::response::Response;
use crate::retry::{RetryHandler, RetryPolicy};
use crate::sender::{ReqwestSender, Sender};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared configuration and transport for a family of requests.
#[derive(Clone)]
pub struct Connector {
    base_url: String,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    body: Body,
    options: TransportOptions,
    authenticator: Option<Authenticator>,
    retry: RetryPolicy,
    retry_handler: Option<RetryHandler>,
    classifier: Classifier,
    middleware: MiddlewarePipeline,
    sender: Arc<dyn Sender>,
    mock_client: Option<MockClient>,
    config: Arc<SenderConfig>,
}

impl Connector {
    /// Create a connector with the default reqwest sender
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(base_url, SenderConfig::default())
    }

    /// Create a connector whose reqwest sender uses `config`
    pub fn with_config(base_url: impl Into<String>, config: SenderConfig) -> Self {
        Self {
            base_url: base_url.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: Body::Empty,
            options: TransportOptions::default(),
            authenticator: None,
            retry: RetryPolicy::default(),
            retry_handler: None,
            classifier: Classifier::new(),
            middleware: MiddlewarePipeline::new(),
            sender: Arc::new(ReqwestSender::with_config(config.clone())),
            mock_client: None,
            config: Arc::new(config),
        }
    }

    // ========== Fluent setters ==========

    /// Replace the transport.
    pub fn with_sender(mut self, sender: impl Sender + 'static) -> Self {
        self.sender = Arc::new(sender);
        self
    }

    pub fn with_shared_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = sender;
        self
    }

    /// Route every send through `mock` instead of the sender.
    pub fn with_mock_client(mut self, mock: MockClient) -> Self {
        self.mock_client = Some(mock);
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

    /// Default body merged under every request body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
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

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_retry_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestError, &mut Request) -> Result<bool> + Send + Sync + 'static,
    {
        self.retry_handler = Some(Arc::new(handler));
        self
    }

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

    pub fn middleware_mut(&mut self) -> &mut MiddlewarePipeline {
        &mut self.middleware
    }

    // ========== Accessors ==========

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
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

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
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

    pub fn sender(&self) -> &Arc<dyn Sender> {
        &self.sender
    }

    pub fn mock_client(&self) -> Option<&MockClient> {
        self.mock_client.as_ref()
    }

    /// Get the sender configuration
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    // ========== Sending ==========

    /// Merge `request` into a pending request without sending it.
    pub fn create_pending_request(&self, request: &Request) -> Result<PendingRequest> {
        PendingRequest::build(self, request, true)
    }

    /// Send a request, retrying per its policy.
    ///
    /// `request` is taken by `&mut` because retry handlers may change it
    /// between attempts; those changes stay on the request afterwards.
    pub async fn send(&self, request: &mut Request) -> Result<Response> {
        SendRequest::new(self, None, true).execute(request).await
    }

    /// Send through `mock` for this call only.
    pub async fn send_with_mock(&self, request: &mut Request, mock: &MockClient) -> Result<Response> {
        SendRequest::new(self, Some(mock), true).execute(request).await
    }

    /// Send and block the current thread until the retry chain settles.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when called from inside an async runtime;
    /// use [`Connector::send`] there.
    pub fn send_blocking(&self, request: &mut Request) -> Result<Response> {
        let runtime = blocking_runtime()?;
        runtime.block_on(SendRequest::new(self, None, false).execute(request))
    }

    /// Start a pool over `items`.
    pub fn pool<I, T>(&self, items: I) -> Pool<'_>
    where
        I: IntoIterator<Item = T>,
        T: Into<PoolItem>,
    {
        Pool::new(self).with_items(items)
    }
}

/// Current-thread runtime for the blocking drivers.
pub(crate) fn blocking_runtime() -> Result<tokio::runtime::Runtime> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::Configuration(
            "blocking send called from inside an async runtime".to_string(),
        ));
    }
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Configuration(format!("cannot start blocking runtime: {}", e)))
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("base_url", &self.base_url)
            .field("query", &self.query)
            .field("authenticator", &self.authenticator)
            .field("retry", &self.retry)
            .field("retry_handler", &self.retry_handler.is_some())
            .field("classifier", &self.classifier)
            .field("middleware", &self.middleware)
            .field("mock_client", &self.mock_client)
            .finish_non_exhaustive()
    }
}
