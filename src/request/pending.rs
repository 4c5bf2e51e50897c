//! Send-ready snapshot of one attempt.
//!
//! # Construction
//!
//! [`PendingRequest::build`] runs once per attempt:
//!
//! 1. resolve the URL from the connector base URL, the endpoint and its path params
//! 2. merge headers, query, body and transport options (request over connector)
//! 3. resolve the authenticator (request, then connector) and apply it
//! 4. merge middleware (connector first) and run the request hooks
//!
//! Nothing carries over from a previous attempt except what was changed on the
//! [`Request`] itself, so a retried call never compounds stale state.

use crate::auth::{Authenticate, Authenticator};
use crate::classify::Classifier;
use crate::config::TransportOptions;
use crate::connector::Connector;
use crate::error::Result;
use crate::middleware::MiddlewarePipeline;
use crate::mock::MockResponse;
use crate::protocol::{self, constants, HeaderMapExt};
use crate::request::{Body, Request};
use http::Method;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Merged request for a single attempt.
#[derive(Clone)]
pub struct PendingRequest {
    id: Uuid,
    method: Method,
    url: String,
    name: Option<String>,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    body: Body,
    options: TransportOptions,
    authenticator: Option<Authenticator>,
    classifier: Classifier,
    middleware: MiddlewarePipeline,
    asynchronous: bool,
    fake_response: Option<MockResponse>,
}

impl PendingRequest {
    /// Merge `request` with `connector` and run request middleware.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::Error::Configuration) for an unresolvable
    /// URL, [`Error::Hook`](crate::Error::Hook) when a request hook fails.
    pub fn build(connector: &Connector, request: &Request, asynchronous: bool) -> Result<Self> {
        let endpoint = protocol::substitute_path_params(request.endpoint(), request.path_params())?;
        let url = protocol::resolve_url(connector.base_url(), &endpoint)?;

        let mut headers = BTreeMap::new();
        protocol::merge_headers(&mut headers, connector.headers());
        protocol::merge_headers(&mut headers, request.headers());

        let mut query = connector.query().clone();
        query.extend(request.query().iter().map(|(k, v)| (k.clone(), v.clone())));

        let body = connector.body().merged(request.body());
        if let Some(content_type) = body.content_type() {
            if headers.get_header(constants::CONTENT_TYPE).is_none() {
                headers.set_header(constants::CONTENT_TYPE, content_type);
            }
        }

        let mut pending = PendingRequest {
            id: Uuid::new_v4(),
            method: request.method().clone(),
            url,
            name: request.name().map(str::to_string),
            headers,
            query,
            body,
            options: connector.options().merged(request.options()),
            authenticator: None,
            classifier: connector.classifier().merged(request.classifier()),
            middleware: MiddlewarePipeline::new(),
            asynchronous,
            fake_response: None,
        };

        if let Some(authenticator) = request.authenticator().or(connector.authenticator()) {
            pending.authenticate(authenticator.clone());
        }

        let middleware = connector.middleware().merged(request.middleware());
        pending.fake_response = middleware.execute_request(&mut pending)?;
        pending.middleware = middleware;

        Ok(pending)
    }

    /// A pending request not derived from any connector.
    ///
    /// `url` is used verbatim; no middleware, authenticator or classifier
    /// overrides are attached.
    pub fn detached(method: Method, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url: url.into(),
            name: None,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: Body::Empty,
            options: TransportOptions::default(),
            authenticator: None,
            classifier: Classifier::new(),
            middleware: MiddlewarePipeline::new(),
            asynchronous: true,
            fake_response: None,
        }
    }

    /// Apply an authenticator and remember it.
    pub fn authenticate(&mut self, authenticator: Authenticator) {
        authenticator.apply(self);
        self.authenticator = Some(authenticator);
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set_header(name, value);
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_header(name)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Resolved URL, without the query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.headers
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut TransportOptions {
        &mut self.options
    }

    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut Classifier {
        &mut self.classifier
    }

    pub fn middleware(&self) -> &MiddlewarePipeline {
        &self.middleware
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub(crate) fn set_asynchronous(&mut self, asynchronous: bool) {
        self.asynchronous = asynchronous;
    }

    /// Response supplied by an intercepting request hook.
    pub fn fake_response(&self) -> Option<&MockResponse> {
        self.fake_response.as_ref()
    }

    /// Full URL including the encoded query string.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, encoded)
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let shown = if k == constants::AUTHORIZATION { "[REDACTED]" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();

        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("query", &self.query)
            .field("authenticator", &self.authenticator)
            .field("asynchronous", &self.asynchronous)
            .field("intercepted", &self.fake_response.is_some())
            .finish_non_exhaustive()
    }
}
