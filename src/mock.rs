//! Mock transport.
//!
//! A [`MockClient`] replaces the network with canned [`MockResponse`]s. It can
//! be attached to a connector, passed for a single send, or attached to a pool.
//!
//! # Resolution Order
//!
//! For each send the client looks for, in order:
//!
//! 1. a response registered under the request's name ([`Request::with_name`](crate::Request::with_name))
//! 2. a response registered under a URL glob matching the request URL (`*` matches anything)
//! 3. the next response of the sequence, consumed front to back
//!
//! Named and URL responses are reusable; sequence responses are used once.
//! No match is an [`Error::Configuration`].
//!
//! Clones share the same queue and history, so a test can keep one handle for
//! assertions while the connector owns another.
//!
//! # Examples
//!
//! ```
//! use courier_http::{MockClient, MockResponse};
//!
//! let mock = MockClient::new([
//!     MockResponse::new(500, "boom"),
//!     MockResponse::new(200, "ok"),
//! ]);
//! mock.add_url("https://api.test/health", MockResponse::new(204, ""));
//! assert_eq!(mock.remaining(), 2);
//! mock.assert_nothing_sent();
//! ```

use crate::error::{Error, Result, TransportError};
use crate::request::PendingRequest;
use crate::sender::RawResponse;
use bytes::Bytes;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A canned response, or a canned transport failure.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Bytes,
    failure: Option<TransportError>,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
            failure: None,
        }
    }

    /// JSON body with a matching content type.
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self::new(status, value.to_string()).with_header("Content-Type", "application/json")
    }

    /// Simulate a transport failure instead of a response.
    pub fn connection_failure(message: impl AsRef<str>) -> Self {
        Self {
            status: 0,
            headers: BTreeMap::new(),
            body: Bytes::new(),
            failure: Some(TransportError::connect(message)),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(crate::protocol::normalize_header_name(name), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub(crate) fn to_raw(&self) -> std::result::Result<RawResponse, TransportError> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(RawResponse::new(self.status, self.headers.clone(), self.body.clone())),
        }
    }
}

/// A request the mock client answered.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub pending: PendingRequest,
    /// `None` when a transport failure was simulated
    pub status: Option<u16>,
}

struct UrlMock {
    pattern: String,
    matcher: Option<Regex>,
    response: MockResponse,
}

impl UrlMock {
    fn matches(&self, pending: &PendingRequest) -> bool {
        match &self.matcher {
            Some(re) => re.is_match(pending.url()) || re.is_match(&pending.full_url()),
            None => self.pattern == pending.url(),
        }
    }
}

#[derive(Default)]
struct MockState {
    sequence: VecDeque<MockResponse>,
    by_name: BTreeMap<String, MockResponse>,
    by_url: Vec<UrlMock>,
    recorded: Vec<RecordedRequest>,
}

/// Canned-response transport with assertion helpers.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Client answering with `responses` in order.
    pub fn new(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        let client = Self::default();
        client.state.lock().sequence.extend(responses);
        client
    }

    pub fn add_response(&self, response: MockResponse) -> &Self {
        self.state.lock().sequence.push_back(response);
        self
    }

    /// Answer every request named `name` with `response`.
    pub fn add_named(&self, name: impl Into<String>, response: MockResponse) -> &Self {
        self.state.lock().by_name.insert(name.into(), response);
        self
    }

    /// Answer every request whose URL matches the glob `pattern`.
    pub fn add_url(&self, pattern: impl Into<String>, response: MockResponse) -> &Self {
        let pattern = pattern.into();
        let matcher = glob_to_regex(&pattern);
        self.state.lock().by_url.push(UrlMock {
            pattern,
            matcher,
            response,
        });
        self
    }

    /// Pick the response for `pending` and record the send.
    pub(crate) fn resolve(&self, pending: &PendingRequest) -> Result<MockResponse> {
        let mut state = self.state.lock();

        let found = pending
            .name()
            .and_then(|name| state.by_name.get(name).cloned())
            .or_else(|| {
                state
                    .by_url
                    .iter()
                    .find(|mock| mock.matches(pending))
                    .map(|mock| mock.response.clone())
            });
        let response = match found {
            Some(response) => response,
            None => state.sequence.pop_front().ok_or_else(|| {
                Error::Configuration(format!(
                    "no mock response found for {} {}",
                    pending.method(),
                    pending.url()
                ))
            })?,
        };

        state.recorded.push(RecordedRequest {
            pending: pending.clone(),
            status: (!response.is_failure()).then_some(response.status()),
        });

        Ok(response)
    }

    /// Unused sequence responses.
    pub fn remaining(&self) -> usize {
        self.state.lock().sequence.len()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().recorded.len()
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.state.lock().recorded.clone()
    }

    pub fn last_request(&self) -> Option<PendingRequest> {
        self.state.lock().recorded.last().map(|r| r.pending.clone())
    }

    /// Whether any recorded request has `name` or a URL matching the glob `target`.
    pub fn was_sent(&self, target: &str) -> bool {
        let matcher = glob_to_regex(target);
        self.state.lock().recorded.iter().any(|r| {
            r.pending.name() == Some(target)
                || matcher
                    .as_ref()
                    .map_or(r.pending.url() == target, |re| re.is_match(r.pending.url()))
        })
    }

    pub fn assert_sent_count(&self, expected: usize) {
        let actual = self.sent_count();
        assert_eq!(actual, expected, "expected {} mocked sends, got {}", expected, actual);
    }

    pub fn assert_sent(&self, target: &str) {
        assert!(self.was_sent(target), "expected a request matching '{}' to be sent", target);
    }

    pub fn assert_not_sent(&self, target: &str) {
        assert!(!self.was_sent(target), "expected no request matching '{}'", target);
    }

    pub fn assert_nothing_sent(&self) {
        self.assert_sent_count(0);
    }
}

impl fmt::Debug for MockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockClient")
            .field("sequence", &state.sequence.len())
            .field("named", &state.by_name.len())
            .field("urls", &state.by_url.len())
            .field("recorded", &state.recorded.len())
            .finish()
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn pending(url: &str) -> PendingRequest {
        PendingRequest::detached(Method::GET, url)
    }

    #[test]
    fn test_sequence_is_consumed_in_order() {
        let mock = MockClient::new([MockResponse::new(500, "a"), MockResponse::new(200, "b")]);
        assert_eq!(mock.resolve(&pending("https://api.test/x")).unwrap().status(), 500);
        assert_eq!(mock.resolve(&pending("https://api.test/x")).unwrap().status(), 200);
        assert!(matches!(
            mock.resolve(&pending("https://api.test/x")),
            Err(Error::Configuration(_))
        ));
        mock.assert_sent_count(2);
    }

    #[test]
    fn test_url_glob_beats_sequence_and_is_reusable() {
        let mock = MockClient::new([MockResponse::new(200, "seq")]);
        mock.add_url("https://api.test/users/*", MockResponse::new(404, ""));

        for _ in 0..3 {
            assert_eq!(mock.resolve(&pending("https://api.test/users/9")).unwrap().status(), 404);
        }
        assert_eq!(mock.remaining(), 1);
        mock.assert_sent("https://api.test/users/*");
        mock.assert_not_sent("https://api.test/orders/*");
    }

    #[test]
    fn test_glob_escapes_regex_characters() {
        let re = glob_to_regex("https://api.test/search?q=*").unwrap();
        assert!(re.is_match("https://api.test/search?q=rust"));
        assert!(!re.is_match("https://apiXtest/search?q=rust"));
    }

    #[test]
    fn test_connection_failure_is_recorded_without_status() {
        let mock = MockClient::new([MockResponse::connection_failure("refused")]);
        let response = mock.resolve(&pending("https://api.test/")).unwrap();
        assert!(response.to_raw().is_err());
        assert_eq!(mock.recorded()[0].status, None);
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockClient::default();
        let handle = mock.clone();
        mock.add_response(MockResponse::json(200, serde_json::json!({"ok": true})));
        let response = handle.resolve(&pending("https://api.test/")).unwrap();
        assert_eq!(
            response.to_raw().unwrap().headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        mock.assert_sent_count(1);
        assert_eq!(mock.last_request().map(|p| p.url().to_string()).as_deref(), Some("https://api.test/"));
    }
}
