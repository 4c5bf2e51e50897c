//! Response wrapper.
//!
//! A [`Response`] is produced once per physical send. It owns the raw status,
//! headers and body, the [`PendingRequest`] that produced it, and whether it
//! came from a mock. Success and failure are judged by the pending request's
//! classifier, so a whitelisted 404 reports `successful() == true`.

use crate::error::{Error, RequestError, Result};
use crate::protocol::HeaderMapExt;
use crate::request::PendingRequest;
use crate::sender::RawResponse;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Types that can be built from a response.
///
/// ```
/// use courier_http::{FromResponse, Response, Result};
///
/// struct RateLimit {
///     remaining: u32,
/// }
///
/// impl FromResponse for RateLimit {
///     fn from_response(response: &Response) -> Result<Self> {
///         let remaining = response
///             .header("x-ratelimit-remaining")
///             .and_then(|v| v.parse().ok())
///             .unwrap_or(0);
///         Ok(RateLimit { remaining })
///     }
/// }
/// ```
pub trait FromResponse: Sized {
    fn from_response(response: &Response) -> Result<Self>;
}

/// Completed HTTP call.
#[derive(Clone)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Bytes,
    decoded: OnceLock<serde_json::Value>,
    pending: PendingRequest,
    mocked: bool,
}

impl Response {
    pub fn new(raw: RawResponse, pending: PendingRequest, mocked: bool) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            decoded: OnceLock::new(),
            pending,
            mocked,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_header(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the body, dropping any cached decode.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.decoded = OnceLock::new();
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as JSON, cached after the first successful decode.
    pub fn json_value(&self) -> Result<&serde_json::Value> {
        if let Some(value) = self.decoded.get() {
            return Ok(value);
        }
        let value: serde_json::Value = serde_json::from_slice(&self.body)?;
        Ok(self.decoded.get_or_init(|| value))
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.json_value()?;
        Ok(T::deserialize(value)?)
    }

    /// Build a domain object from the response.
    pub fn dto<T: FromResponse>(&self) -> Result<T> {
        T::from_response(self)
    }

    pub fn pending_request(&self) -> &PendingRequest {
        &self.pending
    }

    pub fn is_mocked(&self) -> bool {
        self.mocked
    }

    /// Classification says this response failed.
    pub fn failed(&self) -> bool {
        self.pending.classifier().has_failed(self)
    }

    pub fn successful(&self) -> bool {
        !self.failed()
    }

    /// Raw 2xx check, ignoring classification rules.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Turn a failed response into [`Error::Request`].
    ///
    /// Useful after sending with `throw_on_max_tries` disabled.
    pub fn into_result(self) -> Result<Response> {
        match self.pending.classifier().classify(&self) {
            Some(kind) => Err(Error::Request(RequestError::new(kind, self))),
            None => Ok(self),
        }
    }

    #[cfg(test)]
    pub(crate) fn fake(status: u16, body: &str) -> Self {
        let raw = RawResponse::new(status, BTreeMap::new(), Bytes::from(body.to_string()));
        Self::new(raw, PendingRequest::detached(http::Method::GET, "https://api.test/"), true)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("mocked", &self.mocked)
            .field("pending", &self.pending)
            .finish()
    }
}
