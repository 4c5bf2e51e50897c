//! Transport adapters.
//!
//! The pipeline only ever talks to a [`Sender`]: hand it a [`PendingRequest`],
//! get back a [`RawResponse`] or a [`TransportError`]. Classification, retry
//! and middleware all happen above this seam, so any HTTP stack can sit
//! behind it.
//!
//! # Module Organization
//!
//! ```text
//! sender/
//! └── reqwest - default sender backed by reqwest::Client
//! ```
//!
//! # Writing a Sender
//!
//! ```
//! use async_trait::async_trait;
//! use courier_http::{PendingRequest, RawResponse, Sender, TransportError};
//!
//! struct Teapot;
//!
//! #[async_trait]
//! impl Sender for Teapot {
//!     async fn send(&self, _pending: &PendingRequest) -> Result<RawResponse, TransportError> {
//!         Ok(RawResponse::new(418, Default::default(), "short and stout".into()))
//!     }
//! }
//! ```

mod reqwest;

pub use self::reqwest::ReqwestSender;

use crate::error::TransportError;
use crate::request::PendingRequest;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Status, headers and body of a settled transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: Bytes) -> Self {
        Self { status, headers, body }
    }
}

/// Performs the actual network I/O for a pending request.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, pending: &PendingRequest) -> Result<RawResponse, TransportError>;
}
