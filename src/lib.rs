#![doc = include_str!("../README.md")]

//! # Courier-HTTP: Connector/Request HTTP SDK
//!
//! Describe an API once as a [`Connector`] (base URL, default headers, auth,
//! retry rules, middleware) and each endpoint as a [`Request`]. Sending merges
//! the two into a [`PendingRequest`], hands it to a [`Sender`], classifies the
//! [`Response`] and retries classified failures per the [`RetryPolicy`].
//!
//! ## Pipeline
//!
//! ```text
//! Request ──┐
//!           ├─► PendingRequest ─► request hooks ─► (fake | mock | Sender)
//! Connector ┘                                          │
//!                  retry? ◄── classify ◄── response hooks ◄┘
//! ```
//!
//! ## Error Categories
//!
//! - [`Error::Request`] - the server answered and classification said failure; retried
//! - [`Error::Fatal`] - no usable response (connection refused, timeout); never retried
//! - [`Error::Configuration`] - bad URL, missing path parameter, no mock response
//! - [`Error::Hook`] - a middleware hook failed
//!
//! ## Module Structure
//!
//! - **[connector]** - shared configuration and the retry state machine
//! - **[request]** - request definitions and merged pending requests
//! - **[response]** - response wrapper and decoding helpers
//! - **[auth]** - authenticators
//! - **[classify]** - status classification and whitelists
//! - **[retry]** - retry policy and backoff helpers
//! - **[middleware]** - request and response hooks
//! - **[pool]** - bounded concurrent sending
//! - **[mock]** - canned-response transport for tests
//! - **[sender]** - transport seam and the reqwest sender
//! - **[protocol]** - header and URL helpers
//! - **[config]** - sender configuration and transport options
//! - **[error]** - error types

pub mod auth;
pub mod classify;
pub mod config;
pub mod connector;
pub mod error;
pub mod middleware;
pub mod mock;
pub mod pool;
pub mod protocol;
pub mod request;
pub mod response;
pub mod retry;
pub mod sender;

pub use auth::{Authenticate, Authenticator};
pub use classify::{Classifier, FailurePredicate, StatusKind};
pub use config::{ClientCertificate, DigestCredentials, SenderConfig, TransportOptions};
pub use connector::Connector;
pub use error::{Error, FatalRequestError, RequestError, Result, TransportError, TransportErrorKind};
pub use middleware::MiddlewarePipeline;
pub use mock::{MockClient, MockResponse, RecordedRequest};
pub use pool::{Pool, PoolItem, PoolReport};
pub use request::{Body, PendingRequest, Request};
pub use response::{FromResponse, Response};
pub use retry::{exponential_backoff, is_retryable_status, RetryHandler, RetryPolicy};
pub use sender::{RawResponse, ReqwestSender, Sender};

pub use http::Method;
