//! Request/response hook pipeline.
//!
//! Connectors and requests each carry a [`MiddlewarePipeline`]. When a
//! [`PendingRequest`] is built the two are merged (connector hooks first) and:
//!
//! 1. every request hook runs against the pending request, in order; a hook
//!    may mutate it, fail, or intercept the send with a [`MockResponse`];
//! 2. after each physical send, every response hook runs exactly once against
//!    the response, before classification.
//!
//! Hook failures surface as [`Error::Hook`] and are never retried.
//!
//! # Examples
//!
//! ```
//! use courier_http::{MiddlewarePipeline, MockResponse};
//!
//! let mut pipeline = MiddlewarePipeline::new();
//! pipeline
//!     .on_request(|pending| {
//!         pending.set_header("X-Request-Id", pending.id().to_string());
//!         Ok(())
//!     })
//!     .intercept(|pending| {
//!         Ok(pending.url().ends_with("/health").then(|| MockResponse::new(200, "ok")))
//!     });
//! assert_eq!(pipeline.len(), 2);
//! ```

use crate::error::{Error, Result};
use crate::mock::MockResponse;
use crate::request::PendingRequest;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;

/// Hook run against every pending request before it is sent.
pub type RequestHook =
    Arc<dyn Fn(&mut PendingRequest) -> anyhow::Result<Option<MockResponse>> + Send + Sync>;

/// Hook run against every response, once per physical send.
pub type ResponseHook = Arc<dyn Fn(&mut Response) -> anyhow::Result<()> + Send + Sync>;

/// Ordered request and response hooks.
#[derive(Clone, Default)]
pub struct MiddlewarePipeline {
    request_hooks: Vec<RequestHook>,
    response_hooks: Vec<ResponseHook>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook that mutates the pending request.
    pub fn on_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut PendingRequest) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.request_hooks
            .push(Arc::new(move |pending: &mut PendingRequest| hook(pending).map(|_| None)));
        self
    }

    /// Add a hook that may answer the request without sending it.
    pub fn intercept<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut PendingRequest) -> anyhow::Result<Option<MockResponse>> + Send + Sync + 'static,
    {
        self.request_hooks.push(Arc::new(hook));
        self
    }

    /// Add a hook that inspects or mutates each response.
    pub fn on_response<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.response_hooks.push(Arc::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.request_hooks.len() + self.response_hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `self`'s hooks followed by `other`'s.
    pub fn merged(&self, other: &MiddlewarePipeline) -> MiddlewarePipeline {
        let mut merged = self.clone();
        merged.request_hooks.extend(other.request_hooks.iter().cloned());
        merged.response_hooks.extend(other.response_hooks.iter().cloned());
        merged
    }

    /// Run request hooks until one intercepts.
    pub(crate) fn execute_request(&self, pending: &mut PendingRequest) -> Result<Option<MockResponse>> {
        for hook in &self.request_hooks {
            if let Some(fake) = hook(pending).map_err(Error::Hook)? {
                return Ok(Some(fake));
            }
        }
        Ok(None)
    }

    pub(crate) fn execute_response(&self, response: &mut Response) -> Result<()> {
        for hook in &self.response_hooks {
            hook(response).map_err(Error::Hook)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MiddlewarePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewarePipeline")
            .field("request_hooks", &self.request_hooks.len())
            .field("response_hooks", &self.response_hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_merge_keeps_order() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut connector = MiddlewarePipeline::new();
        let l = log.clone();
        connector.on_request(move |_| {
            l.lock().push("connector");
            Ok(())
        });

        let mut request = MiddlewarePipeline::new();
        let l = log.clone();
        request.on_request(move |_| {
            l.lock().push("request");
            Ok(())
        });

        let merged = connector.merged(&request);
        let mut pending = PendingRequest::detached(http::Method::GET, "https://api.test/");
        tokio_test::assert_ok!(merged.execute_request(&mut pending));
        assert_eq!(*log.lock(), vec!["connector", "request"]);
    }

    #[test]
    fn test_intercept_stops_the_chain() {
        let later = Arc::new(AtomicUsize::new(0));
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.intercept(|_| Ok(Some(MockResponse::new(204, ""))));
        let l = later.clone();
        pipeline.on_request(move |_| {
            l.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut pending = PendingRequest::detached(http::Method::GET, "https://api.test/");
        let fake = pipeline.execute_request(&mut pending).unwrap();
        assert_eq!(fake.map(|m| m.status()), Some(204));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_hook_failure_is_hook_error() {
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.on_response(|_| Err(anyhow::anyhow!("boom")));

        let mut response = Response::fake(200, "");
        let err = tokio_test::assert_err!(pipeline.execute_response(&mut response));
        assert!(matches!(err, Error::Hook(_)));
    }
}
