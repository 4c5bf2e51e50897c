//! Bounded concurrent sending.
//!
//! A [`Pool`] sends many items through one [`Connector`] with at most
//! `concurrency` of them in flight. Each item settles into exactly one
//! callback: `on_response` with the item's index and response, or
//! `on_exception` with its index and error. Item failures never abort the
//! pool; the aggregate [`PoolReport`] only counts them.
//!
//! [`Request`] items run their full retry chain. [`PendingRequest`] items are
//! already merged and get a single attempt. An item whose retries ran out with
//! `throw_on_max_tries` disabled still settles as a failure: its last response
//! reaches `on_exception` inside [`Error::Request`].
//!
//! # Ordering
//!
//! With a mock transport every item settles on its first poll, so callbacks
//! fire in submission order and canned responses are consumed in that order.
//! Network-backed pools fire callbacks in completion order.
//!
//! # Examples
//!
//! ```no_run
//! use courier_http::{Connector, Request};
//!
//! # async fn run() {
//! let connector = Connector::new("https://api.example.com");
//! let requests = (1..=20).map(|id| Request::get(format!("/users/{}", id)));
//!
//! let mut statuses = Vec::new();
//! let report = connector
//!     .pool(requests)
//!     .concurrency(5)
//!     .on_response(|index, response| statuses.push((index, response.status())))
//!     .on_exception(|index, err| eprintln!("item {} failed: {}", index, err))
//!     .send()
//!     .await;
//! println!("{} ok, {} failed", report.succeeded, report.failed);
//! # }
//! ```

use crate::connector::{blocking_runtime, Connector, SendRequest};
use crate::error::{Error, Result};
use crate::mock::MockClient;
use crate::request::{PendingRequest, Request};
use crate::response::Response;
use futures::stream::{self, StreamExt};
use std::fmt;

/// One unit of pool work.
#[derive(Debug, Clone)]
pub enum PoolItem {
    /// Runs the full retry chain
    Request(Request),
    /// Sent once as-is
    Pending(PendingRequest),
}

impl From<Request> for PoolItem {
    fn from(request: Request) -> Self {
        PoolItem::Request(request)
    }
}

impl From<PendingRequest> for PoolItem {
    fn from(pending: PendingRequest) -> Self {
        PoolItem::Pending(pending)
    }
}

/// Outcome counts of a settled pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

type ResponseCallback<'c> = Box<dyn FnMut(usize, Response) + Send + 'c>;
type ExceptionCallback<'c> = Box<dyn FnMut(usize, Error) + Send + 'c>;

/// Concurrent sender over a list of items.
pub struct Pool<'c> {
    connector: &'c Connector,
    items: Vec<PoolItem>,
    concurrency: Option<usize>,
    mock_client: Option<MockClient>,
    on_response: Option<ResponseCallback<'c>>,
    on_exception: Option<ExceptionCallback<'c>>,
}

impl<'c> Pool<'c> {
    pub fn new(connector: &'c Connector) -> Self {
        Self {
            connector,
            items: Vec::new(),
            concurrency: None,
            mock_client: None,
            on_response: None,
            on_exception: None,
        }
    }

    pub fn add(mut self, item: impl Into<PoolItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn with_items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PoolItem>,
    {
        self.items.extend(items.into_iter().map(Into::into));
        self
    }

    /// Maximum items in flight. Zero, or never calling this, means all at once.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    /// Route this pool's sends through `mock` instead of the connector's transport.
    pub fn with_mock_client(mut self, mock: MockClient) -> Self {
        self.mock_client = Some(mock);
        self
    }

    pub fn on_response<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize, Response) + Send + 'c,
    {
        self.on_response = Some(Box::new(callback));
        self
    }

    pub fn on_exception<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize, Error) + Send + 'c,
    {
        self.on_exception = Some(Box::new(callback));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Send every item and wait until all have settled.
    pub async fn send(self) -> PoolReport {
        self.drive(true).await
    }

    /// Blocking variant of [`Pool::send`].
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when called from inside an async runtime.
    pub fn send_blocking(self) -> Result<PoolReport> {
        let runtime = blocking_runtime()?;
        Ok(runtime.block_on(self.drive(false)))
    }

    async fn drive(self, asynchronous: bool) -> PoolReport {
        let Pool {
            connector,
            items,
            concurrency,
            mock_client,
            mut on_response,
            mut on_exception,
        } = self;

        let total = items.len();
        let limit = match concurrency {
            Some(limit) if limit > 0 => limit,
            _ => total.max(1),
        };
        let action = SendRequest::new(connector, mock_client.as_ref(), asynchronous);
        let action = &action;

        let mut settled = stream::iter(items.into_iter().enumerate())
            .map(move |(index, item)| async move {
                let outcome = match item {
                    PoolItem::Request(mut request) => action.execute(&mut request).await,
                    PoolItem::Pending(pending) => action.attempt(pending, 1).await,
                };
                (index, outcome)
            })
            .buffer_unordered(limit);

        let mut report = PoolReport::default();
        while let Some((index, outcome)) = settled.next().await {
            match outcome.and_then(Response::into_result) {
                Ok(response) => {
                    report.succeeded += 1;
                    if let Some(callback) = on_response.as_mut() {
                        callback(index, response);
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::debug!(index, error = %err, "pool item failed");
                    if let Some(callback) = on_exception.as_mut() {
                        callback(index, err);
                    }
                }
            }
        }

        tracing::info!(
            total,
            succeeded = report.succeeded,
            failed = report.failed,
            concurrency = limit,
            "pool settled"
        );
        report
    }
}

impl fmt::Debug for Pool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("items", &self.items.len())
            .field("concurrency", &self.concurrency)
            .field("mock_client", &self.mock_client)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockResponse;
    use http::Method;

    #[tokio::test]
    async fn test_callbacks_fire_once_per_item_in_submission_order() {
        let mock = MockClient::new([
            MockResponse::new(200, "a"),
            MockResponse::new(500, "b"),
            MockResponse::new(201, "c"),
        ]);
        let connector = Connector::new("https://api.test").with_mock_client(mock);

        let mut events = Vec::new();
        let mut errors = Vec::new();
        let report = connector
            .pool((0..3).map(|i| Request::get(format!("/{}", i))))
            .concurrency(2)
            .on_response(|index, response| events.push((index, response.status())))
            .on_exception(|index, err| errors.push((index, err.status())))
            .send()
            .await;

        assert_eq!(report, PoolReport { succeeded: 2, failed: 1 });
        assert_eq!(events, vec![(0, 200), (2, 201)]);
        assert_eq!(errors, vec![(1, Some(500))]);
    }

    #[tokio::test]
    async fn test_exhausted_item_without_throw_is_a_failure() {
        let mock = MockClient::new([MockResponse::new(500, "first"), MockResponse::new(500, "last")]);
        let connector = Connector::new("https://api.test").with_mock_client(mock.clone());
        let request = Request::get("/flaky")
            .with_retry(crate::RetryPolicy::new(2).with_throw_on_max_tries(false));

        let mut responses = Vec::new();
        let mut errors = Vec::new();
        let report = connector
            .pool([request])
            .on_response(|index, response| responses.push((index, response.status())))
            .on_exception(|index, err| {
                let body = err.response().map(Response::text);
                errors.push((index, err.status(), body));
            })
            .send()
            .await;

        assert_eq!(report, PoolReport { succeeded: 0, failed: 1 });
        assert!(responses.is_empty());
        assert_eq!(errors, vec![(0, Some(500), Some("last".to_string()))]);
        mock.assert_sent_count(2);
    }

    #[tokio::test]
    async fn test_pending_items_get_a_single_attempt() {
        let mock = MockClient::new([MockResponse::new(500, ""), MockResponse::new(200, "")]);
        let connector = Connector::new("https://api.test")
            .with_retry(crate::RetryPolicy::new(3))
            .with_mock_client(mock.clone());
        let pending = PendingRequest::detached(Method::GET, "https://api.test/raw");

        let report = connector.pool([pending]).send().await;
        assert_eq!(report.failed, 1);
        mock.assert_sent_count(1);
    }

    #[tokio::test]
    async fn test_pool_mock_overrides_connector_mock() {
        let attached = MockClient::default();
        let pool_mock = MockClient::new([MockResponse::new(204, "")]);
        let connector = Connector::new("https://api.test").with_mock_client(attached.clone());

        let report = Pool::new(&connector)
            .add(Request::delete("/x"))
            .with_mock_client(pool_mock.clone())
            .send()
            .await;

        assert_eq!(report.succeeded, 1);
        attached.assert_nothing_sent();
        pool_mock.assert_sent_count(1);
    }

    #[tokio::test]
    async fn test_empty_pool_settles_immediately() {
        let connector = Connector::new("https://api.test");
        let pool = connector.pool(Vec::<Request>::new());
        assert!(pool.is_empty());
        assert_eq!(pool.send().await.total(), 0);
    }

    #[test]
    fn test_send_blocking() {
        let mock = MockClient::new([MockResponse::new(200, ""), MockResponse::new(200, "")]);
        let connector = Connector::new("https://api.test").with_mock_client(mock);

        let mut asynchronous = Vec::new();
        let report = connector
            .pool([Request::get("/a"), Request::get("/b")])
            .on_response(|_, response| asynchronous.push(response.pending_request().is_asynchronous()))
            .send_blocking()
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(asynchronous, vec![false, false]);
    }
}
