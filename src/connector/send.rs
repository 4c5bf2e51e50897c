//! The per-request retry state machine.
//!
//! Every attempt rebuilds a [`PendingRequest`] from the connector and the
//! (possibly handler-mutated) [`Request`], dispatches it, runs response hooks
//! once and classifies the result. Classified failures are retried while
//! attempts remain and the retry handler agrees. Transport failures, hook
//! errors and configuration errors end the chain at once.

use super::Connector;
use crate::error::{Error, FatalRequestError, RequestError, Result, TransportError};
use crate::mock::MockClient;
use crate::request::{PendingRequest, Request};
use crate::response::Response;
use crate::retry::RetryPolicy;
use crate::sender::RawResponse;
use tokio::time::sleep;

pub(crate) struct SendRequest<'a> {
    connector: &'a Connector,
    mock_client: Option<&'a MockClient>,
    asynchronous: bool,
}

impl<'a> SendRequest<'a> {
    /// `mock_client` takes precedence over the connector's own mock.
    pub(crate) fn new(connector: &'a Connector, mock_client: Option<&'a MockClient>, asynchronous: bool) -> Self {
        Self {
            connector,
            mock_client: mock_client.or(connector.mock_client()),
            asynchronous,
        }
    }

    /// Run the whole retry chain for `request`.
    pub(crate) async fn execute(&self, request: &mut Request) -> Result<Response> {
        let policy = request
            .retry_policy()
            .copied()
            .unwrap_or(*self.connector.retry_policy());
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;

        loop {
            let pending = PendingRequest::build(self.connector, request, self.asynchronous)?;
            let mut failure = match self.attempt(pending, attempt).await {
                Ok(response) => return Ok(response),
                Err(Error::Request(failure)) => failure,
                Err(e) => return Err(e),
            };

            if attempt >= max_attempts {
                return give_up(failure, &policy);
            }

            let handler = request
                .retry_handler()
                .or(self.connector.retry_handler())
                .cloned();
            if let Some(handler) = handler {
                match handler(&failure, request) {
                    Ok(true) => {}
                    Ok(false) => return give_up(failure, &policy),
                    Err(Error::Request(replacement)) => failure = replacement,
                    Err(e) => return Err(e),
                }
            }

            attempt += 1;
            let delay = policy.delay_before(attempt);
            if self.connector.config().enable_logging {
                tracing::warn!(
                    "Request failed (attempt {} of {}), retrying after {:?}: {}",
                    attempt - 1,
                    max_attempts,
                    delay,
                    failure
                );
            }
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }

    /// One physical send: dispatch, response hooks, classification.
    pub(crate) async fn attempt(&self, mut pending: PendingRequest, attempt: u32) -> Result<Response> {
        pending.set_asynchronous(self.asynchronous);

        let (outcome, mocked) = self.dispatch(&pending).await?;
        tracing::debug!(
            request_id = %pending.id(),
            method = %pending.method(),
            url = pending.url(),
            attempt,
            mocked,
            "request dispatched"
        );

        let raw = match outcome {
            Ok(raw) => raw,
            Err(source) => return Err(FatalRequestError::new(pending, source).into()),
        };

        let middleware = pending.middleware().clone();
        let mut response = Response::new(raw, pending, mocked);
        middleware.execute_response(&mut response)?;

        match response.pending_request().classifier().classify(&response) {
            Some(kind) => Err(RequestError::new(kind, response).into()),
            None => Ok(response),
        }
    }

    /// Intercepted response, then mock, then the real sender.
    async fn dispatch(
        &self,
        pending: &PendingRequest,
    ) -> Result<(std::result::Result<RawResponse, TransportError>, bool)> {
        if let Some(fake) = pending.fake_response() {
            return Ok((fake.to_raw(), true));
        }
        if let Some(mock) = self.mock_client {
            let canned = mock.resolve(pending)?;
            return Ok((canned.to_raw(), true));
        }
        Ok((self.connector.sender().send(pending).await, false))
    }
}

fn give_up(failure: RequestError, policy: &RetryPolicy) -> Result<Response> {
    if policy.throw_on_max_tries {
        Err(Error::Request(failure))
    } else {
        Ok(failure.into_response())
    }
}
