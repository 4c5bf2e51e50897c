//! Send one request with retries and a token-refreshing retry handler.
//!
//! Runs against a mock transport so it needs no network:
//!
//! ```text
//! cargo run --example send_with_retry
//! ```

use courier_http::{Authenticator, Connector, MockClient, MockResponse, Request, RetryPolicy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Profile {
    id: u64,
    login: String,
}

#[tokio::main]
async fn main() -> courier_http::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mock = MockClient::new([
        MockResponse::new(503, "upstream busy"),
        MockResponse::new(401, "token expired"),
        MockResponse::json(200, serde_json::json!({"id": 7, "login": "ada"})),
    ]);

    let connector = Connector::new("https://api.example.com/v2")
        .with_header("Accept", "application/json")
        .with_authenticator(Authenticator::bearer("initial-token"))
        .with_mock_client(mock.clone());

    let mut request = Request::get("/users/{login}")
        .with_path_param("login", "ada")
        .with_retry(
            RetryPolicy::new(4)
                .with_interval_ms(100)
                .with_exponential_backoff(true),
        )
        .with_retry_handler(|err, request| {
            if err.status() == 401 {
                tracing::info!("refreshing token");
                request.authenticate(Authenticator::bearer("refreshed-token"));
            }
            Ok(true)
        });

    let response = connector.send(&mut request).await?;
    let profile: Profile = response.json()?;

    println!("Profile: {} ({})", profile.login, profile.id);
    println!("Attempts: {}", mock.sent_count());
    println!(
        "Final authorization: {}",
        response.pending_request().header("authorization").unwrap_or("-")
    );

    Ok(())
}
