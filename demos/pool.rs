//! Fan out requests through a bounded pool.
//!
//! ```text
//! cargo run --example pool
//! ```

use courier_http::{Connector, MockClient, MockResponse, Request, RetryPolicy};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mock = MockClient::default();
    mock.add_url("https://api.example.com/items/3", MockResponse::new(404, ""));
    mock.add_url("https://api.example.com/items/5", MockResponse::new(500, "broken"));
    mock.add_url("https://api.example.com/items/*", MockResponse::json(200, serde_json::json!({"ok": true})));

    let connector = Connector::new("https://api.example.com")
        .with_retry(RetryPolicy::new(2))
        .treat_as_success(404)
        .with_mock_client(mock.clone());

    let report = connector
        .pool((1..=8).map(|id| Request::get(format!("/items/{}", id))))
        .concurrency(3)
        .on_response(|index, response| {
            println!("[{}] {} {}", index, response.status(), response.text());
        })
        .on_exception(|index, err| {
            println!("[{}] failed: {}", index, err);
        })
        .send()
        .await;

    println!(
        "{} succeeded, {} failed, {} sends",
        report.succeeded,
        report.failed,
        mock.sent_count()
    );
}
