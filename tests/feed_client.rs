mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use newswire::feed::{FeedClient, FeedError};

use common::{config, rss};

fn client() -> FeedClient {
    FeedClient::new(&config(5, Vec::new())).unwrap()
}

#[tokio::test]
async fn test_fetch_parses_entries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rss")
        .match_header("user-agent", mockito::Matcher::Regex("Mozilla".to_string()))
        .with_status(200)
        .with_body(rss(&[
            ("https://news.example.com/a", "Mon, 06 May 2024 10:00:00 GMT"),
            ("https://news.example.com/b", "Tue, 07 May 2024 10:00:00 GMT"),
        ]))
        .create_async()
        .await;

    let entries = client()
        .fetch(&format!("{}/rss", server.url()))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].link.as_deref(), Some("https://news.example.com/b"));
    assert_eq!(entries[0].categories, vec!["Bitcoin".to_string()]);
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rss")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let result = client().try_fetch(&format!("{}/rss", server.url())).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(FeedError::Status(503))));
}

#[tokio::test]
async fn test_short_body_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rss")
        .with_status(200)
        .with_body("<rss/>")
        .create_async()
        .await;

    let client = client();
    let url = format!("{}/rss", server.url());

    assert!(matches!(
        client.try_fetch(&url).await,
        Err(FeedError::TooShort(6))
    ));
    assert!(client.fetch(&url).await.is_none());
}

#[tokio::test]
async fn test_malformed_feed_is_a_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let body = format!("<rss><channel><item><title>{}</item></rss>", "x".repeat(120));
    server
        .mock("GET", "/rss")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let result = client().try_fetch(&format!("{}/rss", server.url())).await;

    assert!(matches!(result, Err(FeedError::Parse(_))));
}

#[tokio::test]
async fn test_blocked_host_is_never_requested() {
    let result = client()
        .try_fetch("https://coinpaprika.com/news/feed")
        .await;

    assert!(matches!(result, Err(FeedError::Blocked(_))));
}

#[tokio::test]
async fn test_transport_errors_give_up_after_budget() {
    // bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let started = std::time::Instant::now();
    let result = client()
        .try_fetch(&format!("http://127.0.0.1:{port}/rss"))
        .await;

    assert!(matches!(result, Err(FeedError::Request(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_transport_error_then_success_is_retried() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let body = rss(&[("https://news.example.com/a", "Mon, 06 May 2024 10:00:00 GMT")]);

    let server = tokio::spawn(async move {
        // first connection is closed without a response
        let (dropped, _) = listener.accept().await.unwrap();
        drop(dropped);

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    let entries = client()
        .try_fetch(&format!("http://127.0.0.1:{port}/rss"))
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].link.as_deref(), Some("https://news.example.com/a"));
    server.await.unwrap();
}
