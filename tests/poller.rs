mod common;

use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use newswire::{
    export::{latest_export, read_export, ArticleExporter, RepositorySnapshots},
    http::sse::client_stream,
    hub::HubMessage,
    store::ArticleRepository,
};

use common::{article, config, harness, rss};

const MON: &str = "Mon, 06 May 2024 10:00:00 GMT";
const TUE: &str = "Tue, 07 May 2024 10:00:00 GMT";
const WED: &str = "Wed, 08 May 2024 10:00:00 GMT";

async fn serve_feed(server: &mut mockito::ServerGuard, path: &str, body: String) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_process_feed_stores_and_broadcasts_first_new_article() {
    let mut server = mockito::Server::new_async().await;
    let body = rss(&[
        ("https://news.example.com/a", MON),
        ("https://news.example.com/b", WED),
        ("https://news.example.com/c", TUE),
    ]);
    serve_feed(&mut server, "/rss", body).await;
    let feed = format!("{}/rss", server.url());

    let config = config(5, vec![feed.clone()]);
    let h = harness(&config, &[]).await;
    let (_, mut rx) = h.hub.register();

    assert_eq!(h.poller.process_feed(&feed).await, 3);

    let urls: Vec<String> = h.poller.snapshot().into_iter().map(|a| a.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://news.example.com/b",
            "https://news.example.com/c",
            "https://news.example.com/a",
        ]
    );
    assert!(h.store.exists("https://news.example.com/c").await.unwrap());

    let Some(HubMessage::Articles { articles }) = rx.recv().await else {
        panic!("expected an articles message");
    };
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].url, "https://news.example.com/a");
    assert_eq!(articles[0].image_url, "https://img.example.com/0.jpg");
    assert!(rx.try_recv().is_err());

    // capacity not reached yet
    assert!(!h.poller.is_ready());
}

#[tokio::test]
async fn test_refetch_adds_nothing() {
    let mut server = mockito::Server::new_async().await;
    serve_feed(
        &mut server,
        "/rss",
        rss(&[("https://news.example.com/a", MON)]),
    )
    .await;
    let feed = format!("{}/rss", server.url());

    let h = harness(&config(5, vec![feed.clone()]), &[]).await;

    assert_eq!(h.poller.process_feed(&feed).await, 1);
    assert_eq!(h.poller.process_feed(&feed).await, 0);
    assert_eq!(h.poller.buffer_len(), 1);
}

#[tokio::test]
async fn test_ready_once_buffer_fills() {
    let mut server = mockito::Server::new_async().await;
    serve_feed(
        &mut server,
        "/rss",
        rss(&[
            ("https://news.example.com/a", MON),
            ("https://news.example.com/b", TUE),
        ]),
    )
    .await;
    let feed = format!("{}/rss", server.url());

    let h = harness(&config(2, vec![feed.clone()]), &[]).await;
    assert!(!h.poller.is_ready());

    h.poller.process_feed(&feed).await;

    assert!(h.poller.is_ready());
    assert_eq!(h.poller.buffer_status().current, 2);
}

#[tokio::test]
async fn test_full_buffer_skips_links_already_stored() {
    let mut server = mockito::Server::new_async().await;
    serve_feed(
        &mut server,
        "/first",
        rss(&[
            ("https://news.example.com/a", MON),
            ("https://news.example.com/b", TUE),
        ]),
    )
    .await;
    serve_feed(
        &mut server,
        "/second",
        rss(&[
            ("https://news.example.com/seen", WED),
            ("https://news.example.com/d", WED),
        ]),
    )
    .await;
    let first = format!("{}/first", server.url());
    let second = format!("{}/second", server.url());

    let h = harness(&config(2, vec![first.clone(), second.clone()]), &[]).await;
    h.store
        .save(
            "https://news.example.com/seen",
            &article("https://news.example.com/seen", "2024-05-08T10:00:00+00:00"),
        )
        .await
        .unwrap();

    assert_eq!(h.poller.process_feed(&first).await, 2);
    assert_eq!(h.poller.process_feed(&second).await, 1);

    let urls: Vec<String> = h.poller.snapshot().into_iter().map(|a| a.url).collect();
    assert!(urls.contains(&"https://news.example.com/d".to_string()));
    assert!(!urls.contains(&"https://news.example.com/seen".to_string()));
}

#[tokio::test]
async fn test_failed_feed_yields_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;
    let feed = format!("{}/missing", server.url());

    let h = harness(&config(2, vec![feed.clone()]), &[]).await;

    assert_eq!(h.poller.process_feed(&feed).await, 0);
    assert_eq!(h.poller.buffer_len(), 0);
}

#[tokio::test]
async fn test_warm_start_from_repository() {
    let stored = vec![
        article("https://news.example.com/a", "2024-05-06T10:00:00+00:00"),
        article("https://news.example.com/b", "2024-05-07T10:00:00+00:00"),
    ];
    let h = harness(&config(5, Vec::new()), &stored).await;

    assert!(h.poller.is_ready());
    let initial = h.poller.initial_articles();
    assert_eq!(initial.articles[0].url, "https://news.example.com/b");
}

#[tokio::test]
async fn test_clear_on_start_ignores_stored_articles() {
    let mut config = config(5, Vec::new());
    config.redis_clear_on_start = true;

    let stored = vec![article("https://news.example.com/a", "2024-05-06T10:00:00+00:00")];
    let h = harness(&config, &stored).await;

    assert!(!h.poller.is_ready());
    assert_eq!(h.poller.buffer_len(), 0);
    assert!(!h.store.exists("https://news.example.com/a").await.unwrap());
}

#[tokio::test]
async fn test_run_fills_buffer_and_exports() {
    // recent, so the steady-state age pruning keeps them
    let now = chrono::Utc::now();
    let earlier = (now - chrono::Duration::hours(2)).to_rfc2822();
    let later = (now - chrono::Duration::hours(1)).to_rfc2822();

    let mut server = mockito::Server::new_async().await;
    serve_feed(
        &mut server,
        "/rss",
        rss(&[
            ("https://news.example.com/a", earlier.as_str()),
            ("https://news.example.com/b", later.as_str()),
        ]),
    )
    .await;
    let feed = format!("{}/rss", server.url());

    let h = harness(&config(2, vec![feed]), &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let exporter = ArticleExporter::new(dir.path()).unwrap();
    let cancel = CancellationToken::new();

    let run = h.poller.run(cancel.clone(), Some(&exporter));
    let observe = async {
        tokio::time::timeout(Duration::from_secs(10), async {
            while exporter.last_saved().is_none() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("poller never exported");
        cancel.cancel();
    };
    tokio::join!(run, observe);

    assert!(h.poller.is_ready());
    let export = read_export(&latest_export(dir.path()).await.unwrap())
        .await
        .unwrap();
    assert_eq!(export.total_articles, 2);
}

#[tokio::test]
async fn test_snapshot_exporter_does_not_take_articles_from_the_api() {
    let mut server = mockito::Server::new_async().await;
    serve_feed(
        &mut server,
        "/rss",
        rss(&[("https://news.example.com/new", WED)]),
    )
    .await;
    let feed = format!("{}/rss", server.url());

    // the API process, warm and full
    let stored = vec![article("https://news.example.com/old", "2024-05-06T10:00:00+00:00")];
    let api = harness(&config(1, vec![feed.clone()]), &stored).await;
    let (_, mut rx) = api.hub.register();

    // the background process over the same repository
    let dir = tempfile::tempdir().unwrap();
    let snapshots = RepositorySnapshots::new(
        api.store.clone(),
        ArticleExporter::new(dir.path()).unwrap(),
        1,
        Duration::from_secs(60),
    );
    snapshots.export_once().await.unwrap();

    assert_eq!(api.poller.process_feed(&feed).await, 1);

    let urls: Vec<String> = api.poller.snapshot().into_iter().map(|a| a.url).collect();
    assert_eq!(urls, vec!["https://news.example.com/new"]);
    assert!(matches!(rx.recv().await, Some(HubMessage::Articles { .. })));

    let path = snapshots.export_once().await.unwrap().unwrap();
    let export = read_export(&path).await.unwrap();
    assert_eq!(export.articles[0]["url"], "https://news.example.com/new");
}

#[tokio::test]
async fn test_cloudflare_feeds_are_polled_on_their_own_interval() {
    let mut server = mockito::Server::new_async().await;
    let regular_mock = server
        .mock("GET", "/rss")
        .with_status(200)
        .with_body(rss(&[("https://news.example.com/a", MON)]))
        .expect_at_least(3)
        .create_async()
        .await;
    let cloudflare_mock = server
        .mock("GET", "/cloudflare")
        .with_status(200)
        .with_body(rss(&[("https://news.example.com/b", TUE)]))
        .expect(1)
        .create_async()
        .await;

    let regular = format!("{}/rss", server.url());
    let cloudflare = format!("{}/cloudflare", server.url());

    let mut config = config(1, vec![regular, cloudflare]);
    config.cloudflare_hosts = vec!["/cloudflare".to_string()];
    config.polling_interval = Duration::from_millis(50);
    config.cloudflare_polling_interval = Duration::from_secs(3600);

    let h = harness(&config, &[]).await;
    let cancel = CancellationToken::new();

    let run = h.poller.run(cancel.clone(), None);
    let stop = async {
        tokio::time::sleep(Duration::from_millis(600)).await;
        cancel.cancel();
    };
    tokio::join!(run, stop);

    // the fill cycle polls every feed once, steady cycles skip the slow one
    regular_mock.assert_async().await;
    cloudflare_mock.assert_async().await;
}

#[tokio::test]
async fn test_client_stream_sends_initial_then_updates() {
    let mut server = mockito::Server::new_async().await;
    serve_feed(
        &mut server,
        "/rss",
        rss(&[("https://news.example.com/a", MON)]),
    )
    .await;
    let feed = format!("{}/rss", server.url());

    let h = harness(&config(3, vec![feed.clone()]), &[]).await;
    let mut stream = Box::pin(client_stream(h.poller.clone(), h.hub.clone()));
    assert_eq!(h.hub.len(), 1);

    let initial = stream.next().await.unwrap();
    assert_eq!(initial["status"], "initializing");
    assert_eq!(initial["articles"].as_array().unwrap().len(), 0);
    assert_eq!(initial["buffer_status"]["required"], 3);
    assert_eq!(initial["buffer_status"]["current"], 0);

    h.poller.process_feed(&feed).await;

    let update = stream.next().await.unwrap();
    assert_eq!(update["articles"][0]["url"], "https://news.example.com/a");
    assert_eq!(update["buffer_status"]["current"], 1);

    drop(stream);
    assert!(h.hub.is_empty());
}

#[tokio::test]
async fn test_client_stream_ends_on_shutdown() {
    let h = harness(&config(3, Vec::new()), &[]).await;
    let mut stream = Box::pin(client_stream(h.poller.clone(), h.hub.clone()));
    stream.next().await.unwrap();

    h.hub.shutdown();

    let notice = stream.next().await.unwrap();
    assert_eq!(notice["type"], "shutdown");
    assert!(stream.next().await.is_none());
}
