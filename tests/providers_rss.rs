// tests/providers_rss.rs
//
// Wire-service feeds: RSS 2.0 and Atom fixtures parsed directly, plus the
// provider fetching from a local server where one feed is broken.

use std::time::Duration;

use crisis_pipeline::ingest::config::FeedConfig;
use crisis_pipeline::ingest::content_hash;
use crisis_pipeline::ingest::providers::rss::parse_feed;
use crisis_pipeline::ingest::providers::RssProvider;
use crisis_pipeline::ingest::types::{EventCategory, FetchOptions, SourceProvider, SourceTier};
use shuttle_axum::axum::{http::StatusCode, routing::get, Router};

fn feed(name: &str, url: &str) -> FeedConfig {
    FeedConfig {
        name: name.into(),
        url: url.into(),
        label: "Wire".into(),
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        shuttle_axum::axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[test]
fn rss_items_are_gated_scored_and_geocoded() {
    let xml = std::fs::read_to_string("tests/fixtures/rss_wire.xml").expect("fixture");
    let events = parse_feed(&xml, &feed("wire", "http://unused")).expect("parse");

    // the bakery item is not geopolitical
    assert_eq!(events.len(), 2);

    let depot = &events[0];
    assert_eq!(depot.id, format!("rss:wire:{}", content_hash("urn:wire:1001")));
    assert_eq!(depot.title, "Missile strike hits Tehran fuel depot");
    assert_eq!(
        depot.summary,
        "Officials reported casualties after the overnight strike."
    );
    assert_eq!(depot.category, EventCategory::Military);
    assert_eq!(depot.location.as_ref().map(|l| l.name.as_str()), Some("Tehran"));
    assert_eq!(depot.timestamp.to_rfc3339(), "2025-06-10T12:30:00+00:00");
    assert_eq!(depot.source, "Wire");
    assert_eq!(depot.source_tier, SourceTier::Public);

    // no guid: the link is the natural key
    let troops = &events[1];
    assert_eq!(
        troops.id,
        format!(
            "rss:wire:{}",
            content_hash("https://wire.example.com/world/border-troops")
        )
    );
    assert!(troops.summary.contains("armoured columns moving"));
    assert!(troops.location.is_none());
}

#[test]
fn atom_entries_use_alternate_link() {
    let xml = std::fs::read_to_string("tests/fixtures/atom_feed.xml").expect("fixture");
    let events = parse_feed(&xml, &feed("desk", "http://unused")).expect("parse");

    assert_eq!(events.len(), 1);
    let ev = &events[0];
    assert_eq!(ev.url.as_deref(), Some("https://desk.example.org/kyiv-drones"));
    assert_eq!(ev.id, format!("rss:desk:{}", content_hash("urn:desk:entry:42")));
    assert_eq!(ev.category, EventCategory::Conflict);
    assert_eq!(ev.location.as_ref().map(|l| l.name.as_str()), Some("Kyiv"));
}

#[test]
fn ids_are_stable_across_parses() {
    let xml = std::fs::read_to_string("tests/fixtures/rss_wire.xml").expect("fixture");
    let f = feed("wire", "http://unused");
    let a: Vec<String> = parse_feed(&xml, &f).unwrap().into_iter().map(|e| e.id).collect();
    let b: Vec<String> = parse_feed(&xml, &f).unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(a, b);
}

#[tokio::test]
async fn broken_feed_does_not_sink_the_others() {
    let wire = std::fs::read_to_string("tests/fixtures/rss_wire.xml").expect("fixture");
    let atom = std::fs::read_to_string("tests/fixtures/atom_feed.xml").expect("fixture");
    let app = Router::new()
        .route("/wire.xml", get(move || async move { wire }))
        .route("/atom.xml", get(move || async move { atom }))
        .route(
            "/down.xml",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
    let base = serve(app).await;

    let provider = RssProvider::new(
        vec![
            feed("wire", &format!("{base}/wire.xml")),
            feed("down", &format!("{base}/down.xml")),
            feed("desk", &format!("{base}/atom.xml")),
        ],
        reqwest::Client::new(),
        Duration::from_secs(2),
    );

    let events = provider.fetch(&FetchOptions::default()).await.expect("fetch");
    assert_eq!(events.len(), 3);
    // newest first across feeds
    assert!(events[0].title.contains("Kyiv"));
    assert!(events
        .windows(2)
        .all(|w| w[0].timestamp >= w[1].timestamp));

    let only_tehran = provider
        .fetch(&FetchOptions {
            query: Some("tehran".into()),
            ..Default::default()
        })
        .await
        .expect("fetch");
    assert_eq!(only_tehran.len(), 1);
}
