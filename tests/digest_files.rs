// tests/digest_files.rs
//
// Private digests read from a directory: both files merged newest first,
// a missing or corrupt file simply contributes nothing.

use crisis_pipeline::ingest::providers::DigestProvider;
use crisis_pipeline::ingest::types::{FetchOptions, SourceProvider, SourceTier};
use std::fs;

#[tokio::test]
async fn both_digests_are_merged_newest_first() {
    let p = DigestProvider::new("tests/fixtures/digests");
    let events = p.fetch(&FetchOptions::default()).await.expect("fetch");

    let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Pentagon weighs new troops deployment to the Gulf",
            "Oil sanctions tighten as Iran tensions build",
            "Taipei warns of escalation after naval drills",
        ]
    );
    assert!(events.iter().all(|e| e.source_tier == SourceTier::Private));
    assert_eq!(events[2].source, "Nikkei");
    assert_eq!(events[0].location.as_ref().map(|l| l.name.as_str()), Some("Pentagon"));
    assert!(p.health_check().await);
}

#[tokio::test]
async fn since_and_limit_apply() {
    let p = DigestProvider::new("tests/fixtures/digests");
    let since = chrono::DateTime::parse_from_rfc3339("2025-06-10T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let events = p
        .fetch(&FetchOptions {
            since: Some(since),
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, "WSJ");
}

#[tokio::test]
async fn corrupt_or_missing_files_contribute_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let p = DigestProvider::new(dir.path());
    assert!(p.fetch(&FetchOptions::default()).await.unwrap().is_empty());
    assert!(!p.health_check().await);

    fs::write(dir.path().join("wsj.json"), "[{\"title\": ").unwrap();
    fs::write(
        dir.path().join("nikkei.json"),
        r#"[{"title":"Seoul and Tokyo hold summit","source":"Nikkei"}]"#,
    )
    .unwrap();
    let events = p.fetch(&FetchOptions::default()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, "Seoul and Tokyo hold summit");
    assert!(p.health_check().await);
}
