mod common;

use rwt_cache::prelude::*;
use rwt_cache::test::coordinator;
use serde_json::json;

use common::{ids, init_tracing, refs, team};

#[tokio::test]
async fn no_op_records_are_not_mirrored() {
    init_tracing();
    let (_store, cache, coordinator) = coordinator();

    let results = coordinator
        .write(&[
            WriteSpec::insert("Team", team("t1", false)),
            WriteSpec::update("Team", "ghost", Patch::new().set("isPaid", true)),
            WriteSpec::insert("Team", team("t3", false)),
        ])
        .await
        .unwrap();

    assert_eq!(ids(&results), vec![Some("t1".into()), None, Some("t3".into())]);
    assert_eq!(cache.set_calls(), 1);
    assert_eq!(cache.set_entries(), 2);
    assert!(cache.peek(&CacheKey::new("Team", "ghost")).await.is_none());
}

#[tokio::test]
async fn failed_store_write_leaves_cache_alone() {
    let (store, cache, coordinator) = coordinator();
    store.fail_writes(true);

    let err = coordinator
        .write(&[WriteSpec::insert("Team", team("t1", false))])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
    assert_eq!(cache.mutations(), 0);
}

#[tokio::test]
async fn failed_mirror_is_reported_after_store_write() {
    let (store, cache, coordinator) = coordinator();
    cache.fail_set(true);

    let err = coordinator
        .write(&[WriteSpec::insert("Team", team("t1", false))])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cache(_)));
    assert_eq!(store.get("Team", "t1"), Some(team("t1", false)));
}

#[tokio::test]
async fn written_documents_are_read_from_cache() {
    let (store, _cache, coordinator) = coordinator();

    coordinator
        .write(&[
            WriteSpec::insert("Team", team("t1", false)),
            WriteSpec::insert("User", Document::new().with("id", 7).with("email", "a@b.c")),
        ])
        .await
        .unwrap();

    let docs = coordinator
        .read(&[DocRef::new("Team", "t1"), DocRef::new("User", "7")])
        .await
        .unwrap();

    assert_eq!(ids(&docs), vec![Some("t1".into()), Some("7".into())]);
    assert_eq!(store.read_calls(), 0);
}

#[tokio::test]
async fn update_refreshes_stale_entry() {
    let (store, cache, coordinator) = coordinator();
    store.seed("Team", team("t1", false));
    coordinator.read(&refs("Team", &["t1"])).await.unwrap();

    let results = coordinator
        .write(&[WriteSpec::update("Team", "t1", Patch::new().set("isPaid", true))])
        .await
        .unwrap();

    assert_eq!(results[0].as_ref().unwrap().get("isPaid"), Some(&json!(true)));
    let cached = cache.peek(&CacheKey::new("Team", "t1")).await.unwrap();
    assert_eq!(cached.get("isPaid"), Some(&json!(true)));
    assert_eq!(cached.get("name"), Some(&json!("team t1")));
}

#[tokio::test]
async fn empty_write_touches_nothing() {
    let (store, cache, coordinator) = coordinator();

    assert!(coordinator.write(&[]).await.unwrap().is_empty());
    assert_eq!(store.write_calls(), 0);
    assert_eq!(cache.mutations(), 0);
}

#[tokio::test]
async fn clear_drops_one_entry() {
    let (store, cache, coordinator) = coordinator();
    store.seed("Team", team("t1", false));
    coordinator
        .prime("Team", &[team("t1", false), team("t2", false)])
        .await
        .unwrap();

    assert!(coordinator.clear(&CacheKey::new("Team", "t1")).await.unwrap());
    assert!(!coordinator.clear(&CacheKey::new("Team", "t1")).await.unwrap());
    assert!(cache.peek(&CacheKey::new("Team", "t2")).await.is_some());

    coordinator.read(&refs("Team", &["t1", "t2"])).await.unwrap();
    assert_eq!(store.read_refs(), 1);
}

#[tokio::test]
async fn prime_is_one_round_trip() {
    let (store, cache, coordinator) = coordinator();
    let docs = (1..=4).map(|i| team(&format!("t{i}"), true)).collect::<Vec<_>>();

    coordinator.prime("Team", &docs).await.unwrap();

    assert_eq!(cache.set_calls(), 1);
    assert_eq!(cache.set_entries(), 4);
    assert_eq!(cache.last_ttl(), Some(coordinator.ttl()));

    let read = coordinator.read(&refs("Team", &["t1", "t4"])).await.unwrap();
    assert_eq!(ids(&read), vec![Some("t1".into()), Some("t4".into())]);
    assert_eq!(store.read_calls(), 0);
}

#[tokio::test]
async fn prime_rejects_documents_without_id() {
    let (_store, cache, coordinator) = coordinator();

    let err = coordinator
        .prime("Team", &[team("t1", false), Document::new().with("name", "anonymous")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingId { ref table } if table == "Team"));
    assert_eq!(cache.mutations(), 0);

    coordinator.prime("Team", &[]).await.unwrap();
    assert_eq!(cache.mutations(), 0);
}
