#![allow(dead_code)]

use rwt_cache::prelude::*;
use serde_json::json;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn team(id: &str, is_paid: bool) -> Document {
    Document::try_from(json!({"id": id, "name": format!("team {id}"), "isPaid": is_paid})).unwrap()
}

pub fn member(id: &str) -> Document {
    Document::try_from(json!({"id": id, "teamId": "t1", "isPaid": false})).unwrap()
}

pub fn refs(table: &str, ids: &[&str]) -> Vec<DocRef> {
    ids.iter().map(|id| DocRef::new(table, *id)).collect()
}

pub fn ids(docs: &[Option<Document>]) -> Vec<Option<String>> {
    docs.iter().map(|doc| doc.as_ref().and_then(Document::id)).collect()
}
