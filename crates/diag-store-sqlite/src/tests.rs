//! Integration tests for `SqliteStorage`, alone and under a `HistoryStore`.

use std::path::PathBuf;

use diag_core::{
  history::{DEFAULT_STORAGE_KEY, HistoryStore, Rating},
  recommend::RecommendResponse,
  storage::Storage,
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStorage;

async fn storage() -> SqliteStorage {
  SqliteStorage::open_in_memory()
    .await
    .expect("in-memory store")
}

fn temp_db_path() -> PathBuf {
  std::env::temp_dir()
    .join(format!("diag-store-test-{}", Uuid::new_v4()))
    .join("history.db")
}

fn response(id: &str) -> RecommendResponse {
  serde_json::from_value(json!({
    "diagnosis_id": id,
    "recommendations": [{
      "rank": 1,
      "model": { "id": "gpt-4.1", "name": "GPT-4.1" },
      "score": 0.75,
      "reason": "balanced"
    }],
    "selections": {
      "q1": "testing",
      "q2": "unit_test",
      "q3": { "complexity": "simple", "priority": [], "context_amount": "small" }
    }
  }))
  .expect("fixture response")
}

// ─── Key/value ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_key_returns_none() {
  let s = storage().await;
  assert_eq!(s.get("absent").await.unwrap(), None);
}

#[tokio::test]
async fn set_then_get() {
  let s = storage().await;
  s.set("k", "v1".into()).await.unwrap();
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some("v1"));
}

#[tokio::test]
async fn set_replaces_previous_value() {
  let s = storage().await;
  s.set("k", "v1".into()).await.unwrap();
  s.set("k", "v2".into()).await.unwrap();
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test]
async fn keys_are_independent() {
  let s = storage().await;
  s.set("a", "1".into()).await.unwrap();
  s.set("b", "2".into()).await.unwrap();
  s.remove("a").await.unwrap();

  assert_eq!(s.get("a").await.unwrap(), None);
  assert_eq!(s.get("b").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn remove_absent_key_is_ok() {
  let s = storage().await;
  s.remove("never-set").await.unwrap();
}

#[tokio::test]
async fn values_survive_reopen() {
  let path = temp_db_path();
  {
    let s = SqliteStorage::open(&path).await.unwrap();
    s.set("k", "durable".into()).await.unwrap();
  }

  let reopened = SqliteStorage::open(&path).await.unwrap();
  assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("durable"));

  if let Some(dir) = path.parent() {
    std::fs::remove_dir_all(dir).ok();
  }
}

// ─── History over SQLite ─────────────────────────────────────────────────────

#[tokio::test]
async fn history_round_trips_through_sqlite() {
  let history = HistoryStore::new(storage().await);
  history.append(response("one")).await.unwrap();
  history.append(response("two")).await.unwrap();
  history
    .update_feedback("one", Rating::new(5).unwrap())
    .await
    .unwrap();

  let all = history.read_all().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].id, "two");
  assert_eq!(all[1].feedback.map(Rating::get), Some(5));
}

#[tokio::test]
async fn history_persists_across_reopen() {
  let path = temp_db_path();
  {
    let history = HistoryStore::new(SqliteStorage::open(&path).await.unwrap());
    history.append(response("kept")).await.unwrap();
    history.append(response("dropped")).await.unwrap();
    history.remove("dropped").await.unwrap();
  }

  let history = HistoryStore::new(SqliteStorage::open(&path).await.unwrap());
  let page = history.read_page(1, 15).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].id, "kept");

  if let Some(dir) = path.parent() {
    std::fs::remove_dir_all(dir).ok();
  }
}

#[tokio::test]
async fn corrupt_history_row_reads_as_empty() {
  let s = storage().await;
  s.set(DEFAULT_STORAGE_KEY, "[{\"id\": 12".into()).await.unwrap();

  let history = HistoryStore::new(s);
  assert!(history.read_all().await.unwrap().is_empty());

  // The next write replaces the corrupt document.
  history.append(response("fresh")).await.unwrap();
  assert_eq!(history.read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn clear_removes_the_row() {
  let s = storage().await;
  let history = HistoryStore::new(s.clone());
  history.append(response("x")).await.unwrap();

  history.clear().await.unwrap();
  assert_eq!(s.get(DEFAULT_STORAGE_KEY).await.unwrap(), None);
  assert_eq!(history.read_page(1, 10).await.unwrap().total, 0);
}
