//! The local diagnosis history log.
//!
//! Past runs are kept as one JSON array under a single storage key, newest
//! first and bounded in size. Every mutation reads the whole collection,
//! changes it and writes the whole collection back. Reads tolerate corrupt
//! stored data by treating it as an empty log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::Mutex;

use crate::{
  Error, Result,
  recommend::{RecommendResponse, RecommendResult},
  selection::{self, Selections},
  storage::Storage,
};

/// Storage key the collection lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "copilot_diagnosis_history";

/// Maximum number of records retained; older ones are dropped on append.
pub const DEFAULT_CAPACITY: usize = 100;

// ─── Rating ──────────────────────────────────────────────────────────────────

/// A 1–5 user rating.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
  pub const MAX: u8 = 5;
  pub const MIN: u8 = 1;

  pub fn new(value: i64) -> Result<Self> {
    if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(Error::InvalidRating(value))
    }
  }

  pub fn get(self) -> u8 { self.0 }
}

impl TryFrom<i64> for Rating {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> { Self::new(value) }
}

impl From<Rating> for u8 {
  fn from(r: Rating) -> Self { r.0 }
}

impl fmt::Display for Rating {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The recommendation output stored with a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResult {
  pub recommendations: Vec<RecommendResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selections:      Option<Selections>,
}

/// One persisted diagnostic run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisHistory {
  /// The `diagnosis_id` assigned by the recommender.
  pub id:         String,
  #[serde(deserialize_with = "selection::deserialize_lenient")]
  pub selections: Selections,
  #[serde(default, deserialize_with = "deserialize_result")]
  pub result:     Option<HistoryResult>,
  #[serde(default)]
  pub feedback:   Option<Rating>,
  pub created_at: DateTime<Utc>,
}

/// An unreadable `result` decodes as `None`; the rest of the record is kept.
fn deserialize_result<'de, D>(
  deserializer: D,
) -> std::result::Result<Option<HistoryResult>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = serde_json::Value::deserialize(deserializer)?;
  if value.is_null() {
    return Ok(None);
  }
  Ok(serde_json::from_value(value).ok())
}

impl DiagnosisHistory {
  /// Build a fresh, unrated record from a successful recommendation.
  pub fn from_response(
    response: RecommendResponse,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: response.diagnosis_id,
      selections: response.selections.clone(),
      result: Some(HistoryResult {
        recommendations: response.recommendations,
        selections:      Some(response.selections),
      }),
      feedback: None,
      created_at,
    }
  }

  /// The top-ranked recommendation, if the record has any.
  pub fn top(&self) -> Option<&RecommendResult> {
    self
      .result
      .as_ref()?
      .recommendations
      .iter()
      .min_by_key(|r| r.rank)
  }

  /// Rebuild the response this record was created from, for re-display.
  pub fn to_response(&self) -> RecommendResponse {
    RecommendResponse {
      diagnosis_id:    self.id.clone(),
      recommendations: self
        .result
        .as_ref()
        .map(|r| r.recommendations.clone())
        .unwrap_or_default(),
      selections:      self.selections.clone(),
    }
  }
}

/// A page of history plus the size of the whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
  pub items: Vec<DiagnosisHistory>,
  pub total: usize,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A bounded, newest-first log of [`DiagnosisHistory`] records over a
/// [`Storage`] backend.
///
/// Operations issued through one `HistoryStore` are serialised: each holds an
/// internal lock across its read-modify-write. Separate stores (or separate
/// processes) sharing the same backend key are last-writer-wins.
pub struct HistoryStore<S> {
  storage:  S,
  key:      String,
  capacity: usize,
  lock:     Mutex<()>,
}

impl<S: Storage> HistoryStore<S> {
  /// A store using [`DEFAULT_STORAGE_KEY`] and [`DEFAULT_CAPACITY`].
  pub fn new(storage: S) -> Self {
    Self::with_options(storage, DEFAULT_STORAGE_KEY, DEFAULT_CAPACITY)
  }

  pub fn with_options(
    storage: S,
    key: impl Into<String>,
    capacity: usize,
  ) -> Self {
    Self {
      storage,
      key: key.into(),
      capacity,
      lock: Mutex::new(()),
    }
  }

  pub fn storage(&self) -> &S { &self.storage }

  pub fn capacity(&self) -> usize { self.capacity }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// All records, newest first.
  ///
  /// The collection is re-sorted on every read regardless of how it was
  /// stored. A missing or unparseable value reads as empty.
  pub async fn read_all(&self) -> Result<Vec<DiagnosisHistory>> {
    let _guard = self.lock.lock().await;
    self.load().await
  }

  /// Page `page` (1-based) of at most `limit` records, plus the total count.
  pub async fn read_page(&self, page: usize, limit: usize) -> Result<HistoryPage> {
    if page == 0 || limit == 0 {
      return Err(Error::InvalidPagination { page, limit });
    }

    let all = self.read_all().await?;
    let total = all.len();
    let offset = (page - 1).saturating_mul(limit);
    let items = all.into_iter().skip(offset).take(limit).collect();

    Ok(HistoryPage { items, total })
  }

  /// Look up a single record by id.
  pub async fn get(&self, id: &str) -> Result<Option<DiagnosisHistory>> {
    Ok(self.read_all().await?.into_iter().find(|h| h.id == id))
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Record a successful recommendation, timestamped now.
  pub async fn append(&self, response: RecommendResponse) -> Result<DiagnosisHistory> {
    self.append_at(response, Utc::now()).await
  }

  /// Record a successful recommendation with an explicit creation time.
  ///
  /// The record goes to the head of the log; anything beyond the capacity is
  /// dropped from the tail.
  pub async fn append_at(
    &self,
    response: RecommendResponse,
    created_at: DateTime<Utc>,
  ) -> Result<DiagnosisHistory> {
    let _guard = self.lock.lock().await;

    let entry = DiagnosisHistory::from_response(response, created_at);
    let mut history = self.load().await?;
    history.insert(0, entry.clone());

    if history.len() > self.capacity {
      let dropped = history.len() - self.capacity;
      history.truncate(self.capacity);
      tracing::debug!(dropped, capacity = self.capacity, "evicted oldest history records");
    }

    self.persist(&history).await?;
    Ok(entry)
  }

  /// Set the rating of record `id`. Returns `false` (and writes nothing) if
  /// no such record exists.
  pub async fn update_feedback(&self, id: &str, rating: Rating) -> Result<bool> {
    let _guard = self.lock.lock().await;

    let mut history = self.load().await?;
    let Some(item) = history.iter_mut().find(|h| h.id == id) else {
      tracing::debug!(id, "feedback for unknown history record ignored");
      return Ok(false);
    };
    item.feedback = Some(rating);

    self.persist(&history).await?;
    Ok(true)
  }

  /// Delete record `id`. Deleting an absent id is a no-op.
  pub async fn remove(&self, id: &str) -> Result<()> {
    let _guard = self.lock.lock().await;

    let mut history = self.load().await?;
    history.retain(|h| h.id != id);
    self.persist(&history).await
  }

  /// Delete every record.
  pub async fn clear(&self) -> Result<()> {
    let _guard = self.lock.lock().await;

    self
      .storage
      .remove(&self.key)
      .await
      .map_err(|e| Error::Storage(Box::new(e)))
  }

  // ── Internals (caller holds the lock) ─────────────────────────────────────

  async fn load(&self) -> Result<Vec<DiagnosisHistory>> {
    let raw = self
      .storage
      .get(&self.key)
      .await
      .map_err(|e| Error::Storage(Box::new(e)))?;

    let Some(raw) = raw else {
      return Ok(Vec::new());
    };

    let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
      Ok(records) => records,
      Err(e) => {
        tracing::warn!(key = %self.key, error = %e, "stored history is unreadable; treating as empty");
        return Ok(Vec::new());
      }
    };

    // One bad record must not take the rest of the log with it.
    let mut items: Vec<DiagnosisHistory> = records
      .into_iter()
      .enumerate()
      .filter_map(|(index, record)| match serde_json::from_value(record) {
        Ok(item) => Some(item),
        Err(e) => {
          tracing::warn!(key = %self.key, index, error = %e, "skipping unreadable history record");
          None
        }
      })
      .collect();

    // Stable, so records with equal timestamps keep their stored order.
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
  }

  async fn persist(&self, history: &[DiagnosisHistory]) -> Result<()> {
    let encoded = serde_json::to_string(history)?;
    self
      .storage
      .set(&self.key, encoded)
      .await
      .map_err(|e| Error::Storage(Box::new(e)))?;
    tracing::debug!(key = %self.key, records = history.len(), "history persisted");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::{
    selection::Q3Answer,
    storage::MemoryStorage,
    testing::{response, response_with},
  };

  fn store() -> HistoryStore<MemoryStorage> { HistoryStore::new(MemoryStorage::new()) }

  fn ids(items: &[DiagnosisHistory]) -> Vec<&str> {
    items.iter().map(|h| h.id.as_str()).collect()
  }

  // ─── Append / capacity ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn append_stores_unrated_record_at_head() {
    let s = store();
    s.append(response("first")).await.unwrap();
    let entry = s.append(response("second")).await.unwrap();

    assert_eq!(entry.feedback, None);
    assert_eq!(
      entry.result.as_ref().and_then(|r| r.selections.clone()),
      Some(entry.selections.clone())
    );

    let all = s.read_all().await.unwrap();
    assert_eq!(ids(&all), ["second", "first"]);
  }

  #[tokio::test]
  async fn capacity_keeps_the_newest_records() {
    let s = store();
    let base = Utc::now();
    for i in 0..130 {
      s.append_at(response(&format!("d{i}")), base + Duration::seconds(i))
        .await
        .unwrap();
      assert!(s.read_all().await.unwrap().len() <= DEFAULT_CAPACITY);
    }

    let all = s.read_all().await.unwrap();
    assert_eq!(all.len(), DEFAULT_CAPACITY);
    let expected: Vec<String> = (30..130).rev().map(|i| format!("d{i}")).collect();
    assert_eq!(ids(&all), expected);
  }

  #[tokio::test]
  async fn capacity_holds_with_identical_timestamps() {
    let s = HistoryStore::with_options(MemoryStorage::new(), "k", 3);
    let at = Utc::now();
    for i in 0..5 {
      s.append_at(response(&format!("d{i}")), at).await.unwrap();
    }

    assert_eq!(ids(&s.read_all().await.unwrap()), ["d4", "d3", "d2"]);
  }

  // ─── Reads ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn empty_store_reads_empty() {
    let s = store();
    assert!(s.read_all().await.unwrap().is_empty());
    let page = s.read_page(1, 10).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
  }

  #[tokio::test]
  async fn corrupt_data_reads_as_empty() {
    let storage = MemoryStorage::new();
    storage.put_raw(DEFAULT_STORAGE_KEY, "{not json");
    let s = HistoryStore::new(storage);

    assert!(s.read_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn bad_result_does_not_lose_other_records() {
    let good = DiagnosisHistory::from_response(response("good"), Utc::now());
    let raw = serde_json::json!([
      good,
      {
        "id": "bad",
        "selections": { "q1": "bug_fixing" },
        "result": { "recommendations": [{ "rank": 1 }] },
        "created_at": "2025-01-02T03:04:05Z"
      },
      { "selections": {}, "created_at": "not a date" }
    ]);
    let storage = MemoryStorage::new();
    storage.put_raw(DEFAULT_STORAGE_KEY, raw.to_string());
    let s = HistoryStore::new(storage);

    let all = s.read_all().await.unwrap();
    assert_eq!(ids(&all), ["good", "bad"]);
    assert!(all[0].result.is_some());
    assert!(all[1].result.is_none());
    assert_eq!(all[1].selections.q1.as_deref(), Some("bug_fixing"));

    s.append(response("new")).await.unwrap();
    assert_eq!(ids(&s.read_all().await.unwrap()), ["new", "good", "bad"]);
  }

  #[tokio::test]
  async fn out_of_order_data_is_resorted() {
    let base = Utc::now();
    let records: Vec<DiagnosisHistory> = [(1, "old"), (3, "new"), (2, "mid")]
      .into_iter()
      .map(|(offset, id)| {
        DiagnosisHistory::from_response(response(id), base + Duration::minutes(offset))
      })
      .collect();

    let storage = MemoryStorage::new();
    storage.put_raw(DEFAULT_STORAGE_KEY, serde_json::to_string(&records).unwrap());
    let s = HistoryStore::new(storage);

    assert_eq!(ids(&s.read_all().await.unwrap()), ["new", "mid", "old"]);
  }

  #[tokio::test]
  async fn string_encoded_selections_are_decoded() {
    let raw = serde_json::json!([{
      "id": "legacy",
      "selections": "{\"q1\":\"testing\",\"q2\":\"unit_test\"}",
      "result": null,
      "created_at": "2025-01-02T03:04:05Z"
    }]);
    let storage = MemoryStorage::new();
    storage.put_raw(DEFAULT_STORAGE_KEY, raw.to_string());
    let s = HistoryStore::new(storage);

    let all = s.read_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].selections.q1.as_deref(), Some("testing"));
    assert_eq!(all[0].selections.q2.as_deref(), Some("unit_test"));
    assert_eq!(all[0].feedback, None);
    assert!(all[0].result.is_none());
  }

  #[tokio::test]
  async fn pages_partition_the_collection() {
    let s = store();
    let base = Utc::now();
    for i in 0..23 {
      s.append_at(response(&format!("d{i}")), base + Duration::seconds(i))
        .await
        .unwrap();
    }
    let all = s.read_all().await.unwrap();

    let limit = 5;
    let mut seen = Vec::new();
    for page in 1..=5 {
      let p = s.read_page(page, limit).await.unwrap();
      assert_eq!(p.total, 23);
      if page < 5 {
        assert_eq!(p.items.len(), limit);
      } else {
        assert_eq!(p.items.len(), 3);
      }
      seen.extend(p.items);
    }
    assert_eq!(seen, all);

    let beyond = s.read_page(6, limit).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 23);
  }

  #[tokio::test]
  async fn zero_page_or_limit_is_rejected() {
    let s = store();
    assert!(matches!(
      s.read_page(0, 10).await,
      Err(Error::InvalidPagination { .. })
    ));
    assert!(matches!(
      s.read_page(1, 0).await,
      Err(Error::InvalidPagination { .. })
    ));
  }

  // ─── Feedback ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn feedback_updates_only_the_target_record() {
    let s = store();
    for id in ["a", "b", "c"] {
      s.append(response(id)).await.unwrap();
    }
    let before = s.read_all().await.unwrap();

    assert!(s.update_feedback("b", Rating::new(4).unwrap()).await.unwrap());
    assert!(s.update_feedback("b", Rating::new(2).unwrap()).await.unwrap());

    let after = s.read_all().await.unwrap();
    let rated: Vec<_> = after.iter().filter(|h| h.feedback.is_some()).collect();
    assert_eq!(rated.len(), 1);
    assert_eq!(rated[0].id, "b");
    assert_eq!(rated[0].feedback.map(Rating::get), Some(2));

    for (old, new) in before.iter().zip(&after) {
      if old.id != "b" {
        assert_eq!(old, new);
      }
    }
  }

  #[tokio::test]
  async fn feedback_for_unknown_id_is_a_no_op() {
    let storage = MemoryStorage::new();
    let s = HistoryStore::new(storage.clone());
    s.append(response("a")).await.unwrap();
    let raw_before = storage.raw(DEFAULT_STORAGE_KEY);

    assert!(!s.update_feedback("zzz", Rating::new(5).unwrap()).await.unwrap());
    assert_eq!(storage.raw(DEFAULT_STORAGE_KEY), raw_before);
  }

  #[test]
  fn rating_bounds() {
    assert!(Rating::new(0).is_err());
    assert!(Rating::new(6).is_err());
    assert!(Rating::new(-1).is_err());
    assert_eq!(Rating::new(1).unwrap().get(), 1);
    assert_eq!(Rating::new(5).unwrap().get(), 5);

    assert!(serde_json::from_str::<Rating>("7").is_err());
    assert_eq!(serde_json::from_str::<Rating>("3").unwrap().get(), 3);
  }

  // ─── Remove / clear ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn remove_drops_only_that_record() {
    let s = store();
    for id in ["a", "b", "c"] {
      s.append(response(id)).await.unwrap();
    }

    s.remove("b").await.unwrap();
    let all = s.read_all().await.unwrap();
    assert!(all.iter().all(|h| h.id != "b"));
    assert_eq!(all.len(), 2);
  }

  #[tokio::test]
  async fn remove_unknown_id_leaves_records_identical() {
    let s = store();
    s.append(response("a")).await.unwrap();
    s.update_feedback("a", Rating::new(3).unwrap()).await.unwrap();
    let before = s.read_all().await.unwrap();

    s.remove("nope").await.unwrap();
    assert_eq!(s.read_all().await.unwrap(), before);
  }

  #[tokio::test]
  async fn clear_empties_everything() {
    let s = store();
    for id in ["a", "b"] {
      s.append(response(id)).await.unwrap();
    }

    s.clear().await.unwrap();
    assert!(s.read_all().await.unwrap().is_empty());
    assert_eq!(s.read_page(1, 15).await.unwrap().total, 0);
  }

  #[tokio::test]
  async fn records_round_trip_through_storage() {
    let storage = MemoryStorage::new();
    let s = HistoryStore::new(storage.clone());
    let q3 = Q3Answer {
      complexity:     "complex".into(),
      priority:       vec!["quality".into(), "creativity".into()],
      context_amount: "large".into(),
    };
    let stored = s
      .append(response_with("x", "new_development", "architecture_design", q3))
      .await
      .unwrap();

    let reopened = HistoryStore::new(storage);
    assert_eq!(reopened.get("x").await.unwrap(), Some(stored));
    assert_eq!(reopened.get("y").await.unwrap(), None);
  }
}
