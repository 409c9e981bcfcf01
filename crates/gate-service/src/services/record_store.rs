//! Record storage behind the records endpoint.
//!
//! Every operation is scoped by the owner, which callers take from verified
//! claims only.

use crate::errors::GateError;
use crate::models::{NewRecord, Record};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Storage for meal/exercise records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a record owned by `owner`.
    async fn insert(&self, owner: &str, record: NewRecord) -> Result<Record, GateError>;

    /// Records owned by `owner`, newest first.
    async fn list(&self, owner: &str) -> Result<Vec<Record>, GateError>;
}

#[derive(Default)]
struct Rows {
    next_id: u64,
    rows: Vec<(String, Record)>,
}

/// In-process record store.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Rows>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, owner: &str, record: NewRecord) -> Result<Record, GateError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;

        let stored = Record {
            id: inner.next_id,
            food_name: record.food_name,
            weight_kg: record.weight_kg,
            intake_kcal: record.intake_kcal,
            exercise_id: record.exercise_id,
            duration_minutes: record.duration_minutes,
            burned_kcal: record.burned_kcal,
            memo: record.memo,
            image_url: record.image_url,
            create_date: chrono::Utc::now(),
        };
        inner.rows.push((owner.to_string(), stored.clone()));

        Ok(stored)
    }

    async fn list(&self, owner: &str) -> Result<Vec<Record>, GateError> {
        let inner = self.inner.read().await;
        let mut records: Vec<Record> = inner
            .rows
            .iter()
            .filter(|(row_owner, _)| row_owner == owner)
            .map(|(_, record)| record.clone())
            .collect();

        records.sort_by(|a, b| b.create_date.cmp(&a.create_date).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_record(food: &str) -> NewRecord {
        NewRecord {
            food_name: food.to_string(),
            weight_kg: 60.0,
            intake_kcal: 100.0,
            exercise_id: None,
            duration_minutes: None,
            burned_kcal: None,
            memo: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let store = InMemoryRecordStore::new();
        store.insert("u1", new_record("rice")).await.unwrap();
        store.insert("u2", new_record("bread")).await.unwrap();

        let records = store.list("u1").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records.first().unwrap().food_name, "rice");
        assert!(store.list("u3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = InMemoryRecordStore::new();
        store.insert("u1", new_record("first")).await.unwrap();
        store.insert("u1", new_record("second")).await.unwrap();

        let names: Vec<_> = store
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.food_name)
            .collect();

        assert_eq!(names, vec!["second", "first"]);
    }
}
