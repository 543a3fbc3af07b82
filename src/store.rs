use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use crate::error::{StoreError, StoreResult};
use crate::model::{ConversionRecord, NewConversion};

/// Persistence for conversion records.
///
/// Implementations assign ids on `create` and never update a record.
#[async_trait]
pub trait ConversionStore: Send + Sync {
    async fn create(&self, input: NewConversion) -> StoreResult<ConversionRecord>;

    async fn list(&self) -> StoreResult<Vec<ConversionRecord>>;

    /// Returns whether a record was removed. A well-formed id that matches
    /// nothing is not an error.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

pub fn parse_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| StoreError::MalformedId(id.to_string()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, ConversionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversionStore for MemoryStore {
    async fn create(&self, input: NewConversion) -> StoreResult<ConversionRecord> {
        let record = ConversionRecord {
            id: Uuid::new_v4(),
            kind: input.kind,
            amount: input.amount,
            result: input.result,
            created_at: Utc::now(),
        };

        self.records.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> StoreResult<Vec<ConversionRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id(id)?;
        Ok(self.records.write().await.remove(&id).is_some())
    }
}

/// Contract checks shared by every store implementation.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;

    fn sample(kind: &str, amount: f64, result: f64) -> NewConversion {
        NewConversion {
            kind: Some(kind.to_string()),
            amount: Some(amount),
            result: Some(result),
        }
    }

    pub async fn create_assigns_id_and_keeps_fields(store: &dyn ConversionStore) {
        let record = store.create(sample("currency", 10.0, 12.5)).await.unwrap();
        assert_eq!(record.kind.as_deref(), Some("currency"));
        assert_eq!(record.amount, Some(10.0));
        assert_eq!(record.result, Some(12.5));

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![record]);
    }

    pub async fn list_returns_every_record(store: &dyn ConversionStore) {
        let mut created = Vec::new();
        for i in 0..5 {
            created.push(store.create(sample("unit", i as f64, i as f64 * 2.0)).await.unwrap());
        }

        let mut listed = store.list().await.unwrap();
        listed.sort_by_key(|r| r.id);
        created.sort_by_key(|r| r.id);
        assert_eq!(listed, created);
    }

    pub async fn absent_fields_stay_absent(store: &dyn ConversionStore) {
        let record = store
            .create(NewConversion {
                kind: Some("unit".to_string()),
                amount: Some(1.0),
                result: None,
            })
            .await
            .unwrap();
        assert_eq!(record.result, None);

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].result, None);
    }

    pub async fn delete_removes_only_target(store: &dyn ConversionStore) {
        let keep = store.create(sample("a", 1.0, 1.0)).await.unwrap();
        let gone = store.create(sample("b", 2.0, 2.0)).await.unwrap();

        assert!(store.delete(&gone.id.to_string()).await.unwrap());
        assert_eq!(store.list().await.unwrap(), vec![keep]);
    }

    pub async fn delete_unknown_and_malformed(store: &dyn ConversionStore) {
        assert!(!store.delete(&Uuid::new_v4().to_string()).await.unwrap());

        let err = store.delete("not-an-id").await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedId(_)));
    }

    pub async fn concurrent_creates_get_distinct_ids(store: &dyn ConversionStore) {
        let creates = (0..20).map(|i| store.create(sample("unit", i as f64, i as f64)));
        let created = futures_util::future::join_all(creates).await;

        let mut ids: Vec<Uuid> = created.into_iter().map(|r| r.unwrap().id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(store.list().await.unwrap().len(), 20);
    }
}
