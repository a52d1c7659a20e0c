mod file;
mod memory;
mod postgres;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreResult;
use crate::models::{HistoryEntry, Medication};

pub const MEDICATIONS_KEY: &str = "medications";
pub const HISTORY_KEY: &str = "medicationHistory";

/// String blobs under fixed keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn put(&self, key: &str, value: String) -> StoreResult<()>;
    fn name(&self) -> &'static str;
}

/// A JSON array stored under one key.
pub struct Collection<T> {
    kv: Arc<dyn KeyValueStore>,
    key: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(kv: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            kv,
            key,
            _item: PhantomData,
        }
    }

    /// Missing or unreadable blobs load as an empty collection.
    pub async fn load(&self) -> StoreResult<Vec<T>> {
        let Some(raw) = self.kv.get(self.key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(
                    "⚠️ Malformed `{}` in {} store, treating as empty: {}",
                    self.key,
                    self.kv.name(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    pub async fn save(&self, items: &[T]) -> StoreResult<()> {
        let raw = serde_json::to_string(items)?;
        self.kv.put(self.key, raw).await
    }
}

#[derive(Clone)]
pub struct MedicationStore {
    inner: Arc<Inner>,
}

struct Inner {
    medications: Collection<Medication>,
    history: Collection<HistoryEntry>,
    write_lock: Mutex<()>,
}

impl MedicationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                medications: Collection::new(kv.clone(), MEDICATIONS_KEY),
                history: Collection::new(kv, HISTORY_KEY),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub async fn load_medications(&self) -> StoreResult<Vec<Medication>> {
        self.inner.medications.load().await
    }

    pub async fn save_medications(&self, medications: &[Medication]) -> StoreResult<()> {
        let _guard = self.inner.write_lock.lock().await;
        self.inner.medications.save(medications).await
    }

    /// Appends a medication built by `build` from the id it is assigned.
    /// Ids are creation milliseconds, bumped past any id already in use.
    pub async fn add_medication<F>(
        &self,
        created_at: DateTime<Utc>,
        build: F,
    ) -> StoreResult<Medication>
    where
        F: FnOnce(i64) -> Medication,
    {
        let _guard = self.inner.write_lock.lock().await;
        let mut medications = self.inner.medications.load().await?;

        let max_id = medications.iter().map(|m| m.id).max();
        let id = match max_id {
            Some(max) if max >= created_at.timestamp_millis() => max + 1,
            _ => created_at.timestamp_millis(),
        };

        let medication = build(id);
        medications.push(medication.clone());
        self.inner.medications.save(&medications).await?;

        tracing::info!("💊 Registered medication {} ({})", medication.id, medication.name);
        Ok(medication)
    }

    pub async fn load_history(&self) -> StoreResult<Vec<HistoryEntry>> {
        self.inner.history.load().await
    }

    pub async fn append_history(&self, entry: HistoryEntry) -> StoreResult<()> {
        self.append_history_unless(entry, |_| false).await?;
        Ok(())
    }

    /// Appends `entry` unless `covered` reports the stored history already
    /// accounts for it. The check and the write happen under one lock.
    /// Returns whether the entry was written.
    pub async fn append_history_unless<F>(
        &self,
        entry: HistoryEntry,
        covered: F,
    ) -> StoreResult<bool>
    where
        F: FnOnce(&[HistoryEntry]) -> bool,
    {
        let _guard = self.inner.write_lock.lock().await;
        let mut history = self.inner.history.load().await?;
        if covered(&history) {
            return Ok(false);
        }
        history.push(entry);
        self.inner.history.save(&history).await?;
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{DoseUnit, MedicationStatus};
    use chrono::TimeZone;

    pub(crate) fn sample_medication(id: i64, name: &str, start: DateTime<Utc>) -> Medication {
        Medication {
            id,
            name: name.to_string(),
            dose_amount: "500".to_string(),
            dose_unit: DoseUnit::Mg,
            frequency_hours: 8,
            start_date: start,
            status: MedicationStatus::Active,
            treatment: None,
            notes: None,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_missing_keys_load_empty() {
        let store = MedicationStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load_medications().await.unwrap().is_empty());
        assert!(store.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_blob_loads_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.put(MEDICATIONS_KEY, "{not json".to_string()).await.unwrap();
        kv.put(HISTORY_KEY, r#"{"an":"object"}"#.to_string()).await.unwrap();

        let store = MedicationStore::new(kv);
        assert!(store.load_medications().await.unwrap().is_empty());
        assert!(store.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_medications() {
        let store = MedicationStore::new(Arc::new(MemoryStore::new()));
        let meds = vec![sample_medication(1, "Paracetamol", start())];
        store.save_medications(&meds).await.unwrap();
        assert_eq!(store.load_medications().await.unwrap(), meds);
    }

    #[tokio::test]
    async fn test_add_medication_assigns_unique_ids() {
        let store = MedicationStore::new(Arc::new(MemoryStore::new()));
        let a = store
            .add_medication(start(), |id| sample_medication(id, "A", start()))
            .await
            .unwrap();
        let b = store
            .add_medication(start(), |id| sample_medication(id, "B", start()))
            .await
            .unwrap();

        assert_eq!(a.id, start().timestamp_millis());
        assert_eq!(b.id, a.id + 1);
        assert_eq!(store.load_medications().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_history_keeps_order() {
        let store = MedicationStore::new(Arc::new(MemoryStore::new()));
        let med = sample_medication(1, "Paracetamol", start());
        for hours in [1, 9] {
            store
                .append_history(HistoryEntry {
                    date: start() + chrono::Duration::hours(hours),
                    medication: med.clone(),
                    taken: true,
                })
                .await
                .unwrap();
        }

        let history = store.load_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].date < history[1].date);
    }

    #[tokio::test]
    async fn test_append_unless_covered() {
        let store = MedicationStore::new(Arc::new(MemoryStore::new()));
        let entry = HistoryEntry {
            date: start(),
            medication: sample_medication(1, "Paracetamol", start()),
            taken: true,
        };

        let first = store
            .append_history_unless(entry.clone(), |history| !history.is_empty())
            .await
            .unwrap();
        let second = store
            .append_history_unless(entry, |history| !history.is_empty())
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.load_history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_not_lost() {
        let store = MedicationStore::new(Arc::new(MemoryStore::new()));
        let med = sample_medication(1, "Paracetamol", start());

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let med = med.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_history(HistoryEntry {
                        date: start() + chrono::Duration::minutes(i),
                        medication: med,
                        taken: true,
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load_history().await.unwrap().len(), 20);
    }
}
