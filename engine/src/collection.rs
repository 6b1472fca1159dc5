//! Typed collections with selector queries and write-through persistence.
//!
//! A [`Collection`] holds one record kind as an in-memory array mirrored to
//! a single [`BlobStore`] key. Every mutating call rewrites the full
//! serialized array before returning, so storage always reflects the last
//! completed mutation. Soft-deleted rows stay in storage and are filtered
//! out at query time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::selector::{compare_values, Selector, SortDirection};
use crate::storage::{storage_key, BlobStore};
use crate::{Error, Result};

/// A record that can live in a [`Collection`].
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name; also the suffix of the persisted storage key.
    const NAME: &'static str;

    /// Unique record identifier.
    fn id(&self) -> &str;

    /// Soft-delete flag.
    fn deleted(&self) -> bool;

    /// Set or clear the soft-delete flag.
    fn set_deleted(&mut self, deleted: bool);

    /// Look up a field by its wire name, for selectors and sorting.
    fn field(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.get(name).cloned(),
            _ => None,
        }
    }
}

/// Eager query pipeline over a snapshot of a collection.
///
/// Builder calls apply in the order they are chained: `filter` narrows,
/// `sort` orders, `limit` truncates. Without a sort, results come back in
/// storage order.
#[derive(Debug, Clone)]
pub struct Query<T: Document> {
    results: Vec<T>,
}

impl<T: Document> Query<T> {
    /// Keep only records matching the selector.
    pub fn filter(mut self, selector: Selector) -> Self {
        self.results
            .retain(|doc| selector.matches(|field| doc.field(field)));
        self
    }

    /// Sort by one field. Missing fields sort as JSON null.
    pub fn sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.results.sort_by(|a, b| {
            let av = a.field(field).unwrap_or(Value::Null);
            let bv = b.field(field).unwrap_or(Value::Null);
            let ord = compare_values(&av, &bv);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        self
    }

    /// Truncate to the first `n` results.
    pub fn limit(mut self, n: usize) -> Self {
        self.results.truncate(n);
        self
    }

    pub fn exec(self) -> Vec<T> {
        self.results
    }
}

/// One record kind, persisted in full after every mutation.
pub struct Collection<T: Document> {
    key: String,
    records: Mutex<Vec<T>>,
    store: Arc<dyn BlobStore>,
}

impl<T: Document> Collection<T> {
    /// Open the collection, loading any persisted rows. A blob that fails
    /// to read or parse resets the collection to empty; the reset is
    /// logged because it discards whatever the blob held.
    pub fn open(store: Arc<dyn BlobStore>) -> Self {
        let key = storage_key(T::NAME);
        let records = match store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        collection = T::NAME,
                        error = %err,
                        "malformed collection blob, resetting to empty"
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(
                    collection = T::NAME,
                    error = %err,
                    "collection blob unreadable, resetting to empty"
                );
                Vec::new()
            }
        };
        Self {
            key,
            records: Mutex::new(records),
            store,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<T>>> {
        self.records
            .lock()
            .map_err(|_| Error::Storage(format!("{} collection lock poisoned", T::NAME)))
    }

    fn snapshot(&self) -> Vec<T> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Serialize the full array, soft-deleted rows included, under the
    /// collection's storage key.
    fn save(&self, records: &[T]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.store.put(&self.key, &raw)
    }

    /// Number of active (non-deleted) records.
    pub fn count(&self) -> usize {
        self.snapshot().iter().filter(|r| !r.deleted()).count()
    }

    /// Insert a single record. Fails on a duplicate id.
    pub fn insert(&self, record: T) -> Result<()> {
        self.bulk_insert(vec![record])
    }

    /// Insert a batch. The whole batch is rejected before any write if an
    /// id already exists or repeats within the batch.
    pub fn bulk_insert(&self, records: Vec<T>) -> Result<()> {
        let mut guard = self.lock()?;
        {
            let mut seen: HashSet<&str> = guard.iter().map(|r| r.id()).collect();
            for record in &records {
                if !seen.insert(record.id()) {
                    return Err(Error::DuplicateId(record.id().to_string()));
                }
            }
        }
        guard.extend(records);
        self.save(&guard)
    }

    /// Insert or replace by id.
    pub fn upsert(&self, record: T) -> Result<()> {
        self.bulk_upsert(vec![record])
    }

    /// Upsert a batch: replace in place when the id exists, append
    /// otherwise. The replacement is the whole document; there is no
    /// field-level merge.
    pub fn bulk_upsert(&self, records: Vec<T>) -> Result<()> {
        let mut guard = self.lock()?;
        for record in records {
            match guard.iter().position(|r| r.id() == record.id()) {
                Some(idx) => guard[idx] = record,
                None => guard.push(record),
            }
        }
        self.save(&guard)
    }

    /// Query over the active records.
    pub fn find(&self) -> Query<T> {
        let results = self
            .snapshot()
            .into_iter()
            .filter(|r| !r.deleted())
            .collect();
        Query { results }
    }

    /// Find an active record by id.
    pub fn find_one(&self, id: &str) -> Option<DocHandle<'_, T>> {
        let doc = self
            .snapshot()
            .into_iter()
            .find(|r| r.id() == id && !r.deleted())?;
        Some(DocHandle {
            collection: self,
            doc,
        })
    }

    /// Find the first active record matching the selector, in storage
    /// order.
    pub fn find_one_where(&self, selector: Selector) -> Option<DocHandle<'_, T>> {
        let doc = self
            .snapshot()
            .into_iter()
            .find(|r| !r.deleted() && selector.matches(|field| r.field(field)))?;
        Some(DocHandle {
            collection: self,
            doc,
        })
    }
}

/// Handle to a single record, supporting full-document patching.
pub struct DocHandle<'a, T: Document> {
    collection: &'a Collection<T>,
    doc: T,
}

impl<T: Document> DocHandle<'_, T> {
    /// The record as seen when the handle was created, or after the last
    /// successful [`patch`](Self::patch).
    pub fn doc(&self) -> &T {
        &self.doc
    }

    pub fn into_doc(self) -> T {
        self.doc
    }

    /// Apply `apply` to the currently stored record, replace it wholesale,
    /// and persist. The handle's snapshot is refreshed to the stored
    /// result.
    pub fn patch<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let mut guard = self.collection.lock()?;
        let idx = guard
            .iter()
            .position(|r| r.id() == self.doc.id())
            .ok_or_else(|| Error::NotFound(self.doc.id().to_string()))?;
        let mut updated = guard[idx].clone();
        apply(&mut updated);
        guard[idx] = updated.clone();
        self.collection.save(&guard)?;
        self.doc = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Widget {
        id: String,
        label: String,
        size: i64,
        #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
        deleted: bool,
    }

    fn is_false(v: &bool) -> bool {
        !*v
    }

    impl Document for Widget {
        const NAME: &'static str = "widgets";

        fn id(&self) -> &str {
            &self.id
        }

        fn deleted(&self) -> bool {
            self.deleted
        }

        fn set_deleted(&mut self, deleted: bool) {
            self.deleted = deleted;
        }
    }

    fn widget(id: &str, label: &str, size: i64) -> Widget {
        Widget {
            id: id.into(),
            label: label.into(),
            size,
            deleted: false,
        }
    }

    fn open_empty() -> (Arc<MemoryStore>, Collection<Widget>) {
        let store = Arc::new(MemoryStore::new());
        let collection = Collection::<Widget>::open(store.clone());
        (store, collection)
    }

    #[test]
    fn starts_empty_and_counts_inserts() {
        let (_, collection) = open_empty();
        assert_eq!(collection.count(), 0);

        collection.insert(widget("w-1", "bolt", 4)).unwrap();
        collection.insert(widget("w-2", "nut", 2)).unwrap();
        assert_eq!(collection.count(), 2);
    }

    #[test]
    fn inserted_record_is_found_by_id() {
        let (_, collection) = open_empty();
        let original = widget("w-1", "bolt", 4);
        collection.insert(original.clone()).unwrap();

        let found = collection.find_one("w-1").unwrap();
        assert_eq!(found.doc(), &original);
        assert!(collection.find_one("w-9").is_none());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let (_, collection) = open_empty();
        collection.insert(widget("w-1", "bolt", 4)).unwrap();

        let err = collection.insert(widget("w-1", "other", 9)).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "w-1"));
        assert_eq!(collection.count(), 1);
    }

    #[test]
    fn bulk_insert_rejects_duplicates_within_batch() {
        let (_, collection) = open_empty();
        let err = collection
            .bulk_insert(vec![widget("w-1", "a", 1), widget("w-1", "b", 2)])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        // Nothing from the batch lands.
        assert_eq!(collection.count(), 0);
    }

    #[test]
    fn upsert_replaces_in_place_or_appends() {
        let (_, collection) = open_empty();
        collection.insert(widget("w-1", "bolt", 4)).unwrap();
        collection.insert(widget("w-2", "nut", 2)).unwrap();

        collection.upsert(widget("w-1", "bolt-v2", 5)).unwrap();
        collection.upsert(widget("w-3", "washer", 1)).unwrap();

        let all = collection.find().exec();
        assert_eq!(all.len(), 3);
        // Replacement keeps the original position.
        assert_eq!(all[0].label, "bolt-v2");
        assert_eq!(all[2].id, "w-3");
    }

    #[test]
    fn upsert_same_document_twice_is_idempotent() {
        let (_, collection) = open_empty();
        let doc = widget("w-1", "bolt", 4);
        collection.upsert(doc.clone()).unwrap();
        collection.upsert(doc).unwrap();
        assert_eq!(collection.count(), 1);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let (store, collection) = open_empty();
        collection.insert(widget("w-1", "bolt", 4)).unwrap();
        collection.upsert(widget("w-2", "nut", 2)).unwrap();

        // A fresh open over the same store sees both writes.
        let reopened = Collection::<Widget>::open(store);
        assert_eq!(reopened.count(), 2);
        assert_eq!(reopened.find_one("w-2").unwrap().doc().label, "nut");
    }

    #[test]
    fn malformed_blob_resets_to_empty() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(&storage_key("widgets"), "{not json at all")
            .unwrap();

        let collection = Collection::<Widget>::open(store.clone());
        assert_eq!(collection.count(), 0);

        // The collection still works after the reset.
        collection.insert(widget("w-1", "bolt", 4)).unwrap();
        assert_eq!(Collection::<Widget>::open(store).count(), 1);
    }

    #[test]
    fn wrong_shape_blob_also_resets() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(&storage_key("widgets"), r#"{"id": "not-an-array"}"#)
            .unwrap();
        assert_eq!(Collection::<Widget>::open(store).count(), 0);
    }

    #[test]
    fn find_excludes_soft_deleted() {
        let (_, collection) = open_empty();
        collection.insert(widget("w-1", "bolt", 4)).unwrap();
        collection.insert(widget("w-2", "nut", 2)).unwrap();

        let mut handle = collection.find_one("w-1").unwrap();
        handle.patch(|w| w.set_deleted(true)).unwrap();

        let all = collection.find().exec();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "w-2");
        assert_eq!(collection.count(), 1);
        assert!(collection.find_one("w-1").is_none());
    }

    #[test]
    fn soft_deleted_rows_stay_in_storage() {
        let (store, collection) = open_empty();
        collection.insert(widget("w-1", "bolt", 4)).unwrap();
        let mut handle = collection.find_one("w-1").unwrap();
        handle.patch(|w| w.set_deleted(true)).unwrap();

        let raw = store.get(&storage_key("widgets")).unwrap().unwrap();
        assert!(raw.contains("w-1"));
        assert!(raw.contains("_deleted"));
    }

    #[test]
    fn filter_sort_limit_pipeline() {
        let (_, collection) = open_empty();
        collection
            .bulk_insert(vec![
                widget("w-1", "bolt", 4),
                widget("w-2", "nut", 9),
                widget("w-3", "washer", 7),
                widget("w-4", "screw", 2),
            ])
            .unwrap();

        let results = collection
            .find()
            .filter(Selector::new().gte("size", 4))
            .sort("size", SortDirection::Desc)
            .limit(2)
            .exec();

        let sizes: Vec<i64> = results.iter().map(|w| w.size).collect();
        assert_eq!(sizes, vec![9, 7]);
    }

    #[test]
    fn unsorted_results_keep_storage_order() {
        let (_, collection) = open_empty();
        collection
            .bulk_insert(vec![
                widget("w-3", "washer", 7),
                widget("w-1", "bolt", 4),
                widget("w-2", "nut", 9),
            ])
            .unwrap();

        let all = collection.find().exec();
        let ids: Vec<&str> = all.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w-3", "w-1", "w-2"]);
    }

    #[test]
    fn find_one_where_returns_first_match_in_storage_order() {
        let (_, collection) = open_empty();
        collection
            .bulk_insert(vec![
                widget("w-1", "bolt", 4),
                widget("w-2", "bolt", 9),
                widget("w-3", "nut", 7),
            ])
            .unwrap();

        let found = collection
            .find_one_where(Selector::new().eq("label", "bolt"))
            .unwrap();
        assert_eq!(found.doc().id, "w-1");

        assert!(collection
            .find_one_where(Selector::new().eq("label", "gear"))
            .is_none());
    }

    #[test]
    fn patch_replaces_stored_document_and_persists() {
        let (store, collection) = open_empty();
        collection.insert(widget("w-1", "bolt", 4)).unwrap();

        let mut handle = collection.find_one("w-1").unwrap();
        handle
            .patch(|w| {
                w.label = "bolt-xl".into();
                w.size = 10;
            })
            .unwrap();
        assert_eq!(handle.doc().size, 10);

        let reopened = Collection::<Widget>::open(store);
        let stored = reopened.find_one("w-1").unwrap().into_doc();
        assert_eq!(stored.label, "bolt-xl");
        assert_eq!(stored.size, 10);
    }

    #[test]
    fn deleted_flag_round_trips_through_wire_name() {
        let mut doc = widget("w-1", "bolt", 4);
        doc.set_deleted(true);
        let raw = serde_json::to_string(&doc).unwrap();
        assert!(raw.contains(r#""_deleted":true"#));

        let parsed: Widget = serde_json::from_str(&raw).unwrap();
        assert!(parsed.deleted());

        // Absent flag deserializes as not deleted.
        let parsed: Widget =
            serde_json::from_str(r#"{"id":"w-2","label":"nut","size":1}"#).unwrap();
        assert!(!parsed.deleted());
    }
}
