use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::{BulkWriteResult, DocumentStore, UpsertOp, WriteFailure};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    bulk_calls: Vec<(String, usize)>,
}

/// In-process store for tests and dry runs. Documents are kept per collection in id order.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    rejected_ids: HashSet<String>,
    failing_calls: HashSet<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert of one of these ids fails individually, like a document the server refuses.
    pub fn rejecting<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rejected_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The bulk calls at these zero-based positions (across all collections) fail as a
    /// whole, like a dropped connection. Nothing from those calls is applied.
    pub fn failing_bulk_calls(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_calls = calls.into_iter().collect();
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// All documents of a collection in id order.
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Sizes of the bulk writes submitted to `collection`, in submission order.
    pub fn bulk_sizes(&self, collection: &str) -> Vec<usize> {
        self.lock()
            .bulk_calls
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, n)| *n)
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collections(&self, names: &[&str]) -> Result<()> {
        let mut inner = self.lock();
        for name in names {
            inner.collections.entry(name.to_string()).or_default();
        }
        Ok(())
    }

    async fn bulk_upsert(&self, collection: &str, ops: Vec<UpsertOp>) -> Result<BulkWriteResult> {
        let mut inner = self.lock();
        let call = inner.bulk_calls.len();
        inner.bulk_calls.push((collection.to_string(), ops.len()));
        if self.failing_calls.contains(&call) {
            anyhow::bail!("bulk write #{call} to {collection} failed: connection reset");
        }
        let docs = inner.collections.entry(collection.to_string()).or_default();
        let mut result = BulkWriteResult::default();
        for op in ops {
            if self.rejected_ids.contains(&op.id) {
                result.failures.push(WriteFailure {
                    id: op.id,
                    message: "document rejected".to_string(),
                });
                continue;
            }
            let mut doc = op.doc;
            if let Value::Object(map) = &mut doc {
                map.insert("_id".to_string(), Value::String(op.id.clone()));
            }
            if docs.insert(op.id, doc).is_some() {
                result.updated += 1;
            } else {
                result.inserted += 1;
            }
        }
        Ok(result)
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        Ok(self.documents(collection))
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .map_or(0, |docs| docs.len() as u64))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_replaces_whole_document() {
        let store = MemoryStore::new();
        store
            .bulk_upsert("vendors", vec![UpsertOp::new("1", json!({"name": "a", "x": 1}))])
            .await
            .unwrap();
        let res = store
            .bulk_upsert("vendors", vec![UpsertOp::new("1", json!({"name": "b"}))])
            .await
            .unwrap();
        assert_eq!((res.inserted, res.updated), (0, 1));
        assert_eq!(store.get("vendors", "1"), Some(json!({"_id": "1", "name": "b"})));
        assert_eq!(store.count("vendors").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_document_does_not_block_batch() {
        let store = MemoryStore::rejecting(["bad"]);
        let res = store
            .bulk_upsert(
                "products",
                vec![
                    UpsertOp::new("a", json!({})),
                    UpsertOp::new("bad", json!({})),
                    UpsertOp::new("c", json!({})),
                ],
            )
            .await
            .unwrap();
        assert_eq!(res.inserted, 2);
        assert_eq!(res.failures.len(), 1);
        assert_eq!(store.bulk_sizes("products"), vec![3]);
    }

    #[tokio::test]
    async fn failing_bulk_call_applies_nothing() {
        let store = MemoryStore::new().failing_bulk_calls([0]);
        let err = store
            .bulk_upsert("products", vec![UpsertOp::new("a", json!({}))])
            .await;
        assert!(err.is_err());
        assert!(store.get("products", "a").is_none());
        store
            .bulk_upsert("products", vec![UpsertOp::new("a", json!({}))])
            .await
            .unwrap();
        assert!(store.get("products", "a").is_some());
    }
}
