use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Collection-oriented JSON document storage.
///
/// Documents are JSON objects keyed by a string id inside a named collection.
/// The store enforces nothing about their shape.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Inserts or replaces the document stored under `id`.
    async fn put(&self, collection: &str, id: &str, document: &Value) -> Result<()>;

    /// Returns `false` when nothing was stored under `id`.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    async fn list(&self, collection: &str) -> Result<Vec<Value>>;

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.list(collection).await?.len())
    }

    /// First document whose top-level `field` equals `value`.
    async fn find_one(&self, collection: &str, field: &str, value: &Value) -> Result<Option<Value>> {
        Ok(self
            .list(collection)
            .await?
            .into_iter()
            .find(|document| document.get(field) == Some(value)))
    }
}

/// sled-backed store: one tree per collection, JSON-encoded values.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .with_context(|| format!("failed to open document store at {}", path.display()))?;
        Ok(Self { db })
    }

    /// Store that lives only as long as the process.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("failed to open temporary document store")?;
        Ok(Self { db })
    }

    fn tree(&self, collection: &str) -> Result<sled::Tree> {
        self.db
            .open_tree(collection)
            .with_context(|| format!("failed to open collection {collection}"))
    }
}

fn decode(collection: &str, bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes)
        .with_context(|| format!("corrupt document in collection {collection}"))
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let tree = self.tree(collection)?;
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(collection, &bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, collection: &str, id: &str, document: &Value) -> Result<()> {
        let tree = self.tree(collection)?;
        let bytes = serde_json::to_vec(document)?;
        tree.insert(id.as_bytes(), bytes)
            .with_context(|| format!("failed to write {collection}/{id}"))?;
        tree.flush_async()
            .await
            .with_context(|| format!("failed to flush {collection}"))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let tree = self.tree(collection)?;
        let removed = tree
            .remove(id.as_bytes())
            .with_context(|| format!("failed to delete {collection}/{id}"))?;
        if removed.is_some() {
            tree.flush_async().await?;
        }
        Ok(removed.is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let tree = self.tree(collection)?;
        tree.iter()
            .values()
            .map(|entry| {
                let bytes = entry.with_context(|| format!("failed to scan {collection}"))?;
                decode(collection, &bytes)
            })
            .collect()
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.tree(collection)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_delete_roundtrip() -> Result<()> {
        let store = SledStore::temporary()?;
        let doc = json!({ "id": "c1", "aadhaar": "1234" });

        store.put("citizens", "c1", &doc).await?;
        assert_eq!(store.get("citizens", "c1").await?, Some(doc));
        assert_eq!(store.get("citizens", "missing").await?, None);

        assert!(store.delete("citizens", "c1").await?);
        assert!(!store.delete("citizens", "c1").await?);
        assert_eq!(store.count("citizens").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn collections_are_isolated() -> Result<()> {
        let store = SledStore::temporary()?;
        store.put("citizens", "same", &json!({ "kind": "citizen" })).await?;
        store.put("ulbs", "same", &json!({ "kind": "ulb" })).await?;

        assert_eq!(store.list("citizens").await?, vec![json!({ "kind": "citizen" })]);
        assert_eq!(store.count("ulbs").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn find_one_matches_top_level_field() -> Result<()> {
        let store = SledStore::temporary()?;
        store
            .put("users", "u1", &json!({ "id": "u1", "email": "a@b.in" }))
            .await?;
        store
            .put("users", "u2", &json!({ "id": "u2", "email": "c@d.in" }))
            .await?;

        let found = store.find_one("users", "email", &json!("c@d.in")).await?;
        assert_eq!(found.and_then(|d| d.get("id").cloned()), Some(json!("u2")));
        assert!(store
            .find_one("users", "email", &json!("nobody@x.in"))
            .await?
            .is_none());
        Ok(())
    }
}
