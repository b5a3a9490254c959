//! Narrow key-value persistence interface. The engine's domain services never
//! see a SQL schema directly — every repository in [`super::repository`] is
//! built on top of this trait, so a concrete backend (sqlite, redis, an
//! object store) can be swapped in without touching business logic.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::domain::Result;

/// A namespaced byte-oriented store. Keys are opaque strings; callers are
/// responsible for serialization (repositories use `serde_json`).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;
    /// List all keys in a namespace, optionally restricted to a prefix.
    async fn list_keys(&self, namespace: &str, prefix: Option<&str>) -> Result<Vec<String>>;
}

/// Reference in-memory implementation, suitable for tests and for running
/// the engine without an external persistence dependency.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}/{key}")
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().expect("kv store lock poisoned");
        Ok(data.get(&Self::full_key(namespace, key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let mut data = self.data.write().expect("kv store lock poisoned");
        data.insert(Self::full_key(namespace, key), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut data = self.data.write().expect("kv store lock poisoned");
        data.remove(&Self::full_key(namespace, key));
        Ok(())
    }

    async fn list_keys(&self, namespace: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        let data = self.data.read().expect("kv store lock poisoned");
        let ns_prefix = format!("{namespace}/");
        let full_prefix = match prefix {
            Some(p) => format!("{ns_prefix}{p}"),
            None => ns_prefix.clone(),
        };
        Ok(data
            .keys()
            .filter(|k| k.starts_with(&full_prefix))
            .map(|k| k[ns_prefix.len()..].to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryKeyValueStore::new();
        store.set("patterns", "a", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("patterns", "a").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryKeyValueStore::new();
        store.set("ns1", "a", b"one".to_vec()).await.unwrap();
        store.set("ns2", "a", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("ns1", "a").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get("ns2", "a").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn list_keys_respects_prefix() {
        let store = InMemoryKeyValueStore::new();
        store.set("patterns", "example.com/a", b"1".to_vec()).await.unwrap();
        store.set("patterns", "example.com/b", b"2".to_vec()).await.unwrap();
        store.set("patterns", "other.com/a", b"3".to_vec()).await.unwrap();

        let mut keys = store.list_keys("patterns", Some("example.com/")).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["example.com/a".to_string(), "example.com/b".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = InMemoryKeyValueStore::new();
        store.set("ns", "a", b"x".to_vec()).await.unwrap();
        store.delete("ns", "a").await.unwrap();
        assert_eq!(store.get("ns", "a").await.unwrap(), None);
    }
}
