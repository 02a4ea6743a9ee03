use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    dao::storage::{StorageError, StorageResult},
    games::GameKind,
};

/// Source of raw content records, one collection per game.
///
/// Records are returned undecoded; sessions decode and validate them so that a
/// single malformed entry never poisons a whole collection.
pub trait ContentProvider: Send + Sync {
    /// Fetch every raw record of the collection backing `kind`.
    fn load(&self, kind: GameKind) -> BoxFuture<'static, StorageResult<Vec<Value>>>;
}

/// Reads `<root>/<content_key>.json`, each file holding a JSON array.
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
    root: Arc<Path>,
}

impl JsonDirProvider {
    /// Provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::from(root.into()),
        }
    }

    /// File backing the collection of `kind`.
    pub fn path_for(&self, kind: GameKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.content_key()))
    }
}

impl ContentProvider for JsonDirProvider {
    fn load(&self, kind: GameKind) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        let path = self.path_for(kind);
        Box::pin(async move {
            let bytes = tokio::fs::read(&path).await.map_err(|err| {
                StorageError::unavailable(format!("failed to read {}", path.display()), err)
            })?;

            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|err| StorageError::Malformed(format!("{}: {err}", path.display())))?;

            match value {
                Value::Array(records) => {
                    debug!(path = %path.display(), records = records.len(), "content file read");
                    Ok(records)
                }
                _ => Err(StorageError::Malformed(format!(
                    "{}: expected a JSON array",
                    path.display()
                ))),
            }
        })
    }
}

/// In-memory provider, mostly for tests and embedding hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    collections: Arc<DashMap<GameKind, Vec<Value>>>,
    loads: Arc<AtomicUsize>,
}

impl MemoryProvider {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the raw records of `kind`.
    pub fn insert(&self, kind: GameKind, records: Vec<Value>) {
        self.collections.insert(kind, records);
    }

    /// Serialize `items` and store them as the collection of `kind`.
    pub fn insert_items<T: Serialize>(&self, kind: GameKind, items: &[T]) -> StorageResult<()> {
        let records = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StorageError::Malformed(err.to_string()))?;
        self.insert(kind, records);
        Ok(())
    }

    /// Number of `load` calls served so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl ContentProvider for MemoryProvider {
    fn load(&self, kind: GameKind) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let records = self
            .collections
            .get(&kind)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        Box::pin(async move { Ok(records) })
    }
}

/// Caching front for a [`ContentProvider`], shared by every session of a host.
///
/// Non-empty collections are cached until invalidated; empty ones are always
/// fetched again so that content added later is picked up.
pub struct ContentCatalog {
    provider: Arc<dyn ContentProvider>,
    cache: DashMap<GameKind, Arc<Vec<Value>>>,
}

impl ContentCatalog {
    /// Catalog over `provider` with an empty cache.
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    /// Raw records of `kind`, from the cache when possible.
    pub async fn load(&self, kind: GameKind) -> StorageResult<Vec<Value>> {
        if let Some(records) = self.cached(kind) {
            return Ok(records.as_ref().clone());
        }

        let records = self.provider.load(kind).await?;
        if !records.is_empty() {
            info!(game = kind.slug(), records = records.len(), "content cached");
            self.cache.insert(kind, Arc::new(records.clone()));
        }
        Ok(records)
    }

    /// Whether `kind` is currently cached.
    pub fn is_cached(&self, kind: GameKind) -> bool {
        self.cache.contains_key(&kind)
    }

    /// Drop the cached collection of `kind`.
    pub fn invalidate(&self, kind: GameKind) {
        self.cache.remove(&kind);
    }

    /// Drop every cached collection.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    fn cached(&self, kind: GameKind) -> Option<Arc<Vec<Value>>> {
        self.cache.get(&kind).map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn catalog_caches_non_empty_collections() {
        let provider = Arc::new(MemoryProvider::new());
        provider.insert(GameKind::Taboo, vec![json!({"word": "Ego", "forbidden": []})]);
        let catalog = ContentCatalog::new(provider.clone());

        assert_eq!(catalog.load(GameKind::Taboo).await.unwrap().len(), 1);
        assert_eq!(catalog.load(GameKind::Taboo).await.unwrap().len(), 1);
        assert_eq!(provider.loads(), 1);
        assert!(catalog.is_cached(GameKind::Taboo));

        catalog.invalidate(GameKind::Taboo);
        catalog.load(GameKind::Taboo).await.unwrap();
        assert_eq!(provider.loads(), 2);
    }

    #[tokio::test]
    async fn empty_collections_are_not_cached() {
        let provider = Arc::new(MemoryProvider::new());
        let catalog = ContentCatalog::new(provider.clone());

        assert!(catalog.load(GameKind::Trivia).await.unwrap().is_empty());
        assert!(!catalog.is_cached(GameKind::Trivia));
        catalog.load(GameKind::Trivia).await.unwrap();
        assert_eq!(provider.loads(), 2);
    }

    #[tokio::test]
    async fn json_dir_provider_reads_arrays_and_rejects_objects() {
        let dir = tempfile::tempdir().unwrap();
        let provider = JsonDirProvider::new(dir.path());

        tokio::fs::write(provider.path_for(GameKind::Dilemma), r#"[{"title": "A"}]"#)
            .await
            .unwrap();
        tokio::fs::write(provider.path_for(GameKind::Trivia), r#"{"questions": []}"#)
            .await
            .unwrap();

        assert_eq!(provider.load(GameKind::Dilemma).await.unwrap().len(), 1);
        assert!(matches!(
            provider.load(GameKind::Trivia).await,
            Err(StorageError::Malformed(_))
        ));
        assert!(matches!(
            provider.load(GameKind::Taboo).await,
            Err(StorageError::Unavailable { .. })
        ));
    }
}
