//! On-disk embedding and search-result caches.
//!
//! Two JSON stores under `<store_path>/../cache/`:
//!
//! - `embeddings.json` — content-hash keyed vectors, capacity 200, evicted
//!   least-recently-used first
//! - `search-results.json` — full result lists keyed by the query shape,
//!   capacity 50, entries expire after 5 minutes
//!
//! Reads are in-memory; writes evict over capacity, then persist the whole
//! map. A corrupt cache file is discarded and rebuilt, never fatal.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use yepmem_core::truncated_sha256;

use crate::error::Result;

/// Embedding cache capacity.
const EMBEDDING_CAPACITY: usize = 200;
/// Search result cache capacity.
const RESULT_CAPACITY: usize = 50;
/// Search result time-to-live.
const RESULT_TTL_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedVector {
    vector: Vec<f32>,
    ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResult {
    payload: serde_json::Value,
    ts: i64,
}

/// Content-hash keyed LRU of embedding vectors.
pub struct EmbeddingCache {
    path: PathBuf,
    entries: LruCache<String, CachedVector>,
}

impl EmbeddingCache {
    /// Open (or seed) the cache under the store's sibling cache directory.
    pub fn open(store_path: &Path) -> Self {
        let path = cache_dir(store_path).join("embeddings.json");
        let mut entries = LruCache::new(NonZeroUsize::new(EMBEDDING_CAPACITY).unwrap());
        for (key, value) in load_entries::<CachedVector>(&path) {
            entries.put(key, value);
        }
        Self { path, entries }
    }

    /// Cached vector for `text`, refreshing its recency.
    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        let key = truncated_sha256(text);
        let entry = self.entries.get_mut(&key)?;
        entry.ts = Utc::now().timestamp_millis();
        Some(entry.vector.clone())
    }

    /// Insert a vector and persist; evicts LRU entries over capacity first
    /// (the LRU map itself guarantees the bound).
    pub fn put(&mut self, text: &str, vector: Vec<f32>) -> Result<()> {
        let key = truncated_sha256(text);
        self.entries.put(
            key,
            CachedVector {
                vector,
                ts: Utc::now().timestamp_millis(),
            },
        );
        self.persist()
    }

    /// Insert many vectors and persist once.
    pub fn put_batch(&mut self, items: impl IntoIterator<Item = (String, Vec<f32>)>) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        for (text, vector) in items {
            self.entries
                .put(truncated_sha256(&text), CachedVector { vector, ts: now });
        }
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and remove the backing file.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        remove_file_if_present(&self.path)
    }

    fn persist(&self) -> Result<()> {
        persist_entries(&self.path, self.entries.iter())
    }
}

/// TTL'd LRU of serialized search results.
pub struct SearchResultCache {
    path: PathBuf,
    entries: LruCache<String, CachedResult>,
}

impl SearchResultCache {
    pub fn open(store_path: &Path) -> Self {
        let path = cache_dir(store_path).join("search-results.json");
        let mut entries = LruCache::new(NonZeroUsize::new(RESULT_CAPACITY).unwrap());
        for (key, value) in load_entries::<CachedResult>(&path) {
            entries.put(key, value);
        }
        Self { path, entries }
    }

    /// Cache key for a query shape. Stable across processes.
    pub fn key(query: &str, top_k: usize, filter: &impl Serialize) -> String {
        let shape = serde_json::json!({
            "queryText": query,
            "topK": top_k,
            "filter": serde_json::to_value(filter).unwrap_or(serde_json::Value::Null),
        });
        truncated_sha256(&shape.to_string())
    }

    /// Cached results, unless expired.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let now = Utc::now().timestamp_millis();
        let (expired, payload) = {
            let entry = self.entries.get(key)?;
            (now - entry.ts > RESULT_TTL_MS, entry.payload.clone())
        };
        if expired {
            debug!("Search cache entry expired");
            self.entries.pop(key);
            return None;
        }
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding corrupt search cache entry: {}", e);
                self.entries.pop(key);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&mut self, key: String, value: &T) -> Result<()> {
        self.entries.put(
            key,
            CachedResult {
                payload: serde_json::to_value(value)?,
                ts: Utc::now().timestamp_millis(),
            },
        );
        persist_entries(&self.path, self.entries.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        remove_file_if_present(&self.path)
    }
}

/// `<store_path>/../cache/`, next to the store directory.
fn cache_dir(store_path: &Path) -> PathBuf {
    store_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cache")
}

/// Load a cache file, oldest entries first so reinsertion preserves LRU
/// order. Corrupt files are discarded.
fn load_entries<T: DeserializeOwned + HasTimestamp>(path: &Path) -> Vec<(String, T)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<HashMap<String, T>>(&content) {
        Ok(map) => {
            let mut entries: Vec<(String, T)> = map.into_iter().collect();
            entries.sort_by_key(|(_, v)| v.ts());
            entries
        }
        Err(e) => {
            warn!("Discarding corrupt cache file {:?}: {}", path, e);
            Vec::new()
        }
    }
}

fn persist_entries<'a, T: Serialize + 'a>(
    path: &Path,
    entries: impl Iterator<Item = (&'a String, &'a T)>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let map: HashMap<&String, &T> = entries.collect();
    let content = serde_json::to_string(&map)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn remove_file_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

trait HasTimestamp {
    fn ts(&self) -> i64;
}

impl HasTimestamp for CachedVector {
    fn ts(&self) -> i64 {
        self.ts
    }
}

impl HasTimestamp for CachedResult {
    fn ts(&self) -> i64 {
        self.ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_dir(root: &Path) -> PathBuf {
        let store = root.join("store");
        std::fs::create_dir_all(&store).unwrap();
        store
    }

    #[test]
    fn embedding_roundtrip_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = EmbeddingCache::open(&store_dir(dir.path()));

        assert!(cache.get("hello").is_none());
        cache.put("hello", vec![1.0, 2.0]).unwrap();
        assert_eq!(cache.get("hello"), Some(vec![1.0, 2.0]));
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn embedding_cache_persists_to_sibling_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_dir(dir.path());
        {
            let mut cache = EmbeddingCache::open(&store);
            cache.put("hello", vec![0.5]).unwrap();
        }
        assert!(dir.path().join("cache/embeddings.json").exists());

        let mut reopened = EmbeddingCache::open(&store);
        assert_eq!(reopened.get("hello"), Some(vec![0.5]));
    }

    #[test]
    fn embedding_cache_evicts_lru_over_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = EmbeddingCache::open(&store_dir(dir.path()));

        let items = (0..EMBEDDING_CAPACITY + 10).map(|i| (format!("text {}", i), vec![i as f32]));
        cache.put_batch(items).unwrap();

        assert_eq!(cache.len(), EMBEDDING_CAPACITY);
        // first ten inserted were evicted
        assert!(cache.get("text 0").is_none());
        assert!(cache.get(&format!("text {}", EMBEDDING_CAPACITY + 9)).is_some());
    }

    #[test]
    fn corrupt_cache_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_dir(dir.path());
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        std::fs::write(dir.path().join("cache/embeddings.json"), "{broken").unwrap();

        let mut cache = EmbeddingCache::open(&store);
        assert!(cache.is_empty());
        // and the cache keeps working
        cache.put("x", vec![1.0]).unwrap();
        assert_eq!(cache.get("x"), Some(vec![1.0]));
    }

    #[test]
    fn result_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SearchResultCache::open(&store_dir(dir.path()));

        let key = SearchResultCache::key("how does auth work", 10, &serde_json::json!(null));
        assert!(cache.get::<Vec<String>>(&key).is_none());

        cache
            .put(key.clone(), &vec!["hit-1".to_string(), "hit-2".to_string()])
            .unwrap();
        assert_eq!(
            cache.get::<Vec<String>>(&key),
            Some(vec!["hit-1".to_string(), "hit-2".to_string()])
        );
    }

    #[test]
    fn result_cache_expires_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SearchResultCache::open(&store_dir(dir.path()));

        let key = "expired-entry".to_string();
        cache.entries.put(
            key.clone(),
            CachedResult {
                payload: serde_json::json!(["stale"]),
                ts: Utc::now().timestamp_millis() - RESULT_TTL_MS - 1,
            },
        );

        assert!(cache.get::<Vec<String>>(&key).is_none());
        assert!(cache.entries.peek(&key).is_none());
    }

    #[test]
    fn result_cache_key_depends_on_shape() {
        let base = SearchResultCache::key("query", 10, &serde_json::json!(null));
        assert_eq!(
            base,
            SearchResultCache::key("query", 10, &serde_json::json!(null))
        );
        assert_ne!(base, SearchResultCache::key("query", 20, &serde_json::json!(null)));
        assert_ne!(base, SearchResultCache::key("other", 10, &serde_json::json!(null)));
    }

    #[test]
    fn clear_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_dir(dir.path());
        let mut cache = EmbeddingCache::open(&store);
        cache.put("x", vec![1.0]).unwrap();
        cache.clear().unwrap();

        assert!(cache.is_empty());
        assert!(!dir.path().join("cache/embeddings.json").exists());
    }
}
