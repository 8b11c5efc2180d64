//! In-memory fingerprint cache with single-flight deduplication.
//!
//! Entries are keyed by a [`CacheKey`] derived from the resolved file path (or a
//! hash of the content for byte inputs) plus the output-affecting subset of the
//! extraction config. File entries remember the size and mtime observed when they
//! were stored; a lookup that sees different values evicts the entry and misses.
//!
//! # Single-flight
//!
//! Concurrent requests for the same key rendezvous on a [`ProcessingGate`]. The
//! first caller to [`DocumentCache::claim`] a key becomes the leader and receives a
//! [`ProcessingGuard`]; everyone else receives the gate and waits on it. The guard
//! removes and signals the gate when dropped, whether the leader succeeded, failed,
//! panicked or was cancelled, so waiters never hang on an abandoned gate.
//!
//! After waking, a waiter must look the key up again: if the leader failed the
//! cache is still empty and the waiter claims the key itself.
//!
//! The cache is process-local and best-effort. Nothing is persisted.

use crate::core::config::ExtractionConfig;
use crate::core::io::{file_fingerprint, file_fingerprint_async, resolve_path, resolve_path_async};
use crate::types::ExtractionResult;
use ahash::{AHashMap, RandomState};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

/// Seeds for the two 64-bit halves of a cache key.
const KEY_SEEDS: [[u64; 4]; 2] = [
    [0x243f_6a88_85a3_08d3, 0x1319_8a2e_0370_7344, 0xa409_3822_299f_31d0, 0x082e_fa98_ec4e_6c89],
    [0x4528_21e6_38d0_1377, 0xbe54_66cf_34e9_0c6c, 0xc0ac_29b7_c97c_50dd, 0x3f84_d5b5_b547_0917],
];

/// Opaque 128-bit cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 16]);

impl CacheKey {
    /// Key for a file, from its resolved path and the relevant config fields.
    ///
    /// `mime_override` is part of the key because it changes which extractor runs.
    pub fn for_file(path: &Path, config: &ExtractionConfig, mime_override: Option<&str>) -> Self {
        Self::for_resolved_file(&resolve_path(path), config, mime_override)
    }

    /// [`CacheKey::for_file`] with the path resolved through `tokio::fs`.
    pub async fn for_file_async(path: &Path, config: &ExtractionConfig, mime_override: Option<&str>) -> Self {
        Self::for_resolved_file(&resolve_path_async(path).await, config, mime_override)
    }

    fn for_resolved_file(resolved: &Path, config: &ExtractionConfig, mime_override: Option<&str>) -> Self {
        let mut parts = vec![
            ("source", "file".to_string()),
            ("path", resolved.to_string_lossy().into_owned()),
            ("mime_override", mime_override.unwrap_or("none").to_string()),
        ];
        parts.extend(config.cache_fingerprint().parts());
        Self::from_parts(&parts, None)
    }

    /// Content-addressed key for a byte buffer.
    pub fn for_bytes(content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Self {
        let mut parts = vec![
            ("source", "bytes".to_string()),
            ("mime_type", mime_type.to_string()),
            ("content_len", content.len().to_string()),
        ];
        parts.extend(config.cache_fingerprint().parts());
        Self::from_parts(&parts, Some(content))
    }

    fn from_parts(parts: &[(&str, String)], content: Option<&[u8]>) -> Self {
        let mut sorted: Vec<_> = parts.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut key = [0u8; 16];
        for (half, seeds) in KEY_SEEDS.iter().enumerate() {
            let mut hasher = RandomState::with_seeds(seeds[0], seeds[1], seeds[2], seeds[3]).build_hasher();
            for (name, value) in &sorted {
                hasher.write(name.as_bytes());
                hasher.write_u8(b'=');
                hasher.write_usize(value.len());
                hasher.write(value.as_bytes());
            }
            if let Some(content) = content {
                hasher.write(content);
            }
            key[half * 8..(half + 1) * 8].copy_from_slice(&hasher.finish().to_le_bytes());
        }
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Where a cached result came from, used to validate it on lookup.
#[derive(Debug, Clone, Copy)]
pub enum CacheSource<'a> {
    /// Stat'ed on every lookup and store.
    File(&'a Path),
    Content { size: u64 },
    /// A file fingerprint already read by the caller; `None` if the file could not be stat'ed.
    Observed(Option<(u64, f64)>),
}

impl CacheSource<'_> {
    fn fingerprint(&self) -> Option<(u64, f64)> {
        match self {
            CacheSource::File(path) => file_fingerprint(path),
            CacheSource::Content { size } => Some((*size, 0.0)),
            CacheSource::Observed(fingerprint) => *fingerprint,
        }
    }

    /// Read the fingerprint now through `tokio::fs`.
    pub async fn observe(&self) -> CacheSource<'static> {
        match self {
            CacheSource::File(path) => CacheSource::Observed(file_fingerprint_async(path).await),
            CacheSource::Content { size } => CacheSource::Content { size: *size },
            CacheSource::Observed(fingerprint) => CacheSource::Observed(*fingerprint),
        }
    }
}

/// A stored extraction result and the fingerprint it is valid for.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Arc<ExtractionResult>,
    pub file_size: u64,
    pub file_mtime: f64,
    pub cached_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub cached_documents: usize,
    pub processing_documents: usize,
    pub total_cache_size_mb: f64,
}

/// One-shot broadcast signal for an in-flight computation.
#[derive(Debug, Default)]
pub struct ProcessingGate {
    done: Mutex<bool>,
    cond: Condvar,
    notify: Notify,
}

impl ProcessingGate {
    fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        *self.done.lock()
    }

    fn complete(&self) {
        let mut done = self.done.lock();
        if *done {
            return;
        }
        *done = true;
        drop(done);
        self.cond.notify_all();
        self.notify.notify_waiters();
    }

    /// Block the current thread until the computation finishes.
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    /// Block for at most `timeout`. Returns whether the gate completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut done = self.done.lock();
        if !*done {
            let _ = self.cond.wait_while_for(&mut done, |done| !*done, timeout);
        }
        *done
    }

    /// Wait asynchronously until the computation finishes.
    pub async fn wait_async(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a completion between the check and the
            // await is not lost.
            notified.as_mut().enable();
            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }
}

/// Outcome of [`DocumentCache::claim`].
pub enum Claim<'a> {
    /// The caller owns the key and must compute the result.
    Leader(ProcessingGuard<'a>),
    /// Another caller is computing; wait on the gate, then look up again.
    Follower(Arc<ProcessingGate>),
}

/// Leadership of an in-flight key. Dropping it releases waiters.
pub struct ProcessingGuard<'a> {
    cache: &'a DocumentCache,
    key: CacheKey,
    gate: Arc<ProcessingGate>,
    generation: u64,
}

impl ProcessingGuard<'_> {
    pub fn key(&self) -> CacheKey {
        self.key
    }

    /// Publish the computed result.
    ///
    /// Returns `false` without storing if the cache was cleared after the key
    /// was claimed.
    pub fn store(&self, source: &CacheSource<'_>, result: ExtractionResult) -> bool {
        let entry = DocumentCache::make_entry(source, result);
        let mut state = self.cache.state.lock();
        if state.generation != self.generation {
            return false;
        }
        state.entries.insert(self.key, entry);
        true
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.cache.release(&self.key, &self.gate);
    }
}

#[derive(Default)]
struct CacheState {
    entries: AHashMap<CacheKey, CacheEntry>,
    processing: AHashMap<CacheKey, Arc<ProcessingGate>>,
    generation: u64,
}

/// Process-local document cache.
#[derive(Default)]
pub struct DocumentCache {
    state: Mutex<CacheState>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for a file, if present and still fresh.
    pub fn get(&self, path: &Path, config: &ExtractionConfig) -> Option<ExtractionResult> {
        self.lookup(&CacheKey::for_file(path, config, None), &CacheSource::File(path))
    }

    /// Store a result for a file, fingerprinted with its current size and mtime.
    pub fn set(&self, path: &Path, config: &ExtractionConfig, result: ExtractionResult) {
        self.insert(CacheKey::for_file(path, config, None), &CacheSource::File(path), result);
    }

    pub fn is_processing(&self, path: &Path, config: &ExtractionConfig) -> bool {
        self.is_key_processing(&CacheKey::for_file(path, config, None))
    }

    /// Register an in-flight computation for a file and return its gate.
    ///
    /// Idempotent: an existing gate is returned as-is. Pair with
    /// [`DocumentCache::mark_complete`], or use [`DocumentCache::claim`] for
    /// guard-based release.
    pub fn mark_processing(&self, path: &Path, config: &ExtractionConfig) -> Arc<ProcessingGate> {
        let key = CacheKey::for_file(path, config, None);
        let mut state = self.state.lock();
        Arc::clone(
            state
                .processing
                .entry(key)
                .or_insert_with(|| Arc::new(ProcessingGate::new())),
        )
    }

    /// Remove the in-flight gate for a file and wake its waiters.
    pub fn mark_complete(&self, path: &Path, config: &ExtractionConfig) {
        let key = CacheKey::for_file(path, config, None);
        let gate = self.state.lock().processing.remove(&key);
        if let Some(gate) = gate {
            gate.complete();
        }
    }

    /// Look up a key, validating file entries against the current fingerprint.
    ///
    /// Stale entries, and entries whose file can no longer be stat'ed, are evicted.
    pub fn lookup(&self, key: &CacheKey, source: &CacheSource<'_>) -> Option<ExtractionResult> {
        let current = source.fingerprint();
        let mut state = self.state.lock();
        let fresh = {
            let entry = state.entries.get(key)?;
            match current {
                Some((size, mtime)) => entry.file_size == size && entry.file_mtime == mtime,
                None => false,
            }
        };
        if !fresh {
            state.entries.remove(key);
            tracing::debug!(cache_key = %key, "Evicted stale cache entry");
            return None;
        }

        state.entries.get(key).map(|entry| ExtractionResult::clone(&entry.result))
    }

    /// Unconditionally store a result under `key`.
    pub fn insert(&self, key: CacheKey, source: &CacheSource<'_>, result: ExtractionResult) {
        let entry = Self::make_entry(source, result);
        self.state.lock().entries.insert(key, entry);
    }

    pub fn is_key_processing(&self, key: &CacheKey) -> bool {
        self.state.lock().processing.contains_key(key)
    }

    /// Become the leader for `key`, or get the gate of the current leader.
    pub fn claim(&self, key: CacheKey) -> Claim<'_> {
        let mut state = self.state.lock();
        if let Some(gate) = state.processing.get(&key) {
            return Claim::Follower(Arc::clone(gate));
        }
        let gate = Arc::new(ProcessingGate::new());
        state.processing.insert(key, Arc::clone(&gate));
        let generation = state.generation;
        Claim::Leader(ProcessingGuard {
            cache: self,
            key,
            gate,
            generation,
        })
    }

    /// Drop all entries and release all in-flight gates.
    ///
    /// Running computations are not cancelled, but their results are no longer
    /// published. Released waiters look up again, miss, and claim the key.
    pub fn clear(&self) {
        let released: Vec<Arc<ProcessingGate>> = {
            let mut state = self.state.lock();
            state.entries.clear();
            state.generation = state.generation.wrapping_add(1);
            tracing::debug!(generation = state.generation, "Document cache cleared");
            state.processing.drain().map(|(_, gate)| gate).collect()
        };
        for gate in released {
            gate.complete();
        }
    }

    pub fn get_stats(&self) -> CacheStats {
        let state = self.state.lock();
        let total_bytes: usize = state
            .entries
            .values()
            .map(|entry| entry.result.content.len() + entry.result.mime_type.len())
            .sum();
        CacheStats {
            cached_documents: state.entries.len(),
            processing_documents: state.processing.len(),
            total_cache_size_mb: total_bytes as f64 / (1024.0 * 1024.0),
        }
    }

    fn release(&self, key: &CacheKey, gate: &Arc<ProcessingGate>) {
        {
            let mut state = self.state.lock();
            // After a clear() another leader may own the key; leave its gate alone.
            if state.processing.get(key).is_some_and(|current| Arc::ptr_eq(current, gate)) {
                state.processing.remove(key);
            }
        }
        gate.complete();
    }

    fn make_entry(source: &CacheSource<'_>, result: ExtractionResult) -> CacheEntry {
        let (file_size, file_mtime) = source.fingerprint().unwrap_or((0, 0.0));
        let cached_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        CacheEntry {
            result: Arc::new(result),
            file_size,
            file_mtime,
            cached_at,
        }
    }
}

static DOCUMENT_CACHE: Lazy<DocumentCache> = Lazy::new(DocumentCache::new);

/// The process-wide document cache.
pub fn get_document_cache() -> &'static DocumentCache {
    &DOCUMENT_CACHE
}

/// Clear the process-wide document cache.
pub fn clear_document_cache() {
    DOCUMENT_CACHE.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread;
    use tempfile::tempdir;

    fn sample(content: &str) -> ExtractionResult {
        ExtractionResult::new(content, "text/plain")
    }

    #[test]
    fn test_key_is_stable_and_hex() {
        let config = ExtractionConfig::default();
        let a = CacheKey::for_file(Path::new("/tmp/doc.txt"), &config, None);
        let b = CacheKey::for_file(Path::new("/tmp/doc.txt"), &config, None);
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 32);
    }

    #[test]
    fn test_key_distinguishes_relevant_fields() {
        let base = ExtractionConfig::default();
        let tables = ExtractionConfig {
            extract_tables: true,
            ..Default::default()
        };
        let scheduling = ExtractionConfig {
            max_concurrent_extractions: Some(2),
            use_cache: false,
            ..Default::default()
        };
        let path = Path::new("/tmp/doc.txt");

        assert_ne!(CacheKey::for_file(path, &base, None), CacheKey::for_file(path, &tables, None));
        assert_eq!(CacheKey::for_file(path, &base, None), CacheKey::for_file(path, &scheduling, None));
        assert_ne!(
            CacheKey::for_file(path, &base, None),
            CacheKey::for_file(path, &base, Some("text/markdown"))
        );
    }

    #[test]
    fn test_bytes_key_is_content_addressed() {
        let config = ExtractionConfig::default();
        let a = CacheKey::for_bytes(b"hello", "text/plain", &config);
        assert_eq!(a, CacheKey::for_bytes(b"hello", "text/plain", &config));
        assert_ne!(a, CacheKey::for_bytes(b"hellp", "text/plain", &config));
        assert_ne!(a, CacheKey::for_bytes(b"hello", "text/markdown", &config));
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "content").unwrap();
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();

        assert!(cache.get(&path, &config).is_none());
        cache.set(&path, &config, sample("content"));
        assert_eq!(cache.get(&path, &config).unwrap().content, "content");
    }

    #[test]
    fn test_size_change_evicts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "content").unwrap();
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();
        cache.set(&path, &config, sample("content"));

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b" and more").unwrap();
        drop(file);

        assert!(cache.get(&path, &config).is_none());
        assert_eq!(cache.get_stats().cached_documents, 0);
    }

    #[test]
    fn test_deleted_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "content").unwrap();
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();
        cache.set(&path, &config, sample("content"));

        std::fs::remove_file(&path).unwrap();
        assert!(cache.get(&path, &config).is_none());
    }

    #[test]
    fn test_content_entries_never_stale() {
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();
        let key = CacheKey::for_bytes(b"abc", "text/plain", &config);
        let source = CacheSource::Content { size: 3 };
        cache.insert(key, &source, sample("abc"));
        assert!(cache.lookup(&key, &source).is_some());
    }

    #[tokio::test]
    async fn test_async_key_and_observed_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "content").unwrap();
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();

        let key = CacheKey::for_file_async(&path, &config, None).await;
        assert_eq!(key, CacheKey::for_file(&path, &config, None));

        let observed = CacheSource::File(&path).observe().await;
        assert!(matches!(observed, CacheSource::Observed(Some((7, _)))));
        cache.insert(key, &observed, sample("content"));
        assert!(cache.get(&path, &config).is_some());

        std::fs::write(&path, "rewritten content").unwrap();
        let observed = CacheSource::File(&path).observe().await;
        assert!(cache.lookup(&key, &observed).is_none());
        assert!(cache.lookup(&key, &CacheSource::Observed(None)).is_none());
    }

    #[test]
    fn test_mark_processing_is_idempotent() {
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();
        let path = Path::new("/tmp/in-flight.txt");

        let first = cache.mark_processing(path, &config);
        let second = cache.mark_processing(path, &config);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_processing(path, &config));

        cache.mark_complete(path, &config);
        assert!(!cache.is_processing(path, &config));
        assert!(first.is_complete());
    }

    #[test]
    fn test_claim_leader_and_follower() {
        let cache = DocumentCache::new();
        let key = CacheKey::for_bytes(b"x", "text/plain", &ExtractionConfig::default());

        let guard = match cache.claim(key) {
            Claim::Leader(guard) => guard,
            Claim::Follower(_) => panic!("first claim must lead"),
        };
        let gate = match cache.claim(key) {
            Claim::Follower(gate) => gate,
            Claim::Leader(_) => panic!("second claim must follow"),
        };
        assert!(!gate.is_complete());

        drop(guard);
        assert!(gate.is_complete());
        assert!(!cache.is_key_processing(&key));
    }

    #[test]
    fn test_guard_released_on_panic() {
        let cache = DocumentCache::new();
        let key = CacheKey::for_bytes(b"panic", "text/plain", &ExtractionConfig::default());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = match cache.claim(key) {
                Claim::Leader(guard) => guard,
                Claim::Follower(_) => unreachable!(),
            };
            panic!("extractor blew up");
        }));
        assert!(outcome.is_err());
        assert!(!cache.is_key_processing(&key));
    }

    #[test]
    fn test_store_after_clear_is_discarded() {
        let cache = DocumentCache::new();
        let key = CacheKey::for_bytes(b"late", "text/plain", &ExtractionConfig::default());
        let source = CacheSource::Content { size: 4 };

        let guard = match cache.claim(key) {
            Claim::Leader(guard) => guard,
            Claim::Follower(_) => unreachable!(),
        };
        cache.clear();

        assert!(!guard.store(&source, sample("late")));
        drop(guard);
        assert!(cache.lookup(&key, &source).is_none());
    }

    #[test]
    fn test_stale_guard_leaves_new_leader_gate() {
        let cache = DocumentCache::new();
        let key = CacheKey::for_bytes(b"k", "text/plain", &ExtractionConfig::default());

        let old = match cache.claim(key) {
            Claim::Leader(guard) => guard,
            Claim::Follower(_) => unreachable!(),
        };
        cache.clear();
        let new = match cache.claim(key) {
            Claim::Leader(guard) => guard,
            Claim::Follower(_) => panic!("clear should forget the old gate"),
        };

        drop(old);
        assert!(cache.is_key_processing(&key));
        drop(new);
        assert!(!cache.is_key_processing(&key));
    }

    #[test]
    fn test_clear_wakes_path_api_waiters() {
        let cache = Arc::new(DocumentCache::new());
        let config = ExtractionConfig::default();
        let path = Path::new("/tmp/cleared-while-processing.txt");

        let gate = cache.mark_processing(path, &config);
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));

        cache.clear();
        cache.mark_complete(path, &config);

        assert!(waiter.join().unwrap());
        assert!(gate.is_complete());
        assert!(!cache.is_processing(path, &config));

        let next = cache.mark_processing(path, &config);
        assert!(!Arc::ptr_eq(&gate, &next));
        assert!(!next.is_complete());
    }

    #[tokio::test]
    async fn test_clear_wakes_async_followers() {
        let cache = DocumentCache::new();
        let key = CacheKey::for_bytes(b"abandoned", "text/plain", &ExtractionConfig::default());

        let leader = match cache.claim(key) {
            Claim::Leader(guard) => guard,
            Claim::Follower(_) => unreachable!(),
        };
        let gate = match cache.claim(key) {
            Claim::Follower(gate) => gate,
            Claim::Leader(_) => panic!("second claim must follow"),
        };

        cache.clear();
        tokio::time::timeout(Duration::from_secs(1), gate.wait_async())
            .await
            .expect("clear should release followers");
        assert!(matches!(cache.claim(key), Claim::Leader(_)));
        drop(leader);
    }

    #[test]
    fn test_gate_wakes_blocking_waiters() {
        let gate = Arc::new(ProcessingGate::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.wait())
            })
            .collect();

        assert!(!gate.wait_timeout(Duration::from_millis(20)));
        gate.complete();
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert!(gate.wait_timeout(Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn test_gate_wakes_async_waiters() {
        let gate = Arc::new(ProcessingGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_async().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.complete();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[test]
    fn test_stats() {
        let cache = DocumentCache::new();
        let config = ExtractionConfig::default();
        let key = CacheKey::for_bytes(b"abc", "text/plain", &config);
        cache.insert(key, &CacheSource::Content { size: 3 }, sample("abc"));
        let _gate = cache.mark_processing(Path::new("/tmp/other.txt"), &config);

        let stats = cache.get_stats();
        assert_eq!(stats.cached_documents, 1);
        assert_eq!(stats.processing_documents, 1);
        assert!(stats.total_cache_size_mb > 0.0);

        cache.clear();
        assert_eq!(cache.get_stats().cached_documents, 0);
        assert_eq!(cache.get_stats().processing_documents, 0);
    }
}
