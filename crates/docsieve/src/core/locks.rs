//! Lock discipline for native libraries that are not thread safe.
//!
//! Two scopes are provided:
//!
//! - [`with_global_lock`] serializes every call into a library with process-global
//!   state, regardless of the file involved.
//! - [`with_resource_lock`] serializes calls touching the same resource (keyed by
//!   the hashed, resolved path) while calls on different resources run in parallel.
//!
//! Both locks are reentrant, so nested helpers may re-acquire a lock the current
//! thread already holds. Acquisition is closure-scoped: the guard is dropped on
//! every exit path, including panics unwinding out of the protected call.
//!
//! The resource table only holds `Weak` references. An entry lives as long as some
//! caller holds its lock handle and is removed when the last holder finishes.

use crate::core::io::resolve_path;
use ahash::AHasher;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Weak};

type ResourceLock = Arc<ReentrantMutex<()>>;

/// Global and per-resource reentrant locks.
#[derive(Default)]
pub struct ResourceMutex {
    global: ReentrantMutex<()>,
    resources: Mutex<HashMap<String, Weak<ReentrantMutex<()>>>>,
}

/// Holds a strong reference to one resource lock and prunes the table entry on drop.
struct ResourceLease<'a> {
    owner: &'a ResourceMutex,
    key: String,
    lock: Option<ResourceLock>,
}

impl Drop for ResourceLease<'_> {
    fn drop(&mut self) {
        let mut table = self.owner.resources.lock();
        // Release our reference under the table lock; leases are only handed out
        // under it too, so a dead entry here stays dead.
        self.lock = None;
        if table.get(&self.key).is_some_and(|lock| lock.strong_count() == 0) {
            table.remove(&self.key);
        }
    }
}

impl ResourceMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the global lock for the lifetime of the returned guard.
    pub fn global_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.global.lock()
    }

    /// Run `f` while holding the global lock.
    pub fn with_global_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.global.lock();
        f()
    }

    /// Run `f` while holding the lock for `resource`.
    pub fn with_resource_lock<R>(&self, resource: impl AsRef<Path>, f: impl FnOnce() -> R) -> R {
        let lease = self.lease(resource_key(resource.as_ref()));
        let _guard = lease.lock.as_ref().map(|lock| lock.lock());
        f()
    }

    /// Number of resource locks currently alive in the table.
    pub fn tracked_resources(&self) -> usize {
        self.resources
            .lock()
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }

    fn lease(&self, key: String) -> ResourceLease<'_> {
        let mut table = self.resources.lock();
        let lock = match table.get(&key).and_then(Weak::upgrade) {
            Some(lock) => lock,
            None => {
                let lock = Arc::new(ReentrantMutex::new(()));
                table.insert(key.clone(), Arc::downgrade(&lock));
                lock
            }
        };
        ResourceLease {
            owner: self,
            key,
            lock: Some(lock),
        }
    }
}

/// Table key for a resource: a hash of its resolved absolute path.
pub fn resource_key(path: &Path) -> String {
    let resolved = resolve_path(path);
    let mut hasher = AHasher::default();
    resolved.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

static RESOURCE_MUTEX: Lazy<ResourceMutex> = Lazy::new(ResourceMutex::new);

/// The process-wide lock set used by extractors.
pub fn resource_mutex() -> &'static ResourceMutex {
    &RESOURCE_MUTEX
}

/// Run `f` under the process-wide global native-library lock.
pub fn with_global_lock<R>(f: impl FnOnce() -> R) -> R {
    RESOURCE_MUTEX.with_global_lock(f)
}

/// Run `f` under the process-wide lock for `resource`.
pub fn with_resource_lock<R>(resource: impl AsRef<Path>, f: impl FnOnce() -> R) -> R {
    RESOURCE_MUTEX.with_resource_lock(resource, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_global_lock_is_reentrant() {
        let mutex = ResourceMutex::new();
        let value = mutex.with_global_lock(|| mutex.with_global_lock(|| 42));
        assert_eq!(value, 42);
    }

    #[test]
    fn test_resource_lock_is_reentrant() {
        let mutex = ResourceMutex::new();
        let value = mutex.with_resource_lock("a.pdf", || mutex.with_resource_lock("a.pdf", || 7));
        assert_eq!(value, 7);
        assert_eq!(mutex.tracked_resources(), 0);
    }

    #[test]
    fn test_entries_reclaimed_after_release() {
        let mutex = ResourceMutex::new();
        mutex.with_resource_lock("a.pdf", || {
            assert_eq!(mutex.tracked_resources(), 1);
            mutex.with_resource_lock("b.pdf", || assert_eq!(mutex.tracked_resources(), 2));
            assert_eq!(mutex.tracked_resources(), 1);
        });
        assert_eq!(mutex.tracked_resources(), 0);
        assert!(mutex.resources.lock().is_empty());
    }

    #[test]
    fn test_released_on_panic() {
        let mutex = ResourceMutex::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mutex.with_resource_lock("c.pdf", || panic!("native call failed"));
        }));
        assert!(outcome.is_err());
        assert_eq!(mutex.tracked_resources(), 0);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mutex.with_global_lock(|| panic!("native init failed"));
        }));
        assert!(outcome.is_err());

        let mutex = Arc::new(mutex);
        let other = Arc::clone(&mutex);
        let acquired = thread::spawn(move || other.with_global_lock(|| true)).join().unwrap();
        assert!(acquired);
    }

    #[test]
    fn test_same_resource_serializes() {
        let mutex = Arc::new(ResourceMutex::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let hold = Duration::from_millis(50);
        let start = Instant::now();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    mutex.with_resource_lock("same.pdf", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(hold);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() >= hold * 2);
    }

    #[test]
    fn test_different_resources_run_concurrently() {
        let mutex = Arc::new(ResourceMutex::new());
        let barrier = Arc::new(Barrier::new(2));

        // Each closure waits for the other while holding its own lock; this only
        // completes if the two locks are independent.
        let handles: Vec<_> = ["a.pdf", "b.pdf"]
            .into_iter()
            .map(|name| {
                let mutex = Arc::clone(&mutex);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || mutex.with_resource_lock(name, || barrier.wait().is_leader()))
            })
            .collect();

        let leaders = handles.into_iter().map(|h| h.join().unwrap()).filter(|leader| *leader).count();
        assert_eq!(leaders, 1);
    }

    #[test]
    fn test_table_empty_after_contended_release() {
        let mutex = Arc::new(ResourceMutex::new());
        for _ in 0..50 {
            let barrier = Arc::new(Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let mutex = Arc::clone(&mutex);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        mutex.with_resource_lock("shared.pdf", || ());
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert!(mutex.resources.lock().is_empty());
        }
    }

    #[test]
    fn test_resource_key_normalizes_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.pdf");
        std::fs::write(&file, b"%PDF").unwrap();
        let dotted = dir.path().join("sub").join("..").join("file.pdf");
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(resource_key(&file), resource_key(&dotted));
        assert_eq!(resource_key(&file).len(), 16);
        assert_ne!(resource_key(Path::new("/tmp/x.pdf")), resource_key(Path::new("/tmp/y.pdf")));
    }
}
