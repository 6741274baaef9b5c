//! Live column cache.
//!
//! Each compiled table keeps the last column listing it read from the
//! database as an immutable [`ColumnSnapshot`]. Readers load the current
//! snapshot without locking. Writers (population, invalidation, schema
//! synchronization) hold the migration lock and bump the version whenever
//! they publish or clear.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::Result;

/// Immutable view of a table's live columns (name → SQL type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSnapshot {
    pub version: u64,
    pub columns: BTreeMap<String, String>,
}

impl ColumnSnapshot {
    /// SQL type of a live column.
    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.columns.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
}

/// Versioned cache of a table's live columns.
#[derive(Debug, Default)]
pub struct ColumnCache {
    snapshot: ArcSwapOption<ColumnSnapshot>,
    version: AtomicU64,
    migration: Mutex<()>,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if populated.
    pub fn current(&self) -> Option<Arc<ColumnSnapshot>> {
        self.snapshot.load_full()
    }

    /// Number of publishes and invalidations so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Take the migration lock. Held for the whole of a schema change.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.migration.lock()
    }

    /// Publish a new snapshot. The guard is proof that the lock is held.
    pub fn publish(
        &self,
        _guard: &MutexGuard<'_, ()>,
        columns: BTreeMap<String, String>,
    ) -> Arc<ColumnSnapshot> {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(ColumnSnapshot { version, columns });
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Drop the snapshot so the next read refetches.
    pub fn invalidate(&self, _guard: &MutexGuard<'_, ()>) {
        self.version.fetch_add(1, Ordering::AcqRel);
        self.snapshot.store(None);
    }

    /// Current snapshot, populating it with `fetch` under the migration lock
    /// when empty.
    pub fn load_or_fetch<F>(&self, fetch: F) -> Result<Arc<ColumnSnapshot>>
    where
        F: FnOnce() -> Result<BTreeMap<String, String>>,
    {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        let guard = self.lock();
        self.load_or_fetch_locked(&guard, fetch)
    }

    /// Same as [`load_or_fetch`](Self::load_or_fetch) for a caller already
    /// holding the migration lock.
    ///
    /// An empty listing (table absent) is returned but not cached.
    pub fn load_or_fetch_locked<F>(
        &self,
        guard: &MutexGuard<'_, ()>,
        fetch: F,
    ) -> Result<Arc<ColumnSnapshot>>
    where
        F: FnOnce() -> Result<BTreeMap<String, String>>,
    {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        let columns = fetch()?;
        if columns.is_empty() {
            return Ok(Arc::new(ColumnSnapshot {
                version: self.version(),
                columns,
            }));
        }
        debug!("Cached {} live columns", columns.len());
        Ok(self.publish(guard, columns))
    }
}
