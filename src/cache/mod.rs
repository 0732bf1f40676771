//! Process-scoped memoization of unpacked display options.
//!
//! Structurally identical displays unpack to identical option maps, so the
//! merge result is kept under a content key. The cache is shared by every
//! view an [`Engine`](crate::Engine) loads and is cleared wholesale whenever
//! a catalog or the settings change.

mod key;

pub use key::unpack_key;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::debug;

/// Result of one unpack: the merged options and the paths that had to be
/// reset to their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unpacked {
    pub options: Map<String, Value>,
    pub repaired: Vec<String>,
}

/// Shared cache of unpacked option maps.
#[derive(Debug, Default)]
pub struct UnpackCache {
    enabled: bool,
    entries: Mutex<HashMap<String, Unpacked>>,
    generation: AtomicU64,
}

impl UnpackCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Unpacked>> {
        // a panic mid-insert leaves a complete map behind
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached unpack for `key`, or build and remember it.
    ///
    /// The lock is held across `build` so two threads never populate the
    /// same key. The flag tells whether the entry was a hit.
    pub fn get_or_insert_with<F>(&self, key: &str, build: F) -> (Unpacked, bool)
    where
        F: FnOnce() -> Unpacked,
    {
        if !self.enabled {
            return (build(), false);
        }
        let mut entries = self.lock();
        if let Some(found) = entries.get(key) {
            debug!(key, "unpack cache hit");
            return (found.clone(), true);
        }
        debug!(key, "unpack cache miss");
        let built = build();
        entries.insert(key.to_string(), built.clone());
        (built, false)
    }

    /// Drop every entry and start a new generation.
    pub fn invalidate(&self) {
        let mut entries = self.lock();
        entries.clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "unpack cache invalidated");
    }

    /// Number of invalidations so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
