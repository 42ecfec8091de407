//! # Artifact Cache
//!
//! Memoizes compiled artifacts per (unit, bindings, child outputs). Each key
//! owns its own lock, so a key is built at most once even when several
//! threads ask for it concurrently, while different keys build in parallel.
//!
//! Entries are immutable once inserted. A failed build leaves the key empty.

use crate::domain::entities::CompiledArtifact;
use crate::domain::value_objects::{Hash, UnitName};
use crate::errors::PrecompileError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Identity of one compilation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Unit being built.
    pub unit: UnitName,
    /// Descriptor fingerprint (template, declarations, children).
    pub fingerprint: Hash,
    /// Encoded value per declared variable; `None` for open slots.
    pub bindings: Vec<(String, Option<Vec<u8>>)>,
    /// Content hash of every child, in declaration order.
    pub children: Vec<(UnitName, Hash)>,
}

/// Whether `get_or_build` compiled or reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from the cache.
    Hit,
    /// Built by this call.
    Built,
}

/// Cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: usize,
    /// Lookups that had to build.
    pub misses: usize,
    /// Builds that failed.
    pub failures: usize,
    /// Entries currently stored.
    pub entries: usize,
}

type Slot = Arc<Mutex<Option<Arc<CompiledArtifact>>>>;

/// Session-scoped artifact cache.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    failures: AtomicUsize,
}

impl ArtifactCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the artifact for `key`, running `build` only if no artifact
    /// is stored yet.
    ///
    /// # Errors
    ///
    /// Whatever `build` returns; nothing is stored in that case.
    pub fn get_or_build<F>(
        &self,
        key: CacheKey,
        build: F,
    ) -> Result<(Arc<CompiledArtifact>, CacheOutcome), PrecompileError>
    where
        F: FnOnce() -> Result<CompiledArtifact, PrecompileError>,
    {
        let slot: Slot = Arc::clone(self.slots.lock().entry(key).or_default());

        // Held across the build: concurrent callers with the same key wait here.
        let mut entry = slot.lock();
        if let Some(artifact) = entry.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((Arc::clone(artifact), CacheOutcome::Hit));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match build() {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                *entry = Some(Arc::clone(&artifact));
                Ok((artifact, CacheOutcome::Built))
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Looks up a stored artifact without building.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CompiledArtifact>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let entry = slot.lock();
        entry.clone()
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// Returns true if no artifact is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        self.slots.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

/// A cache shared across several builds.
///
/// `PrecompileEngine::build` starts a fresh session each time; pass a
/// session to `build_in_session` to reuse artifacts between builds (for
/// example the second build after deployment). Keys include every bound
/// value, so a shared session never returns an artifact built from other
/// bindings.
#[derive(Debug, Default)]
pub struct BuildSession {
    cache: ArtifactCache,
}

impl BuildSession {
    /// Starts an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's cache.
    #[must_use]
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Cache counters accumulated over the session.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// =============================================================================
// TESTS
// =============================================================================
