//! Refresh controller for sheet snapshots
//!
//! Wraps a [`DataLoader`] so that repeated renders reuse the last snapshot
//! until it goes stale. The controller owns its single cache entry; nothing
//! else mutates it, and it is only ever replaced whole.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::{Clock, SystemClock};
use crate::data::{DataLoader, LoadError, Snapshot};

/// How long a snapshot stays fresh unless configured otherwise
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Freshness of the cache as observed at call time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing has been fetched successfully yet
    Empty,
    /// A snapshot younger than the TTL is stored
    Fresh,
    /// The stored snapshot has outlived the TTL
    Stale,
}

impl CacheState {
    pub fn label(&self) -> &'static str {
        match self {
            CacheState::Empty => "empty",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
        }
    }
}

/// The single live snapshot held by a controller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    stored: Option<(Arc<Snapshot>, DateTime<Utc>)>,
}

impl CacheEntry {
    fn filled(snapshot: Arc<Snapshot>, stored_at: DateTime<Utc>) -> Self {
        Self {
            stored: Some((snapshot, stored_at)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_none()
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.stored.as_ref().map(|(snapshot, _)| snapshot)
    }

    /// Controller-clock time at which the snapshot was stored
    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        self.stored.as_ref().map(|(_, at)| *at)
    }
}

/// Serves snapshots from the cache, refreshing through the loader on demand
///
/// # Refresh rules
/// - `get(true)` always fetches
/// - `get(false)` fetches when the cache is empty or stale
/// - A successful fetch replaces the entry; a failed one leaves it untouched
///   and returns the error
#[derive(Debug)]
pub struct RefreshController<L, C = SystemClock> {
    loader: L,
    clock: C,
    ttl: Duration,
    entry: CacheEntry,
}

impl<L: DataLoader> RefreshController<L> {
    /// Creates a controller using wall-clock time and the default TTL
    pub fn new(loader: L) -> Self {
        Self::with_clock(loader, SystemClock, DEFAULT_TTL)
    }
}

impl<L: DataLoader, C: Clock> RefreshController<L, C> {
    /// Creates a controller with an explicit clock and TTL
    pub fn with_clock(loader: L, clock: C, ttl: Duration) -> Self {
        Self {
            loader,
            clock,
            ttl,
            entry: CacheEntry::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn entry(&self) -> &CacheEntry {
        &self.entry
    }

    /// Current freshness, judged against the controller's clock
    pub fn state(&self) -> CacheState {
        let Some(stored_at) = self.entry.stored_at() else {
            return CacheState::Empty;
        };
        // A clock that moved backwards leaves the snapshot fresh
        match (self.clock.now() - stored_at).to_std() {
            Ok(age) if age >= self.ttl => CacheState::Stale,
            _ => CacheState::Fresh,
        }
    }

    /// Returns the stored snapshot without fetching, fresh or not
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.entry.snapshot().cloned()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.entry.stored_at()
    }

    /// Drops the stored snapshot so the next `get` fetches
    pub fn invalidate(&mut self) {
        self.entry = CacheEntry::default();
    }

    /// Returns the current snapshot, fetching a new one when needed
    ///
    /// # Arguments
    /// * `force` - Fetch even if the stored snapshot is still fresh
    ///
    /// # Returns
    /// * `Ok(Arc<Snapshot>)` - The cached or newly fetched snapshot
    /// * `Err(LoadError)` - The fetch failed; the cache entry is unchanged
    pub async fn get(&mut self, force: bool) -> Result<Arc<Snapshot>, LoadError> {
        let state = self.state();
        if !force && state == CacheState::Fresh {
            if let Some(snapshot) = self.entry.snapshot() {
                tracing::trace!("snapshot cache hit");
                return Ok(Arc::clone(snapshot));
            }
        }

        tracing::debug!(force, state = state.label(), "refreshing snapshot");
        let snapshot = Arc::new(self.loader.fetch().await?);
        self.entry = CacheEntry::filled(Arc::clone(&snapshot), self.clock.now());
        tracing::debug!(rows = snapshot.len(), "snapshot stored");

        Ok(snapshot)
    }
}
