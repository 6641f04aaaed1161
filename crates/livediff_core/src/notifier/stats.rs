//! Notifier statistics.
//!
//! ```rust,ignore
//! notifier.refresh();
//! let stats = notifier.stats().snapshot();
//! println!("Deliveries: {}", stats.deliveries);
//! println!("Diffs shared: {}", stats.diffs_shared);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters for one notifier.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct NotifierStats {
    /// Commit signals received from the source.
    commits_observed: AtomicU64,
    /// Refresh cycles run.
    refreshes: AtomicU64,
    /// Diff engine runs.
    diffs_computed: AtomicU64,
    /// Subscriptions served from another subscription's diff.
    diffs_shared: AtomicU64,
    /// Callbacks invoked, initial deliveries included.
    deliveries: AtomicU64,
    /// Initial deliveries.
    initial_deliveries: AtomicU64,
    /// Lineages found invalidated.
    invalidations: AtomicU64,
    /// Failures isolated to one subscription or lineage.
    failures: AtomicU64,
}

impl NotifierStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_commit(&self) {
        self.commits_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_diff(&self) {
        self.diffs_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shared_diff(&self) {
        self.diffs_shared.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self, initial: bool) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        if initial {
            self.initial_deliveries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of commit signals received.
    pub fn commits_observed(&self) -> u64 {
        self.commits_observed.load(Ordering::Relaxed)
    }

    /// Returns the number of refresh cycles.
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Returns the number of diff engine runs.
    pub fn diffs_computed(&self) -> u64 {
        self.diffs_computed.load(Ordering::Relaxed)
    }

    /// Returns the number of diffs reused across subscriptions.
    pub fn diffs_shared(&self) -> u64 {
        self.diffs_shared.load(Ordering::Relaxed)
    }

    /// Returns the number of callbacks invoked.
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Returns the number of initial deliveries.
    pub fn initial_deliveries(&self) -> u64 {
        self.initial_deliveries.load(Ordering::Relaxed)
    }

    /// Returns the number of invalidated lineages seen.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Returns the number of isolated failures.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commits_observed: self.commits_observed(),
            refreshes: self.refreshes(),
            diffs_computed: self.diffs_computed(),
            diffs_shared: self.diffs_shared(),
            deliveries: self.deliveries(),
            initial_deliveries: self.initial_deliveries(),
            invalidations: self.invalidations(),
            failures: self.failures(),
        }
    }
}

/// A point-in-time copy of [`NotifierStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Commit signals received from the source.
    pub commits_observed: u64,
    /// Refresh cycles run.
    pub refreshes: u64,
    /// Diff engine runs.
    pub diffs_computed: u64,
    /// Subscriptions served from another subscription's diff.
    pub diffs_shared: u64,
    /// Callbacks invoked.
    pub deliveries: u64,
    /// Initial deliveries.
    pub initial_deliveries: u64,
    /// Lineages found invalidated.
    pub invalidations: u64,
    /// Isolated failures.
    pub failures: u64,
}
