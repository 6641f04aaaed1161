//! The notifier: runs refresh cycles and delivers change sets.

use super::collection::LiveCollection;
use super::stats::NotifierStats;
use super::subscription::{Delivered, Subscription};
use super::token::{NotificationToken, SubscriptionState};
use super::{Callback, CollectionState, Notification};
use crate::changeset::ChangeSet;
use crate::config::{InitialDelivery, NotifierConfig};
use crate::diff::DiffEngine;
use crate::dirty::DirtySet;
use crate::error::{CoreError, CoreResult};
use crate::keypath::{KeyPathFilter, KeyPathsCollection};
use crate::snapshot::{CollectionDescriptor, Materialized, Snapshot};
use crate::source::SnapshotSource;
use crate::types::{LineageId, SubscriptionId, Version};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Change sets computed during one lineage refresh, keyed by filter and
/// starting version.
type DiffCache = HashMap<(KeyPathsCollection, Version), ChangeSet>;

/// Delivers collection change notifications for one data source.
///
/// Cloning is cheap; clones share subscriptions and state.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

pub(crate) struct NotifierInner {
    source: Arc<dyn SnapshotSource>,
    config: NotifierConfig,
    engine: DiffEngine,
    subscriptions: RwLock<BTreeMap<SubscriptionId, Arc<Subscription>>>,
    next_id: AtomicU64,
    /// Held for the duration of a refresh cycle.
    refresh_lock: Mutex<()>,
    /// Thread currently running a refresh.
    refreshing: Mutex<Option<ThreadId>>,
    /// Set by commits, cleared when a refresh starts.
    pending: Mutex<bool>,
    commit_signal: Condvar,
    stats: NotifierStats,
}

impl NotifierInner {
    pub(crate) fn remove(&self, id: SubscriptionId) {
        self.subscriptions.write().remove(&id);
    }

    fn signal_commit(&self, version: Version) {
        self.stats.record_commit();
        let mut pending = self.pending.lock();
        *pending = true;
        self.commit_signal.notify_all();
        tracing::trace!(version = %version, "commit observed");
    }
}

/// Clears the refreshing thread marker when a refresh ends, even by panic.
struct RefreshingMarker<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for RefreshingMarker<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

impl Notifier {
    /// Creates a notifier and registers it for commit signals.
    pub fn new(source: Arc<dyn SnapshotSource>, config: NotifierConfig) -> Self {
        let engine = DiffEngine::new().flag_scattered_resets(config.flag_scattered_resets);
        if let Some(limit) = source.max_dirty_path_len() {
            if config.full_depth > limit {
                tracing::warn!(
                    full_depth = config.full_depth,
                    limit,
                    "full depth exceeds the source's dirty path limit"
                );
            }
        }
        let inner = Arc::new(NotifierInner {
            source: Arc::clone(&source),
            config,
            engine,
            subscriptions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            refresh_lock: Mutex::new(()),
            refreshing: Mutex::new(None),
            pending: Mutex::new(false),
            commit_signal: Condvar::new(),
            stats: NotifierStats::new(),
        });

        let weak: Weak<NotifierInner> = Arc::downgrade(&inner);
        source.on_commit(Arc::new(move |version| {
            if let Some(inner) = weak.upgrade() {
                inner.signal_commit(version);
            }
        }));

        Self { inner }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &NotifierConfig {
        &self.inner.config
    }

    /// Returns delivery statistics.
    pub fn stats(&self) -> &NotifierStats {
        &self.inner.stats
    }

    /// Returns the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    /// Returns a handle on a collection of the source.
    ///
    /// # Errors
    ///
    /// Propagates the source's error for unknown lineages.
    pub fn collection(&self, lineage: LineageId) -> CoreResult<LiveCollection> {
        let descriptor = self.inner.source.descriptor(lineage)?;
        Ok(LiveCollection::new(self.clone(), descriptor))
    }

    pub(crate) fn read(&self, lineage: LineageId) -> CoreResult<Materialized> {
        let version = self.inner.source.current_version(lineage)?;
        self.inner.source.materialize(lineage, version)
    }

    /// Returns true if a commit arrived since the last refresh started.
    pub fn has_pending_commit(&self) -> bool {
        *self.inner.pending.lock()
    }

    /// Blocks until a commit is signalled or the timeout expires.
    ///
    /// Returns true if a commit is pending.
    pub fn wait_for_commit(&self, timeout: Duration) -> bool {
        let mut pending = self.inner.pending.lock();
        if !*pending {
            let _ = self.inner.commit_signal.wait_for(&mut pending, timeout);
        }
        *pending
    }

    pub(crate) fn subscribe(
        &self,
        descriptor: &CollectionDescriptor,
        key_paths: Option<KeyPathsCollection>,
        callback: Callback,
    ) -> CoreResult<NotificationToken> {
        let inner = &self.inner;
        let key_paths = key_paths.unwrap_or_default();
        let schema = inner.source.schema();
        let filter = KeyPathFilter::resolve(
            &key_paths,
            &schema,
            &descriptor.element,
            inner.config.full_depth,
        )?;
        if let Some(limit) = inner.source.max_dirty_path_len() {
            if let Some(path) = key_paths.paths().iter().find(|path| path.len() > limit) {
                return Err(CoreError::invalid_operation(format!(
                    "key path '{path}' has {} segments but the source reports changes at most {limit} deep",
                    path.len()
                )));
            }
        }

        let id = SubscriptionId(inner.next_id.fetch_add(1, Ordering::Relaxed));
        let lineage = descriptor.lineage;
        let subscription = Arc::new(Subscription::new(id, lineage, key_paths, filter, callback));
        let token = NotificationToken::new(
            id,
            lineage,
            Arc::clone(&subscription.state),
            Arc::downgrade(inner),
        );

        tracing::debug!(
            subscription = %id,
            lineage = %lineage,
            mode = ?subscription.key_paths.mode(),
            "subscription registered"
        );

        if inner.config.initial_delivery == InitialDelivery::Immediate {
            let version = inner.source.current_version(lineage)?;
            match inner.source.materialize(lineage, version)? {
                Materialized::Live(snapshot) => {
                    let current = Arc::new(snapshot);
                    subscription.advance(Arc::clone(&current));
                    self.deliver(&subscription, initial(id, lineage, current));
                }
                Materialized::Invalidated => {
                    inner.stats.record_invalidation();
                    self.invalidate(&subscription);
                    return Ok(token);
                }
            }
        }

        if subscription.state.is_active() {
            inner.subscriptions.write().insert(id, subscription);
        }
        Ok(token)
    }

    /// Runs one refresh cycle.
    ///
    /// Every lineage with subscribers is read once at its current version.
    /// Commits made since the last refresh coalesce into one change set per
    /// subscriber. Returns the number of callbacks invoked.
    ///
    /// Calling `refresh` from inside a callback does nothing.
    pub fn refresh(&self) -> usize {
        let inner = &self.inner;
        let me = thread::current().id();
        if *inner.refreshing.lock() == Some(me) {
            tracing::debug!("refresh requested from a callback; ignored");
            return 0;
        }

        let _cycle = inner.refresh_lock.lock();
        *inner.refreshing.lock() = Some(me);
        let _marker = RefreshingMarker(&inner.refreshing);
        *inner.pending.lock() = false;
        inner.stats.record_refresh();

        let mut by_lineage: BTreeMap<LineageId, Vec<Arc<Subscription>>> = BTreeMap::new();
        for subscription in inner.subscriptions.read().values() {
            by_lineage
                .entry(subscription.lineage)
                .or_default()
                .push(Arc::clone(subscription));
        }

        tracing::debug!(
            lineages = by_lineage.len(),
            subscriptions = by_lineage.values().map(Vec::len).sum::<usize>(),
            "refresh started"
        );

        let delivered: usize = by_lineage
            .iter()
            .map(|(&lineage, subscriptions)| self.refresh_lineage(lineage, subscriptions))
            .sum();

        tracing::debug!(delivered, "refresh finished");
        delivered
    }

    fn refresh_lineage(&self, lineage: LineageId, subscriptions: &[Arc<Subscription>]) -> usize {
        let inner = &self.inner;
        let read = inner
            .source
            .current_version(lineage)
            .and_then(|version| inner.source.materialize(lineage, version));

        let current = match read {
            Ok(Materialized::Live(snapshot)) => Arc::new(snapshot),
            Ok(Materialized::Invalidated) => {
                tracing::debug!(lineage = %lineage, "lineage invalidated");
                inner.stats.record_invalidation();
                return subscriptions
                    .iter()
                    .map(|subscription| usize::from(self.invalidate(subscription)))
                    .sum();
            }
            Err(err) => {
                tracing::warn!(lineage = %lineage, error = %err, "failed to read lineage");
                inner.stats.record_failure();
                return 0;
            }
        };

        let mut dirty_sets: HashMap<Version, DirtySet> = HashMap::new();
        let mut diffs: DiffCache = HashMap::new();
        let mut delivered = 0;
        for subscription in subscriptions {
            match self.prepare(subscription, &current, &mut dirty_sets, &mut diffs) {
                Ok(Some(notification)) => {
                    if self.deliver(subscription, notification) {
                        delivered += 1;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        subscription = %subscription.id,
                        lineage = %lineage,
                        error = %err,
                        "failed to compute changes"
                    );
                    inner.stats.record_failure();
                }
            }
        }
        delivered
    }

    /// Decides what, if anything, a subscription receives for `current`.
    fn prepare(
        &self,
        subscription: &Subscription,
        current: &Arc<Snapshot>,
        dirty_sets: &mut HashMap<Version, DirtySet>,
        diffs: &mut DiffCache,
    ) -> CoreResult<Option<Notification>> {
        let inner = &self.inner;
        let old = match subscription.delivered() {
            Delivered::Pending => {
                subscription.advance(Arc::clone(current));
                return Ok(Some(initial(
                    subscription.id,
                    subscription.lineage,
                    Arc::clone(current),
                )));
            }
            Delivered::Invalidated => return Ok(None),
            Delivered::Snapshot(old) => old,
        };
        if old.version() == current.version() {
            return Ok(None);
        }

        let since = old.version();
        let cache_key = (subscription.key_paths.clone(), since);
        let shared = if inner.config.share_diffs {
            diffs.get(&cache_key).cloned()
        } else {
            None
        };

        let changes = match shared {
            Some(changes) => {
                inner.stats.record_shared_diff();
                changes
            }
            None => {
                let dirty = match dirty_sets.entry(since) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(inner.source.dirty_properties(
                        subscription.lineage,
                        since,
                        current.version(),
                    )?),
                };
                let changes = inner
                    .engine
                    .diff(Some(old.as_ref()), current, &subscription.filter, dirty)?
                    .unwrap_or_default();
                inner.stats.record_diff();
                if inner.config.share_diffs {
                    diffs.insert(cache_key, changes.clone());
                }
                changes
            }
        };

        subscription.advance(Arc::clone(current));

        tracing::trace!(
            subscription = %subscription.id,
            from = %since,
            to = %current.version(),
            empty = changes.is_empty(),
            "diffed subscription"
        );

        if changes.is_empty() {
            return Ok(None);
        }
        Ok(Some(Notification {
            subscription: subscription.id,
            lineage: subscription.lineage,
            state: CollectionState::Live(Arc::clone(current)),
            previous: Some(old),
            changes: Some(changes),
        }))
    }

    /// Sends the final invalidation signal and retires the subscription.
    fn invalidate(&self, subscription: &Subscription) -> bool {
        let notification = match subscription.take_for_invalidation() {
            Delivered::Invalidated => return false,
            Delivered::Pending => Notification {
                subscription: subscription.id,
                lineage: subscription.lineage,
                state: CollectionState::Invalidated,
                previous: None,
                changes: None,
            },
            Delivered::Snapshot(old) => Notification {
                subscription: subscription.id,
                lineage: subscription.lineage,
                state: CollectionState::Invalidated,
                changes: Some(ChangeSet {
                    deleted: (0..old.len()).collect(),
                    is_reset: true,
                    ..ChangeSet::default()
                }),
                previous: Some(old),
            },
        };

        let delivered = self.deliver(subscription, notification);
        if subscription.state.finish(SubscriptionState::Invalidated) {
            tracing::debug!(subscription = %subscription.id, "subscription invalidated");
        }
        self.inner.remove(subscription.id);
        delivered
    }

    fn deliver(&self, subscription: &Subscription, notification: Notification) -> bool {
        let ran = subscription.deliver(&notification);
        if ran {
            self.inner.stats.record_delivery(notification.is_initial());
        }
        ran
    }
}

fn initial(id: SubscriptionId, lineage: LineageId, current: Arc<Snapshot>) -> Notification {
    Notification {
        subscription: id,
        lineage,
        state: CollectionState::Live(current),
        previous: None,
        changes: None,
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("config", &self.inner.config)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
