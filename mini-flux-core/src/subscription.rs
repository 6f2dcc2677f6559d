//! Subscription registry and disposable subscription handles
//!
//! For each [`Tag`] the registry keeps subscriptions ordered by
//! `(priority, id)`: lower priority runs first, equal priorities run in
//! registration order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, warn};

use crate::action::{Action, ActionRef, Tag, Tags};
use crate::dispatcher::Shared;

/// Priority used when none is given. Lower values run earlier.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Buffered actions per subscription stream before a slow reader lags
const STREAM_CAPACITY: usize = 64;

pub(crate) type Callback = Box<dyn Fn(&dyn Action) + Send + Sync>;

pub(crate) struct SubscriptionEntry {
    id: u64,
    priority: i32,
    tag: Tag,
    callback: Callback,
    disposed: AtomicBool,
    stream_tx: Mutex<Option<broadcast::Sender<ActionRef>>>,
}

impl SubscriptionEntry {
    pub(crate) fn new(id: u64, priority: i32, tag: Tag, callback: Callback) -> Self {
        Self {
            id,
            priority,
            tag,
            callback,
            disposed: AtomicBool::new(false),
            stream_tx: Mutex::new(None),
        }
    }

    fn key(&self) -> (i32, u64) {
        (self.priority, self.id)
    }

    pub(crate) fn on_action(&self, action: &ActionRef) {
        if self.disposed.load(Ordering::SeqCst) {
            error!(
                id = self.id,
                action = action.name(),
                "Subscription is disposed but got an action"
            );
            return;
        }

        (self.callback)(action.as_ref());

        if let Some(tx) = self.stream_tx.lock().as_ref() {
            // No receivers is fine
            let _ = tx.send(action.clone());
        }
    }
}

/// Per-tag ordered subscriber sets
#[derive(Default)]
pub(crate) struct Registry {
    by_tag: HashMap<Tag, BTreeMap<(i32, u64), Arc<SubscriptionEntry>>>,
}

impl Registry {
    pub(crate) fn insert(&mut self, entry: Arc<SubscriptionEntry>) {
        self.by_tag
            .entry(entry.tag)
            .or_default()
            .insert(entry.key(), entry);
    }

    pub(crate) fn remove(&mut self, entry: &SubscriptionEntry) -> bool {
        let Some(set) = self.by_tag.get_mut(&entry.tag) else {
            return false;
        };
        // Ids restart after `clear`, so check identity as well as the key
        let removed = match set.get(&entry.key()) {
            Some(found) if std::ptr::eq(Arc::as_ptr(found), entry) => {
                set.remove(&entry.key());
                true
            }
            _ => false,
        };
        if set.is_empty() {
            self.by_tag.remove(&entry.tag);
        }
        removed
    }

    /// Subscribers for every tag, tag declaration order first
    pub(crate) fn matching(&self, tags: &Tags) -> Vec<Arc<SubscriptionEntry>> {
        tags.iter()
            .filter_map(|tag| self.by_tag.get(&tag))
            .flat_map(|set| set.values().cloned())
            .collect()
    }

    pub(crate) fn count(&self, tag: Tag) -> usize {
        self.by_tag.get(&tag).map(BTreeMap::len).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn total(&self) -> usize {
        self.by_tag.values().map(BTreeMap::len).sum()
    }

    #[cfg(test)]
    pub(crate) fn clear(&mut self) {
        self.by_tag.clear();
    }
}

/// Handle to a dispatcher subscription
///
/// Dropping the handle does **not** unsubscribe; call [`dispose`](Self::dispose)
/// or hand the handle to a [`SubscriptionTracker`].
pub struct DispatcherSubscription {
    shared: Weak<Mutex<Shared>>,
    entry: Arc<SubscriptionEntry>,
}

impl std::fmt::Debug for DispatcherSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherSubscription")
            .field("id", &self.entry.id)
            .field("priority", &self.entry.priority)
            .field("tag", &self.entry.tag)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl DispatcherSubscription {
    pub(crate) fn new(shared: Weak<Mutex<Shared>>, entry: Arc<SubscriptionEntry>) -> Self {
        Self { shared, entry }
    }

    pub fn id(&self) -> u64 {
        self.entry.id
    }

    pub fn priority(&self) -> i32 {
        self.entry.priority
    }

    pub fn tag(&self) -> Tag {
        self.entry.tag
    }

    pub fn is_disposed(&self) -> bool {
        self.entry.disposed.load(Ordering::SeqCst)
    }

    /// Remove the subscription from the dispatcher
    ///
    /// Returns `true` if it was removed. Disposing twice is reported with a
    /// warning and otherwise ignored.
    pub fn dispose(&self) -> bool {
        if self.entry.disposed.swap(true, Ordering::SeqCst) {
            warn!(
                id = self.entry.id,
                "Subscription already disposed, multiple dispose calls?"
            );
            return false;
        }

        // Completes any open action streams
        self.entry.stream_tx.lock().take();

        let removed = self
            .shared
            .upgrade()
            .map(|shared| shared.lock().registry.remove(&self.entry))
            .unwrap_or(false);
        if !removed {
            warn!(
                id = self.entry.id,
                "Failed to remove dispatcher subscription, multiple dispose calls?"
            );
        }
        removed
    }

    /// Actions delivered to this subscription, as a stream
    ///
    /// Every call returns an independent receiver that sees actions
    /// delivered after the call. The stream ends when the subscription is
    /// disposed. A reader that falls behind skips the actions it missed.
    pub fn actions(&self) -> impl Stream<Item = ActionRef> + Send + 'static {
        let rx = {
            let mut guard = self.entry.stream_tx.lock();
            if guard.is_none() && !self.is_disposed() {
                *guard = Some(broadcast::channel(STREAM_CAPACITY).0);
            }
            match guard.as_ref() {
                Some(tx) => tx.subscribe(),
                // Sender dropped right away, the stream ends immediately
                None => broadcast::channel(1).1,
            }
        };
        let id = self.entry.id;
        BroadcastStream::new(rx).filter_map(move |item| match item {
            Ok(action) => Some(action),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(id, skipped, "action stream lagged");
                None
            }
        })
    }
}

/// Tracks dispatcher subscriptions so they can be disposed together
#[derive(Default)]
pub struct SubscriptionTracker {
    subscriptions: Mutex<Vec<DispatcherSubscription>>,
}

impl std::fmt::Debug for SubscriptionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionTracker")
            .field("tracked", &self.len())
            .finish()
    }
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a subscription
    pub fn track(&self, subscription: DispatcherSubscription) {
        self.subscriptions.lock().push(subscription);
    }

    /// Dispose and forget every tracked subscription
    pub fn cancel_subscriptions(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in subscriptions {
            if !subscription.is_disposed() {
                subscription.dispose();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
