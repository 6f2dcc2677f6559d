//! Typed state containers driven by dispatched actions
//!
//! A store owns one [`StoreState`] holding an immutable `Arc<S>` snapshot.
//! It registers its action subscriptions in [`Store::init`] and replaces the
//! snapshot from its reducers with [`StoreState::set_state`]. Observers read
//! the current snapshot with [`Store::state`] or follow changes with
//! [`Store::observe_state`].
//!
//! # Example
//!
//! ```ignore
//! use mini_flux::prelude::*;
//!
//! #[derive(Debug, Default, DebugState)]
//! struct CounterState {
//!     value: i64,
//! }
//!
//! struct CounterStore {
//!     state: StoreState<CounterState>,
//! }
//!
//! impl Store for CounterStore {
//!     type State = CounterState;
//!
//!     fn state_holder(&self) -> &StoreState<CounterState> {
//!         &self.state
//!     }
//!
//!     fn init(self: &Arc<Self>) {
//!         self.subscribe(|store: &Self, action: &Increment| {
//!             let value = store.state().value + action.by;
//!             store.state.set_state(CounterState { value });
//!         });
//!     }
//! }
//! ```

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use crate::action::Action;
use crate::debug::{DebugSection, DebugState};
use crate::dispatcher::Dispatcher;
use crate::subscription::{DispatcherSubscription, SubscriptionTracker, DEFAULT_PRIORITY};

/// Init order used when a store does not override [`Store::properties`]
pub const DEFAULT_INIT_ORDER: i32 = 100;

/// Buffered snapshots per observer before a slow observer lags
const STATE_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorePhase {
    #[default]
    Uninitialized,
    Initialized,
    Disposed,
}

/// Static configuration of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreProperties {
    /// Stores with lower values are initialized first
    pub init_order: i32,
}

impl Default for StoreProperties {
    fn default() -> Self {
        Self {
            init_order: DEFAULT_INIT_ORDER,
        }
    }
}

impl StoreProperties {
    pub fn with_init_order(init_order: i32) -> Self {
        Self { init_order }
    }
}

struct StateInner<S> {
    factory: Box<dyn Fn() -> S + Send + Sync>,
    current: RwLock<Option<Arc<S>>>,
    tx: broadcast::Sender<Arc<S>>,
}

impl<S: Send + Sync + 'static> StateInner<S> {
    fn get(&self) -> Arc<S> {
        if let Some(state) = self.current.read().as_ref() {
            return state.clone();
        }
        self.current
            .write()
            .get_or_insert_with(|| Arc::new((self.factory)()))
            .clone()
    }

    /// Swap the snapshot, notifying observers unless it is the same `Arc`
    fn replace(&self, new: Arc<S>) -> bool {
        {
            let mut current = self.current.write();
            if current.as_ref().is_some_and(|old| Arc::ptr_eq(old, &new)) {
                return false;
            }
            *current = Some(new.clone());
        }
        // No observers is fine
        let _ = self.tx.send(new);
        true
    }
}

/// State holder shared by every store
///
/// Owns the current snapshot, the change broadcast, and the subscriptions
/// the store registered on the dispatcher.
pub struct StoreState<S> {
    inner: Arc<StateInner<S>>,
    dispatcher: Dispatcher,
    tracker: SubscriptionTracker,
    phase: Mutex<StorePhase>,
}

impl<S> std::fmt::Debug for StoreState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("state", &std::any::type_name::<S>())
            .field("phase", &*self.phase.lock())
            .field("subscriptions", &self.tracker.len())
            .finish()
    }
}

impl<S: Default + Send + Sync + 'static> StoreState<S> {
    /// State holder whose initial state is `S::default()`
    pub fn with_default(dispatcher: &Dispatcher) -> Self {
        Self::new(dispatcher, S::default)
    }
}

impl<S: Send + Sync + 'static> StoreState<S> {
    /// Create a state holder with an explicit initial-state factory
    ///
    /// The factory runs lazily on first read and again on every
    /// [`reset_state`](Self::reset_state).
    pub fn new<F>(dispatcher: &Dispatcher, factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        let (tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StateInner {
                factory: Box::new(factory),
                current: RwLock::new(None),
                tx,
            }),
            dispatcher: dispatcher.clone(),
            tracker: SubscriptionTracker::new(),
            phase: Mutex::new(StorePhase::Uninitialized),
        }
    }

    /// Dispatcher the store subscribes to
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Current snapshot, created from the factory on first read
    pub fn state(&self) -> Arc<S> {
        self.inner.get()
    }

    /// Replace the state
    ///
    /// Observers are notified unless `state` is the very same `Arc` as the
    /// current snapshot. Structurally equal values in a new `Arc` notify.
    /// Returns whether observers were notified.
    ///
    /// # Panics
    ///
    /// Panics when called off the UI thread.
    #[track_caller]
    pub fn set_state(&self, state: impl Into<Arc<S>>) -> bool {
        self.dispatcher.ui().assert_on_ui_thread();
        let changed = self.inner.replace(state.into());
        trace!(state = std::any::type_name::<S>(), changed, "set_state");
        changed
    }

    /// Replace the state with a value derived from the current one
    #[track_caller]
    pub fn update(&self, f: impl FnOnce(&S) -> S) -> bool {
        let next = f(&self.state());
        self.set_state(next)
    }

    /// Stream of states: the current one first, then every change
    ///
    /// Each call returns an independent observer. The stream only ends when
    /// the state holder is dropped. An observer that falls behind skips to
    /// the newer snapshots.
    pub fn observe_state(&self) -> impl Stream<Item = Arc<S>> + Send + 'static {
        let rx = self.inner.tx.subscribe();
        observe_from(self.state(), rx)
    }

    /// Track a dispatcher subscription so [`close`](Self::close) disposes it
    pub fn track(&self, subscription: DispatcherSubscription) {
        self.tracker.track(subscription);
    }

    /// Number of tracked subscriptions
    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }

    pub fn phase(&self) -> StorePhase {
        *self.phase.lock()
    }

    /// Move to `Initialized`; false if the store already left `Uninitialized`
    fn begin_init(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase != StorePhase::Uninitialized {
            return false;
        }
        *phase = StorePhase::Initialized;
        true
    }

    /// Dispose every tracked subscription. The dispatcher is unaffected.
    pub fn close(&self) {
        self.tracker.cancel_subscriptions();
        *self.phase.lock() = StorePhase::Disposed;
    }

    /// Force a state from any thread, bypassing reducers
    ///
    /// Runs on the UI thread and blocks until applied, with the same
    /// blocking rules as [`UiContext::run_sync`](crate::UiContext::run_sync).
    /// Intended for tests.
    pub fn set_test_state(&self, state: impl Into<Arc<S>>) {
        let inner = self.inner.clone();
        let state = state.into();
        self.dispatcher.ui().run_sync(move || {
            inner.replace(state);
        });
    }

    /// Replace the state with a fresh one from the factory
    ///
    /// Blocks like [`set_test_state`](Self::set_test_state). Intended for tests.
    pub fn reset_state(&self) {
        let inner = self.inner.clone();
        self.dispatcher.ui().run_sync(move || {
            let fresh = Arc::new((inner.factory)());
            inner.replace(fresh);
        });
    }
}

impl<S> Drop for StoreState<S> {
    fn drop(&mut self) {
        // Stores dropped without `close` must not leave dead callbacks behind
        self.tracker.cancel_subscriptions();
    }
}

/// `current` followed by the states broadcast on `rx`
///
/// `rx` is subscribed before `current` is read, so a change landing in
/// between is both the initial item and the first broadcast; the repeat is
/// dropped.
fn observe_from<S: Send + Sync + 'static>(
    current: Arc<S>,
    rx: broadcast::Receiver<Arc<S>>,
) -> impl Stream<Item = Arc<S>> + Send + 'static {
    let mut initial = Some(current.clone());
    let changes = BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(state) => match initial.take() {
            Some(first) if Arc::ptr_eq(&first, &state) => None,
            _ => Some(state),
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(
                state = std::any::type_name::<S>(),
                skipped, "state observer lagged"
            );
            None
        }
    });
    tokio_stream::once(current).chain(changes)
}

/// Contract implemented by every store
pub trait Store: Send + Sync + 'static {
    type State: Send + Sync + 'static;

    /// The holder of this store's state
    fn state_holder(&self) -> &StoreState<Self::State>;

    /// Register action subscriptions. Runs once, before first external use.
    fn init(self: &Arc<Self>);

    fn properties(&self) -> StoreProperties {
        StoreProperties::default()
    }

    /// Name used in logs, the type name without its module path
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn state(&self) -> Arc<Self::State> {
        self.state_holder().state()
    }

    fn observe_state(&self) -> impl Stream<Item = Arc<Self::State>> + Send + 'static {
        self.state_holder().observe_state()
    }

    fn close(&self) {
        self.state_holder().close();
    }

    /// Subscribe a reducer for actions of type `A`, tracked by this store
    ///
    /// The callback receives the store itself. The subscription holds the
    /// store weakly, so a dropped store simply stops reducing.
    fn subscribe<A, F>(self: &Arc<Self>, callback: F)
    where
        Self: Sized,
        A: Action,
        F: Fn(&Self, &A) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(DEFAULT_PRIORITY, callback);
    }

    /// Same as [`subscribe`](Store::subscribe) with an explicit priority
    fn subscribe_with_priority<A, F>(self: &Arc<Self>, priority: i32, callback: F)
    where
        Self: Sized,
        A: Action,
        F: Fn(&Self, &A) + Send + Sync + 'static,
    {
        let store: Weak<Self> = Arc::downgrade(self);
        let holder = self.state_holder();
        let subscription = holder
            .dispatcher()
            .subscribe_with_priority(priority, move |action: &A| {
                if let Some(store) = store.upgrade() {
                    callback(&store, action);
                }
            });
        holder.track(subscription);
    }
}

fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

/// Snapshot of a store's state, comparable by identity
#[derive(Clone)]
pub struct StoreSnapshot {
    state: Arc<dyn DebugState + Send + Sync>,
}

impl std::fmt::Debug for StoreSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSnapshot")
            .field("sections", &self.sections().len())
            .finish()
    }
}

impl StoreSnapshot {
    pub fn new<S: DebugState + Send + Sync + 'static>(state: Arc<S>) -> Self {
        Self { state }
    }

    /// True if both snapshots are the same state instance
    pub fn same_as(&self, other: &StoreSnapshot) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.state) as *const (),
            Arc::as_ptr(&other.state) as *const (),
        )
    }

    pub fn sections(&self) -> Vec<DebugSection> {
        self.state.debug_sections()
    }

    /// See [`DebugState::debug_text`]
    pub fn text(&self) -> String {
        self.state.debug_text()
    }
}

/// Object-safe view of a store, used by bootstrap, logging and tests
pub trait AnyStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn init_order(&self) -> i32;

    /// Run [`Store::init`] unless the store was already initialized
    ///
    /// Returns whether init ran.
    fn init_store(self: Arc<Self>) -> bool;

    fn phase(&self) -> StorePhase;

    /// Current state, created on first read
    fn snapshot(&self) -> StoreSnapshot;

    /// See [`StoreState::reset_state`]
    fn reset_state(&self);

    fn close(&self);
}

impl<T> AnyStore for T
where
    T: Store,
    T::State: DebugState,
{
    fn name(&self) -> &'static str {
        Store::name(self)
    }

    fn init_order(&self) -> i32 {
        self.properties().init_order
    }

    fn init_store(self: Arc<Self>) -> bool {
        if !self.state_holder().begin_init() {
            warn!(store = Store::name(&*self), "store initialized twice, skipping");
            return false;
        }
        Store::init(&self);
        true
    }

    fn phase(&self) -> StorePhase {
        self.state_holder().phase()
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::new(self.state_holder().state())
    }

    fn reset_state(&self) {
        self.state_holder().reset_state();
    }

    fn close(&self) {
        Store::close(self);
    }
}

/// Timing of one store's bootstrap
#[derive(Debug, Clone)]
pub struct StoreInitTiming {
    pub store: &'static str,
    pub init_order: i32,
    pub init: Duration,
    pub first_state: Duration,
}

/// Initialize stores in ascending `init_order`, then read each state once
///
/// Stores with the same order keep their relative position. Returns the
/// per-store timings, which are also logged at debug level.
pub fn init_stores(stores: &[Arc<dyn AnyStore>]) -> Vec<StoreInitTiming> {
    let started = Instant::now();
    let mut ordered: Vec<Arc<dyn AnyStore>> = stores.to_vec();
    ordered.sort_by_key(|store| store.init_order());

    let timings: Vec<StoreInitTiming> = ordered
        .into_iter()
        .map(|store| {
            let begin = Instant::now();
            store.clone().init_store();
            let init = begin.elapsed();

            let begin = Instant::now();
            store.snapshot();
            let first_state = begin.elapsed();

            StoreInitTiming {
                store: store.name(),
                init_order: store.init_order(),
                init,
                first_state,
            }
        })
        .collect();

    for timing in &timings {
        debug!(
            store = timing.store,
            order = timing.init_order,
            init_us = timing.init.as_micros() as u64,
            state_us = timing.first_state.as_micros() as u64,
            "store initialized"
        );
    }
    debug!(
        stores = timings.len(),
        total_ms = started.elapsed().as_millis() as u64,
        "stores initialized"
    );
    timings
}
