//! Central synchronous action router
//!
//! The [`Dispatcher`] owns the subscription registry and the interceptor
//! list. Every dispatch runs on the UI thread, passes through the
//! interceptor chain and fans the resulting action out to the subscribers
//! of each tag the action declares.
//!
//! # Example
//!
//! ```ignore
//! use mini_flux_core::{Dispatcher, UiContext};
//!
//! let (ui, _ui_loop) = UiContext::current();
//! let dispatcher = Dispatcher::new(ui);
//!
//! let sub = dispatcher.subscribe(|action: &Increment| {
//!     tracing::info!(by = action.by, "increment");
//! });
//!
//! dispatcher.dispatch(Increment { by: 2 });
//! sub.dispose();
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::action::{Action, ActionRef, IntoAction, Tag};
use crate::error::DispatchError;
use crate::interceptor::{build_chain, same_interceptor, Chain, Interceptor};
use crate::subscription::{DispatcherSubscription, Registry, SubscriptionEntry, DEFAULT_PRIORITY};
use crate::ui::UiContext;

/// State guarded by the dispatcher's single lock
pub(crate) struct Shared {
    pub(crate) registry: Registry,
    interceptors: Vec<Arc<dyn Interceptor>>,
    root: Arc<dyn Chain>,
    chain: Arc<dyn Chain>,
}

impl Shared {
    fn rebuild_chain(&mut self) {
        self.chain = build_chain(self.root.clone(), &self.interceptors);
    }
}

/// Terminal link: delivers the action to every matching subscriber
struct RootChain {
    shared: Weak<Mutex<Shared>>,
}

impl Chain for RootChain {
    fn proceed(&self, action: ActionRef) -> ActionRef {
        let Some(shared) = self.shared.upgrade() else {
            return action;
        };
        // Snapshot under the lock, deliver without it so callbacks can
        // subscribe or dispose freely
        let subscribers = shared.lock().registry.matching(&action.tags());
        trace!(
            action = action.name(),
            subscribers = subscribers.len(),
            "delivering"
        );
        for subscriber in subscribers {
            subscriber.on_action(&action);
        }
        action
    }
}

struct DispatcherInner {
    ui: UiContext,
    shared: Arc<Mutex<Shared>>,
    dispatching: AtomicBool,
    action_counter: AtomicU64,
    subscription_counter: AtomicU64,
}

/// Dispatches actions and manages subscriptions to them
///
/// Cloning is cheap; all clones share the same registry. Construct one per
/// application in the composition root and pass it to the stores.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("ui", &self.inner.ui)
            .field("dispatching", &self.dispatching())
            .field("action_count", &self.action_count())
            .finish()
    }
}

/// Clears the in-progress flag when a dispatch exits, including on unwind
struct DispatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Result<Self, DispatchError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| DispatchError::Reentrant)?;
        Ok(Self { flag })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Dispatcher {
    /// Create a dispatcher bound to a UI context
    pub fn new(ui: UiContext) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Mutex<Shared>>| {
            let root: Arc<dyn Chain> = Arc::new(RootChain {
                shared: weak.clone(),
            });
            Mutex::new(Shared {
                registry: Registry::default(),
                interceptors: Vec::new(),
                chain: root.clone(),
                root,
            })
        });

        Self {
            inner: Arc::new(DispatcherInner {
                ui,
                shared,
                dispatching: AtomicBool::new(false),
                action_counter: AtomicU64::new(0),
                subscription_counter: AtomicU64::new(0),
            }),
        }
    }

    /// The UI context dispatches must run on
    pub fn ui(&self) -> &UiContext {
        &self.inner.ui
    }

    /// True only while a dispatch is running
    pub fn dispatching(&self) -> bool {
        self.inner.dispatching.load(Ordering::SeqCst)
    }

    /// Number of dispatches started so far
    pub fn action_count(&self) -> u64 {
        self.inner.action_counter.load(Ordering::SeqCst)
    }

    /// Dispatch an action to every subscriber
    ///
    /// Returns the action produced by the interceptor chain, which may be a
    /// substitute when an interceptor replaced or muted the original.
    ///
    /// # Panics
    ///
    /// Panics when called off the UI thread or while another dispatch is
    /// reducing state. Both are programmer errors.
    #[track_caller]
    pub fn dispatch(&self, action: impl IntoAction) -> ActionRef {
        match self.try_dispatch(action) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`dispatch`](Self::dispatch) but reports misuse as an error
    pub fn try_dispatch(&self, action: impl IntoAction) -> Result<ActionRef, DispatchError> {
        if !self.inner.ui.is_on_ui_thread() {
            return Err(DispatchError::NotOnUiThread);
        }
        let _guard = DispatchGuard::enter(&self.inner.dispatching)?;
        self.inner.action_counter.fetch_add(1, Ordering::SeqCst);

        let action = action.into_action();
        trace!(action = action.name(), "dispatch");
        let chain = self.inner.shared.lock().chain.clone();
        Ok(chain.proceed(action))
    }

    /// Post a dispatch to the UI thread and return immediately
    pub fn dispatch_on_ui(&self, action: impl IntoAction) {
        let action = action.into_action();
        let dispatcher = self.clone();
        self.inner.ui.post(move || {
            dispatcher.dispatch(action);
        });
    }

    /// Post a dispatch to the UI thread and block until it completes
    ///
    /// Callable from plain threads and from multi-thread tokio workers.
    ///
    /// # Panics
    ///
    /// Panics when called from the UI thread, where it would deadlock, or
    /// from inside a current-thread tokio runtime. A panic raised while
    /// dispatching is re-raised here.
    #[track_caller]
    pub fn dispatch_on_ui_sync(&self, action: impl IntoAction) -> ActionRef {
        self.inner.ui.assert_not_on_ui_thread();
        let action = action.into_action();
        let dispatcher = self.clone();
        self.inner.ui.run_sync(move || dispatcher.dispatch(action))
    }

    /// Subscribe to actions of type `A` with [`DEFAULT_PRIORITY`]
    pub fn subscribe<A, F>(&self, callback: F) -> DispatcherSubscription
    where
        A: Action,
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(DEFAULT_PRIORITY, callback)
    }

    /// Subscribe to actions of type `A`; lower priorities run first
    pub fn subscribe_with_priority<A, F>(&self, priority: i32, callback: F) -> DispatcherSubscription
    where
        A: Action,
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe_tag(Tag::of::<A>(), priority, move |action: &dyn Action| {
            if let Some(action) = action.downcast_ref::<A>() {
                callback(action);
            }
        })
    }

    /// Subscribe to every action declaring `tag`
    ///
    /// Used for capability markers shared by several action types.
    pub fn subscribe_tag<F>(&self, tag: Tag, priority: i32, callback: F) -> DispatcherSubscription
    where
        F: Fn(&dyn Action) + Send + Sync + 'static,
    {
        let id = self
            .inner
            .subscription_counter
            .fetch_add(1, Ordering::SeqCst);
        let entry = Arc::new(SubscriptionEntry::new(id, priority, tag, Box::new(callback)));
        self.inner.shared.lock().registry.insert(entry.clone());
        debug!(id, priority, tag = tag.short_name(), "subscribed");
        DispatcherSubscription::new(Arc::downgrade(&self.inner.shared), entry)
    }

    /// Number of live subscriptions for a tag
    pub fn subscription_count(&self, tag: Tag) -> usize {
        self.inner.shared.lock().registry.count(tag)
    }

    /// Append an interceptor to the chain
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        let mut shared = self.inner.shared.lock();
        shared.interceptors.push(interceptor);
        shared.rebuild_chain();
        debug!(interceptors = shared.interceptors.len(), "interceptor added");
    }

    /// Remove an interceptor previously added, compared by identity
    ///
    /// Returns `true` if it was part of the chain.
    pub fn remove_interceptor<I: ?Sized>(&self, interceptor: &Arc<I>) -> bool {
        let mut shared = self.inner.shared.lock();
        let before = shared.interceptors.len();
        shared
            .interceptors
            .retain(|existing| !same_interceptor(existing, interceptor));
        let removed = shared.interceptors.len() != before;
        if removed {
            shared.rebuild_chain();
            debug!(interceptors = shared.interceptors.len(), "interceptor removed");
        }
        removed
    }

    /// Number of registered interceptors
    pub fn interceptor_count(&self) -> usize {
        self.inner.shared.lock().interceptors.len()
    }

    /// Drop every subscription and restart ids. Intended for tests.
    pub fn clear_subscriptions(&self) {
        // Callbacks may own stores, whose drop takes this lock again
        let cleared = std::mem::take(&mut self.inner.shared.lock().registry);
        self.inner.subscription_counter.store(0, Ordering::SeqCst);
        drop(cleared);
    }
}
