//! Test utilities for dispatcher and store code
//!
//! - [`TestDispatcherInterceptor`] mutes every action and records it
//! - [`TestInterceptorGuard`] installs that interceptor for one scope
//! - [`reset_stores`] puts stores back to their initial state
//! - `assert_dispatched!`, `assert_not_dispatched!`, `count_dispatched!`
//!   inspect recorded actions
//!
//! # Example
//!
//! ```ignore
//! use mini_flux::testing::*;
//! use mini_flux::{assert_dispatched, assert_not_dispatched};
//!
//! let (dispatcher, _ui_loop) = test_dispatcher();
//! let muted = TestInterceptorGuard::install(&dispatcher);
//!
//! dispatcher.dispatch(LoadPersonsAction { count: 2 });
//!
//! let actions = muted.actions();
//! assert_dispatched!(actions, LoadPersonsAction, LoadPersonsAction { count: 2 });
//! assert_not_dispatched!(actions, DeletePersonAction);
//! ```

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::action::{Action, ActionRef, Tags};
use crate::dispatcher::Dispatcher;
use crate::interceptor::{Chain, Interceptor};
use crate::store::AnyStore;
use crate::ui::{UiContext, UiLoop};

/// Placeholder returned for every action muted by [`TestDispatcherInterceptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestOnlyAction;

impl Action for TestOnlyAction {
    fn name(&self) -> &'static str {
        "TestOnlyAction"
    }

    fn tags(&self) -> Tags {
        Tags::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Interceptor that records every action and stops it from reaching stores
#[derive(Debug, Default)]
pub struct TestDispatcherInterceptor {
    actions: Mutex<Vec<ActionRef>>,
}

impl TestDispatcherInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions muted so far, in dispatch order
    pub fn actions(&self) -> Vec<ActionRef> {
        self.actions.lock().clone()
    }

    pub fn clear(&self) {
        self.actions.lock().clear();
    }
}

impl Interceptor for TestDispatcherInterceptor {
    fn intercept(&self, action: ActionRef, _chain: &dyn Chain) -> ActionRef {
        self.actions.lock().push(action);
        Arc::new(TestOnlyAction)
    }
}

/// Mutes a dispatcher while alive
///
/// Installs a [`TestDispatcherInterceptor`] and removes it on drop.
#[must_use = "the interceptor is removed when the guard is dropped"]
pub struct TestInterceptorGuard {
    dispatcher: Dispatcher,
    interceptor: Arc<TestDispatcherInterceptor>,
}

impl TestInterceptorGuard {
    pub fn install(dispatcher: &Dispatcher) -> Self {
        let interceptor = Arc::new(TestDispatcherInterceptor::new());
        dispatcher.add_interceptor(interceptor.clone());
        Self {
            dispatcher: dispatcher.clone(),
            interceptor,
        }
    }

    pub fn interceptor(&self) -> &TestDispatcherInterceptor {
        &self.interceptor
    }

    /// Actions muted so far, in dispatch order
    pub fn actions(&self) -> Vec<ActionRef> {
        self.interceptor.actions()
    }
}

impl Drop for TestInterceptorGuard {
    fn drop(&mut self) {
        self.dispatcher.remove_interceptor(&self.interceptor);
    }
}

/// Dispatcher whose UI thread is the calling thread
///
/// Posted work runs when the returned [`UiLoop`] is pumped.
pub fn test_dispatcher() -> (Dispatcher, UiLoop) {
    let (ui, ui_loop) = UiContext::current();
    (Dispatcher::new(ui), ui_loop)
}

/// Reset every store to a fresh initial state
pub fn reset_stores(stores: &[Arc<dyn AnyStore>]) {
    for store in stores {
        store.reset_state();
    }
}

/// Assert that an action of a type, optionally matching a pattern, was recorded
///
/// # Example
///
/// ```ignore
/// assert_dispatched!(actions, LoadPersonsAction);
/// assert_dispatched!(actions, LoadPersonsAction, LoadPersonsAction { count: 2 });
/// assert_dispatched!(actions, LoadPersonsAction, LoadPersonsAction { count } if *count > 1);
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($actions:expr, $ty:ty) => {
        assert!(
            $actions.iter().any(|a| a.is::<$ty>()),
            "Expected action `{}` to be dispatched, but got: {:?}",
            stringify!($ty),
            $actions
        );
    };
    ($actions:expr, $ty:ty, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| a
                .downcast_ref::<$ty>()
                .is_some_and(|a| matches!(a, $pattern $(if $guard)?))),
            "Expected action matching `{}` to be dispatched, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no action of a type, optionally matching a pattern, was recorded
#[macro_export]
macro_rules! assert_not_dispatched {
    ($actions:expr, $ty:ty) => {
        assert!(
            !$actions.iter().any(|a| a.is::<$ty>()),
            "Expected action `{}` NOT to be dispatched, but it was: {:?}",
            stringify!($ty),
            $actions
        );
    };
    ($actions:expr, $ty:ty, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| a
                .downcast_ref::<$ty>()
                .is_some_and(|a| matches!(a, $pattern $(if $guard)?))),
            "Expected action matching `{}` NOT to be dispatched, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Count recorded actions of a type, optionally matching a pattern
#[macro_export]
macro_rules! count_dispatched {
    ($actions:expr, $ty:ty) => {
        $actions.iter().filter(|a| a.is::<$ty>()).count()
    };
    ($actions:expr, $ty:ty, $pattern:pat $(if $guard:expr)?) => {
        $actions
            .iter()
            .filter(|a| a
                .downcast_ref::<$ty>()
                .is_some_and(|a| matches!(a, $pattern $(if $guard)?)))
            .count()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{DebugSection, DebugState};
    use crate::store::{Store, StoreState};

    #[derive(Debug, PartialEq)]
    enum Door {
        Open { floor: u8 },
        Close,
    }

    impl Action for Door {
        fn name(&self) -> &'static str {
            match self {
                Door::Open { .. } => "Open",
                Door::Close => "Close",
            }
        }

        fn tags(&self) -> Tags {
            Tags::of::<Self>()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_interceptor_mutes_and_records() {
        let (dispatcher, _ui_loop) = test_dispatcher();
        let reached = Arc::new(Mutex::new(0));
        let counter = reached.clone();
        dispatcher.subscribe(move |_: &Door| *counter.lock() += 1);

        let guard = TestInterceptorGuard::install(&dispatcher);
        let out = dispatcher.dispatch(Door::Open { floor: 3 });

        assert!(out.is::<TestOnlyAction>());
        assert_eq!(*reached.lock(), 0);
        let actions = guard.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].downcast_ref::<Door>(), Some(&Door::Open { floor: 3 }));

        drop(guard);
        dispatcher.dispatch(Door::Close);
        assert_eq!(*reached.lock(), 1);
        assert_eq!(dispatcher.interceptor_count(), 0);
    }

    #[test]
    fn test_assertion_macros() {
        let (dispatcher, _ui_loop) = test_dispatcher();
        let guard = TestInterceptorGuard::install(&dispatcher);

        dispatcher.dispatch(Door::Open { floor: 1 });
        dispatcher.dispatch(Door::Open { floor: 4 });
        let actions = guard.actions();

        assert_dispatched!(actions, Door);
        assert_dispatched!(actions, Door, Door::Open { floor: 4 });
        assert_dispatched!(actions, Door, Door::Open { floor } if *floor > 3);
        assert_not_dispatched!(actions, Door, Door::Close);
        assert_not_dispatched!(actions, TestOnlyAction);
        assert_eq!(count_dispatched!(actions, Door), 2);
        assert_eq!(count_dispatched!(actions, Door, Door::Open { floor: 1 }), 1);

        guard.interceptor().clear();
        assert!(guard.actions().is_empty());
    }

    #[test]
    #[should_panic(expected = "Expected action matching `Door::Close` to be dispatched")]
    fn test_assert_dispatched_failure_message() {
        let actions: Vec<ActionRef> = vec![Arc::new(Door::Open { floor: 0 })];
        assert_dispatched!(actions, Door, Door::Close);
    }

    #[derive(Debug, Default)]
    struct Flag(bool);

    impl DebugState for Flag {
        fn debug_sections(&self) -> Vec<DebugSection> {
            vec![DebugSection::new("Flag").entry("on", self.0.to_string())]
        }
    }

    struct FlagStore {
        state: StoreState<Flag>,
    }

    impl Store for FlagStore {
        type State = Flag;

        fn state_holder(&self) -> &StoreState<Flag> {
            &self.state
        }

        fn init(self: &Arc<Self>) {}
    }

    #[test]
    fn test_reset_stores() {
        let (dispatcher, _ui_loop) = test_dispatcher();
        let store = Arc::new(FlagStore {
            state: StoreState::with_default(&dispatcher),
        });
        store.state.set_test_state(Flag(true));
        assert!(store.state().0);

        reset_stores(&[store.clone() as Arc<dyn AnyStore>]);
        assert!(!store.state().0);
    }
}
