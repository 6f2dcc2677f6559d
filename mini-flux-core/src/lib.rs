//! Core traits and types for mini-flux
//!
//! This crate provides a Flux-style unidirectional data flow runtime:
//! actions go through a [`Dispatcher`], pass an interceptor [`Chain`], and
//! reach the [`Store`]s subscribed to them. Every state transition runs on
//! one designated UI thread ([`UiContext`]).
//!
//! # Core Concepts
//!
//! - **Action**: immutable value describing something that happened
//! - **Dispatcher**: synchronous router with priority-ordered subscriptions
//! - **Interceptor**: middleware that observes, replaces or mutes actions
//! - **Store**: owner of one immutable state snapshot, replaced by reducers
//! - **Task**: status envelope for asynchronous work kept in state
//!
//! # Basic Example
//!
//! ```ignore
//! use mini_flux_core::prelude::*;
//!
//! let (ui, _ui_loop) = UiContext::current();
//! let dispatcher = Dispatcher::new(ui);
//!
//! let store = Arc::new(CounterStore::new(&dispatcher));
//! init_stores(&[store.clone() as Arc<dyn AnyStore>]);
//!
//! dispatcher.dispatch(Increment { by: 1 });
//! assert_eq!(store.state().value, 1);
//! ```
//!
//! # Background Work
//!
//! Work running off the UI thread hands its outcome back as an action:
//!
//! ```ignore
//! let dispatcher = dispatcher.clone();
//! tokio::spawn(async move {
//!     let task = match fetch().await {
//!         Ok(_) => task_success(()),
//!         Err(e) => task_failure((), Some(e.into())),
//!     };
//!     dispatcher.dispatch_on_ui(FetchedAction { task });
//! });
//! ```

pub mod action;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod store;
pub mod subscription;
pub mod task;
pub mod testing;
pub mod ui;

// Core trait exports
pub use action::{Action, ActionRef, IntoAction, Silent, Tag, Tags};
pub use interceptor::{Chain, Interceptor};

// Dispatch exports
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, UiError};
pub use subscription::{DispatcherSubscription, SubscriptionTracker, DEFAULT_PRIORITY};
pub use ui::{UiContext, UiLoop};

// Store exports
pub use store::{
    init_stores, AnyStore, Store, StoreInitTiming, StorePhase, StoreProperties, StoreSnapshot,
    StoreState, DEFAULT_INIT_ORDER,
};

// Task exports
pub use task::{
    task_failure, task_idle, task_running, task_success, Task, TaskError, TaskStatus, TypedTask,
};

// Debug exports
pub use debug::{DebugEntry, DebugSection, DebugState, DebugWrapper};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionRef, IntoAction, Silent, Tag, Tags};
    pub use crate::debug::{DebugSection, DebugState, LoggerConfig, LoggerInterceptor};
    pub use crate::dispatcher::Dispatcher;
    pub use crate::interceptor::{Chain, Interceptor};
    pub use crate::store::{init_stores, AnyStore, Store, StoreProperties, StoreState};
    pub use crate::subscription::{DispatcherSubscription, DEFAULT_PRIORITY};
    pub use crate::task::{
        task_failure, task_idle, task_running, task_success, Task, TaskError, TaskStatus,
        TypedTask,
    };
    pub use crate::ui::UiContext;
    pub use std::sync::Arc;
}
