//! mini-flux: Flux-style unidirectional data flow for Rust applications
//!
//! Actions are dispatched on a single UI thread, run through an interceptor
//! chain, and reach the stores subscribed to them in priority order. Stores
//! own immutable state snapshots that observers read or stream.
//!
//! # Example
//! ```ignore
//! use mini_flux::prelude::*;
//!
//! #[derive(Action, Debug)]
//! struct Increment {
//!     by: i64,
//! }
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
//!             store.state.update(|s| CounterState { value: s.value + action.by });
//!         });
//!     }
//! }
//! ```

// Re-export everything from core
pub use mini_flux_core::*;

// Re-export derive macros
pub use mini_flux_macros::{Action, DebugState};

/// Prelude for convenient imports
pub mod prelude {
    pub use mini_flux_core::prelude::*;

    // Derive macros
    pub use mini_flux_macros::{Action, DebugState};
}
