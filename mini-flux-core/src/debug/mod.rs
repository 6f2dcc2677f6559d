//! Debug and inspection utilities
//!
//! - [`DebugState`]: expose a state as titled key/value sections
//! - [`diff_sections`]: field-level differences between two renderings
//! - [`LoggerInterceptor`]: log every action with the store changes it caused
//!
//! # State Inspection
//!
//! ```ignore
//! use mini_flux::DebugState;
//!
//! #[derive(DebugState)]
//! struct PersonState {
//!     #[debug(section = "Persons", label = "Loaded")]
//!     persons: usize,
//!     #[debug(skip)]
//!     cache: Vec<u8>,
//! }
//! ```
//!
//! # Action Logging
//!
//! ```
//! use mini_flux_core::debug::LoggerConfig;
//!
//! // Log only Load* and Delete* actions
//! let config = LoggerConfig::new(Some("Load*,Delete*"), None);
//! assert!(config.should_log("LoadPersons"));
//!
//! // Log everything
//! let config = LoggerConfig::default();
//! assert!(config.should_log("Anything"));
//! ```

pub mod diff;
pub mod logger;
pub mod state;

pub use diff::{diff_sections, format_diffs, FieldDiff};
pub use logger::{
    glob_match, ActionLog, ActionLogEntry, LoggerConfig, LoggerInterceptor, StoreChange,
    LOG_TARGET,
};
pub use state::{DebugEntry, DebugSection, DebugState, DebugWrapper};
