//! Error types for misuse of the dispatch and UI-context entry points
//!
//! These describe programmer errors. The panicking entry points
//! ([`Dispatcher::dispatch`](crate::Dispatcher::dispatch),
//! [`UiContext::run_sync`](crate::UiContext::run_sync)) fail fast with the
//! same messages; the `try_*` variants hand them back instead.

/// Misuse detected when entering a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// `dispatch` was called outside the UI thread
    #[error("This method can only be called from the main application thread")]
    NotOnUiThread,

    /// `dispatch` was called while another dispatch was reducing state
    #[error("Can't dispatch actions while reducing state!")]
    Reentrant,
}

/// Failure to hand work over to the UI thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UiError {
    /// A blocking handoff was requested from the UI thread itself
    #[error("This method can not be called from the main application thread")]
    OnUiThread,

    /// The UI loop was shut down before the job could run
    #[error("ui loop is no longer running")]
    LoopStopped,
}
