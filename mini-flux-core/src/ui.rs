//! The single designated UI execution context
//!
//! All store mutations and every [`Dispatcher::dispatch`](crate::Dispatcher::dispatch)
//! happen on one thread. Background work hands results back through
//! [`UiContext::post`] (fire and forget) or [`UiContext::run_sync`]
//! (blocking handoff).
//!
//! Two ways to obtain a context:
//! - [`UiContext::spawn`] starts a dedicated thread that drains the job queue.
//! - [`UiContext::current`] designates the calling thread; the returned
//!   [`UiLoop`] drains the queue when the owner calls `run` or `pump`.
//!
//! ```
//! use mini_flux_core::UiContext;
//!
//! let ui = UiContext::spawn("ui").unwrap();
//! let on_ui = ui.run_sync({
//!     let ui = ui.clone();
//!     move || ui.is_on_ui_thread()
//! });
//! assert!(on_ui);
//! assert!(!ui.is_on_ui_thread());
//! ui.shutdown();
//! ```

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::error::UiError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle to the UI thread and its job queue
#[derive(Clone)]
pub struct UiContext {
    inner: Arc<UiInner>,
}

struct UiInner {
    name: String,
    thread_id: ThreadId,
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for UiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiContext")
            .field("name", &self.inner.name)
            .field("thread_id", &self.inner.thread_id)
            .finish()
    }
}

impl UiContext {
    /// Spawn a dedicated UI thread
    ///
    /// The thread runs posted jobs in FIFO order until [`shutdown`](Self::shutdown)
    /// is called or every handle is dropped.
    pub fn spawn(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let ui_loop = UiLoop { rx };
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || ui_loop.run())?;

        Ok(Self {
            inner: Arc::new(UiInner {
                name,
                thread_id: handle.thread().id(),
                tx: Mutex::new(Some(tx)),
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Designate the calling thread as the UI thread
    ///
    /// Jobs posted to the returned context only run when the caller drives
    /// the [`UiLoop`].
    pub fn current() -> (Self, UiLoop) {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let name = thread::current().name().unwrap_or("ui").to_string();
        let ctx = Self {
            inner: Arc::new(UiInner {
                name,
                thread_id: thread::current().id(),
                tx: Mutex::new(Some(tx)),
                handle: Mutex::new(None),
            }),
        };
        (ctx, UiLoop { rx })
    }

    /// Name of the UI thread
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Check the caller runs on the UI thread
    pub fn is_on_ui_thread(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Panics unless called on the UI thread
    #[track_caller]
    pub fn assert_on_ui_thread(&self) {
        if !self.is_on_ui_thread() {
            panic!("This method can only be called from the main application thread");
        }
    }

    /// Panics when called on the UI thread
    #[track_caller]
    pub fn assert_not_on_ui_thread(&self) {
        if self.is_on_ui_thread() {
            panic!("{}", UiError::OnUiThread);
        }
    }

    /// Execute a job on the UI thread and return immediately
    ///
    /// Jobs posted after shutdown are dropped with a debug log.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.enqueue(Box::new(job)).is_err() {
            debug!(ui = %self.inner.name, "ui loop stopped, dropping posted job");
        }
    }

    /// Execute a job on the UI thread and block until it completes
    ///
    /// Runs the job inline when already on the UI thread. A panic inside
    /// the job is re-raised on the caller.
    ///
    /// From a multi-thread tokio worker the wait goes through
    /// `block_in_place`, so other tasks keep running.
    ///
    /// # Panics
    ///
    /// Panics if the UI loop is no longer running, or when called from
    /// inside a current-thread tokio runtime.
    pub fn run_sync<R, F>(&self, job: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.try_run_sync(job) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    /// Like [`run_sync`](Self::run_sync) but reports a stopped loop as an error
    pub fn try_run_sync<R, F>(&self, job: F) -> Result<R, UiError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_on_ui_thread() {
            return Ok(job());
        }

        let (tx, rx) = oneshot::channel();
        self.enqueue(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            let _ = tx.send(result);
        }))?;

        match wait_blocking(rx) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(UiError::LoopStopped),
        }
    }

    /// Stop accepting jobs and wait for a spawned UI thread to drain
    pub fn shutdown(&self) {
        self.inner.tx.lock().take();
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            if !self.is_on_ui_thread() && handle.join().is_err() {
                error!(ui = %self.inner.name, "ui thread terminated with a panic");
            }
        }
    }

    fn enqueue(&self, job: Job) -> Result<(), UiError> {
        let guard = self.inner.tx.lock();
        let tx = guard.as_ref().ok_or(UiError::LoopStopped)?;
        tx.send(job).map_err(|_| UiError::LoopStopped)
    }
}

/// Block on a handoff, leaving the runtime first when called from a
/// multi-thread tokio worker
///
/// A current-thread runtime cannot be left; blocking there panics.
fn wait_blocking<T>(rx: oneshot::Receiver<T>) -> Result<T, oneshot::error::RecvError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| rx.blocking_recv())
        }
        _ => rx.blocking_recv(),
    }
}

/// Receiving half of a UI job queue
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl UiLoop {
    /// Run jobs until the context is shut down
    ///
    /// # Panics
    ///
    /// A panicking job stops the loop and the panic propagates. Pending
    /// and later handoffs then fail with [`UiError::LoopStopped`].
    pub fn run(mut self) {
        debug!("ui loop started");
        while let Some(job) = self.rx.blocking_recv() {
            run_job(job);
        }
        debug!("ui loop stopped");
    }

    /// Run every job queued so far and return how many ran
    ///
    /// A panicking job propagates to the caller; jobs queued after it stay
    /// queued.
    pub fn pump(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_job(job);
            ran += 1;
        }
        ran
    }
}

/// Panics are logged and re-raised, a misused UI loop does not keep going
fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(reason = %panic_message(payload.as_ref()), "ui job panicked");
        panic::resume_unwind(payload);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
