//! Status envelope for asynchronous work reflected in state
//!
//! A [`TypedTask`] is plain data: stores keep one per async operation and
//! reducers move it through `Idle -> Running -> Success | Error`. Failures
//! travel as data inside the task, never as errors across dispatch.
//!
//! ```
//! use mini_flux_core::task::{task_failure, task_idle, task_running, Task};
//!
//! let task: Task = task_idle(());
//! assert!(!task.is_terminal());
//!
//! let task: Task = task_running(());
//! assert!(task.is_running());
//!
//! let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
//! let task: Task = task_failure((), Some(err.into()));
//! assert!(task.is_failure() && task.is_terminal());
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// State of the task. `Idle` is not a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// Cloneable cause attached to a failed task
#[derive(Clone)]
pub struct TaskError(Arc<dyn Error + Send + Sync>);

impl TaskError {
    /// Wrap any error
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Access the underlying error
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl<E> From<E> for TaskError
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Basic wrapper to represent an ongoing task
#[derive(Debug, Clone)]
pub struct TypedTask<T> {
    pub status: TaskStatus,
    pub metadata: T,
    pub error: Option<TaskError>,
}

/// A task without metadata
pub type Task = TypedTask<()>;

impl<T> TypedTask<T> {
    pub fn new(status: TaskStatus, metadata: T, error: Option<TaskError>) -> Self {
        Self {
            status,
            metadata,
            error,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == TaskStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    pub fn is_failure(&self) -> bool {
        self.status == TaskStatus::Error
    }

    pub fn is_successful(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// `Success` and `Error` are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Success | TaskStatus::Error)
    }
}

impl<T: Default> Default for TypedTask<T> {
    fn default() -> Self {
        task_idle(T::default())
    }
}

// Errors compare by identity, they carry no structural equality.
impl<T: PartialEq> PartialEq for TypedTask<T> {
    fn eq(&self, other: &Self) -> bool {
        let same_error = match (&self.error, &other.error) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        };
        self.status == other.status && self.metadata == other.metadata && same_error
    }
}

/// Idle task
pub fn task_idle<T>(metadata: T) -> TypedTask<T> {
    TypedTask::new(TaskStatus::Idle, metadata, None)
}

/// Sets the task as running
pub fn task_running<T>(metadata: T) -> TypedTask<T> {
    TypedTask::new(TaskStatus::Running, metadata, None)
}

/// Sets the task as succeeded with data
pub fn task_success<T>(metadata: T) -> TypedTask<T> {
    TypedTask::new(TaskStatus::Success, metadata, None)
}

/// Sets the task as error, with its cause
pub fn task_failure<T>(metadata: T, error: Option<TaskError>) -> TypedTask<T> {
    TypedTask::new(TaskStatus::Error, metadata, error)
}
