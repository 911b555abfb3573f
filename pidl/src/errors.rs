//! Error types for the pidl orchestration engine.
//!
//! The taxonomy is closed: configuration mistakes surface at construction
//! time, lookup failures surface from context views, and execution failures
//! surface from `run` wrapped with the offending task name(s).

use thiserror::Error;

/// The error type for all pidl operations.
///
/// The enum is `Clone` so that memoized promise failures can be replayed
/// on later evaluations without re-running the underlying thunk.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PidlError {
    /// Misconfiguration detected at construction time: duplicate task
    /// names, an invalid concurrency value, or a predicate given both a
    /// value and a thunk.
    #[error("configuration error: {0}")]
    Config(String),

    /// A mapping-typed context view was asked for a key it does not hold.
    #[error("key '{key}' not found in context view '{view}'")]
    KeyLookup {
        /// The view that was queried.
        view: String,
        /// The missing key.
        key: String,
    },

    /// A context view was requested that was never registered.
    #[error("no context view named '{name}' is registered")]
    UnknownView {
        /// The unregistered view name.
        name: String,
    },

    /// An `on_error` policy string did not name a known policy.
    #[error("invalid error policy '{0}' (expected raise, exit or continue)")]
    InvalidPolicy(String),

    /// Plan construction reached its fixed point without covering every
    /// registered task: the named tasks have unsatisfiable prerequisites
    /// (missing references or cycles).
    #[error("plan does not cover tasks: {}", names.join(", "))]
    UnreachableTasks {
        /// The unreachable task names, in pipeline insertion order.
        names: Vec<String>,
    },

    /// `run_one` was called with a name no task carries.
    #[error("no task named '{name}'")]
    UnknownTask {
        /// The requested task name.
        name: String,
    },

    /// An action reported a failure. User-supplied actions construct this
    /// (directly or via [`PidlError::action`]) to signal that their work
    /// did not complete.
    #[error("{0}")]
    Action(String),

    /// A single task raised out of a wave.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        /// The task that raised.
        task: String,
        /// The underlying failure.
        #[source]
        source: Box<PidlError>,
    },

    /// More than one task raised out of the same concurrent wave.
    #[error("tasks failed in wave: {}", tasks.join(", "))]
    WaveFailed {
        /// The offending task names.
        tasks: Vec<String>,
    },
}

impl PidlError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an action failure from a message.
    #[must_use]
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    /// Wraps a task failure with the task name.
    #[must_use]
    pub fn task_failed(task: impl Into<String>, source: PidlError) -> Self {
        Self::TaskFailed {
            task: task.into(),
            source: Box::new(source),
        }
    }

    /// Returns the underlying error for a wrapped task failure, or `self`
    /// when nothing is wrapped. Deferred evaluations propagate their
    /// original failure, so callers can always reach the root cause.
    #[must_use]
    pub fn root_cause(&self) -> &PidlError {
        match self {
            Self::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
