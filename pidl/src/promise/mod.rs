//! Single-assignment lazily evaluated values.
//!
//! A [`Promise`] wraps a raw value, a zero-argument thunk, or a context key
//! to be read on demand. The first forcing memoizes the outcome, success or
//! failure, so a thunk is invoked at most once for the life of the promise.

use crate::context::Context;
use crate::errors::PidlError;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A zero-argument deferred evaluator.
pub type Thunk = Box<dyn Fn() -> Result<Value, PidlError> + Send + Sync>;

enum Source {
    /// Already materialized at construction; the cell is pre-filled.
    Raw,
    Thunk(Thunk),
    ContextKey { key: String, context: Arc<Context> },
}

/// A single-assignment memoized lazy value.
pub struct Promise {
    source: Source,
    cell: Mutex<Option<Result<Value, PidlError>>>,
}

impl Promise {
    /// Wraps a plain value. The promise is already evaluated.
    #[must_use]
    pub fn of(value: impl Into<Value>) -> Self {
        Self {
            source: Source::Raw,
            cell: Mutex::new(Some(Ok(value.into()))),
        }
    }

    /// Wraps a bare key with no context: it resolves to itself.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::of(Value::String(key.into()))
    }

    /// Wraps a thunk, forced on first access.
    #[must_use]
    pub fn deferred<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<Value, PidlError> + Send + Sync + 'static,
    {
        Self {
            source: Source::Thunk(Box::new(thunk)),
            cell: Mutex::new(None),
        }
    }

    /// Wraps an already-boxed thunk.
    #[must_use]
    pub fn deferred_boxed(thunk: Thunk) -> Self {
        Self {
            source: Source::Thunk(thunk),
            cell: Mutex::new(None),
        }
    }

    /// Wraps a context key, read from `context` when forced.
    #[must_use]
    pub fn context_key(key: impl Into<String>, context: Arc<Context>) -> Self {
        Self {
            source: Source::ContextKey {
                key: key.into(),
                context,
            },
            cell: Mutex::new(None),
        }
    }

    /// Builds a promise from an optional value and an optional thunk, the
    /// shape dynamic configuration surfaces supply.
    ///
    /// # Errors
    ///
    /// Returns `Config` when both a value and a thunk are given, or when
    /// neither is.
    pub fn from_parts(value: Option<Value>, thunk: Option<Thunk>) -> Result<Self, PidlError> {
        match (value, thunk) {
            (Some(_), Some(_)) => Err(PidlError::config(
                "a promise takes a value or a thunk, not both",
            )),
            (Some(value), None) => Ok(Self::of(value)),
            (None, Some(thunk)) => Ok(Self::deferred_boxed(thunk)),
            (None, None) => Err(PidlError::config("a promise needs a value or a thunk")),
        }
    }

    /// Forces evaluation and returns the memoized result.
    ///
    /// Later calls return the first outcome unchanged, even if the thunk
    /// would now produce something different.
    ///
    /// # Errors
    ///
    /// Replays the underlying evaluation failure, unwrapped.
    pub fn value(&self) -> Result<Value, PidlError> {
        let mut cell = self.cell.lock();
        if let Some(result) = cell.as_ref() {
            return result.clone();
        }
        let result = match &self.source {
            Source::Raw => unreachable!("raw promises are constructed evaluated"),
            Source::Thunk(thunk) => thunk(),
            Source::ContextKey { key, context } => Ok(context.get(key)),
        };
        *cell = Some(result.clone());
        result
    }

    /// Returns true iff the value has been materialized. Always true for
    /// plain values; for thunk and context-key promises only after
    /// [`Promise::value`] has been called.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.cell.lock().is_some()
    }
}

impl fmt::Display for Promise {
    /// String coercion forces evaluation. A forcing failure renders the
    /// error message, since `Display` cannot propagate it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Ok(Value::String(s)) => write!(f, "{s}"),
            Ok(other) => write!(f, "{other}"),
            Err(err) => write!(f, "<unevaluable: {err}>"),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Raw => "raw",
            Source::Thunk(_) => "thunk",
            Source::ContextKey { .. } => "context_key",
        };
        f.debug_struct("Promise")
            .field("source", &source)
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}
