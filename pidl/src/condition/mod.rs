//! Conditional skipping via `only_if` predicates.
//!
//! Any configurable entity (action, task, pipeline) may carry one
//! [`SkipRule`]. The entity runs when the predicate is truthy and is
//! skipped when it is falsey; with no rule configured the entity always
//! runs.

use crate::context::Context;
use crate::errors::PidlError;
use crate::promise::{Promise, Thunk};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Truthiness for predicate and context values: everything is truthy
/// except `Null` and `false`. Zero and the empty string are truthy.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

enum Predicate {
    /// A raw value or thunk, memoized through a promise.
    Fixed(Promise),
    /// A context key: truthy iff the key is set and its value is truthy,
    /// read live against the context at evaluation time.
    Key(String),
}

/// A configured skip predicate.
///
/// `should_skip` is true iff the predicate evaluates falsey; a missing
/// rule (no `SkipRule` at all) means "never skip", which is why the rule
/// is always carried as an `Option`.
pub struct SkipRule {
    predicate: Predicate,
}

impl SkipRule {
    /// A predicate from a raw truthy/falsey value.
    #[must_use]
    pub fn from_value(value: impl Into<Value>) -> Self {
        Self {
            predicate: Predicate::Fixed(Promise::of(value)),
        }
    }

    /// A predicate from a thunk, evaluated lazily and at most once.
    #[must_use]
    pub fn from_thunk<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<Value, PidlError> + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Fixed(Promise::deferred(thunk)),
        }
    }

    /// A predicate from a context key: run iff the key is set and truthy.
    #[must_use]
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            predicate: Predicate::Key(key.into()),
        }
    }

    /// The dynamic `only_if` surface: a value or a thunk, not both.
    ///
    /// With neither supplied the call logs a warning and configures
    /// nothing (the skip stays unset).
    ///
    /// # Errors
    ///
    /// Returns `Config` when both a value and a thunk are given.
    pub fn configure(
        value: Option<Value>,
        thunk: Option<Thunk>,
    ) -> Result<Option<Self>, PidlError> {
        match (value, thunk) {
            (Some(_), Some(_)) => Err(PidlError::config(
                "only_if takes a value or a thunk, not both",
            )),
            (Some(value), None) => Ok(Some(Self::from_value(value))),
            (None, Some(thunk)) => Ok(Some(Self {
                predicate: Predicate::Fixed(Promise::deferred_boxed(thunk)),
            })),
            (None, None) => {
                warn!("only_if called with neither a value nor a thunk; skip remains unset");
                Ok(None)
            }
        }
    }

    /// Evaluates the predicate against `ctx` and reports whether the
    /// owner should be skipped.
    ///
    /// # Errors
    ///
    /// Propagates a thunk evaluation failure, unwrapped.
    pub fn should_skip(&self, ctx: &Context) -> Result<bool, PidlError> {
        let satisfied = match &self.predicate {
            Predicate::Fixed(promise) => truthy(&promise.value()?),
            Predicate::Key(key) => ctx.is_set(key) && truthy(&ctx.get(key)),
        };
        Ok(!satisfied)
    }
}

impl fmt::Debug for SkipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Predicate::Fixed(promise) => f.debug_tuple("SkipRule").field(promise).finish(),
            Predicate::Key(key) => f.debug_tuple("SkipRule").field(key).finish(),
        }
    }
}
