//! The shared key/value store for one pipeline run.

use super::views::ContextView;
use crate::errors::PidlError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Shared mutable state for one pipeline run.
///
/// All key/value access serializes on a single mutex; there is no per-key
/// locking. Missing keys read as `Value::Null` rather than erroring, and
/// [`Context::is_set`] distinguishes absent-or-null from present.
///
/// Named views registered at construction are read-only for the lifetime
/// of the context.
#[derive(Debug, Default)]
pub struct Context {
    data: Mutex<HashMap<String, Value>>,
    views: HashMap<String, ContextView>,
}

impl Context {
    /// Creates an empty context with no views.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a context with named views and seed data.
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Writes a value, overwriting any prior value for the key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.lock().insert(key.into(), value.into());
    }

    /// Reads a value. Missing keys read as `Value::Null`; reads never fail.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.data.lock().get(key).cloned().unwrap_or(Value::Null)
    }

    /// Returns true iff a value is present and not null.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.data.lock().get(key).is_some_and(|v| !v.is_null())
    }

    /// Removes a key so that `is_set` no longer reports it.
    pub fn unset(&self, key: &str) {
        self.data.lock().remove(key);
    }

    /// Returns a snapshot of all user-set key/value pairs.
    #[must_use]
    pub fn all(&self) -> HashMap<String, Value> {
        self.data.lock().clone()
    }

    /// Returns the named view.
    ///
    /// # Errors
    ///
    /// Returns `UnknownView` if no view with that name was registered.
    pub fn view(&self, name: &str) -> Result<&ContextView, PidlError> {
        self.views.get(name).ok_or_else(|| PidlError::UnknownView {
            name: name.to_string(),
        })
    }

    /// Looks up a key in a mapping-shaped view.
    ///
    /// # Errors
    ///
    /// Returns `UnknownView` for an unregistered view, `Config` when the
    /// view is not a mapping, and `KeyLookup` when the key is absent.
    pub fn view_get(&self, name: &str, key: &str) -> Result<Value, PidlError> {
        let view = self.view(name)?;
        if !view.is_mapping() {
            return Err(PidlError::config(format!(
                "context view '{name}' is not a mapping and takes no key"
            )));
        }
        view.get(key).ok_or_else(|| PidlError::KeyLookup {
            view: name.to_string(),
            key: key.to_string(),
        })
    }

    /// Returns the entire contents of the named view.
    ///
    /// # Errors
    ///
    /// Returns `UnknownView` if no view with that name was registered.
    pub fn view_value(&self, name: &str) -> Result<Value, PidlError> {
        Ok(self.view(name)?.value())
    }

    /// Returns the registered view names.
    #[must_use]
    pub fn view_names(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }
}

/// Builder for a [`Context`] with named views and seed data.
///
/// Structured logging is carried by the `tracing` facade rather than a
/// context option, so the view name `logger` is reserved and rejected.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    data: HashMap<String, Value>,
    views: HashMap<String, ContextView>,
}

impl ContextBuilder {
    /// Registers a named read-only view. Objects become mapping views,
    /// arrays sequence views, anything else scalar views.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a duplicate view name or the reserved name
    /// `logger`.
    pub fn view(mut self, name: impl Into<String>, value: Value) -> Result<Self, PidlError> {
        let name = name.into();
        if name == "logger" {
            return Err(PidlError::config(
                "the view name 'logger' is reserved; logging goes through tracing",
            ));
        }
        if self.views.contains_key(&name) {
            return Err(PidlError::config(format!(
                "duplicate context view '{name}'"
            )));
        }
        self.views.insert(name, ContextView::classify(value));
        Ok(self)
    }

    /// Seeds an initial key/value pair.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Finalizes the context.
    #[must_use]
    pub fn build(self) -> Context {
        Context {
            data: Mutex::new(self.data),
            views: self.views,
        }
    }
}
