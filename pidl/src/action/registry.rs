//! Named action factories for configuration surfaces.

use super::Action;
use crate::errors::PidlError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds an action instance given the instance name.
pub type ActionFactory = Arc<dyn Fn(&str) -> Arc<dyn Action> + Send + Sync>;

/// A registry of action types by name.
///
/// The pipeline-level registry is injected into every task; tasks may add
/// their own factories on top. Configuration code then instantiates
/// registered types by name instead of constructing them inline.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    factories: HashMap<String, ActionFactory>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under a type name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: ActionFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Registers a closure factory under a type name.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> Arc<dyn Action> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(factory));
    }

    /// Instantiates a registered type.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no factory is registered under `type_name`.
    pub fn create(&self, type_name: &str, action_name: &str) -> Result<Arc<dyn Action>, PidlError> {
        let factory = self.factories.get(type_name).ok_or_else(|| {
            PidlError::config(format!("no action type registered as '{type_name}'"))
        })?;
        Ok(factory(action_name))
    }

    /// True iff a factory is registered under `type_name`.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// All registered type names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Copies every factory from `other` into this registry. Existing
    /// names are overwritten, so task-level registrations win when merged
    /// on top of the pipeline's.
    pub fn merge(&mut self, other: &ActionRegistry) {
        for (name, factory) in &other.factories {
            self.factories.insert(name.clone(), factory.clone());
        }
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("types", &self.names())
            .finish()
    }
}
