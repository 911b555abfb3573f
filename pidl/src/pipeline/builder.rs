//! Per-task configuration surface used by `Pipeline::add_task`.

use crate::action::{Action, ActionFactory, ActionRegistry};
use crate::condition::SkipRule;
use crate::context::Context;
use crate::errors::PidlError;
use crate::promise::Thunk;
use crate::task::Task;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Collects a task's actions, prerequisites, and skip predicate during
/// pipeline configuration.
///
/// The builder starts with the pipeline's action registry; task-level
/// registrations layer on top and win on name clashes.
pub struct TaskBuilder {
    name: String,
    context: Arc<Context>,
    registry: ActionRegistry,
    actions: Vec<Arc<dyn Action>>,
    prerequisites: Vec<String>,
    skip: Option<SkipRule>,
}

impl TaskBuilder {
    pub(crate) fn new(name: String, context: Arc<Context>, registry: ActionRegistry) -> Self {
        Self {
            name,
            context,
            registry,
            actions: Vec::new(),
            prerequisites: Vec::new(),
            skip: None,
        }
    }

    /// The task name under construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared run context, for actions that capture it at
    /// configuration time (e.g. context-key promises).
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Appends an action after validating it. Duplicate names append.
    ///
    /// # Errors
    ///
    /// Propagates the action's validation failure.
    pub fn add_action(&mut self, action: Arc<dyn Action>) -> Result<&mut Self, PidlError> {
        action.validate()?;
        self.actions.push(action);
        Ok(self)
    }

    /// Instantiates a registered action type by name and appends it.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unregistered type; propagates the new
    /// action's validation failure.
    pub fn action(&mut self, type_name: &str, action_name: &str) -> Result<&mut Self, PidlError> {
        let action = self.registry.create(type_name, action_name)?;
        self.add_action(action)
    }

    /// Registers a task-local action factory, shadowing any pipeline-level
    /// factory with the same type name.
    pub fn register_action(&mut self, type_name: impl Into<String>, factory: ActionFactory) {
        self.registry.register(type_name, factory);
    }

    /// Declares prerequisite tasks by name.
    pub fn after<I, S>(&mut self, prereqs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for prereq in prereqs {
            let prereq = prereq.into();
            if !self.prerequisites.contains(&prereq) {
                self.prerequisites.push(prereq);
            }
        }
        self
    }

    /// Configures the task's skip predicate from the value/thunk surface.
    ///
    /// # Errors
    ///
    /// Returns `Config` when both a value and a thunk are given.
    pub fn only_if(
        &mut self,
        value: Option<Value>,
        thunk: Option<Thunk>,
    ) -> Result<&mut Self, PidlError> {
        if let Some(rule) = SkipRule::configure(value, thunk)? {
            self.skip = Some(rule);
        }
        Ok(self)
    }

    /// Configures a context-key skip predicate: the task runs iff the key
    /// is set and truthy at wave time.
    pub fn only_if_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.skip = Some(SkipRule::from_key(key));
        self
    }

    pub(crate) fn build(self) -> Task {
        Task::from_parts(
            self.name,
            self.context,
            self.actions,
            self.prerequisites,
            self.skip,
        )
    }
}

impl fmt::Debug for TaskBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBuilder")
            .field("name", &self.name)
            .field("actions", &self.actions.len())
            .field("prerequisites", &self.prerequisites)
            .finish()
    }
}
