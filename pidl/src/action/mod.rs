//! The action contract consumed by the orchestration core.
//!
//! An action is one sequential unit of work inside a task: named, carrying
//! an error policy, an optional skip predicate, and an async `run`.
//! Concrete work (database, filesystem, HTTP, ...) is user-supplied;
//! [`ActionCore`] bundles the fields every implementation needs, and
//! [`FnAction`] wraps a closure for tests and light integration.

mod policy;
mod registry;

pub use policy::{normalize_exit_code, ErrorPolicy};
pub use registry::{ActionFactory, ActionRegistry};

use crate::condition::SkipRule;
use crate::context::Context;
use crate::errors::PidlError;
use crate::promise::Promise;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;

/// A named unit of work inside a task.
///
/// The string form used in event payloads is
/// `"<kind>:<name>:<verb>"` (see [`Action::label`]).
#[async_trait]
pub trait Action: Send + Sync + Debug {
    /// The action's configured name.
    fn name(&self) -> &str;

    /// The action type name, first segment of the string form.
    fn kind(&self) -> &str;

    /// The configured action verb, last segment of the string form.
    fn verb(&self) -> &str;

    /// What happens when `run` fails.
    fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::Raise
    }

    /// The exit code recorded when an [`ErrorPolicy::Exit`] action fails.
    fn exit_code(&self) -> i32 {
        0
    }

    /// The configured skip predicate, if any.
    fn skip_rule(&self) -> Option<&SkipRule> {
        None
    }

    /// Validates the configuration at registration time.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unusable configuration.
    fn validate(&self) -> Result<(), PidlError> {
        Ok(())
    }

    /// Performs the work.
    ///
    /// # Errors
    ///
    /// A failure is filtered through the action's error policy by the
    /// owning task.
    async fn run(&self, ctx: &Context) -> Result<(), PidlError>;

    /// A one-line description for plan walkthroughs.
    fn dry_run(&self) -> String {
        self.label()
    }

    /// The action string form `"<kind>:<name>:<verb>"`.
    fn label(&self) -> String {
        format!("{}:{}:{}", self.kind(), self.name(), self.verb())
    }

    /// True iff failures re-raise out of the task.
    fn raise_on_error(&self) -> bool {
        self.error_policy().raises()
    }

    /// True iff failures request pipeline termination.
    fn exit_on_error(&self) -> bool {
        self.error_policy().exits()
    }

    /// Evaluates the skip predicate against `ctx`. No predicate means the
    /// action runs.
    ///
    /// # Errors
    ///
    /// Propagates a predicate evaluation failure.
    fn should_skip(&self, ctx: &Context) -> Result<bool, PidlError> {
        match self.skip_rule() {
            Some(rule) => rule.should_skip(ctx),
            None => Ok(false),
        }
    }
}

/// The field bundle concrete action types embed: name, verb, error policy,
/// exit code, skip predicate, and lazily resolved attributes.
///
/// Attribute values are [`Promise`]s so that fields configured from
/// context keys or thunks resolve on first use rather than at
/// configuration time.
#[derive(Debug)]
pub struct ActionCore {
    name: String,
    verb: String,
    policy: ErrorPolicy,
    exit_code: i32,
    skip: Option<SkipRule>,
    attributes: HashMap<String, Promise>,
}

impl ActionCore {
    /// Creates a core with the default `Raise` policy and exit code 0.
    #[must_use]
    pub fn new(name: impl Into<String>, verb: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verb: verb.into(),
            policy: ErrorPolicy::default(),
            exit_code: 0,
            skip: None,
            attributes: HashMap::new(),
        }
    }

    /// The action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The action verb.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The configured error policy.
    #[must_use]
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The normalized exit code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// The configured skip predicate, if any.
    #[must_use]
    pub fn skip_rule(&self) -> Option<&SkipRule> {
        self.skip.as_ref()
    }

    /// Configures the error policy from its string form, with an optional
    /// exit code (meaningful under `exit`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidPolicy` for an unknown policy string.
    pub fn on_error(&mut self, policy: &str, code: Option<&Value>) -> Result<(), PidlError> {
        self.policy = policy.parse()?;
        if let Some(code) = code {
            self.exit_code = normalize_exit_code(code);
        }
        Ok(())
    }

    /// Configures the skip predicate from the `only_if` value/thunk
    /// surface. A repeat call replaces the previous predicate.
    ///
    /// # Errors
    ///
    /// Returns `Config` when both a value and a thunk are given.
    pub fn only_if(
        &mut self,
        value: Option<Value>,
        thunk: Option<crate::promise::Thunk>,
    ) -> Result<(), PidlError> {
        if let Some(rule) = SkipRule::configure(value, thunk)? {
            self.set_skip_rule(rule);
        }
        Ok(())
    }

    /// Configures a context-key skip predicate. A repeat call replaces the
    /// previous predicate.
    pub fn only_if_key(&mut self, key: impl Into<String>) {
        self.set_skip_rule(SkipRule::from_key(key));
    }

    /// Installs a skip predicate, replacing any previous one.
    pub fn set_skip_rule(&mut self, rule: SkipRule) {
        if self.skip.is_some() {
            tracing::debug!(action = %self.name, "replacing skip predicate");
        }
        self.skip = Some(rule);
    }

    /// Stores a lazily resolved attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Promise) {
        self.attributes.insert(name.into(), value);
    }

    /// Returns a stored attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Promise> {
        self.attributes.get(name)
    }

    /// All stored attributes by name.
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Promise> {
        &self.attributes
    }
}

/// A closure-backed action.
pub struct FnAction<F>
where
    F: Fn(&Context) -> Result<(), PidlError> + Send + Sync,
{
    core: ActionCore,
    func: F,
}

impl<F> FnAction<F>
where
    F: Fn(&Context) -> Result<(), PidlError> + Send + Sync,
{
    /// Creates a function action with the verb `run`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            core: ActionCore::new(name, "run"),
            func,
        }
    }

    /// Overrides the action verb.
    #[must_use]
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.core.verb = verb.into();
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.core.policy = policy;
        self
    }

    /// Sets the exit code recorded under [`ErrorPolicy::Exit`].
    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.core.exit_code = code;
        self
    }

    /// Installs a skip predicate.
    #[must_use]
    pub fn with_skip_rule(mut self, rule: SkipRule) -> Self {
        self.core.skip = Some(rule);
        self
    }
}

impl<F> Debug for FnAction<F>
where
    F: Fn(&Context) -> Result<(), PidlError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.core.name)
            .field("verb", &self.core.verb)
            .field("policy", &self.core.policy)
            .finish()
    }
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(&Context) -> Result<(), PidlError> + Send + Sync,
{
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> &str {
        "FnAction"
    }

    fn verb(&self) -> &str {
        self.core.verb()
    }

    fn error_policy(&self) -> ErrorPolicy {
        self.core.policy()
    }

    fn exit_code(&self) -> i32 {
        self.core.exit_code()
    }

    fn skip_rule(&self) -> Option<&SkipRule> {
        self.core.skip_rule()
    }

    async fn run(&self, ctx: &Context) -> Result<(), PidlError> {
        (self.func)(ctx)
    }
}

/// An action that does nothing. Useful in tests and plan walkthroughs.
#[derive(Debug)]
pub struct NoOpAction {
    core: ActionCore,
}

impl NoOpAction {
    /// Creates a no-op action with the verb `noop`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: ActionCore::new(name, "noop"),
        }
    }
}

#[async_trait]
impl Action for NoOpAction {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> &str {
        "NoOpAction"
    }

    fn verb(&self) -> &str {
        self.core.verb()
    }

    async fn run(&self, _ctx: &Context) -> Result<(), PidlError> {
        Ok(())
    }
}
