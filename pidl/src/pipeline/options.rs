//! Pipeline configuration options.

use crate::action::ActionRegistry;
use crate::errors::PidlError;
use serde_json::Value;

/// Recognized pipeline options.
///
/// `concurrency` caps how many tasks run at once within a wave; `0` means
/// unbounded. `skip` lists tasks that stay in the plan but are never run.
/// `actions` seeds every task's factory registry (factories are code, so
/// they are registered on this struct rather than parsed from a mapping).
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Run every wave serially regardless of size.
    pub single_thread: bool,
    /// Task names that are never run.
    pub skip: Vec<String>,
    /// Maximum concurrent tasks per wave; 0 means unbounded.
    pub concurrency: usize,
    /// Action factories injected into every task.
    pub actions: ActionRegistry,
}

impl PipelineOptions {
    /// Creates the default options: multi-threaded waves, nothing skipped,
    /// unbounded concurrency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a mapping. Unrecognized keys are ignored;
    /// `actions` cannot be expressed as data and is ignored here.
    ///
    /// # Errors
    ///
    /// Returns `Config` when `concurrency` is not a non-negative integer,
    /// `single_thread` is not a boolean, or `skip` is not an array of
    /// strings.
    pub fn from_value(value: &Value) -> Result<Self, PidlError> {
        let mut options = Self::default();
        let map = match value {
            Value::Null => return Ok(options),
            Value::Object(map) => map,
            other => {
                return Err(PidlError::config(format!(
                    "pipeline options must be a mapping, got {other}"
                )))
            }
        };

        if let Some(single_thread) = map.get("single_thread") {
            options.single_thread = single_thread.as_bool().ok_or_else(|| {
                PidlError::config("option 'single_thread' must be a boolean")
            })?;
        }

        if let Some(concurrency) = map.get("concurrency") {
            let parsed = concurrency.as_u64().ok_or_else(|| {
                PidlError::config("option 'concurrency' must be a non-negative integer")
            })?;
            options.concurrency = usize::try_from(parsed).map_err(|_| {
                PidlError::config("option 'concurrency' is out of range")
            })?;
        }

        if let Some(skip) = map.get("skip") {
            let items = skip
                .as_array()
                .ok_or_else(|| PidlError::config("option 'skip' must be an array of task names"))?;
            for item in items {
                let name = item.as_str().ok_or_else(|| {
                    PidlError::config("option 'skip' must be an array of task names")
                })?;
                options.skip.push(name.to_string());
            }
        }

        Ok(options)
    }

    /// Forces serial wave execution.
    #[must_use]
    pub fn with_single_thread(mut self, single_thread: bool) -> Self {
        self.single_thread = single_thread;
        self
    }

    /// Sets the per-wave concurrency cap; 0 means unbounded.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Names tasks that are never run.
    #[must_use]
    pub fn with_skip<I, S>(mut self, skip: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip = skip.into_iter().map(Into::into).collect();
        self
    }

    /// Seeds the action factories injected into every task.
    #[must_use]
    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = actions;
        self
    }
}
