//! The pipeline orchestrator.
//!
//! A pipeline owns its tasks and the optional error handler, derives a
//! wave-grouped execution plan from the declared prerequisites, and runs
//! waves either serially or with one spawned task per pipeline task.
//! Between waves the dispatcher is single-threaded: wave N+1 starts only
//! after every task in wave N has terminated.

mod builder;
mod options;
mod plan;


pub use builder::TaskBuilder;
pub use options::PipelineOptions;
pub use plan::WavePlan;

use crate::condition::SkipRule;
use crate::context::Context;
use crate::errors::PidlError;
use crate::events::{EventBuffer, EventEmitter, EventHandler, PipelineEvent};
use crate::promise::Thunk;
use crate::task::Task;
use crate::utils::{duration_ms, generate_run_id, iso_timestamp};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The name under which the error handler task is configured.
const ERROR_HANDLER_NAME: &str = "error_handler";

/// The orchestrator: owns tasks, the error handler, and the event stream.
///
/// Construction stamps `job_name` and `run_date` into the shared context;
/// each `run` additionally stamps a fresh `run_id`. The pipeline is
/// stateless between runs apart from accumulated event subscribers.
pub struct Pipeline {
    name: String,
    context: Arc<Context>,
    tasks: HashMap<String, Arc<Task>>,
    task_order: Vec<String>,
    error_handler: Option<Arc<Task>>,
    skip: Option<SkipRule>,
    options: PipelineOptions,
    events: Arc<EventEmitter>,
}

impl Pipeline {
    /// Creates a pipeline over a shared context.
    ///
    /// Writes `job_name` (the stringified pipeline name) and `run_date`
    /// (the construction timestamp) into the context.
    #[must_use]
    pub fn new(name: impl Into<String>, context: Arc<Context>, options: PipelineOptions) -> Self {
        let name = name.into();
        context.set("job_name", name.clone());
        context.set("run_date", iso_timestamp());
        Self {
            name,
            context,
            tasks: HashMap::new(),
            task_order: Vec::new(),
            error_handler: None,
            skip: None,
            options,
            events: Arc::new(EventEmitter::new()),
        }
    }

    /// Creates a pipeline with options given as a mapping, per the
    /// external construction contract: unrecognized keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Config` for malformed recognized options (see
    /// [`PipelineOptions::from_value`]).
    pub fn with_value_options(
        name: impl Into<String>,
        context: Arc<Context>,
        options: &Value,
    ) -> Result<Self, PidlError> {
        Ok(Self::new(name, context, PipelineOptions::from_value(options)?))
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared run context.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The pipeline's event emitter; subscribe here to observe the run.
    #[must_use]
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Looks up a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    /// Registered task names in insertion order.
    #[must_use]
    pub fn task_names(&self) -> &[String] {
        &self.task_order
    }

    /// Registers and configures a task.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a duplicate task name; propagates
    /// configuration failures from the closure.
    pub fn add_task<F>(&mut self, name: impl Into<String>, configure: F) -> Result<(), PidlError>
    where
        F: FnOnce(&mut TaskBuilder) -> Result<(), PidlError>,
    {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(PidlError::config(format!("duplicate task name '{name}'")));
        }

        let mut task_builder = TaskBuilder::new(
            name.clone(),
            self.context.clone(),
            self.options.actions.clone(),
        );
        configure(&mut task_builder)?;

        self.task_order.push(name.clone());
        self.tasks.insert(name, Arc::new(task_builder.build()));
        Ok(())
    }

    /// Configures the cleanup task invoked when a wave raises or yields an
    /// errored exit request. The handler participates in no plan.
    ///
    /// # Errors
    ///
    /// Propagates configuration failures from the closure.
    pub fn on_error<F>(&mut self, configure: F) -> Result<(), PidlError>
    where
        F: FnOnce(&mut TaskBuilder) -> Result<(), PidlError>,
    {
        let mut task_builder = TaskBuilder::new(
            ERROR_HANDLER_NAME.to_string(),
            self.context.clone(),
            self.options.actions.clone(),
        );
        configure(&mut task_builder)?;
        self.error_handler = Some(Arc::new(task_builder.build()));
        Ok(())
    }

    /// Configures the pipeline's own skip predicate.
    ///
    /// # Errors
    ///
    /// Returns `Config` when both a value and a thunk are given.
    pub fn only_if(&mut self, value: Option<Value>, thunk: Option<Thunk>) -> Result<(), PidlError> {
        if let Some(rule) = SkipRule::configure(value, thunk)? {
            self.skip = Some(rule);
        }
        Ok(())
    }

    /// Configures a context-key skip predicate for the whole pipeline.
    pub fn only_if_key(&mut self, key: impl Into<String>) {
        self.skip = Some(SkipRule::from_key(key));
    }

    /// Computes the wave plan: a sequence of waves of task names honoring
    /// prerequisites, split to the concurrency cap, ordered by insertion.
    ///
    /// # Errors
    ///
    /// Returns `UnreachableTasks` when prerequisites cannot be satisfied
    /// (missing references or cycles).
    pub fn explain(&self) -> Result<WavePlan, PidlError> {
        let entries: Vec<(String, Vec<String>)> = self
            .task_order
            .iter()
            .filter_map(|name| self.tasks.get(name))
            .map(|task| (task.name().to_string(), task.prerequisites()))
            .collect();
        plan::layer_waves(&entries, self.options.concurrency)
    }

    /// Runs the pipeline wave-by-wave.
    ///
    /// Waves run serially under `single_thread`, otherwise with one
    /// spawned task per pipeline task. After each wave, an exit request
    /// stops the loop (invoking the error handler if the exit carried an
    /// error); an escaping failure invokes the error handler and then
    /// re-raises. `pipeline_end` is emitted only when no failure escapes.
    ///
    /// # Errors
    ///
    /// Returns plan validation failures, a `TaskFailed` wrapping a single
    /// raising task, or `WaveFailed` naming several.
    pub async fn run(&self) -> Result<(), PidlError> {
        let plan = self.explain()?;

        if let Some(rule) = &self.skip {
            if rule.should_skip(&self.context)? {
                info!(pipeline = %self.name, "pipeline skipped by its own predicate");
                return Ok(());
            }
        }

        self.reset_run_state();
        self.context.set("run_id", generate_run_id().to_string());

        let start = Instant::now();
        self.events.emit(&PipelineEvent::pipeline_start(&self.name));

        let mut failure: Option<PidlError> = None;
        for wave in &plan {
            let result = if self.options.single_thread {
                self.run_wave_serial(wave).await
            } else {
                self.run_wave_concurrent(wave).await
            };

            match result {
                Err(err) => {
                    failure = Some(err);
                    break;
                }
                Ok(()) => {
                    let exited: Vec<&Arc<Task>> = wave
                        .iter()
                        .filter_map(|name| self.tasks.get(name))
                        .filter(|task| task.exited())
                        .collect();
                    if !exited.is_empty() {
                        if exited.iter().any(|task| task.errored()) {
                            self.invoke_error_handler().await;
                        }
                        break;
                    }
                }
            }
        }

        if let Some(err) = failure {
            self.invoke_error_handler().await;
            return Err(err);
        }

        self.events
            .emit(&PipelineEvent::pipeline_end(&self.name, duration_ms(start)));
        Ok(())
    }

    /// Runs one task directly, ignoring skip lists and dependencies, with
    /// `pipeline_start`/`pipeline_end` emitted around it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTask` for an unregistered name, or `TaskFailed`
    /// when the task raises.
    pub async fn run_one(&self, name: &str) -> Result<(), PidlError> {
        let task = self
            .tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PidlError::UnknownTask {
                name: name.to_string(),
            })?;

        task.reset_run_state();
        let start = Instant::now();
        self.events.emit(&PipelineEvent::pipeline_start(&self.name));

        let forward = self.pipeline_forwarder();
        task.events().on_all(forward.clone());
        let result = task.run().await;
        task.events().remove_from_all(&forward);

        if let Err(err) = result {
            error!(task = %name, error = %err, "task failed");
            return Err(PidlError::task_failed(name, err));
        }

        self.events
            .emit(&PipelineEvent::pipeline_end(&self.name, duration_ms(start)));
        Ok(())
    }

    /// Describes the plan without running anything: one header per wave,
    /// task and action lines indented beneath, skip-listed tasks marked.
    ///
    /// # Errors
    ///
    /// Returns plan validation failures.
    pub fn dry_run(&self) -> Result<String, PidlError> {
        let plan = self.explain()?;
        let mut out = format!("Pipeline '{}'", self.name);

        for (index, wave) in plan.iter().enumerate() {
            out.push_str(&format!("\nWave {}:", index + 1));
            for name in wave {
                let Some(task) = self.tasks.get(name) else {
                    continue;
                };
                let mut description = task.dry_run();
                if self.options.skip.contains(name) {
                    description = match description.split_once('\n') {
                        Some((first, rest)) => format!("{first} (skipped)\n{rest}"),
                        None => format!("{description} (skipped)"),
                    };
                }
                for line in description.lines() {
                    out.push_str("\n  ");
                    out.push_str(line);
                }
            }
        }

        info!(pipeline = %self.name, "dry run:\n{out}");
        Ok(out)
    }

    fn reset_run_state(&self) {
        for task in self.tasks.values() {
            task.reset_run_state();
        }
        if let Some(handler) = &self.error_handler {
            handler.reset_run_state();
        }
        self.context.unset("error");
        self.context.unset("exit_code");
    }

    /// A handler that re-emits a task's events on the pipeline emitter.
    fn pipeline_forwarder(&self) -> EventHandler {
        let events = self.events.clone();
        Arc::new(move |event: &PipelineEvent| events.emit(event))
    }

    /// Selects the wave's runnable tasks, honoring the skip list and each
    /// task's own predicate. Predicates are evaluated on the dispatcher
    /// before anything is spawned.
    fn runnable_tasks(&self, wave: &[String]) -> Result<Vec<Arc<Task>>, PidlError> {
        let mut runnable = Vec::new();
        for name in wave {
            if self.options.skip.contains(name) {
                debug!(task = %name, "task on skip list");
                continue;
            }
            let Some(task) = self.tasks.get(name) else {
                continue;
            };
            if task.should_skip()? {
                debug!(task = %name, "task skipped by predicate");
                continue;
            }
            runnable.push(task.clone());
        }
        Ok(runnable)
    }

    async fn run_wave_serial(&self, wave: &[String]) -> Result<(), PidlError> {
        for task in self.runnable_tasks(wave)? {
            let forward = self.pipeline_forwarder();
            task.events().on_all(forward.clone());
            let result = task.run().await;
            task.events().remove_from_all(&forward);

            if let Err(err) = result {
                error!(task = %task.name(), error = %err, "task failed");
                return Err(PidlError::task_failed(task.name(), err));
            }
        }
        Ok(())
    }

    async fn run_wave_concurrent(&self, wave: &[String]) -> Result<(), PidlError> {
        let buffer = Arc::new(EventBuffer::new());
        let runnable = self.runnable_tasks(wave)?;

        let mut running = Vec::with_capacity(runnable.len());
        for task in runnable {
            let capture: EventHandler = {
                let buffer = buffer.clone();
                Arc::new(move |event: &PipelineEvent| buffer.push(event.clone()))
            };
            task.events().on_all(capture.clone());

            let runner = task.clone();
            let handle = tokio::spawn(async move { runner.run().await });
            running.push((task, capture, handle));
        }

        let mut failed: Vec<(String, PidlError)> = Vec::new();
        for (task, capture, handle) in running {
            let joined = handle.await;
            task.events().remove_from_all(&capture);

            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(task = %task.name(), error = %err, "task failed");
                    failed.push((task.name().to_string(), err));
                }
                Err(join_err) => {
                    error!(task = %task.name(), error = %join_err, "task aborted");
                    failed.push((
                        task.name().to_string(),
                        PidlError::action(format!("task aborted: {join_err}")),
                    ));
                }
            }
        }

        // Replay captured task events on the dispatcher so pipeline
        // subscribers observe a single-threaded stream.
        buffer.replay(&self.events);

        match failed.len() {
            0 => Ok(()),
            1 => {
                let (name, err) = failed.remove(0);
                Err(PidlError::task_failed(name, err))
            }
            _ => Err(PidlError::WaveFailed {
                tasks: failed.into_iter().map(|(name, _)| name).collect(),
            }),
        }
    }

    /// Runs the error handler, if configured and not skipped. Handler
    /// failures are logged, never re-raised in place of the original.
    async fn invoke_error_handler(&self) {
        let Some(handler) = &self.error_handler else {
            return;
        };

        match handler.should_skip() {
            Ok(true) => {
                debug!("error handler skipped by its predicate");
                return;
            }
            Err(err) => {
                warn!(error = %err, "error handler predicate failed; handler not run");
                return;
            }
            Ok(false) => {}
        }

        let forward = self.pipeline_forwarder();
        handler.events().on_all(forward.clone());
        if let Err(err) = handler.run().await {
            warn!(error = %err, "error handler failed");
        }
        handler.events().remove_from_all(&forward);
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("tasks", &self.task_order)
            .field("error_handler", &self.error_handler.is_some())
            .field("options", &self.options)
            .finish()
    }
}
