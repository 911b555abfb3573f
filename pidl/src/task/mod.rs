//! Tasks: ordered action lists with prerequisites and per-run state.

use crate::action::Action;
use crate::condition::SkipRule;
use crate::context::Context;
use crate::errors::PidlError;
use crate::events::{EventEmitter, PipelineEvent};
use crate::utils::duration_ms;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy)]
struct RunState {
    exit: bool,
    exit_code: i32,
}

/// An ordered collection of actions with prerequisite task dependencies.
///
/// Tasks are shared as `Arc`s between the pipeline and the wave tasks it
/// spawns, so all mutable state sits behind locks. Prerequisites are
/// declared by name; the pipeline's planner decides when the task is ready.
#[derive(Debug)]
pub struct Task {
    name: String,
    context: Arc<Context>,
    actions: RwLock<Vec<Arc<dyn Action>>>,
    prerequisites: RwLock<Vec<String>>,
    skip: RwLock<Option<SkipRule>>,
    state: RwLock<RunState>,
    events: EventEmitter,
}

impl Task {
    /// Creates an empty task bound to the shared context.
    #[must_use]
    pub fn new(name: impl Into<String>, context: Arc<Context>) -> Self {
        Self {
            name: name.into(),
            context,
            actions: RwLock::new(Vec::new()),
            prerequisites: RwLock::new(Vec::new()),
            skip: RwLock::new(None),
            state: RwLock::new(RunState::default()),
            events: EventEmitter::new(),
        }
    }

    pub(crate) fn from_parts(
        name: String,
        context: Arc<Context>,
        actions: Vec<Arc<dyn Action>>,
        prerequisites: Vec<String>,
        skip: Option<SkipRule>,
    ) -> Self {
        Self {
            name,
            context,
            actions: RwLock::new(actions),
            prerequisites: RwLock::new(prerequisites),
            skip: RwLock::new(skip),
            state: RwLock::new(RunState::default()),
            events: EventEmitter::new(),
        }
    }

    /// The task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared run context.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// The task's event emitter. The pipeline binds this to its own
    /// emitter (or a wave buffer) for the duration of a run.
    #[must_use]
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Appends an action after validating it. Registering the same action
    /// name twice appends; there is no deduplication.
    ///
    /// # Errors
    ///
    /// Propagates the action's own validation failure.
    pub fn add_action(&self, action: Arc<dyn Action>) -> Result<(), PidlError> {
        action.validate()?;
        self.actions.write().push(action);
        Ok(())
    }

    /// The number of registered actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.read().len()
    }

    /// Declares prerequisite tasks by name. Repeated declarations
    /// accumulate; duplicates are dropped.
    pub fn after<I, S>(&self, prereqs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = self.prerequisites.write();
        for prereq in prereqs {
            let prereq = prereq.into();
            if !list.contains(&prereq) {
                list.push(prereq);
            }
        }
    }

    /// The declared prerequisite names.
    #[must_use]
    pub fn prerequisites(&self) -> Vec<String> {
        self.prerequisites.read().clone()
    }

    /// True iff the task has no prerequisites.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.prerequisites.read().is_empty()
    }

    /// True iff every prerequisite is in `seen`.
    #[must_use]
    pub fn is_ready(&self, seen: &HashSet<String>) -> bool {
        self.prerequisites.read().iter().all(|p| seen.contains(p))
    }

    /// Installs a skip predicate, replacing any previous one.
    pub fn set_skip_rule(&self, rule: SkipRule) {
        let mut skip = self.skip.write();
        if skip.is_some() {
            debug!(task = %self.name, "replacing skip predicate");
        }
        *skip = Some(rule);
    }

    /// Evaluates the task's skip predicate. No predicate means run.
    ///
    /// # Errors
    ///
    /// Propagates a predicate evaluation failure.
    pub fn should_skip(&self) -> Result<bool, PidlError> {
        match &*self.skip.read() {
            Some(rule) => rule.should_skip(&self.context),
            None => Ok(false),
        }
    }

    /// True iff an EXIT-policy action failed during the current run.
    #[must_use]
    pub fn exited(&self) -> bool {
        self.state.read().exit
    }

    /// The exit code recorded when an EXIT-policy action failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.state.read().exit_code
    }

    /// True iff any task in the run has recorded an error. The flag lives
    /// in the shared context, so every task observing it turns errored.
    #[must_use]
    pub fn errored(&self) -> bool {
        self.context.is_set("error")
    }

    pub(crate) fn reset_run_state(&self) {
        *self.state.write() = RunState::default();
    }

    /// Runs the actions in declaration order, filtering each failure
    /// through the action's error policy:
    ///
    /// - `Raise` records the error in the context and re-raises; neither
    ///   `action_end` nor `task_end` is emitted.
    /// - `Exit` records the error and exit code, stops the remaining
    ///   actions, and returns cleanly; the pipeline stops at the wave
    ///   boundary.
    /// - `Continue` logs and proceeds to the next action.
    ///
    /// # Errors
    ///
    /// Returns the failure of a `Raise`-policy action, or a skip-predicate
    /// evaluation failure.
    pub async fn run(&self) -> Result<(), PidlError> {
        let start = Instant::now();
        self.events.emit(&PipelineEvent::task_start(&self.name));

        let actions: Vec<Arc<dyn Action>> = self.actions.read().clone();
        for action in actions {
            let label = action.label();
            if action.should_skip(&self.context)? {
                debug!(task = %self.name, action = %label, "skipping action");
                continue;
            }

            self.events.emit(&PipelineEvent::action_start(&label));
            let action_start = Instant::now();

            match action.run(&self.context).await {
                Ok(()) => {
                    self.events
                        .emit(&PipelineEvent::action_end(&label, duration_ms(action_start)));
                }
                Err(err) if action.raise_on_error() => {
                    self.context.set("error", err.to_string());
                    return Err(err);
                }
                Err(err) if action.exit_on_error() => {
                    self.context.set("error", err.to_string());
                    let code = action.exit_code();
                    {
                        let mut state = self.state.write();
                        state.exit = true;
                        state.exit_code = code;
                    }
                    self.context.set("exit_code", code);
                    break;
                }
                Err(err) => {
                    warn!(
                        task = %self.name,
                        action = %label,
                        error = %err,
                        "action failed; continuing"
                    );
                }
            }
        }

        self.events
            .emit(&PipelineEvent::task_end(&self.name, duration_ms(start)));
        Ok(())
    }

    /// Describes the task and its actions for a plan walkthrough.
    #[must_use]
    pub fn dry_run(&self) -> String {
        let mut out = String::from(self.name.as_str());
        for action in self.actions.read().iter() {
            out.push_str("\n    - ");
            out.push_str(&action.dry_run());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ErrorPolicy, FnAction, NoOpAction};
    use crate::events::EventKind;
    use parking_lot::Mutex;
    use serde_json::json;

    fn task(name: &str) -> Task {
        Task::new(name, Arc::new(Context::new()))
    }

    fn seen(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn record_events(task: &Task) -> Arc<Mutex<Vec<PipelineEvent>>> {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        task.events()
            .on_all(Arc::new(move |event: &PipelineEvent| {
                sink.lock().push(event.clone());
            }));
        recorded
    }

    #[test]
    fn test_first_iff_no_prerequisites() {
        let t = task("t");
        assert!(t.is_first());
        assert!(t.is_ready(&seen(&[])));

        t.after(["a"]);
        assert!(!t.is_first());
        assert!(!t.is_ready(&seen(&[])));
    }

    #[test]
    fn test_ready_requires_every_prerequisite() {
        let t = task("t");
        t.after(["a", "b"]);
        assert!(!t.is_ready(&seen(&["a"])));
        assert!(t.is_ready(&seen(&["a", "b", "c"])));
    }

    #[test]
    fn test_after_accumulates_and_dedupes() {
        let t = task("t");
        t.after(["a"]);
        t.after(["b", "a"]);
        assert_eq!(t.prerequisites(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_duplicate_action_registration_appends() {
        let t = task("t");
        t.add_action(Arc::new(NoOpAction::new("same"))).unwrap();
        t.add_action(Arc::new(NoOpAction::new("same"))).unwrap();
        assert_eq!(t.action_count(), 2);
    }

    #[tokio::test]
    async fn test_run_emits_paired_events() {
        let t = task("load");
        t.add_action(Arc::new(NoOpAction::new("a1"))).unwrap();
        let recorded = record_events(&t);

        t.run().await.unwrap();

        let events = recorded.lock();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].kind(), EventKind::TaskStart);
        assert_eq!(events[1].kind(), EventKind::ActionStart);
        assert_eq!(events[2].kind(), EventKind::ActionEnd);
        assert_eq!(events[3].kind(), EventKind::TaskEnd);
    }

    #[tokio::test]
    async fn test_raise_policy_aborts_without_end_events() {
        let ctx = Arc::new(Context::new());
        let t = Task::new("boom", ctx.clone());
        t.add_action(Arc::new(FnAction::new("fail", |_: &Context| {
            Err(PidlError::action("boom"))
        })))
        .unwrap();
        let recorded = record_events(&t);

        let err = t.run().await.unwrap_err();

        assert_eq!(err, PidlError::Action("boom".to_string()));
        assert_eq!(ctx.get("error"), json!("boom"));
        assert!(t.errored());

        let kinds: Vec<EventKind> = recorded.lock().iter().map(PipelineEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::TaskStart, EventKind::ActionStart]);
    }

    #[tokio::test]
    async fn test_exit_policy_stops_task_and_records_code() {
        let ctx = Arc::new(Context::new());
        let t = Task::new("x", ctx.clone());
        t.add_action(Arc::new(
            FnAction::new("fail", |_: &Context| Err(PidlError::action("db down")))
                .with_policy(ErrorPolicy::Exit)
                .with_exit_code(101),
        ))
        .unwrap();
        let ran_after = Arc::new(Mutex::new(false));
        let flag = ran_after.clone();
        t.add_action(Arc::new(FnAction::new("later", move |_: &Context| {
            *flag.lock() = true;
            Ok(())
        })))
        .unwrap();
        let recorded = record_events(&t);

        t.run().await.unwrap();

        assert!(t.exited());
        assert_eq!(t.exit_code(), 101);
        assert_eq!(ctx.get("exit_code"), json!(101));
        assert_eq!(ctx.get("error"), json!("db down"));
        assert!(!*ran_after.lock());

        // task_end still emitted: the task returned cleanly.
        let kinds: Vec<EventKind> = recorded.lock().iter().map(PipelineEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::TaskStart, EventKind::ActionStart, EventKind::TaskEnd]
        );
    }

    #[tokio::test]
    async fn test_continue_policy_proceeds() {
        let ctx = Arc::new(Context::new());
        let t = Task::new("t", ctx.clone());
        t.add_action(Arc::new(
            FnAction::new("flaky", |_: &Context| Err(PidlError::action("transient")))
                .with_policy(ErrorPolicy::Continue),
        ))
        .unwrap();
        t.add_action(Arc::new(FnAction::new("after", |ctx: &Context| {
            ctx.set("reached", true);
            Ok(())
        })))
        .unwrap();

        t.run().await.unwrap();

        assert_eq!(ctx.get("reached"), json!(true));
        assert!(!t.exited());
    }

    #[tokio::test]
    async fn test_skipped_action_not_run() {
        let ctx = Arc::new(Context::new());
        let t = Task::new("t", ctx.clone());
        t.add_action(Arc::new(
            FnAction::new("guarded", |ctx: &Context| {
                ctx.set("ran", true);
                Ok(())
            })
            .with_skip_rule(crate::condition::SkipRule::from_value(false)),
        ))
        .unwrap();
        let recorded = record_events(&t);

        t.run().await.unwrap();

        assert!(!ctx.is_set("ran"));
        let kinds: Vec<EventKind> = recorded.lock().iter().map(PipelineEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::TaskStart, EventKind::TaskEnd]);
    }

    #[tokio::test]
    async fn test_reset_run_state() {
        let t = task("t");
        t.add_action(Arc::new(
            FnAction::new("fail", |_: &Context| Err(PidlError::action("bad state")))
                .with_policy(ErrorPolicy::Exit)
                .with_exit_code(3),
        ))
        .unwrap();

        t.run().await.unwrap();
        assert!(t.exited());
        assert_eq!(t.exit_code(), 3);

        t.reset_run_state();
        assert!(!t.exited());
        assert_eq!(t.exit_code(), 0);
    }

    #[test]
    fn test_task_skip_rule() {
        let t = task("t");
        assert!(!t.should_skip().unwrap());
        t.set_skip_rule(SkipRule::from_value(false));
        assert!(t.should_skip().unwrap());
    }

    #[test]
    fn test_dry_run_lists_actions() {
        let t = task("load");
        t.add_action(Arc::new(NoOpAction::new("a"))).unwrap();
        t.add_action(Arc::new(NoOpAction::new("b"))).unwrap();

        let description = t.dry_run();
        assert!(description.starts_with("load"));
        assert!(description.contains("NoOpAction:a:noop"));
        assert!(description.contains("NoOpAction:b:noop"));
    }
}
