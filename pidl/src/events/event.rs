//! Lifecycle events emitted by pipelines, tasks and actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The subscription key for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A pipeline run began.
    PipelineStart,
    /// A pipeline run finished.
    PipelineEnd,
    /// A task began.
    TaskStart,
    /// A task finished.
    TaskEnd,
    /// An action began.
    ActionStart,
    /// An action finished.
    ActionEnd,
}

impl EventKind {
    /// Every kind, in lifecycle order. Used to bind forwarding handlers to
    /// a task's whole event stream.
    pub const ALL: [EventKind; 6] = [
        EventKind::PipelineStart,
        EventKind::PipelineEnd,
        EventKind::TaskStart,
        EventKind::TaskEnd,
        EventKind::ActionStart,
        EventKind::ActionEnd,
    ];

    /// The event name as emitted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PipelineStart => "pipeline_start",
            EventKind::PipelineEnd => "pipeline_end",
            EventKind::TaskStart => "task_start",
            EventKind::TaskEnd => "task_end",
            EventKind::ActionStart => "action_start",
            EventKind::ActionEnd => "action_end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event observed on a pipeline or task emitter.
///
/// `duration_ms` payloads are whole milliseconds. The `action` payload is
/// the action string form `"<type>:<name>:<verb>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A pipeline run began.
    PipelineStart {
        /// The pipeline name.
        name: String,
    },
    /// A pipeline run finished.
    PipelineEnd {
        /// The pipeline name.
        name: String,
        /// Elapsed run time in whole milliseconds.
        duration_ms: u64,
    },
    /// A task began.
    TaskStart {
        /// The task name.
        name: String,
    },
    /// A task finished.
    TaskEnd {
        /// The task name.
        name: String,
        /// Elapsed task time in whole milliseconds.
        duration_ms: u64,
    },
    /// An action began.
    ActionStart {
        /// The action string form.
        action: String,
    },
    /// An action finished.
    ActionEnd {
        /// The action string form.
        action: String,
        /// Elapsed action time in whole milliseconds.
        duration_ms: u64,
    },
}

impl PipelineEvent {
    /// Returns the subscription key for this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::PipelineStart { .. } => EventKind::PipelineStart,
            PipelineEvent::PipelineEnd { .. } => EventKind::PipelineEnd,
            PipelineEvent::TaskStart { .. } => EventKind::TaskStart,
            PipelineEvent::TaskEnd { .. } => EventKind::TaskEnd,
            PipelineEvent::ActionStart { .. } => EventKind::ActionStart,
            PipelineEvent::ActionEnd { .. } => EventKind::ActionEnd,
        }
    }

    /// Creates a `pipeline_start` event.
    #[must_use]
    pub fn pipeline_start(name: impl Into<String>) -> Self {
        Self::PipelineStart { name: name.into() }
    }

    /// Creates a `pipeline_end` event.
    #[must_use]
    pub fn pipeline_end(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::PipelineEnd {
            name: name.into(),
            duration_ms,
        }
    }

    /// Creates a `task_start` event.
    #[must_use]
    pub fn task_start(name: impl Into<String>) -> Self {
        Self::TaskStart { name: name.into() }
    }

    /// Creates a `task_end` event.
    #[must_use]
    pub fn task_end(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::TaskEnd {
            name: name.into(),
            duration_ms,
        }
    }

    /// Creates an `action_start` event.
    #[must_use]
    pub fn action_start(action: impl Into<String>) -> Self {
        Self::ActionStart {
            action: action.into(),
        }
    }

    /// Creates an `action_end` event.
    #[must_use]
    pub fn action_end(action: impl Into<String>, duration_ms: u64) -> Self {
        Self::ActionEnd {
            action: action.into(),
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            PipelineEvent::task_start("t").kind(),
            EventKind::TaskStart
        );
        assert_eq!(
            PipelineEvent::action_end("A:a:run", 12).kind(),
            EventKind::ActionEnd
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EventKind::PipelineStart.as_str(), "pipeline_start");
        assert_eq!(EventKind::ActionEnd.to_string(), "action_end");
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = PipelineEvent::task_end("load", 250);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("task_end"));

        let back: PipelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
