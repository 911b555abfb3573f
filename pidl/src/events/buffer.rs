//! Cross-task event capture for concurrent waves.

use super::emitter::EventEmitter;
use super::event::PipelineEvent;
use parking_lot::Mutex;

/// A mutex-guarded buffer that captures events emitted by tasks running
/// concurrently, for in-order replay on the dispatcher after the wave
/// barrier. Subscribers of pipeline events therefore observe a
/// single-threaded stream.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Mutex<Vec<PipelineEvent>>,
}

impl EventBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures one event. Called from the thread performing the emit.
    pub fn push(&self, event: PipelineEvent) {
        self.events.lock().push(event);
    }

    /// Takes all captured events, oldest first, leaving the buffer empty.
    #[must_use]
    pub fn drain(&self) -> Vec<PipelineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Drains the buffer and re-emits every event on `emitter`, preserving
    /// capture order.
    pub fn replay(&self, emitter: &EventEmitter) {
        for event in self.drain() {
            emitter.emit(&event);
        }
    }

    /// Returns the number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
