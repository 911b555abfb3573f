//! Run identifier generation.

use uuid::Uuid;

/// Generates the UUID v4 written into the context as `run_id` at dispatch.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}
