//! Shared key/value state plus read-only named views.
//!
//! One [`Context`] is shared by reference across a pipeline, its tasks and
//! their actions for the duration of a run.

mod store;
mod views;

pub use store::{Context, ContextBuilder};
pub use views::ContextView;
