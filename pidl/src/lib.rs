//! # Pidl
//!
//! A library for orchestrating dependent pipelines of work.
//!
//! A pipeline is a collection of named **tasks**, each an ordered list of
//! named **actions**. Tasks declare prerequisites on other tasks by name;
//! the pipeline derives a wave-grouped execution plan honoring those
//! dependencies and runs waves either concurrently (with an optional
//! concurrency cap) or strictly serially. Around that core sit per-action
//! error policies, cleanup via an error handler task, lazily resolved
//! context values, and lifecycle event emission.
//!
//! ## Quick start
//!
//! ```rust
//! use pidl::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), PidlError> {
//! let context = Arc::new(Context::new());
//! let mut pipeline = Pipeline::new("etl", context, PipelineOptions::default());
//!
//! pipeline.add_task("extract", |t| {
//!     t.add_action(Arc::new(FnAction::new("fetch", |ctx: &Context| {
//!         ctx.set("rows", 42);
//!         Ok(())
//!     })))?;
//!     Ok(())
//! })?;
//! pipeline.add_task("load", |t| {
//!     t.after(["extract"]);
//!     t.add_action(Arc::new(FnAction::new("insert", |ctx: &Context| {
//!         assert_eq!(ctx.get("rows"), serde_json::json!(42));
//!         Ok(())
//!     })))?;
//!     Ok(())
//! })?;
//!
//! assert_eq!(
//!     pipeline.explain()?,
//!     vec![vec!["extract".to_string()], vec!["load".to_string()]]
//! );
//! pipeline.run().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod action;
pub mod condition;
pub mod context;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod promise;
pub mod task;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{
        Action, ActionCore, ActionRegistry, ErrorPolicy, FnAction, NoOpAction,
    };
    pub use crate::condition::SkipRule;
    pub use crate::context::{Context, ContextBuilder, ContextView};
    pub use crate::errors::PidlError;
    pub use crate::events::{EventEmitter, EventKind, PipelineEvent};
    pub use crate::pipeline::{Pipeline, PipelineOptions, TaskBuilder, WavePlan};
    pub use crate::promise::Promise;
    pub use crate::task::Task;
}

#[cfg(test)]
mod tests {
    #[test]
    fn library_compiles() {
        assert!(true);
    }
}
