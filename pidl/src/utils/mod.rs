//! Timestamp and run-identifier helpers.

mod ids;
mod timestamps;

pub use ids::generate_run_id;
pub use timestamps::{duration_ms, iso_timestamp, now_utc, Timestamp};
