//! Per-action error policy and exit-code normalization.

use crate::errors::PidlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// What happens when an action's `run` fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Re-raise out of the task, aborting it and the pipeline.
    #[default]
    Raise,
    /// Swallow locally; the task sets its exit flag and exit code, and the
    /// pipeline terminates after the current wave.
    Exit,
    /// Swallow and log; subsequent actions in the task still run.
    Continue,
}

impl ErrorPolicy {
    /// True iff failures re-raise.
    #[must_use]
    pub fn raises(self) -> bool {
        self == ErrorPolicy::Raise
    }

    /// True iff failures request pipeline termination.
    #[must_use]
    pub fn exits(self) -> bool {
        self == ErrorPolicy::Exit
    }
}

impl FromStr for ErrorPolicy {
    type Err = PidlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raise" => Ok(ErrorPolicy::Raise),
            "exit" => Ok(ErrorPolicy::Exit),
            "continue" => Ok(ErrorPolicy::Continue),
            _ => Err(PidlError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorPolicy::Raise => "raise",
            ErrorPolicy::Exit => "exit",
            ErrorPolicy::Continue => "continue",
        };
        f.write_str(s)
    }
}

/// Normalizes a configured exit code: `0` stays `0`, anything that coerces
/// to a non-zero integer becomes that integer, and non-numeric input
/// becomes `1`.
#[must_use]
pub fn normalize_exit_code(code: &Value) -> i32 {
    match code {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                clamp_code(i)
            } else if let Some(f) = n.as_f64() {
                clamp_code(f as i64)
            } else {
                1
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => clamp_code(i),
            Err(_) => 1,
        },
        _ => 1,
    }
}

/// Values outside the `i32` range do not coerce and fold to 1.
fn clamp_code(code: i64) -> i32 {
    i32::try_from(code).unwrap_or(1)
}
