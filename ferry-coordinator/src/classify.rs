//! Aggregate-state classification and ETA estimation
//!
//! The ETA is a deliberate linear extrapolation from elapsed time and
//! percent complete (rate assumed constant). Downstream consumers pin their
//! expectations to this exact formula, including the withheld ETA at 0% and
//! 100%, so it must not be "improved."

use serde::{Deserialize, Serialize};

/// Smallest elapsed interval used in rate estimation, in seconds.
const MIN_ELAPSED_SECS: f64 = 0.001;

/// Operator-facing state of a backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Completed,
    Running,
    Paused,
}

/// Result of classifying aggregate counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub state: StepState,
    pub percentage: f64,
    pub eta_ms: Option<f64>,
}

/// Estimated milliseconds remaining:
/// `elapsed_secs * (100 - pct) / pct * 1000`.
///
/// Returns `None` without a start time, and at 0% (no rate yet) or >= 100%
/// (nothing remaining).
pub fn estimate_eta_ms(started_epoch: Option<i64>, percentage: f64, now_epoch: f64) -> Option<f64> {
    let started = started_epoch?;
    if percentage <= 0.0 || percentage >= 100.0 {
        return None;
    }
    let elapsed_secs = (now_epoch - started as f64).max(MIN_ELAPSED_SECS);
    let remaining_factor = (100.0 - percentage) / percentage;
    Some(elapsed_secs * remaining_factor * 1000.0)
}

/// Map aggregate counts plus the externally supplied worker-activity signal
/// into an overall state.
///
/// - nothing to do, or everything done: `Completed` at 100%, no ETA;
/// - workers active: `Running` with a linear ETA;
/// - otherwise: `Paused` (a paused queue has no meaningful rate).
pub fn classify(
    total: u64,
    completed: u64,
    started_epoch: Option<i64>,
    active_workers: bool,
    now_epoch: f64,
) -> Classification {
    if total == 0 || completed >= total {
        return Classification {
            state: StepState::Completed,
            percentage: 100.0,
            eta_ms: None,
        };
    }

    let percentage = completed as f64 / total as f64 * 100.0;
    if active_workers {
        Classification {
            state: StepState::Running,
            percentage,
            eta_ms: estimate_eta_ms(started_epoch, percentage, now_epoch),
        }
    } else {
        Classification {
            state: StepState::Paused,
            percentage,
            eta_ms: None,
        }
    }
}
