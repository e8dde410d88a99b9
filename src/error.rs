//! Error taxonomy for the scheduler core.
//!
//! `Scheduler::solve` never lets one of these escape its own boundary: every
//! variant is folded into `SolveResponse::Failure` before it reaches a
//! caller. They exist so the internal stages can compose with `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("no feasible schedule exists for the given constraints")]
    Infeasible,
}

impl ScheduleError {
    /// The fixed, caller-facing message for an unsolvable request. Time
    /// exhaustion without a feasible solution collapses to this same
    /// message: no partial schedule is ever emitted, and the caller can't
    /// tell the two failure modes apart.
    pub fn user_message(&self) -> String {
        match self {
            ScheduleError::InvalidInput(msg) => msg.clone(),
            ScheduleError::Infeasible => {
                "no schedule satisfies these constraints; relax unavailability, fixed days off, \
                 or score bounds and try again"
                    .to_string()
            }
        }
    }
}
