//! Monthly on-call scheduler for a physician roster.
//!
//! `Scheduler::solve` is the crate's single entry point: it runs the
//! calendar classifier, the model builder, and the solver driver in strict
//! order and folds every outcome into a `SolveResponse`, never letting an
//! internal error escape its own boundary.

pub mod api;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod solver;

use crate::config::SolverConfig;
use crate::domain::{SolveRequest, SolveResponse};

/// Zero-field facade over the three solve stages. Owns no state across
/// calls, so concurrent solves just mean separate `Scheduler`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct Scheduler {
    config: SolverConfig,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Runs calendar classification, model construction, and the solver
    /// driver in order. Never panics and never returns `Err`: both the
    /// happy and infeasible paths become `SolveResponse` variants.
    pub fn solve(&self, req: &SolveRequest) -> SolveResponse {
        let span = tracing::info_span!(
            "solve",
            year = req.year,
            month = req.month,
            num_doctors = req.num_doctors,
        );
        let _enter = span.enter();

        if let Err(err) = req.validate() {
            tracing::warn!(error = %err, "rejected invalid request");
            return SolveResponse::Failure {
                message: err.user_message(),
            };
        }

        let cal = tracing::info_span!("calendar").in_scope(|| {
            calendar::classify(req.year, req.month, &req.holidays)
        });

        let result = tracing::info_span!("solve_driver", num_days = cal.num_days)
            .in_scope(|| solver::drive(req, &cal, &self.config));

        match result {
            Ok(schedule) => {
                tracing::info!(status = ?schedule.status, "solve succeeded");
                SolveResponse::Success {
                    status: schedule.status,
                    schedule: schedule.schedule,
                    scores: schedule.scores,
                }
            }
            Err(err @ error::ScheduleError::Infeasible) => {
                tracing::error!(error = %err, "solve failed");
                SolveResponse::Failure {
                    message: err.user_message(),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected invalid request");
                SolveResponse::Failure {
                    message: err.user_message(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObjectiveWeights;
    use std::collections::{BTreeMap, BTreeSet};

    fn base_request() -> SolveRequest {
        SolveRequest {
            year: 2024,
            month: 4,
            num_doctors: 6,
            holidays: BTreeSet::new(),
            unavailable: BTreeMap::new(),
            fixed_unavailable_weekdays: BTreeMap::new(),
            clinic_weekdays: BTreeMap::new(),
            prev_month_worked_days: BTreeMap::new(),
            prev_month_last_day: None,
            sat_prev: BTreeMap::new(),
            score_min: 0.0,
            score_max: 100.0,
            min_score: BTreeMap::new(),
            max_score: BTreeMap::new(),
            target_score: BTreeMap::new(),
            past_total_scores: BTreeMap::new(),
            past_sat_counts: Vec::new(),
            past_sunhol_counts: Vec::new(),
            objective_weights: ObjectiveWeights::default(),
        }
    }

    #[test]
    fn invalid_month_is_rejected_without_touching_the_solver() {
        let mut req = base_request();
        req.month = 13;
        let scheduler = Scheduler::new();
        match scheduler.solve(&req) {
            SolveResponse::Failure { message } => assert!(message.contains("month")),
            SolveResponse::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn valid_request_succeeds() {
        let scheduler = Scheduler::new();
        match scheduler.solve(&base_request()) {
            SolveResponse::Success { schedule, .. } => assert_eq!(schedule.len(), 30),
            SolveResponse::Failure { message } => panic!("unexpected failure: {message}"),
        }
    }
}
