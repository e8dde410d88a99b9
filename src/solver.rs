//! Solver driver: turns `selen`'s feasibility search into a bound-tightening
//! optimizer under a wall-clock budget.
//!
//! State machine: `Constructed -> ModelBuilt -> (Solved{Optimal|Feasible} |
//! Infeasible)`. `ModelBuilt` is implicit here: each loop iteration rebuilds
//! the model with a tighter `total_penalty` ceiling and solves it fresh,
//! since `selen` has no incremental re-solve to drive.

use std::time::{Duration, Instant};

use selen::prelude::*;

use crate::calendar::MonthCalendar;
use crate::config::SolverConfig;
use crate::domain::{Decimal1, DayAssignment, DoctorId, Schedule, SolveRequest, SolveStatus};
use crate::error::ScheduleError;
use crate::model::{self, BuiltModel};

/// Runs the bound-tightening search:
///
/// 1. Solve with no ceiling on `total_penalty`. No feasible point at all ->
///    `Infeasible`.
/// 2. Record the feasible solution's penalty, rebuild with
///    `total_penalty <= best - 1`, and re-solve. Repeat.
/// 3. Stop when a rebuild is infeasible (the prior solution is optimal) or
///    the wall-clock budget is exhausted.
///
/// Each `selen` solve is itself capped at the time remaining in the budget,
/// not just the outer loop, so a single hard attempt can't run past the
/// deadline on its own.
pub fn drive(
    req: &SolveRequest,
    cal: &MonthCalendar,
    config: &SolverConfig,
) -> Result<Schedule, ScheduleError> {
    let deadline = Instant::now() + config.wall_clock_budget;

    let mut best: Option<(BuiltModel, Solution)> = None;
    let mut ceiling: Option<i64> = None;
    let mut proved_optimal = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let built = model::build(req, cal, ceiling, remaining)?;
        match built.model.solve() {
            Ok(solution) => {
                let penalty = solution.get::<i32>(built.total_penalty) as i64;
                let next_ceiling = penalty - 1;
                best = Some((built, solution));
                if next_ceiling < 0 {
                    // A zero-penalty solution can't be tightened further.
                    proved_optimal = true;
                    break;
                }
                ceiling = Some(next_ceiling);
            }
            Err(_) => {
                if best.is_some() {
                    proved_optimal = true;
                }
                break;
            }
        }
    }

    let (built, solution) = match best {
        Some(pair) => pair,
        None => return Err(ScheduleError::Infeasible),
    };

    let status = if proved_optimal {
        SolveStatus::Optimal
    } else {
        SolveStatus::Feasible
    };

    Ok(extract(req, cal, &built, &solution, status))
}

/// Reads the unique `night`/`day` doctor per day and the score map off a
/// solved model. Uniqueness is guaranteed by the slot-filling hard
/// constraint, not re-checked here.
fn extract(
    req: &SolveRequest,
    cal: &MonthCalendar,
    built: &BuiltModel,
    solution: &Solution,
    status: SolveStatus,
) -> Schedule {
    let num_days = cal.num_days as usize;

    let mut schedule = Vec::with_capacity(num_days);
    for t in 0..num_days {
        let info = &cal.days[t];
        let night_shift = (0..req.num_doctors)
            .find(|&d| solution.get::<i32>(built.night[d][t]) == 1)
            .map(DoctorId)
            .expect("slot-filling constraint guarantees exactly one night doctor");

        let day_shift = if info.is_sun_or_holiday() {
            (0..req.num_doctors)
                .find(|&d| solution.get::<i32>(built.day_shift[d][t]) == 1)
                .map(DoctorId)
        } else {
            None
        };

        schedule.push(DayAssignment {
            day: info.day,
            is_sunhol: info.is_sun_or_holiday(),
            day_shift,
            night_shift,
        });
    }

    let scores = (0..req.num_doctors)
        .map(|d| {
            let scaled = solution.get::<i32>(built.score[d]) as i64;
            (DoctorId(d), Decimal1::from_scaled(scaled))
        })
        .collect();

    Schedule {
        status,
        schedule,
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use crate::domain::ObjectiveWeights;
    use std::collections::{BTreeMap, BTreeSet};

    fn base_request(num_doctors: usize) -> SolveRequest {
        SolveRequest {
            year: 2024,
            month: 4,
            num_doctors,
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
    fn weekday_only_month_succeeds_with_no_day_shifts() {
        let req = base_request(6);
        let cal = calendar::classify(req.year, req.month, &req.holidays);
        let config = SolverConfig::default();

        let result = drive(&req, &cal, &config).expect("feasible");
        assert_eq!(result.schedule.len(), cal.num_days as usize);
        for day in &result.schedule {
            assert!(!day.is_sunhol);
            assert!(day.day_shift.is_none());
        }
    }

    #[test]
    fn tight_score_bounds_either_fail_or_hit_exactly() {
        let mut req = base_request(8);
        req.score_min = 2.0;
        req.score_max = 2.0;
        let cal = calendar::classify(req.year, req.month, &req.holidays);
        let config = SolverConfig::default();

        match drive(&req, &cal, &config) {
            Ok(result) => {
                for score in result.scores.values() {
                    assert_eq!(score.to_f64(), 2.0);
                }
            }
            Err(ScheduleError::Infeasible) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
