//! Model builder: declares the decision variables, posts every hard
//! constraint, and assembles the weighted soft-objective as a single
//! `total_penalty` variable.
//!
//! Built on `selen`, a dependency-free CSP solver over bounded integer
//! variables with linear sum/comparison constraints. `selen` has no
//! built-in weighted-objective minimization, so this module only builds a
//! feasibility model with `total_penalty` as an ordinary variable; the
//! bound-tightening search that actually minimizes it lives in `solver.rs`.
//! Every comparison here reduces to `sum(...).eq/.le/.ge(sum(...))` so the
//! model never needs subtraction or scalar multiplication primitives:
//! coefficients are encoded by repeating a variable in the summed list,
//! and constants by a once-created fixed-domain variable (`m.int(c, c)`).

use std::collections::HashMap;
use std::time::Duration;

use selen::prelude::*;

use crate::calendar::MonthCalendar;
use crate::config::SCORE_VAR_UPPER_BOUND;
use crate::domain::{Decimal1, DoctorId, ObjectiveWeights, SolveRequest};
use crate::error::ScheduleError;

/// Generous ceiling for the summed weighted objective. Not part of the
/// data model: purely an implementation bound on the `total_penalty`
/// variable's domain.
const PENALTY_UPPER_BOUND: i32 = 2_000_000;

pub struct BuiltModel {
    pub model: Model,
    pub night: Vec<Vec<VarId>>,
    pub day_shift: Vec<Vec<VarId>>,
    pub score: Vec<VarId>,
    pub total_penalty: VarId,
}

/// Builds the CSP model for one solve attempt. `penalty_ceiling`, when
/// present, posts `total_penalty <= ceiling`: the bound-tightening search
/// driver's mechanism for turning repeated feasibility checks into an
/// optimization (see `solver.rs`). `time_budget` caps the search `selen`
/// itself runs on this attempt, so a single hard instance can't overrun
/// the caller's wall-clock budget.
pub fn build(
    req: &SolveRequest,
    cal: &MonthCalendar,
    penalty_ceiling: Option<i64>,
    time_budget: Duration,
) -> Result<BuiltModel, ScheduleError> {
    let num_doctors = req.num_doctors;
    let num_days = cal.num_days as usize;
    let weights = &req.objective_weights;

    let config = SolverConfig::default().with_timeout(time_budget);
    let mut m = Model::with_config(config);
    let mut const_cache: HashMap<i64, VarId> = HashMap::new();

    let blocked = compute_blocked(req, cal);

    let (night, day_shift) = declare_shift_variables(&mut m, cal, &blocked, num_doctors, num_days);

    post_slot_filling(&mut m, cal, &night, &day_shift, num_doctors, num_days);
    post_min_spacing(&mut m, &night, &day_shift, num_doctors, num_days);

    let sunhol_days: Vec<usize> = (0..num_days).filter(|&t| cal.days[t].is_sun_or_holiday()).collect();
    let sat_days: Vec<usize> = (0..num_days).filter(|&t| cal.days[t].is_saturday()).collect();

    let sat_night_total = post_saturday_cap(&mut m, &night, &sat_days, num_doctors);
    let (sunhol_day_total, sunhol_total) =
        post_sunhol_caps(&mut m, &night, &day_shift, &sunhol_days, num_doctors);

    let score = post_score_and_bounds(&mut m, req, cal, &night, &day_shift, num_doctors, num_days)?;

    let mut total_terms: Vec<VarId> = vec![konst(&mut m, &mut const_cache, 0)];

    post_month_fairness(&mut m, &score, num_doctors, weights, &mut total_terms);
    post_past_gap(
        &mut m,
        &mut const_cache,
        &sat_night_total,
        num_doctors,
        |d| req.past_sat_count(DoctorId(d)),
        weights.past_sat_gap,
        &mut total_terms,
    );
    post_past_gap(
        &mut m,
        &mut const_cache,
        &sunhol_total,
        num_doctors,
        |d| req.past_sunhol_count(DoctorId(d)),
        weights.past_sunhol_gap,
        &mut total_terms,
    );

    let one_var = konst(&mut m, &mut const_cache, 1);
    post_gap_offset(&mut m, &night, &day_shift, num_doctors, num_days, 5, one_var, weights.gap5, &mut total_terms);
    post_gap_offset(&mut m, &night, &day_shift, num_doctors, num_days, 6, one_var, weights.gap6, &mut total_terms);

    post_pre_clinic(req, cal, &night, num_doctors, num_days, weights.pre_clinic, &mut total_terms);
    post_sat_consec(req, &sat_night_total, num_doctors, weights.sat_consec, &mut total_terms);
    post_target(&mut m, &mut const_cache, req, &score, num_doctors, weights.target, &mut total_terms);
    post_sunhol_3rd(&mut m, &mut const_cache, &sunhol_total, num_doctors, weights.sunhol_3rd, &mut total_terms);

    let total_expr = m.sum(&total_terms);
    let total_penalty = m.int(0, PENALTY_UPPER_BOUND);
    m.c(total_expr).eq(total_penalty);

    if let Some(ceiling) = penalty_ceiling {
        let ceiling = ceiling.clamp(0, PENALTY_UPPER_BOUND as i64) as i32;
        m.c(total_penalty).le(int(ceiling));
    }

    Ok(BuiltModel {
        model: m,
        night,
        day_shift,
        score,
        total_penalty,
    })
}

/// `work[d,t] = 0` sites: per-day unavailability, fixed-weekday
/// unavailability and its eve, and the cross-month-spacing prefix (spec
/// hard constraints 3, 4, 6). Folded into variable domains at creation
/// time rather than posted as separate constraints.
fn compute_blocked(req: &SolveRequest, cal: &MonthCalendar) -> Vec<Vec<bool>> {
    let num_doctors = req.num_doctors;
    let num_days = cal.num_days as usize;
    let mut blocked = vec![vec![false; num_days]; num_doctors];

    for (doc, days) in &req.unavailable {
        if doc.0 >= num_doctors {
            continue;
        }
        for &day in days {
            if day >= 1 && (day as usize) <= num_days {
                blocked[doc.0][(day - 1) as usize] = true;
            }
        }
    }

    for (doc, weekdays) in &req.fixed_unavailable_weekdays {
        if doc.0 >= num_doctors {
            continue;
        }
        for t in 0..num_days {
            if weekdays.contains(&cal.days[t].weekday) {
                blocked[doc.0][t] = true;
                if t > 0 {
                    blocked[doc.0][t - 1] = true;
                }
            }
        }
    }

    if let Some(prev_last) = req.prev_month_last_day {
        for (doc, worked) in &req.prev_month_worked_days {
            if doc.0 >= num_doctors {
                continue;
            }
            for &prev_day in worked {
                let dist = prev_last as i64 - prev_day as i64 + 1;
                if (1..=4).contains(&dist) {
                    let end = ((5 - dist) as usize).min(num_days);
                    for t in 1..=end {
                        blocked[doc.0][t - 1] = true;
                    }
                }
            }
        }
    }

    blocked
}

fn declare_shift_variables(
    m: &mut Model,
    cal: &MonthCalendar,
    blocked: &[Vec<bool>],
    num_doctors: usize,
    num_days: usize,
) -> (Vec<Vec<VarId>>, Vec<Vec<VarId>>) {
    let mut night = vec![Vec::with_capacity(num_days); num_doctors];
    let mut day_shift = vec![Vec::with_capacity(num_days); num_doctors];

    for d in 0..num_doctors {
        for t in 0..num_days {
            let is_blocked = blocked[d][t];
            let night_var = if is_blocked { m.int(0, 0) } else { m.int(0, 1) };
            let day_var = if cal.days[t].is_sun_or_holiday() && !is_blocked {
                m.int(0, 1)
            } else {
                m.int(0, 0)
            };
            // work = night + day; no-double-duty follows for free since
            // work's domain caps the sum at 1.
            let work_var = m.int(0, 1);
            let sum_nd = m.sum(&[night_var, day_var]);
            m.c(sum_nd).eq(work_var);

            night[d].push(night_var);
            day_shift[d].push(day_var);
        }
    }

    (night, day_shift)
}

fn post_slot_filling(
    m: &mut Model,
    cal: &MonthCalendar,
    night: &[Vec<VarId>],
    day_shift: &[Vec<VarId>],
    num_doctors: usize,
    num_days: usize,
) {
    for t in 0..num_days {
        let night_col: Vec<VarId> = (0..num_doctors).map(|d| night[d][t]).collect();
        let s = m.sum(&night_col);
        m.c(s).eq(int(1));

        if cal.days[t].is_sun_or_holiday() {
            let day_col: Vec<VarId> = (0..num_doctors).map(|d| day_shift[d][t]).collect();
            let s = m.sum(&day_col);
            m.c(s).eq(int(1));
        }
    }
}

fn post_min_spacing(
    m: &mut Model,
    night: &[Vec<VarId>],
    day_shift: &[Vec<VarId>],
    num_doctors: usize,
    num_days: usize,
) {
    let work_of = |d: usize, t: usize, night: &[Vec<VarId>], day_shift: &[Vec<VarId>]| -> [VarId; 2] {
        [night[d][t], day_shift[d][t]]
    };
    for d in 0..num_doctors {
        for t in 0..num_days {
            for k in 1..=4usize {
                if t + k < num_days {
                    let lhs = work_of(d, t, night, day_shift);
                    let rhs = work_of(d, t + k, night, day_shift);
                    // work[d,t] + work[d,t+k] <= 1, work expressed inline
                    // as night+day since no standalone work var escapes
                    // this function.
                    let lhs_sum = m.sum(&lhs);
                    let rhs_sum = m.sum(&rhs);
                    let total = m.sum(&[lhs_sum, rhs_sum]);
                    m.c(total).le(int(1));
                }
            }
        }
    }
}

fn materialize_sum(m: &mut Model, vars: &[VarId], upper: i32) -> VarId {
    if vars.is_empty() {
        return m.int(0, 0);
    }
    let total = m.int(0, upper.max(1));
    let s = m.sum(vars);
    m.c(s).eq(total);
    total
}

fn post_saturday_cap(
    m: &mut Model,
    night: &[Vec<VarId>],
    sat_days: &[usize],
    num_doctors: usize,
) -> Vec<VarId> {
    let mut totals = Vec::with_capacity(num_doctors);
    for d in 0..num_doctors {
        let vars: Vec<VarId> = sat_days.iter().map(|&t| night[d][t]).collect();
        let total = materialize_sum(m, &vars, vars.len() as i32);
        m.c(total).le(int(1));
        totals.push(total);
    }
    totals
}

fn post_sunhol_caps(
    m: &mut Model,
    night: &[Vec<VarId>],
    day_shift: &[Vec<VarId>],
    sunhol_days: &[usize],
    num_doctors: usize,
) -> (Vec<VarId>, Vec<VarId>) {
    let mut day_totals = Vec::with_capacity(num_doctors);
    let mut combined_totals = Vec::with_capacity(num_doctors);

    for d in 0..num_doctors {
        let day_vars: Vec<VarId> = sunhol_days.iter().map(|&t| day_shift[d][t]).collect();
        let day_total = materialize_sum(m, &day_vars, day_vars.len() as i32);
        m.c(day_total).le(int(2));

        let mut combined_vars: Vec<VarId> = Vec::with_capacity(sunhol_days.len() * 2);
        for &t in sunhol_days {
            combined_vars.push(day_shift[d][t]);
            combined_vars.push(night[d][t]);
        }
        let combined_total = materialize_sum(m, &combined_vars, combined_vars.len() as i32);
        m.c(combined_total).le(int(3));

        day_totals.push(day_total);
        combined_totals.push(combined_total);
    }

    (day_totals, combined_totals)
}

fn post_score_and_bounds(
    m: &mut Model,
    req: &SolveRequest,
    cal: &MonthCalendar,
    night: &[Vec<VarId>],
    day_shift: &[Vec<VarId>],
    num_doctors: usize,
    num_days: usize,
) -> Result<Vec<VarId>, ScheduleError> {
    let mut score = Vec::with_capacity(num_doctors);

    for d in 0..num_doctors {
        let mut terms: Vec<VarId> = Vec::new();
        for t in 0..num_days {
            let info = &cal.days[t];
            if info.is_sun_or_holiday() {
                for _ in 0..5 {
                    terms.push(day_shift[d][t]);
                }
                for _ in 0..10 {
                    terms.push(night[d][t]);
                }
            } else if info.is_saturday() {
                for _ in 0..15 {
                    terms.push(night[d][t]);
                }
            } else {
                for _ in 0..10 {
                    terms.push(night[d][t]);
                }
            }
        }

        let score_var = m.int(0, SCORE_VAR_UPPER_BOUND);
        let s = m.sum(&terms);
        m.c(s).eq(score_var);

        let doctor = DoctorId(d);
        let min_f = req.min_score_for(doctor);
        let max_f = req.max_score_for(doctor);
        if min_f > max_f {
            return Err(ScheduleError::InvalidInput(format!(
                "doctor {d}: min_score {min_f} exceeds max_score {max_f}"
            )));
        }
        let min_scaled = Decimal1::from_f64(min_f).scaled() as i32;
        let max_scaled = Decimal1::from_f64(max_f).scaled() as i32;
        m.c(score_var).ge(int(min_scaled));
        m.c(score_var).le(int(max_scaled));

        score.push(score_var);
    }

    Ok(score)
}

fn konst(m: &mut Model, cache: &mut HashMap<i64, VarId>, value: i64) -> VarId {
    *cache
        .entry(value)
        .or_insert_with(|| m.int(value as i32, value as i32))
}

/// Posts `lhs <= rhs` as sums, i.e. `sum(rhs) - sum(lhs) >= 0`. The
/// workhorse behind every `aux >= linear_expr` relaxation in this module.
fn sum_le(m: &mut Model, lhs: &[VarId], rhs: &[VarId]) {
    let l = m.sum(lhs);
    let r = m.sum(rhs);
    m.c(l).le(r);
}

fn push_weighted(terms: &mut Vec<VarId>, var: VarId, weight: u32) {
    for _ in 0..weight {
        terms.push(var);
    }
}

fn post_month_fairness(
    m: &mut Model,
    score: &[VarId],
    num_doctors: usize,
    weights: &ObjectiveWeights,
    total_terms: &mut Vec<VarId>,
) {
    let max_var = m.int(0, SCORE_VAR_UPPER_BOUND);
    let min_var = m.int(0, SCORE_VAR_UPPER_BOUND);
    for d in 0..num_doctors {
        m.c(score[d]).le(max_var);
        m.c(min_var).le(score[d]);
    }
    let fairness = m.int(0, SCORE_VAR_UPPER_BOUND);
    sum_le(m, &[max_var], &[fairness, min_var]);
    push_weighted(total_terms, fairness, weights.month_fairness);
}

fn post_past_gap(
    m: &mut Model,
    const_cache: &mut HashMap<i64, VarId>,
    current_totals: &[VarId],
    num_doctors: usize,
    past_count: impl Fn(usize) -> i64,
    weight: u32,
    total_terms: &mut Vec<VarId>,
) {
    let mut combined = Vec::with_capacity(num_doctors);
    let mut upper = 0i32;
    for d in 0..num_doctors {
        let past = past_count(d);
        let past_var = konst(m, const_cache, past);
        let combined_upper = SCORE_VAR_UPPER_BOUND + past.unsigned_abs().min(i32::MAX as u64) as i32;
        let combined_var = m.int(0, combined_upper.max(1));
        let s = m.sum(&[current_totals[d], past_var]);
        m.c(s).eq(combined_var);
        upper = upper.max(combined_upper);
        combined.push(combined_var);
    }

    let max_var = m.int(0, upper.max(1));
    let min_var = m.int(0, upper.max(1));
    for &c in &combined {
        m.c(c).le(max_var);
        m.c(min_var).le(c);
    }
    let gap = m.int(0, upper.max(1));
    sum_le(m, &[max_var], &[gap, min_var]);
    push_weighted(total_terms, gap, weight);
}

fn post_gap_offset(
    m: &mut Model,
    night: &[Vec<VarId>],
    day_shift: &[Vec<VarId>],
    num_doctors: usize,
    num_days: usize,
    offset: usize,
    one_var: VarId,
    weight: u32,
    total_terms: &mut Vec<VarId>,
) {
    for d in 0..num_doctors {
        for t in 0..num_days {
            if t + offset < num_days {
                let aux = m.int(0, 1);
                let work_t = m.sum(&[night[d][t], day_shift[d][t]]);
                let work_to = m.sum(&[night[d][t + offset], day_shift[d][t + offset]]);
                let work_sum = m.sum(&[work_t, work_to]);
                let bound = m.sum(&[aux, one_var]);
                m.c(work_sum).le(bound);
                push_weighted(total_terms, aux, weight);
            }
        }
    }
}

fn post_pre_clinic(
    req: &SolveRequest,
    cal: &MonthCalendar,
    night: &[Vec<VarId>],
    num_doctors: usize,
    num_days: usize,
    weight: u32,
    total_terms: &mut Vec<VarId>,
) {
    for (doc, weekdays) in &req.clinic_weekdays {
        if doc.0 >= num_doctors {
            continue;
        }
        for t in 1..num_days {
            if weekdays.contains(&cal.days[t].weekday) {
                push_weighted(total_terms, night[doc.0][t - 1], weight);
            }
        }
    }
}

/// A doctor flagged as having worked a Saturday last month incurs the
/// penalty iff any Saturday night is assigned to them this month. The
/// Saturday-night cap already caps that sum at 1, so the sum itself is
/// the indicator: no separate boolean is needed.
fn post_sat_consec(
    req: &SolveRequest,
    sat_night_total: &[VarId],
    num_doctors: usize,
    weight: u32,
    total_terms: &mut Vec<VarId>,
) {
    for d in 0..num_doctors {
        let flagged = req.sat_prev.get(&DoctorId(d)).copied().unwrap_or(false);
        if flagged {
            push_weighted(total_terms, sat_night_total[d], weight);
        }
    }
}

fn post_target(
    m: &mut Model,
    const_cache: &mut HashMap<i64, VarId>,
    req: &SolveRequest,
    score: &[VarId],
    num_doctors: usize,
    weight: u32,
    total_terms: &mut Vec<VarId>,
) {
    for d in 0..num_doctors {
        if let Some(&target_f) = req.target_score.get(&DoctorId(d)) {
            let target_scaled = Decimal1::from_f64(target_f).scaled();
            let target_var = konst(m, const_cache, target_scaled);
            let aux = m.int(0, SCORE_VAR_UPPER_BOUND);
            sum_le(m, &[score[d]], &[aux, target_var]);
            sum_le(m, &[target_var], &[aux, score[d]]);
            push_weighted(total_terms, aux, weight);
        }
    }
}

fn post_sunhol_3rd(
    m: &mut Model,
    const_cache: &mut HashMap<i64, VarId>,
    sunhol_total: &[VarId],
    num_doctors: usize,
    weight: u32,
    total_terms: &mut Vec<VarId>,
) {
    let two_var = konst(m, const_cache, 2);
    for d in 0..num_doctors {
        let aux = m.int(0, 3);
        sum_le(m, &[sunhol_total[d]], &[aux, two_var]);
        push_weighted(total_terms, aux, weight);
    }
}
