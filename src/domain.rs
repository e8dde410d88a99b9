//! Request/response types for the on-call scheduler.
//!
//! Everything here is frozen input or immutable output: inputs are
//! read-only for the duration of a solve, and outputs are immutable
//! snapshots. The boolean decision variables the model builder creates are
//! internal to `model.rs` and never appear in this module.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Index of a doctor in the roster, 0..num_doctors. No per-name identity is
/// needed inside the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(pub usize);

impl std::fmt::Display for DoctorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One decimal digit of precision, stored as an integer scaled by 10 so it
/// stays inside the integer constraint model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal1(i64);

impl Decimal1 {
    /// Half-away-from-zero rounding of `value * 10`, the boundary conversion
    /// used for scores and bounds coming in from a caller.
    pub fn from_f64(value: f64) -> Self {
        let scaled = value * 10.0;
        let rounded = if scaled >= 0.0 {
            (scaled + 0.5).floor()
        } else {
            (scaled - 0.5).ceil()
        };
        Self(rounded as i64)
    }

    pub fn from_scaled(scaled: i64) -> Self {
        Self(scaled)
    }

    pub fn scaled(self) -> i64 {
        self.0
    }

    /// Exact division by 10, the boundary conversion used when emitting
    /// results (no rounding needed in this direction).
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl Serialize for Decimal1 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Decimal1 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Decimal1::from_f64(value))
    }
}

/// Objective weights for the soft penalty terms. Unspecified keys take the
/// defaults in `config.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectiveWeights {
    pub month_fairness: u32,
    pub past_sat_gap: u32,
    pub past_sunhol_gap: u32,
    pub gap5: u32,
    pub gap6: u32,
    pub pre_clinic: u32,
    pub sat_consec: u32,
    /// Reserved for future use; currently does not contribute a term.
    pub score_balance: u32,
    pub target: u32,
    pub sunhol_3rd: u32,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        use crate::config::*;
        Self {
            month_fairness: DEFAULT_MONTH_FAIRNESS,
            past_sat_gap: DEFAULT_PAST_SAT_GAP,
            past_sunhol_gap: DEFAULT_PAST_SUNHOL_GAP,
            gap5: DEFAULT_GAP5,
            gap6: DEFAULT_GAP6,
            pre_clinic: DEFAULT_PRE_CLINIC,
            sat_consec: DEFAULT_SAT_CONSEC,
            score_balance: DEFAULT_SCORE_BALANCE,
            target: DEFAULT_TARGET,
            sunhol_3rd: DEFAULT_SUNHOL_3RD,
        }
    }
}

/// All frozen inputs to a single solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub year: i32,
    pub month: u32,
    pub num_doctors: usize,

    #[serde(default)]
    pub holidays: BTreeSet<u32>,
    #[serde(default)]
    pub unavailable: BTreeMap<DoctorId, Vec<u32>>,
    #[serde(default)]
    pub fixed_unavailable_weekdays: BTreeMap<DoctorId, Vec<u32>>,
    /// Clinic ("outpatient") weekdays per doctor; a night shift the day
    /// before incurs the `pre_clinic` soft penalty.
    #[serde(default)]
    pub clinic_weekdays: BTreeMap<DoctorId, Vec<u32>>,

    #[serde(default)]
    pub prev_month_worked_days: BTreeMap<DoctorId, Vec<u32>>,
    pub prev_month_last_day: Option<u32>,
    #[serde(default)]
    pub sat_prev: BTreeMap<DoctorId, bool>,

    pub score_min: f64,
    pub score_max: f64,
    #[serde(default)]
    pub min_score: BTreeMap<DoctorId, f64>,
    #[serde(default)]
    pub max_score: BTreeMap<DoctorId, f64>,
    #[serde(default)]
    pub target_score: BTreeMap<DoctorId, f64>,
    #[serde(default)]
    pub past_total_scores: BTreeMap<DoctorId, f64>,

    #[serde(default)]
    pub past_sat_counts: Vec<i64>,
    #[serde(default)]
    pub past_sunhol_counts: Vec<i64>,

    #[serde(default)]
    pub objective_weights: ObjectiveWeights,
}

impl SolveRequest {
    pub fn doctors(&self) -> impl Iterator<Item = DoctorId> + '_ {
        (0..self.num_doctors).map(DoctorId)
    }

    /// Missing entries in a per-doctor past-count array default to zero.
    pub fn past_sat_count(&self, doctor: DoctorId) -> i64 {
        self.past_sat_counts.get(doctor.0).copied().unwrap_or(0)
    }

    pub fn past_sunhol_count(&self, doctor: DoctorId) -> i64 {
        self.past_sunhol_counts.get(doctor.0).copied().unwrap_or(0)
    }

    pub fn min_score_for(&self, doctor: DoctorId) -> f64 {
        self.min_score.get(&doctor).copied().unwrap_or(self.score_min)
    }

    pub fn max_score_for(&self, doctor: DoctorId) -> f64 {
        self.max_score.get(&doctor).copied().unwrap_or(self.score_max)
    }

    /// Rejects garbage input with a typed error rather than handing it to
    /// the model builder. Does not touch the documented edge cases that are
    /// tolerances, not holes: out-of-range day numbers in sets are still
    /// silently ignored downstream.
    pub fn validate(&self) -> Result<(), crate::error::ScheduleError> {
        use crate::error::ScheduleError;

        if !(1..=12).contains(&self.month) {
            return Err(ScheduleError::InvalidInput(format!(
                "month must be in 1..=12, got {}",
                self.month
            )));
        }
        if self.num_doctors == 0 {
            return Err(ScheduleError::InvalidInput(
                "num_doctors must be positive".to_string(),
            ));
        }
        if self.score_min > self.score_max {
            return Err(ScheduleError::InvalidInput(format!(
                "score_min {} exceeds score_max {}",
                self.score_min, self.score_max
            )));
        }
        for (doctor, min_f) in &self.min_score {
            let max_f = self.max_score.get(doctor).copied().unwrap_or(self.score_max);
            if *min_f > max_f {
                return Err(ScheduleError::InvalidInput(format!(
                    "doctor {doctor}: min_score {min_f} exceeds max_score {max_f}"
                )));
            }
        }

        // Weight fields are `u32`, so non-negativity is already enforced by
        // the type.

        Ok(())
    }
}

/// One day's assignment in the returned schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAssignment {
    pub day: u32,
    pub is_sunhol: bool,
    /// Present iff `is_sunhol`.
    pub day_shift: Option<DoctorId>,
    pub night_shift: DoctorId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub status: SolveStatus,
    pub schedule: Vec<DayAssignment>,
    pub scores: BTreeMap<DoctorId, Decimal1>,
}

/// The scheduler's entry point never throws across its boundary: every
/// outcome becomes one of these two shapes.
#[derive(Debug, Clone)]
pub enum SolveResponse {
    Success {
        status: SolveStatus,
        schedule: Vec<DayAssignment>,
        scores: BTreeMap<DoctorId, Decimal1>,
    },
    Failure {
        message: String,
    },
}

impl Serialize for SolveResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        match self {
            SolveResponse::Success {
                status,
                schedule,
                scores,
            } => {
                let mut s = serializer.serialize_struct("SolveResponse", 4)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("status", status)?;
                s.serialize_field("schedule", schedule)?;
                s.serialize_field("scores", scores)?;
                s.end()
            }
            SolveResponse::Failure { message } => {
                let mut s = serializer.serialize_struct("SolveResponse", 2)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("message", message)?;
                s.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_rounds_half_away_from_zero() {
        assert_eq!(Decimal1::from_f64(2.05).scaled(), 21);
        assert_eq!(Decimal1::from_f64(2.0).scaled(), 20);
        assert_eq!(Decimal1::from_f64(-2.05).scaled(), -21);
    }

    #[test]
    fn decimal_round_trips_exactly_on_output() {
        assert_eq!(Decimal1::from_scaled(15).to_f64(), 1.5);
    }

    #[test]
    fn missing_past_counts_default_to_zero() {
        let req = SolveRequest {
            year: 2024,
            month: 4,
            num_doctors: 3,
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
            past_sat_counts: vec![2],
            past_sunhol_counts: vec![],
            objective_weights: ObjectiveWeights::default(),
        };
        assert_eq!(req.past_sat_count(DoctorId(0)), 2);
        assert_eq!(req.past_sat_count(DoctorId(1)), 0);
        assert_eq!(req.past_sunhol_count(DoctorId(0)), 0);
    }
}
