//! REST API surface: a thin HTTP front end over `Scheduler::solve`, made
//! concrete as a single-route demo binary. Mirrors
//! `original_source/backend/routers/optimize.py` and `health.py` route-for-route.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{DoctorId, ObjectiveWeights, SolveRequest, SolveResponse};
use crate::error::ScheduleError;
use crate::Scheduler;

/// Shared application state. `Scheduler` owns no mutable state across
/// calls, so this only exists to give the router a `State` extractor to
/// clone per request.
#[derive(Clone, Default)]
pub struct AppState {
    scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/optimize", post(optimize))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - liveness, mirrors `original_source/backend/routers/health.py`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Wire shape of a solve request. JSON object keys are always strings, so
/// every per-doctor mapping is received as `HashMap<String, _>` and coerced
/// to `DoctorId` here. Mirrors the original's
/// `{int(k): v for k, v in req.unavailable.items()}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequestDto {
    pub year: i32,
    pub month: u32,
    pub num_doctors: usize,

    #[serde(default)]
    pub holidays: Vec<u32>,
    #[serde(default)]
    pub unavailable: HashMap<String, Vec<u32>>,
    #[serde(default)]
    pub fixed_unavailable_weekdays: HashMap<String, Vec<u32>>,
    #[serde(default)]
    pub clinic_weekdays: HashMap<String, Vec<u32>>,
    #[serde(default)]
    pub prev_month_worked_days: HashMap<String, Vec<u32>>,
    pub prev_month_last_day: Option<u32>,
    #[serde(default)]
    pub sat_prev: HashMap<String, bool>,

    pub score_min: f64,
    pub score_max: f64,
    #[serde(default)]
    pub min_score: HashMap<String, f64>,
    #[serde(default)]
    pub max_score: HashMap<String, f64>,
    #[serde(default)]
    pub target_score: HashMap<String, f64>,
    #[serde(default)]
    pub past_total_scores: HashMap<String, f64>,

    #[serde(default)]
    pub past_sat_counts: Vec<i64>,
    #[serde(default)]
    pub past_sunhol_counts: Vec<i64>,

    #[serde(default)]
    pub objective_weights: ObjectiveWeights,
}

impl OptimizeRequestDto {
    pub fn into_domain(self) -> Result<SolveRequest, ScheduleError> {
        Ok(SolveRequest {
            year: self.year,
            month: self.month,
            num_doctors: self.num_doctors,
            holidays: self.holidays.into_iter().collect(),
            unavailable: coerce_keys(self.unavailable)?,
            fixed_unavailable_weekdays: coerce_keys(self.fixed_unavailable_weekdays)?,
            clinic_weekdays: coerce_keys(self.clinic_weekdays)?,
            prev_month_worked_days: coerce_keys(self.prev_month_worked_days)?,
            prev_month_last_day: self.prev_month_last_day,
            sat_prev: coerce_keys(self.sat_prev)?,
            score_min: self.score_min,
            score_max: self.score_max,
            min_score: coerce_keys(self.min_score)?,
            max_score: coerce_keys(self.max_score)?,
            target_score: coerce_keys(self.target_score)?,
            past_total_scores: coerce_keys(self.past_total_scores)?,
            past_sat_counts: self.past_sat_counts,
            past_sunhol_counts: self.past_sunhol_counts,
            objective_weights: self.objective_weights,
        })
    }
}

/// Parses every string key of a doctor-indexed map to a `DoctorId`, failing
/// with a typed `InvalidInput` instead of silently dropping the entry.
fn coerce_keys<V>(
    map: HashMap<String, V>,
) -> Result<std::collections::BTreeMap<DoctorId, V>, ScheduleError> {
    map.into_iter()
        .map(|(key, value)| {
            key.parse::<usize>()
                .map(|idx| (DoctorId(idx), value))
                .map_err(|_| ScheduleError::InvalidInput(format!("doctor key {key:?} is not an integer")))
        })
        .collect()
}

/// POST /api/optimize - accepts the JSON request body, runs the solver on a
/// blocking worker, and returns the structured response. Mirrors
/// `original_source/backend/routers/optimize.py`.
async fn optimize(
    State(state): State<AppState>,
    Json(dto): Json<OptimizeRequestDto>,
) -> (StatusCode, Json<SolveResponse>) {
    let req = match dto.into_domain() {
        Ok(req) => req,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SolveResponse::Failure {
                    message: err.user_message(),
                }),
            )
        }
    };

    let scheduler = state.scheduler.clone();
    let response = tokio::task::spawn_blocking(move || scheduler.solve(&req))
        .await
        .unwrap_or_else(|join_err| {
            tracing::error!(error = %join_err, "solver task panicked");
            SolveResponse::Failure {
                message: "internal solver error".to_string(),
            }
        });

    let status = match &response {
        SolveResponse::Success { .. } => StatusCode::OK,
        SolveResponse::Failure { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_doctor_key_is_rejected() {
        let mut map = HashMap::new();
        map.insert("not-a-number".to_string(), vec![5u32]);
        let result: Result<std::collections::BTreeMap<DoctorId, Vec<u32>>, _> = coerce_keys(map);
        assert!(result.is_err());
    }

    #[test]
    fn numeric_doctor_key_coerces() {
        let mut map = HashMap::new();
        map.insert("2".to_string(), vec![5u32]);
        let result = coerce_keys::<Vec<u32>>(map).unwrap();
        assert_eq!(result.get(&DoctorId(2)), Some(&vec![5u32]));
    }
}
