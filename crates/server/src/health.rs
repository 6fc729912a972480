use aimana_core::ml::ModelSummary;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub history: HealthCheck,
    pub candidates: usize,
    pub models: Vec<ModelSummary>,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let history = history_check(&state);
    let ready = history.status == "ready";
    let predictor = state.optimizer.predictor();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "aimana-server runtime initialized".to_string(),
        },
        history,
        candidates: state.optimizer.candidates().len(),
        models: vec![predictor.conversion_model().summary(), predictor.margin_model().summary()],
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn history_check(state: &AppState) -> HealthCheck {
    if state.history.is_empty() {
        return HealthCheck {
            status: "degraded",
            detail: "history dataset has no rows; every request will be not found".to_string(),
        };
    }

    HealthCheck {
        status: "ready",
        detail: format!(
            "{} rows covering {} products",
            state.history.len(),
            state.history.product_count()
        ),
    }
}
