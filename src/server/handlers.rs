//! HTTP request handlers

use std::sync::Arc;
use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::inference::parse_body;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Body of a successful `/predict` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub confidence: Option<f64>,
}

pub async fn home() -> &'static str {
    "Obesity Prediction API is running!"
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": state.service.is_ready(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

/// Validate the body, then run the model off the async executor
pub async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<PredictResponse>> {
    let record = parse_body(&body)?;

    let service = Arc::clone(&state.service);
    let prediction = tokio::task::spawn_blocking(move || service.predict(&record))
        .await
        .map_err(|e| ServerError::Prediction(format!("Prediction task failed: {}", e)))?
        .map_err(|e| ServerError::Prediction(e.to_string()))?;

    tracing::debug!(label = %prediction.label, confidence = ?prediction.confidence, "Prediction served");
    Ok(Json(PredictResponse {
        prediction: prediction.label,
        confidence: prediction.confidence,
    }))
}
