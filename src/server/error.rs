//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::inference::RequestError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    BadRequest(#[from] RequestError),

    #[error("{0}")]
    Prediction(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(e) => {
                tracing::debug!(reason = %e, "Rejected request");
                StatusCode::BAD_REQUEST
            }
            ServerError::Prediction(msg) => {
                tracing::error!(detail = %msg, "Prediction failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
