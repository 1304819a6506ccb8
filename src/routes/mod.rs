pub mod classify_route;
pub mod default_route;
pub mod directory_route;
pub mod job_route;
pub mod search_route;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::error::ScoutError;

impl ResponseError for ScoutError {
    fn status_code(&self) -> StatusCode {
        match self {
            ScoutError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScoutError::InputValidation(_) => StatusCode::BAD_REQUEST,
            ScoutError::Transport(_) | ScoutError::Api { .. } => StatusCode::BAD_GATEWAY,
            // A cancelled operation is a normal outcome for the panel.
            ScoutError::Cancelled => StatusCode::OK,
            ScoutError::Busy { .. } => StatusCode::CONFLICT,
            ScoutError::UnknownResult { .. } | ScoutError::UnknownJob(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ScoutError::Cancelled => json!({ "cancelled": true }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
