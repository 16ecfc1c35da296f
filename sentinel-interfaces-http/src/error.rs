use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use sentinel_application::AppError;
use sentinel_domain::PipelineError;

#[derive(Debug)]
pub enum HttpError {
    Unauthorized,
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        match value {
            AppError::Unauthorized => HttpError::Unauthorized,
            AppError::BadRequest(msg) => HttpError::BadRequest(msg),
            AppError::Pipeline(err) => HttpError::from(err),
            AppError::Internal(err) => HttpError::Internal(format!("{:#}", err)),
        }
    }
}

impl From<PipelineError> for HttpError {
    fn from(value: PipelineError) -> Self {
        match value {
            PipelineError::AlreadyRunning { .. } => HttpError::Conflict(value.to_string()),
            PipelineError::SourceUnavailable(_) => HttpError::Unavailable(value.to_string()),
            PipelineError::Conflict(_) | PipelineError::DetectionFailure(_) => {
                HttpError::Internal(value.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Conflict(_) => StatusCode::CONFLICT,
            HttpError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            HttpError::Unauthorized => "unauthorized".to_string(),
            HttpError::BadRequest(msg) => format!("bad request: {}", msg),
            HttpError::Conflict(msg) | HttpError::Unavailable(msg) | HttpError::Internal(msg) => msg,
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_status_codes() {
        let busy = HttpError::from(AppError::from(PipelineError::AlreadyRunning {
            process_name: "aml_processing".to_string(),
        }));
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let down = HttpError::from(PipelineError::SourceUnavailable("timeout".to_string()));
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bad_input = HttpError::from(PipelineError::DetectionFailure("nan".to_string()));
        assert_eq!(bad_input.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad_request = HttpError::from(AppError::BadRequest("date".to_string()));
        assert_eq!(bad_request.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn response_carries_status() {
        let response = HttpError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
