use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use df_factory::FactoryError;
use df_supervisor::SupervisorError;
use df_workspace::WorkspaceError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn factory_error(err: &FactoryError) -> (StatusCode, Self) {
        let error = Self::new(err.error_code(), err.to_string());
        match err {
            FactoryError::NotFound(_) => (StatusCode::NOT_FOUND, error),
            FactoryError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, error),
            FactoryError::DuplicateHandle(_) => (StatusCode::CONFLICT, error),
            FactoryError::Supervisor(SupervisorError::Spawn { program, .. }) => (
                StatusCode::BAD_REQUEST,
                error.with_details(serde_json::json!({ "command": program })),
            ),
            FactoryError::Supervisor(_) => (StatusCode::INTERNAL_SERVER_ERROR, error),
            FactoryError::Workspace(WorkspaceError::Conflict { .. }) => {
                (StatusCode::CONFLICT, error)
            }
            FactoryError::Workspace(_) => (StatusCode::INTERNAL_SERVER_ERROR, error.retryable()),
        }
    }
}

#[derive(Debug)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&self.error).unwrap_or_default();
        (self.status, [("content-type", "application/json")], body).into_response()
    }
}

impl From<(StatusCode, ApiError)> for ApiErrorResponse {
    fn from((status, error): (StatusCode, ApiError)) -> Self {
        Self { status, error }
    }
}

impl From<FactoryError> for ApiErrorResponse {
    fn from(err: FactoryError) -> Self {
        ApiError::factory_error(&err).into()
    }
}
