use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snip_pipeline::PipelineError;
use snip_service::ServiceError;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Service(ServiceError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Service(ServiceError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            AppError::Service(ServiceError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Pipeline(PipelineError::Stopped) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (status, self.to_string()).into_response()
    }
}
