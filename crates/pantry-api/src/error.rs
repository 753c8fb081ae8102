use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pantry_core::CoreError;
use pantry_types::api::ErrorResponse;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) => core_status(err),
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Core(err) => err.code(),
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal => "internal_error",
        }
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::RecipeNotFound(_) | CoreError::UserNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Forbidden => StatusCode::FORBIDDEN,
        CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        // Relation transitions and validation failures are client errors
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:#}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}
