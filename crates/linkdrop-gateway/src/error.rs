use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use linkdrop_shortener::ShortenerError;
use linkdrop_upload::UploadError;
use serde_json::json;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    Upload(UploadError),
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    RateLimited(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Shortener(e) => match e {
                ShortenerError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                ShortenerError::BlockedUrl(_) => (StatusCode::BAD_REQUEST, "blocked_url"),
                ShortenerError::ReservedAlias(_) => (StatusCode::BAD_REQUEST, "reserved_alias"),
                ShortenerError::InvalidShortCode(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_short_code")
                }
                ShortenerError::AliasConflict(_) => (StatusCode::CONFLICT, "alias_conflict"),
                ShortenerError::CodeSpaceExhausted(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "code_space_exhausted")
                }
                ShortenerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },
            AppError::Upload(e) => match e {
                UploadError::NoFiles => (StatusCode::BAD_REQUEST, "no_files"),
                UploadError::Rejected { .. } => (StatusCode::BAD_REQUEST, "file_rejected"),
                UploadError::TooManyFiles { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "too_many_files")
                }
                UploadError::PayloadTooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
                }
                UploadError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                UploadError::FileMissing(_) => (StatusCode::NOT_FOUND, "file_missing"),
                UploadError::IdSpaceExhausted(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "id_space_exhausted")
                }
                UploadError::Pattern(_) | UploadError::Io(_) | UploadError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
                }
            },
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Shortener(e) => e.to_string(),
            AppError::Upload(e) => e.to_string(),
            AppError::BadRequest(message)
            | AppError::NotFound(message)
            | AppError::PayloadTooLarge(message)
            | AppError::RateLimited(message) => message.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.message(), "request failed");
            "internal server error".to_string()
        } else {
            self.message()
        };
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        AppError::Shortener(value)
    }
}

impl From<UploadError> for AppError {
    fn from(value: UploadError) -> Self {
        AppError::Upload(value)
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(value.body_text())
        } else {
            AppError::BadRequest(value.body_text())
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(value: MultipartError) -> Self {
        if value.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(value.body_text())
        } else {
            AppError::BadRequest(value.body_text())
        }
    }
}
