use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("Invalid image handle: {0}")]
    InvalidImageHandle(String),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Invalid edit parameter: {0}")]
    InvalidEditParameter(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: {0} bytes, max allowed: {1} bytes")]
    PayloadTooLarge(usize, usize),

    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ClassifyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClassifyError::UnknownModel(_) => StatusCode::NOT_FOUND,
            ClassifyError::ImageNotFound(_) => StatusCode::NOT_FOUND,
            ClassifyError::InvalidImageHandle(_) => StatusCode::BAD_REQUEST,
            ClassifyError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClassifyError::InvalidEditParameter(_) => StatusCode::BAD_REQUEST,
            ClassifyError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ClassifyError::PayloadTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ClassifyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClassifyError::Base64(_) => StatusCode::BAD_REQUEST,
            ClassifyError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClassifyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClassifyError::UnknownModel(_) => "UNKNOWN_MODEL",
            ClassifyError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            ClassifyError::ImageNotFound(_) => "IMAGE_NOT_FOUND",
            ClassifyError::InvalidImageHandle(_) => "INVALID_IMAGE_HANDLE",
            ClassifyError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            ClassifyError::InvalidEditParameter(_) => "INVALID_EDIT_PARAMETER",
            ClassifyError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            ClassifyError::PayloadTooLarge(_, _) => "PAYLOAD_TOO_LARGE",
            ClassifyError::Timeout(_) => "TIMEOUT",
            ClassifyError::InvalidInput(_) => "INVALID_INPUT",
            ClassifyError::Config(_) => "CONFIG_ERROR",
            ClassifyError::Io(_) => "IO_ERROR",
            ClassifyError::Base64(_) => "BASE64_DECODE_ERROR",
            ClassifyError::Ort(_) => "ORT_ERROR",
            ClassifyError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ClassifyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        tracing::error!("Request failed: {} ({})", self, status);

        (status, axum::Json(error_response)).into_response()
    }
}
