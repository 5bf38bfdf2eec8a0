//! Error types for the Chest Numbers server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
///
/// `StreamWrite` mostly never reaches a client as a response: by the time the
/// output transport breaks, headers and part of the document have already been
/// sent. It exists so the render pipeline can log the failure distinctly from
/// a generation failure.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("QR encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    #[error("Stream write failed: {0}")]
    StreamWrite(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Wrap an I/O failure that happened while writing to the output stream.
    pub fn stream_write(err: std::io::Error) -> Self {
        AppError::StreamWrite(err.to_string())
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg.clone()),
            AppError::Qr(e) => {
                tracing::error!("QR generation error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "code_generation_failed",
                    "Failed to generate QR code".to_string(),
                )
            }
            AppError::Image(e) => {
                tracing::error!("Image encoding error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "code_generation_failed",
                    "Failed to encode QR image".to_string(),
                )
            }
            AppError::CodeGeneration(e) => {
                tracing::error!("Code generation error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "code_generation_failed",
                    "Failed to generate QR code".to_string(),
                )
            }
            AppError::StreamWrite(e) => {
                tracing::error!("Stream write error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "stream_write_failed",
                    "Output stream failed".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
