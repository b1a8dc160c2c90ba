use thiserror::Error;

/// Errors that abort processing of a single image.
///
/// "No plate found" and "OCR returned nothing" are not errors; they surface as
/// [`crate::core::Decision::NotFound`].
#[derive(Debug, Error)]
pub enum PlateError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("text recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    #[error("image processing failed: {0}")]
    Processing(#[from] anyhow::Error),
}

/// Failure to publish a decision. Never rolls back a recorded decision.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to serialize notification payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("notification transport error: {0}")]
    Transport(String),

    #[error("notification timed out after {0:?}")]
    Timeout(std::time::Duration),
}
