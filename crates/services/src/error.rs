//! Shared error types for the services crate.

use thiserror::Error;

use reflect_core::model::AnswerError;
use storage::repository::StorageError;

/// Errors emitted by the HTTP API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("not authenticated")]
    Auth,

    /// No resource for this request. For the daily-question endpoint this is
    /// the normal "no questions left today" outcome, not a fault.
    #[error("not found")]
    NotFound,

    #[error("request rejected: {0}")]
    Validation(String),

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Local precondition failures of the daily flow controller.
///
/// Remote failures never show up here; those surface through
/// `FlowState::Error` so the presentation layer can offer a retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    #[error("another request is in flight")]
    Busy,

    #[error("no question is awaiting an answer")]
    NoActiveQuestion,

    #[error("action is not available right now")]
    ActionUnavailable,

    #[error(transparent)]
    Answer(#[from] AnswerError),
}

/// Errors emitted by `PreferencesService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
