//! services/api/src/web/http_error.rs
//!
//! The single JSON error body every handler returns: `{ "error", "code", "back" }`.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use picture_book_core::error::{ReaderError, UploadError, WizardError};
use picture_book_core::ports::PortError;
use picture_book_core::wizard::routes;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    back: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
    /// Where the client should send the user when the page cannot be shown.
    pub back: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            back: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_back(mut self, back: impl Into<String>) -> Self {
        self.back = Some(back.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message).with_code("bad_request")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
            back: self.back,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<WizardError> for AppError {
    fn from(e: WizardError) -> Self {
        let status = match &e {
            WizardError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            WizardError::Upload(_) => StatusCode::BAD_REQUEST,
            WizardError::AnswerRequired { .. } | WizardError::NoThemeSelected => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WizardError::MissingUploadedImage
            | WizardError::MissingStorySetting
            | WizardError::NoQuestions
            | WizardError::InvalidState(_)
            | WizardError::Cancelled => StatusCode::CONFLICT,
            WizardError::UploadFailed(_)
            | WizardError::StorySettingFailed(_)
            | WizardError::QuestionsFailed(_)
            | WizardError::SubmitFailed(_)
            | WizardError::ThemesFailed(_)
            | WizardError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        };
        let err = AppError::new(status, e.to_string()).with_code(e.code());
        match e {
            // The step needs an image or story setting the user has not produced yet.
            WizardError::MissingUploadedImage | WizardError::MissingStorySetting => {
                err.with_back(routes::UPLOAD)
            }
            _ => err,
        }
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        WizardError::from(e).into()
    }
}

impl From<ReaderError> for AppError {
    fn from(e: ReaderError) -> Self {
        let (status, code) = match &e {
            ReaderError::NotFound => (StatusCode::NOT_FOUND, "storybook_not_found"),
            ReaderError::Failed(_) => (StatusCode::BAD_GATEWAY, "storybook_failed"),
        };
        AppError::new(status, e.to_string())
            .with_code(code)
            .with_back(routes::HOME)
    }
}

/// Failures from the session store.
impl From<PortError> for AppError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(_) => {
                AppError::new(StatusCode::NOT_FOUND, "セッションが見つかりません")
                    .with_code("session_not_found")
            }
            other => AppError::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
                .with_code("internal"),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return WizardError::from(UploadError::TooLarge {
                size: 0,
                limit: picture_book_core::wizard::MAX_IMAGE_BYTES,
            })
            .into();
        }
        AppError::new(e.status(), e.body_text()).with_code("bad_multipart")
    }
}
