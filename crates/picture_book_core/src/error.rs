//! crates/picture_book_core/src/error.rs
//!
//! Errors raised by the wizard steps. Every variant renders as a short,
//! user-facing message in the app's language.

use crate::ports::PortError;

/// Rejections raised before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("画像ファイルのみアップロード可能です")]
    NotAnImage { content_type: String },
    #[error("ファイルサイズは10MB以下にしてください")]
    TooLarge { size: u64, limit: u64 },
    #[error("ファイルが選択されていません")]
    NoFile,
}

/// Errors from the wizard steps, including backend failures seen at a step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("先に画像をアップロードしてください")]
    MissingUploadedImage,

    #[error("物語の設定が見つかりません。はじめからやりなおしてね")]
    MissingStorySetting,

    #[error("このしつもんにはこたえてね")]
    AnswerRequired { field: String },

    #[error("しつもんがまだよみこまれていません")]
    NoQuestions,

    #[error("いまはそうさできません")]
    InvalidState(&'static str),

    #[error("テーマが選択されていません")]
    NoThemeSelected,

    #[error("画像のアップロードに失敗しました")]
    UploadFailed(#[source] PortError),

    #[error("物語の設定の作成に失敗しました")]
    StorySettingFailed(#[source] PortError),

    #[error("しつもんのよみこみに失敗しました")]
    QuestionsFailed(#[source] PortError),

    #[error("こたえの保存にしっぱいしました")]
    SubmitFailed(#[source] PortError),

    #[error("テーマのよみこみに失敗しました")]
    ThemesFailed(#[source] PortError),

    #[error("画像生成に失敗しました")]
    GenerationFailed(#[source] PortError),

    #[error("そうさが中断されました")]
    Cancelled,
}

impl WizardError {
    /// A stable machine-readable slug for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            WizardError::Upload(UploadError::NotAnImage { .. }) => "not_an_image",
            WizardError::Upload(UploadError::TooLarge { .. }) => "file_too_large",
            WizardError::Upload(UploadError::NoFile) => "no_file",
            WizardError::MissingUploadedImage => "missing_uploaded_image",
            WizardError::MissingStorySetting => "missing_story_setting",
            WizardError::AnswerRequired { .. } => "answer_required",
            WizardError::NoQuestions => "no_questions",
            WizardError::InvalidState(_) => "invalid_state",
            WizardError::NoThemeSelected => "no_theme_selected",
            WizardError::UploadFailed(_) => "upload_failed",
            WizardError::StorySettingFailed(_) => "story_setting_failed",
            WizardError::QuestionsFailed(_) => "questions_failed",
            WizardError::SubmitFailed(_) => "submit_failed",
            WizardError::ThemesFailed(_) => "themes_failed",
            WizardError::GenerationFailed(_) => "generation_failed",
            WizardError::Cancelled => "cancelled",
        }
    }
}

/// Errors shown by the storybook reader.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReaderError {
    #[error("絵本が見つかりません")]
    NotFound,
    #[error("絵本の取得に失敗しました")]
    Failed(#[source] PortError),
}

impl From<PortError> for ReaderError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(_) | PortError::Rejected { status: 404, .. } => ReaderError::NotFound,
            other => ReaderError::Failed(other),
        }
    }
}
