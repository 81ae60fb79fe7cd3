//! crates/picture_book_core/src/ports.rs
//!
//! Defines the service contracts (traits) the wizard logic is written against.
//! The story backend, the book library and the session storage all sit behind
//! these traits, so the core never touches HTTP or a database directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    BookDetail, BooksPage, ImageFile, ImageGenerationResult, ImageUrlUpdate, PageImageRequest,
    Question, StoryBook, StoryBookCreated, StoryPlot, StorySetting, ThemeSelection, UploadedImage,
};
use crate::session::WizardSession;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The remote side answered with a non-success status.
    #[error("Backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Operation cancelled")]
    Cancelled,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote story backend. One method per endpoint the wizard calls.
#[async_trait]
pub trait StoryBackendService: Send + Sync {
    // --- Upload step ---
    async fn upload_image(&self, user_id: i64, file: ImageFile) -> PortResult<UploadedImage>;

    async fn create_story_setting(&self, uploaded_image_id: i64) -> PortResult<StorySetting>;

    // --- Question step ---
    async fn fetch_questions(&self, story_setting_id: i64) -> PortResult<Vec<Question>>;

    async fn submit_answer(&self, story_setting_id: i64, field: &str, answer: &str)
        -> PortResult<()>;

    async fn start_story_generation(&self, story_setting_id: i64) -> PortResult<()>;

    // --- Theme step ---
    async fn fetch_story_plots(
        &self,
        user_id: i64,
        story_setting_id: i64,
        limit: usize,
    ) -> PortResult<Vec<StoryPlot>>;

    async fn select_theme(&self, story_setting_id: i64, theme: &str)
        -> PortResult<ThemeSelection>;

    async fn confirm_theme_and_create(
        &self,
        story_plot_id: i64,
        theme: &str,
    ) -> PortResult<StoryBookCreated>;

    async fn generate_page_images(
        &self,
        request: &PageImageRequest,
    ) -> PortResult<ImageGenerationResult>;

    async fn update_image_urls(&self, update: &ImageUrlUpdate) -> PortResult<()>;

    // --- Reader step ---
    async fn fetch_storybook(&self, storybook_id: i64) -> PortResult<StoryBook>;
}

/// The finished-book library behind the proxy routes. Records are strictly validated.
#[async_trait]
pub trait LibraryService: Send + Sync {
    async fn list_books(&self, limit: Option<u32>, cursor: Option<&str>) -> PortResult<BooksPage>;

    async fn get_book(&self, book_id: i64) -> PortResult<BookDetail>;
}

/// Durable storage for the wizard's identifiers. The only place they are persisted.
#[async_trait]
pub trait WizardSessionStore: Send + Sync {
    async fn create(&self, user_id: i64) -> PortResult<WizardSession>;

    async fn load(&self, session_id: Uuid) -> PortResult<WizardSession>;

    async fn save(&self, session: &WizardSession) -> PortResult<()>;

    async fn delete(&self, session_id: Uuid) -> PortResult<()>;
}
