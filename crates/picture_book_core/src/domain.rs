//! crates/picture_book_core/src/domain.rs
//!
//! Defines the transfer records exchanged with the story backend.
//! They mirror the backend's JSON; the service never owns the authoritative copy.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of pages in every storybook. The backend stores them as fixed columns.
pub const STORYBOOK_PAGES: usize = 5;

//=========================================================================================
// Upload
//=========================================================================================

/// An image file selected by the user, ready to be sent as multipart data.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// The record the backend returns after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedImage {
    pub id: i64,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub meta_data: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
}

impl UploadedImage {
    /// The location later steps use as the reference image: the public URL
    /// when the backend stored it in a bucket, the server path otherwise.
    pub fn stored_path(&self) -> Option<&str> {
        self.public_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(self.file_path.as_str()).filter(|s| !s.trim().is_empty()))
    }
}

//=========================================================================================
// Story setting and questions
//=========================================================================================

/// Attributes the backend derived from the uploaded photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorySetting {
    #[serde(rename = "story_setting_id")]
    pub id: i64,
    #[serde(default)]
    pub generated_data: Map<String, Value>,
}

/// How a question is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    Text,
    Select,
}

impl From<String> for QuestionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "select" => QuestionKind::Select,
            _ => QuestionKind::Text,
        }
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::Text => "text_input".to_string(),
            QuestionKind::Select => "select".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

/// A single question the backend asks about the story setting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub field: String,
    pub question: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

fn default_kind() -> QuestionKind {
    QuestionKind::Text
}

#[derive(Debug, Deserialize)]
pub struct QuestionList {
    #[serde(default)]
    pub questions: Vec<Question>,
}

//=========================================================================================
// Themes
//=========================================================================================

/// A candidate title and description the user picks before the book is generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryPlot {
    pub story_plot_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub selected_theme: Option<String>,
}

impl StoryPlot {
    /// The key the backend expects when this plot is chosen.
    pub fn theme_key(&self) -> &str {
        self.selected_theme
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.title)
    }
}

#[derive(Debug, Deserialize)]
pub struct StoryPlotList {
    #[serde(default)]
    pub items: Vec<StoryPlot>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ThemeSelection {
    pub story_plot_id: i64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StoryBookCreated {
    pub storybook_id: i64,
    #[serde(default)]
    pub selected_theme: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

//=========================================================================================
// Image generation
//=========================================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageImageRequest {
    pub story_plot_id: i64,
    pub strength: f32,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeneratedImage {
    pub page_number: u32,
    pub filepath: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ImageGenerationResult {
    #[serde(default)]
    pub total_generated: u32,
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}

/// Assigns generated image paths to the storybook's page columns.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ImageUrlUpdate {
    pub storybook_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_1_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_2_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_3_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_4_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_5_image_url: Option<String>,
}

impl ImageUrlUpdate {
    /// Builds the update from generation output. Later entries for the same
    /// page win; pages outside 1..=5 are ignored.
    pub fn from_generated(storybook_id: i64, images: &[GeneratedImage]) -> Self {
        let mut update = Self {
            storybook_id,
            ..Default::default()
        };
        for image in images {
            let slot = match image.page_number {
                1 => &mut update.page_1_image_url,
                2 => &mut update.page_2_image_url,
                3 => &mut update.page_3_image_url,
                4 => &mut update.page_4_image_url,
                5 => &mut update.page_5_image_url,
                _ => continue,
            };
            *slot = Some(image.filepath.clone());
        }
        update
    }

    pub fn is_empty(&self) -> bool {
        self.page_1_image_url.is_none()
            && self.page_2_image_url.is_none()
            && self.page_3_image_url.is_none()
            && self.page_4_image_url.is_none()
            && self.page_5_image_url.is_none()
    }
}

//=========================================================================================
// Storybook
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageGenerationStatus {
    Pending,
    Generating,
    Completed,
    Failed,
    Other(String),
}

impl From<String> for ImageGenerationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "generating" => Self::Generating,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<ImageGenerationStatus> for String {
    fn from(status: ImageGenerationStatus) -> Self {
        match status {
            ImageGenerationStatus::Pending => "pending".to_string(),
            ImageGenerationStatus::Generating => "generating".to_string(),
            ImageGenerationStatus::Completed => "completed".to_string(),
            ImageGenerationStatus::Failed => "failed".to_string(),
            ImageGenerationStatus::Other(s) => s,
        }
    }
}

impl Default for ImageGenerationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// The finished five-page book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryBook {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub page_1: String,
    #[serde(default)]
    pub page_2: String,
    #[serde(default)]
    pub page_3: String,
    #[serde(default)]
    pub page_4: String,
    #[serde(default)]
    pub page_5: String,
    #[serde(default)]
    pub page_1_image_url: Option<String>,
    #[serde(default)]
    pub page_2_image_url: Option<String>,
    #[serde(default)]
    pub page_3_image_url: Option<String>,
    #[serde(default)]
    pub page_4_image_url: Option<String>,
    #[serde(default)]
    pub page_5_image_url: Option<String>,
    #[serde(default)]
    pub image_generation_status: ImageGenerationStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub uploaded_image_id: Option<i64>,
}

/// Raw text and stored image location of one page, before URL normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage<'a> {
    pub number: usize,
    pub text: &'a str,
    pub image: Option<&'a str>,
}

impl StoryBook {
    pub fn pages(&self) -> [RawPage<'_>; STORYBOOK_PAGES] {
        [
            RawPage { number: 1, text: &self.page_1, image: self.page_1_image_url.as_deref() },
            RawPage { number: 2, text: &self.page_2, image: self.page_2_image_url.as_deref() },
            RawPage { number: 3, text: &self.page_3, image: self.page_3_image_url.as_deref() },
            RawPage { number: 4, text: &self.page_4, image: self.page_4_image_url.as_deref() },
            RawPage { number: 5, text: &self.page_5, image: self.page_5_image_url.as_deref() },
        ]
    }
}

//=========================================================================================
// Library (validated proxy records)
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub id: i64,
    pub page_no: i64,
    pub image_url: Option<String>,
    pub alt: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub pages: Vec<BookPage>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BooksPage {
    pub books: Vec<BookSummary>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}
