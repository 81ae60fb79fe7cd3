//! crates/picture_book_core/src/wizard/reader.rs
//!
//! The storybook reader: five fixed pages behind a 1-based page counter.

use serde::Serialize;
use tracing::{error, info};

use crate::domain::{ImageGenerationStatus, StoryBook, STORYBOOK_PAGES};
use crate::error::ReaderError;
use crate::image_url::ImageUrlNormalizer;
use crate::ports::StoryBackendService;

/// Loads a storybook, mapping a missing book to the localized not-found error.
pub async fn load_storybook(
    backend: &dyn StoryBackendService,
    storybook_id: i64,
) -> Result<StoryBook, ReaderError> {
    match backend.fetch_storybook(storybook_id).await {
        Ok(book) => {
            info!(storybook_id, "Storybook loaded");
            Ok(book)
        }
        Err(e) => {
            error!("Failed to load storybook {}: {:?}", storybook_id, e);
            Err(ReaderError::from(e))
        }
    }
}

/// A page ready to render.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageView {
    pub page: usize,
    pub total: usize,
    pub text: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReaderView {
    pub storybook_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub current: PageView,
    pub has_previous: bool,
    pub has_next: bool,
    pub status_label: &'static str,
}

#[derive(Debug, Clone)]
pub struct StoryBookReader {
    book: StoryBook,
    pages: Vec<PageView>,
    page: usize,
}

impl StoryBookReader {
    pub fn new(book: StoryBook, normalizer: &ImageUrlNormalizer) -> Self {
        let pages = book
            .pages()
            .iter()
            .map(|raw| PageView {
                page: raw.number,
                total: STORYBOOK_PAGES,
                text: raw.text.to_string(),
                image_url: normalizer.page_image(raw.image),
            })
            .collect();
        Self {
            book,
            pages,
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Jumps to a page, clamped to 1..=5.
    pub fn go_to(&mut self, page: usize) -> usize {
        self.page = page.clamp(1, STORYBOOK_PAGES);
        self.page
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.page + 1)
    }

    pub fn previous(&mut self) -> usize {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn current(&self) -> &PageView {
        &self.pages[self.page - 1]
    }

    pub fn view(&self) -> ReaderView {
        ReaderView {
            storybook_id: self.book.id,
            title: self.book.title.clone(),
            description: self.book.description.clone(),
            current: self.current().clone(),
            has_previous: self.page > 1,
            has_next: self.page < STORYBOOK_PAGES,
            status_label: match self.book.image_generation_status {
                ImageGenerationStatus::Completed => "画像付き",
                _ => "テキストのみ",
            },
        }
    }
}
