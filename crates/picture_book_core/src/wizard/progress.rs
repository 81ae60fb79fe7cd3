//! crates/picture_book_core/src/wizard/progress.rs
//!
//! A small counter that drives the image-generation progress bar.
//! It reflects what the wizard has observed locally; the backend does not stream progress.

use serde::Serialize;
use std::sync::Mutex;

/// Pages the wizard expects the backend to illustrate.
pub const EXPECTED_IMAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Generating,
    Completed,
    Failed,
}

/// Coarse phase of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Pending,
    Generating,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageError {
    pub page_number: u32,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentImage {
    pub page_number: u32,
    pub status: ImageStatus,
}

/// Events the theme step emits while it generates a book.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started { total: u32 },
    ImageGenerating { page_number: u32 },
    ImageCompleted { page_number: u32 },
    ImageFailed { page_number: u32, error: String },
    Finished,
}

/// Receives progress events. Implemented by whatever holds the tracker a view reads.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressTracker {
    current: u32,
    total: u32,
    phase: ProgressPhase,
    current_image: Option<CurrentImage>,
    errors: Vec<PageError>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            phase: ProgressPhase::Pending,
            current_image: None,
            errors: Vec::new(),
        }
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, total: u32) {
        *self = Self {
            total,
            phase: ProgressPhase::Generating,
            ..Self::default()
        };
    }

    pub fn image_generating(&mut self, page_number: u32) {
        self.current_image = Some(CurrentImage {
            page_number,
            status: ImageStatus::Generating,
        });
    }

    pub fn image_completed(&mut self, page_number: u32) {
        self.current += 1;
        self.current_image = Some(CurrentImage {
            page_number,
            status: ImageStatus::Completed,
        });
    }

    pub fn image_failed(&mut self, page_number: u32, error: impl Into<String>) {
        self.current += 1;
        self.current_image = Some(CurrentImage {
            page_number,
            status: ImageStatus::Failed,
        });
        self.errors.push(PageError {
            page_number,
            error: error.into(),
        });
    }

    pub fn finish(&mut self) {
        self.phase = ProgressPhase::Done;
        self.current_image = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => self.start(total),
            ProgressEvent::ImageGenerating { page_number } => self.image_generating(page_number),
            ProgressEvent::ImageCompleted { page_number } => self.image_completed(page_number),
            ProgressEvent::ImageFailed { page_number, error } => {
                self.image_failed(page_number, error)
            }
            ProgressEvent::Finished => self.finish(),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.phase == ProgressPhase::Generating
    }

    pub fn errors(&self) -> &[PageError] {
        &self.errors
    }

    /// Fill of the progress bar, `current / total * 100`, clamped to 0..=100.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (f64::from(self.current) / f64::from(self.total) * 100.0).clamp(0.0, 100.0)
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            current: self.current,
            total: self.total,
            percent: self.percent(),
            is_generating: self.is_generating(),
            phase: self.phase,
            current_image: self.current_image.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl ProgressObserver for Mutex<ProgressTracker> {
    fn on_event(&self, event: ProgressEvent) {
        if let Ok(mut tracker) = self.lock() {
            tracker.apply(event);
        }
    }
}

/// What the progress bar renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub current: u32,
    pub total: u32,
    pub percent: f64,
    pub is_generating: bool,
    pub phase: ProgressPhase,
    pub current_image: Option<CurrentImage>,
    pub errors: Vec<PageError>,
}
