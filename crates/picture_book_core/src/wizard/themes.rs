//! crates/picture_book_core/src/wizard/themes.rs
//!
//! The theme step: page through the candidate titles, then turn the chosen one
//! into an illustrated storybook.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{ImageUrlUpdate, PageImageRequest, StoryPlot};
use crate::error::WizardError;
use crate::ports::{StoryBackendService, WizardSessionStore};
use crate::session::WizardSession;
use crate::wizard::progress::{ProgressEvent, ProgressObserver, EXPECTED_IMAGES};
use crate::wizard::routes;

/// How many candidate themes are fetched for one story setting.
pub const THEME_FETCH_LIMIT: usize = 3;

/// Circular slider over the candidate themes.
#[derive(Debug, Clone, Default)]
pub struct ThemeCarousel {
    items: Vec<StoryPlot>,
    index: usize,
    generating: bool,
    last_error: Option<String>,
}

impl ThemeCarousel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, items: Vec<StoryPlot>) {
        self.items = items;
        self.index = 0;
        self.last_error = None;
    }

    pub fn items(&self) -> &[StoryPlot] {
        &self.items
    }

    pub fn is_loaded(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&StoryPlot> {
        self.items.get(self.index)
    }

    pub fn next(&mut self) -> usize {
        if !self.items.is_empty() {
            self.index = (self.index + 1) % self.items.len();
        }
        self.index
    }

    pub fn previous(&mut self) -> usize {
        if !self.items.is_empty() {
            let len = self.items.len();
            self.index = (self.index + len - 1) % len;
        }
        self.index
    }

    pub fn select(&mut self, index: usize) -> Result<usize, WizardError> {
        if index >= self.items.len() {
            return Err(WizardError::NoThemeSelected);
        }
        self.index = index;
        Ok(index)
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Locks the carousel for generation and returns the chosen theme.
    pub fn begin_generation(&mut self) -> Result<StoryPlot, WizardError> {
        if self.generating {
            return Err(WizardError::InvalidState("generation already running"));
        }
        let plot = self.current().cloned().ok_or(WizardError::NoThemeSelected)?;
        self.generating = true;
        self.last_error = None;
        Ok(plot)
    }

    /// Returns to the selection state, keeping the error message on failure.
    pub fn end_generation(&mut self, error: Option<&WizardError>) {
        self.generating = false;
        self.last_error = error.map(ToString::to_string);
    }

    pub fn view(&self) -> ThemeView {
        ThemeView {
            state: if self.generating { "generating" } else { "selecting" },
            index: self.index,
            total: self.items.len(),
            current: self.current().cloned(),
            items: self.items.clone(),
            error: self.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThemeView {
    pub state: &'static str,
    pub index: usize,
    pub total: usize,
    pub current: Option<StoryPlot>,
    pub items: Vec<StoryPlot>,
    pub error: Option<String>,
}

/// Knobs for the image-to-image generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub strength: f32,
    pub prefix: String,
    pub expected_images: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            strength: 1.0,
            prefix: "storyplot_i2i_all".to_string(),
            expected_images: EXPECTED_IMAGES,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfirmOutcome {
    pub storybook_id: i64,
    pub story_plot_id: i64,
    pub total_generated: u32,
    pub next: String,
}

/// Generates the story for the chosen theme, creates the storybook, illustrates
/// its pages and links the images to it.
///
/// Linking the images is best effort: the book exists and is readable without them.
pub async fn confirm_theme(
    backend: &dyn StoryBackendService,
    store: &dyn WizardSessionStore,
    session: &mut WizardSession,
    plot: &StoryPlot,
    observer: &dyn ProgressObserver,
    options: &GenerationOptions,
) -> Result<ConfirmOutcome, WizardError> {
    let story_setting_id = session.require_story_setting_id()?;
    let theme = plot.theme_key().to_string();

    info!(story_setting_id, theme = %theme, "Generating story for selected theme");
    let selection = backend
        .select_theme(story_setting_id, &theme)
        .await
        .map_err(|e| {
            error!("Story generation for theme failed: {:?}", e);
            WizardError::GenerationFailed(e)
        })?;

    let created = backend
        .confirm_theme_and_create(selection.story_plot_id, &theme)
        .await
        .map_err(|e| {
            error!("Storybook creation failed: {:?}", e);
            WizardError::GenerationFailed(e)
        })?;
    let storybook_id = created.storybook_id;
    info!(storybook_id, story_plot_id = selection.story_plot_id, "Storybook created");

    observer.on_event(ProgressEvent::Started {
        total: options.expected_images,
    });
    observer.on_event(ProgressEvent::ImageGenerating { page_number: 1 });

    let request = PageImageRequest {
        story_plot_id: selection.story_plot_id,
        strength: options.strength,
        prefix: options.prefix.clone(),
        reference_image_path: session.reference_image_path().map(str::to_string),
    };
    let result = match backend.generate_page_images(&request).await {
        Ok(result) => result,
        Err(e) => {
            error!("Page image generation failed: {:?}", e);
            for page_number in 1..=options.expected_images {
                observer.on_event(ProgressEvent::ImageFailed {
                    page_number,
                    error: e.to_string(),
                });
            }
            observer.on_event(ProgressEvent::Finished);
            return Err(WizardError::GenerationFailed(e));
        }
    };
    info!(total_generated = result.total_generated, "Page images generated");

    for page_number in 1..=options.expected_images {
        if result.images.iter().any(|img| img.page_number == page_number) {
            observer.on_event(ProgressEvent::ImageCompleted { page_number });
        } else {
            observer.on_event(ProgressEvent::ImageFailed {
                page_number,
                error: "画像が生成されませんでした".to_string(),
            });
        }
    }

    let update = ImageUrlUpdate::from_generated(storybook_id, &result.images);
    if !update.is_empty() {
        if let Err(e) = backend.update_image_urls(&update).await {
            warn!("Failed to link generated images to storybook {}: {:?}", storybook_id, e);
        }
    }
    observer.on_event(ProgressEvent::Finished);

    session.record_storybook(storybook_id);
    if let Err(e) = store.save(session).await {
        warn!("Failed to persist storybook id {}: {:?}", storybook_id, e);
    }

    Ok(ConfirmOutcome {
        storybook_id,
        story_plot_id: selection.story_plot_id,
        total_generated: result.total_generated,
        next: routes::storybook(storybook_id),
    })
}
