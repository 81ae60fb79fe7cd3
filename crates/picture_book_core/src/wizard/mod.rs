//! The four wizard steps, in the order the user walks through them.

pub mod progress;
pub mod questions;
pub mod reader;
pub mod routes;
pub mod themes;
pub mod upload;

pub use progress::{ProgressEvent, ProgressObserver, ProgressTracker, ProgressView};
pub use questions::{send_answers, submit_answers, FlowState, NextOutcome, QuestionFlow, QuestionView};
pub use reader::{load_storybook, ReaderView, StoryBookReader};
pub use themes::{confirm_theme, ConfirmOutcome, GenerationOptions, ThemeCarousel, ThemeView};
pub use upload::{create_story_setting, run_upload, validate_image, UploadOutcome, MAX_IMAGE_BYTES};
