pub mod domain;
pub mod error;
pub mod image_url;
pub mod ports;
pub mod session;
pub mod wizard;

pub use domain::{
    BookDetail, BookPage, BookSummary, BooksPage, ImageFile, Question, StoryBook, StoryPlot,
    StorySetting, UploadedImage,
};
pub use error::{ReaderError, UploadError, WizardError};
pub use image_url::ImageUrlNormalizer;
pub use ports::{LibraryService, PortError, PortResult, StoryBackendService, WizardSessionStore};
pub use session::WizardSession;
