//! crates/picture_book_core/src/wizard/upload.rs
//!
//! The upload step: validate the photo, upload it, and turn it into a story setting.

use serde::Serialize;
use tracing::{error, info};

use crate::domain::ImageFile;
use crate::error::{UploadError, WizardError};
use crate::ports::{StoryBackendService, WizardSessionStore};
use crate::session::WizardSession;
use crate::wizard::routes;

/// Largest photo accepted, in bytes (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Rejects anything that is not an image or is over the size ceiling.
/// Runs before any network call.
pub fn validate_image(content_type: &str, size: u64) -> Result<(), UploadError> {
    if !content_type.starts_with("image/") {
        return Err(UploadError::NotAnImage {
            content_type: content_type.to_string(),
        });
    }
    if size > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// What the page shows about the selected file before it is sent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilePreview {
    pub file_name: String,
    pub content_type: String,
    /// Size in MiB, rounded to two decimals for display.
    pub size_mib: f64,
}

impl FilePreview {
    pub fn of(file: &ImageFile) -> Self {
        let mib = file.size() as f64 / 1024.0 / 1024.0;
        Self {
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            size_mib: (mib * 100.0).round() / 100.0,
        }
    }
}

/// The result of a completed upload step.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadOutcome {
    pub uploaded_image_id: i64,
    pub story_setting_id: i64,
    pub preview: FilePreview,
    pub next: String,
}

/// Validates, uploads and creates the story setting, persisting each identifier
/// as soon as it is known.
pub async fn run_upload(
    backend: &dyn StoryBackendService,
    store: &dyn WizardSessionStore,
    session: &mut WizardSession,
    file: ImageFile,
) -> Result<UploadOutcome, WizardError> {
    validate_image(&file.content_type, file.size())?;
    let preview = FilePreview::of(&file);

    info!(file = %file.file_name, size = file.size(), "Uploading image");
    let uploaded = backend
        .upload_image(session.user_id, file)
        .await
        .map_err(|e| {
            error!("Image upload failed: {:?}", e);
            WizardError::UploadFailed(e)
        })?;

    session.record_upload(&uploaded);
    store.save(session).await.map_err(WizardError::UploadFailed)?;
    info!(uploaded_image_id = uploaded.id, "Image uploaded");

    let story_setting_id = create_story_setting(backend, store, session).await?;

    Ok(UploadOutcome {
        uploaded_image_id: uploaded.id,
        story_setting_id,
        preview,
        next: routes::QUESTION.to_string(),
    })
}

/// Creates the story setting for the session's uploaded image. Also used on its
/// own to retry after the upload itself already succeeded.
pub async fn create_story_setting(
    backend: &dyn StoryBackendService,
    store: &dyn WizardSessionStore,
    session: &mut WizardSession,
) -> Result<i64, WizardError> {
    let uploaded_image_id = session.require_uploaded_image_id()?;

    let setting = backend
        .create_story_setting(uploaded_image_id)
        .await
        .map_err(|e| {
            error!("Failed to create story setting for image {}: {:?}", uploaded_image_id, e);
            WizardError::StorySettingFailed(e)
        })?;

    session.record_story_setting(&setting);
    store
        .save(session)
        .await
        .map_err(WizardError::StorySettingFailed)?;
    info!(story_setting_id = setting.id, "Story setting created");
    Ok(setting.id)
}
