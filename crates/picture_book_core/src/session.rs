//! crates/picture_book_core/src/session.rs
//!
//! The wizard session: the identifiers each step hands to the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{StorySetting, UploadedImage};
use crate::error::WizardError;

/// Identifiers collected while a user walks through the wizard.
///
/// The chain is strictly linear: an uploaded image yields a story setting,
/// the story setting feeds questions and themes, a confirmed theme yields a
/// storybook. Recording an upstream value clears everything downstream of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WizardSession {
    pub id: Uuid,
    pub user_id: i64,
    pub uploaded_image_id: Option<i64>,
    pub uploaded_image_path: Option<String>,
    pub story_setting_id: Option<i64>,
    pub story_setting_data: Option<Map<String, Value>>,
    pub storybook_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new(user_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            uploaded_image_id: None,
            uploaded_image_path: None,
            story_setting_id: None,
            story_setting_data: None,
            storybook_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn record_upload(&mut self, image: &UploadedImage) {
        self.uploaded_image_id = Some(image.id);
        self.uploaded_image_path = image.stored_path().map(str::to_string);
        self.story_setting_id = None;
        self.story_setting_data = None;
        self.storybook_id = None;
        self.touch();
    }

    pub fn record_story_setting(&mut self, setting: &StorySetting) {
        self.story_setting_id = Some(setting.id);
        self.story_setting_data = Some(setting.generated_data.clone());
        self.storybook_id = None;
        self.touch();
    }

    pub fn record_storybook(&mut self, storybook_id: i64) {
        self.storybook_id = Some(storybook_id);
        self.touch();
    }

    pub fn require_uploaded_image_id(&self) -> Result<i64, WizardError> {
        self.uploaded_image_id.ok_or(WizardError::MissingUploadedImage)
    }

    pub fn require_story_setting_id(&self) -> Result<i64, WizardError> {
        self.story_setting_id.ok_or(WizardError::MissingStorySetting)
    }

    /// The reference image handed to image generation, if a usable one was stored.
    pub fn reference_image_path(&self) -> Option<&str> {
        self.uploaded_image_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }

    /// A text attribute the backend derived for the current story setting.
    pub fn setting_attr(&self, key: &str) -> Option<&str> {
        self.story_setting_data
            .as_ref()
            .and_then(|data| data.get(key))
            .and_then(Value::as_str)
    }

    pub fn protagonist_name(&self) -> Option<&str> {
        self.setting_attr("protagonist_name")
    }

    pub fn protagonist_type(&self) -> Option<&str> {
        self.setting_attr("protagonist_type")
    }

    pub fn setting_place(&self) -> Option<&str> {
        self.setting_attr("setting_place")
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
