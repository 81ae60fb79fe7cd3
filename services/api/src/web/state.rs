//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-session wizard runtime.

use crate::config::Config;
use picture_book_core::image_url::ImageUrlNormalizer;
use picture_book_core::ports::{LibraryService, StoryBackendService, WizardSessionStore};
use picture_book_core::wizard::{GenerationOptions, ProgressTracker, QuestionFlow, ThemeCarousel};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn StoryBackendService>,
    pub library: Arc<dyn LibraryService>,
    pub sessions: Arc<dyn WizardSessionStore>,
    pub runtimes: RuntimeRegistry,
    pub normalizer: ImageUrlNormalizer,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn StoryBackendService>,
        library: Arc<dyn LibraryService>,
        sessions: Arc<dyn WizardSessionStore>,
    ) -> Self {
        let normalizer =
            ImageUrlNormalizer::new(config.public_backend_url.clone(), config.rewrite_bucket_host);
        Self {
            config,
            backend,
            library,
            sessions,
            runtimes: RuntimeRegistry::default(),
            normalizer,
        }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            strength: self.config.image_strength,
            prefix: self.config.image_prefix.clone(),
            ..GenerationOptions::default()
        }
    }
}

//=========================================================================================
// WizardRuntime (Specific to One Wizard Session)
//=========================================================================================

/// The step state a wizard session holds between requests. Only the identifiers
/// in `WizardSession` are persisted; this lives as long as the process.
#[derive(Default)]
pub struct WizardRuntime {
    pub questions: QuestionFlow,
    pub themes: ThemeCarousel,
}

/// Handles to one session's runtime. Cloning shares the same state.
#[derive(Clone)]
pub struct RuntimeHandle {
    pub state: Arc<Mutex<WizardRuntime>>,
    pub progress: Arc<std::sync::Mutex<ProgressTracker>>,
    /// Cancels the answer submission currently in flight, if any.
    pub cancel: CancellationToken,
}

impl Default for RuntimeHandle {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(WizardRuntime::default())),
            progress: Arc::new(std::sync::Mutex::new(ProgressTracker::new())),
            cancel: CancellationToken::new(),
        }
    }
}

/// Maps session ids to their in-process runtime.
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    inner: Arc<Mutex<HashMap<Uuid, RuntimeHandle>>>,
}

impl RuntimeRegistry {
    pub async fn get_or_create(&self, session_id: Uuid) -> RuntimeHandle {
        self.inner
            .lock()
            .await
            .entry(session_id)
            .or_default()
            .clone()
    }

    /// Cancels in-flight work and hands out a fresh token for the next attempt.
    /// Returns false when the session has no runtime yet.
    pub async fn abort(&self, session_id: Uuid) -> bool {
        let mut runtimes = self.inner.lock().await;
        match runtimes.get_mut(&session_id) {
            Some(handle) => {
                handle.cancel.cancel();
                handle.cancel = CancellationToken::new();
                true
            }
            None => false,
        }
    }

    /// Drops the runtime after a new upload; the questions and themes belong to
    /// the previous story setting.
    pub async fn reset(&self, session_id: Uuid) {
        if let Some(handle) = self.inner.lock().await.remove(&session_id) {
            handle.cancel.cancel();
        }
    }

    pub async fn remove(&self, session_id: Uuid) {
        self.reset(session_id).await;
    }
}
