//! Walks the whole wizard against an in-process fake backend.

use async_trait::async_trait;
use bytes::Bytes;
use picture_book_core::domain::{
    GeneratedImage, ImageFile, ImageGenerationResult, ImageUrlUpdate,
    PageImageRequest, Question, QuestionKind, StoryBook, StoryBookCreated, StoryPlot, StorySetting,
    ThemeSelection, UploadedImage,
};
use picture_book_core::error::{ReaderError, UploadError, WizardError};
use picture_book_core::image_url::ImageUrlNormalizer;
use picture_book_core::ports::{PortError, PortResult, StoryBackendService, WizardSessionStore};
use picture_book_core::session::WizardSession;
use picture_book_core::wizard::{
    confirm_theme, create_story_setting, load_storybook, run_upload, submit_answers, FlowState, GenerationOptions,
    NextOutcome, ProgressTracker, QuestionFlow, StoryBookReader, ThemeCarousel,
};
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// Fakes
//=========================================================================================

#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<String>>,
    fail_upload: bool,
    /// How many story-setting requests fail before one succeeds.
    story_setting_failures: AtomicUsize,
    /// How many answer requests fail before they start succeeding.
    answer_failures: AtomicUsize,
    fail_generation: bool,
    fail_image_update: bool,
    slow_answers: bool,
}

impl FakeBackend {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Decrements a failure budget, reporting whether this call should fail.
fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn server_error() -> PortError {
    PortError::Rejected {
        status: 500,
        message: "Internal Server Error".into(),
    }
}

fn question(field: &str, required: bool) -> Question {
    Question {
        field: field.to_string(),
        question: format!("{}をおしえてね", field),
        kind: QuestionKind::Text,
        placeholder: None,
        required,
        options: vec![],
    }
}

#[async_trait]
impl StoryBackendService for FakeBackend {
    async fn upload_image(&self, _user_id: i64, file: ImageFile) -> PortResult<UploadedImage> {
        self.record(format!("upload:{}", file.file_name));
        if self.fail_upload {
            return Err(server_error());
        }
        Ok(UploadedImage {
            id: 42,
            file_name: file.file_name,
            file_path: "/srv/uploads/photo.jpg".into(),
            content_type: file.content_type,
            size_bytes: file.data.len() as u64,
            uploaded_at: None,
            meta_data: None,
            public_url: None,
        })
    }

    async fn create_story_setting(&self, uploaded_image_id: i64) -> PortResult<StorySetting> {
        self.record(format!("story_setting:{}", uploaded_image_id));
        if take_failure(&self.story_setting_failures) {
            return Err(server_error());
        }
        let mut generated_data = Map::new();
        generated_data.insert("protagonist_name".into(), json!("ミミ"));
        Ok(StorySetting {
            id: 7,
            generated_data,
        })
    }

    async fn fetch_questions(&self, story_setting_id: i64) -> PortResult<Vec<Question>> {
        self.record(format!("questions:{}", story_setting_id));
        Ok(vec![
            question("protagonist_name", true),
            question("setting_place", false),
            question("hobby", false),
        ])
    }

    async fn submit_answer(&self, story_setting_id: i64, field: &str, answer: &str) -> PortResult<()> {
        if self.slow_answers {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.record(format!("answer:{}:{}={}", story_setting_id, field, answer));
        if take_failure(&self.answer_failures) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn start_story_generation(&self, story_setting_id: i64) -> PortResult<()> {
        self.record(format!("generate_story:{}", story_setting_id));
        Ok(())
    }

    async fn fetch_story_plots(
        &self,
        _user_id: i64,
        story_setting_id: i64,
        limit: usize,
    ) -> PortResult<Vec<StoryPlot>> {
        self.record(format!("plots:{}:{}", story_setting_id, limit));
        Ok((1..=3)
            .map(|i| StoryPlot {
                story_plot_id: i,
                title: format!("テーマ{}", i),
                description: None,
                selected_theme: None,
            })
            .collect())
    }

    async fn select_theme(&self, story_setting_id: i64, theme: &str) -> PortResult<ThemeSelection> {
        self.record(format!("select:{}:{}", story_setting_id, theme));
        Ok(ThemeSelection {
            story_plot_id: 11,
            title: theme.to_string(),
        })
    }

    async fn confirm_theme_and_create(
        &self,
        story_plot_id: i64,
        _theme: &str,
    ) -> PortResult<StoryBookCreated> {
        self.record(format!("create_book:{}", story_plot_id));
        Ok(StoryBookCreated {
            storybook_id: 99,
            selected_theme: None,
            message: None,
        })
    }

    async fn generate_page_images(
        &self,
        request: &PageImageRequest,
    ) -> PortResult<ImageGenerationResult> {
        self.record(format!(
            "images:{}:{}",
            request.story_plot_id,
            request.reference_image_path.as_deref().unwrap_or("-")
        ));
        if self.fail_generation {
            return Err(PortError::Rejected {
                status: 500,
                message: "gpu on fire".into(),
            });
        }
        Ok(ImageGenerationResult {
            total_generated: 5,
            images: (1..=5)
                .map(|page_number| GeneratedImage {
                    page_number,
                    filepath: format!("C:\\out\\page_{}.png", page_number),
                })
                .collect(),
        })
    }

    async fn update_image_urls(&self, update: &ImageUrlUpdate) -> PortResult<()> {
        self.record(format!("update_urls:{}", update.storybook_id));
        if self.fail_image_update {
            return Err(PortError::Unexpected("connection reset".into()));
        }
        Ok(())
    }

    async fn fetch_storybook(&self, storybook_id: i64) -> PortResult<StoryBook> {
        self.record(format!("storybook:{}", storybook_id));
        if storybook_id != 99 {
            return Err(PortError::NotFound(format!("storybook {}", storybook_id)));
        }
        let book = serde_json::from_value(json!({
            "id": 99,
            "title": "テーマ1",
            "page_1": "むかしむかし",
            "page_2": "ミミはもりへ",
            "page_3": "かわをわたって",
            "page_4": "ともだちができた",
            "page_5": "おしまい",
            "page_1_image_url": "C:\\out\\page_1.png",
            "image_generation_status": "completed"
        }))
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(book)
    }
}

#[derive(Default)]
struct MemoryStore {
    sessions: Mutex<HashMap<Uuid, WizardSession>>,
}

#[async_trait]
impl WizardSessionStore for MemoryStore {
    async fn create(&self, user_id: i64) -> PortResult<WizardSession> {
        let session = WizardSession::new(user_id);
        self.sessions.lock().unwrap().insert(session.id, session.clone());
        Ok(session)
    }

    async fn load(&self, session_id: Uuid) -> PortResult<WizardSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(session_id.to_string()))
    }

    async fn save(&self, session: &WizardSession) -> PortResult<()> {
        self.sessions.lock().unwrap().insert(session.id, session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> PortResult<()> {
        self.sessions.lock().unwrap().remove(&session_id);
        Ok(())
    }
}

fn photo() -> ImageFile {
    ImageFile {
        file_name: "photo.jpg".into(),
        content_type: "image/jpeg".into(),
        data: Bytes::from(vec![0u8; 2_000_000]),
    }
}

/// Runs the upload and question steps so a test can start at the theme step.
async fn through_questions(backend: &FakeBackend, store: &MemoryStore) -> WizardSession {
    let mut session = store.create(1).await.unwrap();
    run_upload(backend, store, &mut session, photo()).await.unwrap();

    let mut flow = QuestionFlow::new();
    flow.load(backend.fetch_questions(7).await.unwrap());
    flow.set_answer("ミミ").unwrap();
    flow.next().unwrap();
    flow.next().unwrap();
    flow.next().unwrap();
    submit_answers(&mut flow, backend, 7, &CancellationToken::new())
        .await
        .unwrap();
    session
}

//=========================================================================================
// Scenarios
//=========================================================================================

#[tokio::test]
async fn full_wizard_produces_a_readable_book() {
    let backend = FakeBackend::default();
    let store = MemoryStore::default();
    let mut session = store.create(1).await.unwrap();

    // Upload: 42 -> story setting 7.
    let upload = run_upload(&backend, &store, &mut session, photo()).await.unwrap();
    assert_eq!(upload.uploaded_image_id, 42);
    assert_eq!(upload.story_setting_id, 7);
    assert_eq!(upload.next, "/question");
    assert_eq!(upload.preview.size_mib, 1.91);
    let persisted = store.load(session.id).await.unwrap();
    assert_eq!(persisted.story_setting_id, Some(7));

    // Questions: the required one blocks while empty, then all three are answered.
    let mut flow = QuestionFlow::new();
    flow.load(backend.fetch_questions(7).await.unwrap());
    assert!(matches!(flow.next(), Err(WizardError::AnswerRequired { .. })));
    flow.set_answer("ミミ").unwrap();
    assert_eq!(flow.next(), Ok(NextOutcome::Advanced(1)));
    flow.set_answer("もり").unwrap();
    assert_eq!(flow.next(), Ok(NextOutcome::Advanced(2)));
    flow.set_answer("ピアノ").unwrap();
    assert_eq!(flow.next(), Ok(NextOutcome::ReadyToSubmit));

    let submitted = submit_answers(&mut flow, &backend, 7, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        submitted.submitted_fields,
        vec!["protagonist_name", "setting_place", "hobby"]
    );
    assert_eq!(submitted.next, "/story-theme");
    assert_eq!(flow.state(), FlowState::Completed);

    // Themes: three candidates, the first one is confirmed.
    let mut carousel = ThemeCarousel::new();
    carousel.load(backend.fetch_story_plots(1, 7, 3).await.unwrap());
    assert_eq!(carousel.items().len(), 3);
    assert_eq!(carousel.select(0), Ok(0));
    let plot = carousel.begin_generation().unwrap();
    let progress = Mutex::new(ProgressTracker::new());
    let confirmed = confirm_theme(
        &backend,
        &store,
        &mut session,
        &plot,
        &progress,
        &GenerationOptions::default(),
    )
    .await
    .unwrap();
    carousel.end_generation(None);

    assert_eq!(confirmed.storybook_id, 99);
    assert_eq!(confirmed.next, "/storybook/99");
    let view = progress.lock().unwrap().view();
    assert_eq!(view.current, 5);
    assert_eq!(view.percent, 100.0);
    assert!(view.errors.is_empty());
    assert_eq!(store.load(session.id).await.unwrap().storybook_id, Some(99));

    // Reader.
    let book = load_storybook(&backend, 99).await.unwrap();
    let reader = StoryBookReader::new(book, &ImageUrlNormalizer::new("http://localhost:8000", true));
    let page = reader.view();
    assert_eq!((page.current.page, page.current.total), (1, 5));
    assert_eq!(
        page.current.image_url.as_deref(),
        Some("http://localhost:8000/uploads/generated_images/page_1.png")
    );

    assert_eq!(
        backend.calls(),
        vec![
            "upload:photo.jpg",
            "story_setting:42",
            "questions:7",
            "answer:7:protagonist_name=ミミ",
            "answer:7:setting_place=もり",
            "answer:7:hobby=ピアノ",
            "generate_story:7",
            "plots:7:3",
            "select:7:テーマ1",
            "create_book:11",
            "images:11:/srv/uploads/photo.jpg",
            "update_urls:99",
            "storybook:99",
        ]
    );
}

#[tokio::test]
async fn rejected_file_never_reaches_the_backend() {
    let backend = FakeBackend::default();
    let store = MemoryStore::default();
    let mut session = store.create(1).await.unwrap();

    let text = ImageFile {
        file_name: "notes.txt".into(),
        content_type: "text/plain".into(),
        data: Bytes::from_static(b"hello"),
    };
    let err = run_upload(&backend, &store, &mut session, text).await.unwrap_err();
    assert!(matches!(err, WizardError::Upload(UploadError::NotAnImage { .. })));
    assert_eq!(err.to_string(), "画像ファイルのみアップロード可能です");
    assert!(backend.calls().is_empty());
    assert_eq!(session.uploaded_image_id, None);
}

#[tokio::test]
async fn backend_rejecting_the_upload_stops_the_step() {
    let backend = FakeBackend {
        fail_upload: true,
        ..FakeBackend::default()
    };
    let store = MemoryStore::default();
    let mut session = store.create(1).await.unwrap();

    let err = run_upload(&backend, &store, &mut session, photo()).await.unwrap_err();
    assert!(matches!(err, WizardError::UploadFailed(_)));
    assert_eq!(backend.calls(), vec!["upload:photo.jpg"]);
    assert_eq!(session.uploaded_image_id, None);
    assert_eq!(store.load(session.id).await.unwrap().uploaded_image_id, None);
}

#[tokio::test]
async fn story_setting_can_be_retried_after_the_upload_succeeded() {
    let backend = FakeBackend {
        story_setting_failures: AtomicUsize::new(1),
        ..FakeBackend::default()
    };
    let store = MemoryStore::default();
    let mut session = store.create(1).await.unwrap();

    let err = run_upload(&backend, &store, &mut session, photo()).await.unwrap_err();
    assert!(matches!(err, WizardError::StorySettingFailed(_)));
    let persisted = store.load(session.id).await.unwrap();
    assert_eq!(persisted.uploaded_image_id, Some(42));
    assert_eq!(persisted.story_setting_id, None);

    let mut reloaded = store.load(session.id).await.unwrap();
    let story_setting_id = create_story_setting(&backend, &store, &mut reloaded)
        .await
        .unwrap();
    assert_eq!(story_setting_id, 7);
    assert_eq!(store.load(session.id).await.unwrap().story_setting_id, Some(7));
    assert_eq!(
        backend.calls(),
        vec!["upload:photo.jpg", "story_setting:42", "story_setting:42"]
    );
}

#[tokio::test]
async fn failed_answer_is_reported_and_resubmitted_on_next() {
    let backend = FakeBackend {
        answer_failures: AtomicUsize::new(1),
        ..FakeBackend::default()
    };
    let mut flow = QuestionFlow::new();
    flow.load(vec![question("protagonist_name", true), question("hobby", false)]);
    flow.set_answer("ミミ").unwrap();
    flow.next().unwrap();
    flow.set_answer("ピアノ").unwrap();
    assert_eq!(flow.next(), Ok(NextOutcome::ReadyToSubmit));

    let err = submit_answers(&mut flow, &backend, 7, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::SubmitFailed(_)));
    assert_eq!(flow.state(), FlowState::Answering(1));
    assert_eq!(flow.current_answer(), "ピアノ");
    assert_eq!(flow.last_error(), Some(err.to_string().as_str()));

    assert_eq!(flow.next(), Ok(NextOutcome::ReadyToSubmit));
    let submitted = submit_answers(&mut flow, &backend, 7, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(submitted.submitted_fields, vec!["protagonist_name", "hobby"]);
    assert_eq!(flow.state(), FlowState::Completed);
    assert_eq!(
        backend.calls(),
        vec![
            "answer:7:protagonist_name=ミミ",
            "answer:7:protagonist_name=ミミ",
            "answer:7:hobby=ピアノ",
            "generate_story:7",
        ]
    );
}

#[tokio::test]
async fn aborted_submission_returns_to_the_last_question() {
    let backend = FakeBackend {
        slow_answers: true,
        ..FakeBackend::default()
    };
    let mut flow = QuestionFlow::new();
    flow.load(vec![question("protagonist_name", true), question("hobby", false)]);
    flow.set_answer("ミミ").unwrap();
    flow.next().unwrap();
    assert_eq!(flow.next(), Ok(NextOutcome::ReadyToSubmit));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = submit_answers(&mut flow, &backend, 7, &cancel).await.unwrap_err();
    assert_eq!(err, WizardError::Cancelled);
    assert_eq!(flow.state(), FlowState::Answering(1));
    assert!(flow.last_error().is_some());
    assert!(!backend.calls().iter().any(|c| c.starts_with("generate_story")));
}

#[tokio::test]
async fn failed_image_linking_still_yields_the_book() {
    let backend = FakeBackend {
        fail_image_update: true,
        ..FakeBackend::default()
    };
    let store = MemoryStore::default();
    let mut session = through_questions(&backend, &store).await;

    let mut carousel = ThemeCarousel::new();
    carousel.load(backend.fetch_story_plots(1, 7, 3).await.unwrap());
    let plot = carousel.begin_generation().unwrap();
    let progress = Mutex::new(ProgressTracker::new());

    let confirmed = confirm_theme(
        &backend,
        &store,
        &mut session,
        &plot,
        &progress,
        &GenerationOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(confirmed.storybook_id, 99);
    assert!(!progress.lock().unwrap().is_generating());
}

#[tokio::test]
async fn failed_generation_marks_every_page_and_unlocks_the_carousel() {
    let backend = FakeBackend {
        fail_generation: true,
        ..FakeBackend::default()
    };
    let store = MemoryStore::default();
    let mut session = through_questions(&backend, &store).await;

    let mut carousel = ThemeCarousel::new();
    carousel.load(backend.fetch_story_plots(1, 7, 3).await.unwrap());
    let plot = carousel.begin_generation().unwrap();
    let progress = Mutex::new(ProgressTracker::new());

    let result = confirm_theme(
        &backend,
        &store,
        &mut session,
        &plot,
        &progress,
        &GenerationOptions::default(),
    )
    .await;
    carousel.end_generation(result.as_ref().err());

    assert!(matches!(result, Err(WizardError::GenerationFailed(_))));
    assert!(!carousel.is_generating());
    assert_eq!(carousel.view().error.as_deref(), Some("画像生成に失敗しました"));
    let tracker = progress.lock().unwrap();
    assert_eq!(tracker.errors().len(), 5);
    assert_eq!(tracker.percent(), 100.0);
    assert_eq!(session.storybook_id, None);
}

#[tokio::test]
async fn missing_storybook_is_reported_in_plain_words() {
    let backend = FakeBackend::default();
    let err = load_storybook(&backend, 123).await.unwrap_err();
    assert_eq!(err, ReaderError::NotFound);
    assert_eq!(err.to_string(), "絵本が見つかりません");
}
