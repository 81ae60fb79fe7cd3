//! services/api/src/web/wizard.rs
//!
//! Handlers for the wizard steps: upload, questions, themes and generation progress.
//! Identifiers are read from and written to the session store; the step state
//! (answers, carousel position, progress) lives in the session's runtime.

use crate::web::http_error::AppError;
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use bytes::Bytes;
use picture_book_core::domain::ImageFile;
use picture_book_core::error::{UploadError, WizardError};
use picture_book_core::wizard::questions::SubmitOutcome;
use picture_book_core::wizard::themes::THEME_FETCH_LIMIT;
use picture_book_core::wizard::{
    self as steps, routes, ConfirmOutcome, NextOutcome, ProgressView, QuestionView, ThemeView,
    UploadOutcome,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AnswerPayload {
    pub answer: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectThemePayload {
    pub index: usize,
}

#[derive(Serialize)]
pub struct StorySettingResponse {
    pub story_setting_id: i64,
    pub next: String,
}

/// Result of pressing "next" on a question: either the following question or,
/// after the last one, the submission outcome.
#[derive(Serialize)]
pub struct NextQuestionResponse {
    pub view: QuestionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<SubmitOutcome>,
}

//=========================================================================================
// Upload Step
//=========================================================================================

/// Upload the photo and create the story setting from it.
///
/// Accepts a multipart/form-data request with a `file` part. Non-images and files
/// over 10 MB are rejected before anything is sent to the backend.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/upload",
    request_body(content_type = "multipart/form-data", description = "The photo to upload."),
    responses(
        (status = 200, description = "Image uploaded and story setting created"),
        (status = 400, description = "Missing file or not an image"),
        (status = 413, description = "File too large"),
        (status = 502, description = "The story backend failed")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, AppError> {
    let mut session = app_state.sessions.load(session_id).await?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data: Bytes = field.bytes().await?;
        file = Some(ImageFile {
            file_name,
            content_type,
            data,
        });
        break;
    }
    let file = file.ok_or(UploadError::NoFile)?;
    steps::validate_image(&file.content_type, file.size())?;

    let previous_setting = session.story_setting_id;
    let result = steps::run_upload(
        app_state.backend.as_ref(),
        app_state.sessions.as_ref(),
        &mut session,
        file,
    )
    .await;
    // The step state belongs to the story setting; keep it unless that changed.
    if session.story_setting_id != previous_setting {
        app_state.runtimes.reset(session_id).await;
    }
    Ok(Json(result?))
}

/// Retry story-setting creation for an image that was already uploaded.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/upload/confirm",
    responses(
        (status = 200, description = "Story setting created"),
        (status = 409, description = "No image uploaded yet"),
        (status = 502, description = "The story backend failed")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn confirm_upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StorySettingResponse>, AppError> {
    let mut session = app_state.sessions.load(session_id).await?;
    let story_setting_id = steps::create_story_setting(
        app_state.backend.as_ref(),
        app_state.sessions.as_ref(),
        &mut session,
    )
    .await?;
    app_state.runtimes.reset(session_id).await;
    Ok(Json(StorySettingResponse {
        story_setting_id,
        next: routes::QUESTION.to_string(),
    }))
}

//=========================================================================================
// Question Step
//=========================================================================================

/// Load the questions for the session's story setting and show the current one.
#[utoipa::path(
    get,
    path = "/wizard/{session_id}/questions",
    responses(
        (status = 200, description = "Current question view"),
        (status = 409, description = "No story setting yet"),
        (status = 502, description = "The story backend failed")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn questions_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuestionView>, AppError> {
    let session = app_state.sessions.load(session_id).await?;
    let story_setting_id = session.require_story_setting_id()?;

    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    if !runtime.questions.is_loaded() {
        let questions = app_state
            .backend
            .fetch_questions(story_setting_id)
            .await
            .map_err(|e| {
                error!("Failed to fetch questions for setting {}: {:?}", story_setting_id, e);
                WizardError::QuestionsFailed(e)
            })?;
        info!(story_setting_id, count = questions.len(), "Questions loaded");
        runtime.questions.load(questions);
    }
    Ok(Json(runtime.questions.view()))
}

/// Edit the answer shown for the current question.
#[utoipa::path(
    put,
    path = "/wizard/{session_id}/questions/answer",
    request_body = AnswerPayload,
    responses(
        (status = 200, description = "Updated question view"),
        (status = 409, description = "Questions not loaded or locked")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn set_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<QuestionView>, AppError> {
    app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    runtime.questions.set_answer(payload.answer)?;
    Ok(Json(runtime.questions.view()))
}

/// Go back one question.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/questions/previous",
    responses((status = 200, description = "Updated question view")),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn previous_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuestionView>, AppError> {
    app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    runtime.questions.previous()?;
    Ok(Json(runtime.questions.view()))
}

/// Store the current answer and move on. On the last question every answer is
/// sent to the backend, one request per field, and story generation is started.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/questions/next",
    responses(
        (status = 200, description = "Advanced, or answers submitted"),
        (status = 409, description = "Submission aborted or nothing to answer"),
        (status = 422, description = "A required answer is empty"),
        (status = 502, description = "The story backend failed")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn next_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<NextQuestionResponse>, AppError> {
    let session = app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;

    let (story_setting_id, answers) = {
        let mut runtime = handle.state.lock().await;
        if let NextOutcome::Advanced(_) = runtime.questions.next()? {
            return Ok(Json(NextQuestionResponse {
                view: runtime.questions.view(),
                submitted: None,
            }));
        }
        match session.require_story_setting_id() {
            Ok(id) => (id, runtime.questions.pending_answers()),
            Err(e) => {
                runtime.questions.finish_submission(Err(e.clone()))?;
                return Err(e.into());
            }
        }
    };

    // The runtime lock is released while sending so the question view keeps
    // answering with `submitting` and the session can be aborted.
    let result = steps::send_answers(
        answers,
        app_state.backend.as_ref(),
        story_setting_id,
        &handle.cancel,
    )
    .await;

    let mut runtime = handle.state.lock().await;
    let outcome = runtime.questions.finish_submission(result)?;
    Ok(Json(NextQuestionResponse {
        view: runtime.questions.view(),
        submitted: Some(outcome),
    }))
}

//=========================================================================================
// Theme Step
//=========================================================================================

/// Load the candidate themes for the session's story setting.
#[utoipa::path(
    get,
    path = "/wizard/{session_id}/themes",
    responses(
        (status = 200, description = "Theme carousel view"),
        (status = 409, description = "No story setting yet"),
        (status = 502, description = "The story backend failed")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn themes_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ThemeView>, AppError> {
    let session = app_state.sessions.load(session_id).await?;
    let story_setting_id = session.require_story_setting_id()?;

    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    if !runtime.themes.is_loaded() {
        let plots = app_state
            .backend
            .fetch_story_plots(session.user_id, story_setting_id, THEME_FETCH_LIMIT)
            .await
            .map_err(|e| {
                error!("Failed to fetch story plots for setting {}: {:?}", story_setting_id, e);
                WizardError::ThemesFailed(e)
            })?;
        info!(story_setting_id, count = plots.len(), "Themes loaded");
        runtime.themes.load(plots);
    }
    Ok(Json(runtime.themes.view()))
}

/// Slide the carousel one theme back, wrapping around.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/themes/previous",
    responses((status = 200, description = "Theme carousel view")),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn previous_theme_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ThemeView>, AppError> {
    app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    runtime.themes.previous();
    Ok(Json(runtime.themes.view()))
}

/// Slide the carousel one theme forward, wrapping around.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/themes/next",
    responses((status = 200, description = "Theme carousel view")),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn next_theme_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ThemeView>, AppError> {
    app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    runtime.themes.next();
    Ok(Json(runtime.themes.view()))
}

/// Jump straight to a theme by its position in the carousel.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/themes/select",
    request_body = SelectThemePayload,
    responses(
        (status = 200, description = "Theme carousel view"),
        (status = 422, description = "No theme at that index")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn select_theme_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SelectThemePayload>,
) -> Result<Json<ThemeView>, AppError> {
    app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;
    let mut runtime = handle.state.lock().await;
    runtime.themes.select(payload.index)?;
    Ok(Json(runtime.themes.view()))
}

/// Generate the story for the current theme, create the storybook and illustrate it.
///
/// Progress can be followed on `/wizard/{session_id}/progress` while this runs.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/themes/confirm",
    responses(
        (status = 200, description = "Storybook created"),
        (status = 409, description = "No story setting or generation already running"),
        (status = 422, description = "No theme selected"),
        (status = 502, description = "The story backend failed")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn confirm_theme_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ConfirmOutcome>, AppError> {
    let mut session = app_state.sessions.load(session_id).await?;
    session.require_story_setting_id()?;

    let handle = app_state.runtimes.get_or_create(session_id).await;
    let plot = handle.state.lock().await.themes.begin_generation()?;

    // The runtime lock is released while generating so the carousel and the
    // progress bar stay readable.
    let result = steps::confirm_theme(
        app_state.backend.as_ref(),
        app_state.sessions.as_ref(),
        &mut session,
        &plot,
        &*handle.progress,
        &app_state.generation_options(),
    )
    .await;

    handle
        .state
        .lock()
        .await
        .themes
        .end_generation(result.as_ref().err());
    Ok(Json(result?))
}

/// Progress of the page-image generation.
#[utoipa::path(
    get,
    path = "/wizard/{session_id}/progress",
    responses((status = 200, description = "Progress bar view")),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn progress_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ProgressView>, AppError> {
    app_state.sessions.load(session_id).await?;
    let handle = app_state.runtimes.get_or_create(session_id).await;
    let view = handle
        .progress
        .lock()
        .map_err(|_| {
            AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "progress state poisoned")
                .with_code("internal")
        })?
        .view();
    Ok(Json(view))
}
