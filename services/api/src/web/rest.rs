//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the wizard session resource and the master
//! definition for the OpenAPI document.

use crate::web::http_error::AppError;
use crate::web::state::AppState;
use crate::web::{books, reader, wizard};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use picture_book_core::session::WizardSession;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        get_session_handler,
        delete_session_handler,
        abort_handler,
        wizard::upload_handler,
        wizard::confirm_upload_handler,
        wizard::questions_handler,
        wizard::set_answer_handler,
        wizard::previous_question_handler,
        wizard::next_question_handler,
        wizard::themes_handler,
        wizard::previous_theme_handler,
        wizard::next_theme_handler,
        wizard::select_theme_handler,
        wizard::confirm_theme_handler,
        wizard::progress_handler,
        reader::storybook_handler,
        books::list_books_handler,
        books::get_book_handler,
    ),
    components(
        schemas(SessionResponse, wizard::AnswerPayload, wizard::SelectThemePayload)
    ),
    tags(
        (name = "Picture Book Wizard API", description = "Upload a photo, answer questions, pick a theme and read the generated picture book.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Snapshot of the identifiers a wizard session has collected so far.
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    session_id: Uuid,
    user_id: i64,
    uploaded_image_id: Option<i64>,
    /// Browser-usable URL of the uploaded photo.
    uploaded_image_url: Option<String>,
    story_setting_id: Option<i64>,
    protagonist_name: Option<String>,
    protagonist_type: Option<String>,
    setting_place: Option<String>,
    storybook_id: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl SessionResponse {
    pub fn from_session(session: &WizardSession, state: &AppState) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id,
            uploaded_image_id: session.uploaded_image_id,
            uploaded_image_url: state
                .normalizer
                .uploaded_image(session.uploaded_image_path.as_deref()),
            story_setting_id: session.story_setting_id,
            protagonist_name: session.protagonist_name().map(str::to_string),
            protagonist_type: session.protagonist_type().map(str::to_string),
            setting_place: session.setting_place().map(str::to_string),
            storybook_id: session.storybook_id,
            updated_at: session.updated_at,
        }
    }
}

/// Reads the optional `x-user-id` header, falling back to the configured user.
fn user_id_from(headers: &HeaderMap, state: &AppState) -> Result<i64, AppError> {
    match headers.get("x-user-id") {
        None => Ok(state.config.default_user_id),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::bad_request("Invalid x-user-id format")),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Start a new wizard session.
///
/// The `x-user-id` header is optional; without it the configured default user is used.
#[utoipa::path(
    post,
    path = "/wizard/sessions",
    responses(
        (status = 201, description = "Session created successfully", body = SessionResponse),
        (status = 400, description = "Invalid x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Option<i64>, Header, description = "The user the session belongs to.")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user_id_from(&headers, &app_state)?;
    let session = app_state.sessions.create(user_id).await?;
    info!(session_id = %session.id, user_id, "Wizard session created");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::from_session(&session, &app_state)),
    ))
}

/// Fetch the current state of a wizard session.
#[utoipa::path(
    get,
    path = "/wizard/{session_id}",
    responses(
        (status = 200, description = "Session snapshot", body = SessionResponse),
        (status = 404, description = "Unknown session")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = app_state.sessions.load(session_id).await?;
    Ok(Json(SessionResponse::from_session(&session, &app_state)))
}

/// Abort any in-flight work and forget the session.
#[utoipa::path(
    delete,
    path = "/wizard/{session_id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Unknown session")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.runtimes.remove(session_id).await;
    app_state.sessions.delete(session_id).await?;
    info!(%session_id, "Wizard session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel the answer submission currently running for this session.
#[utoipa::path(
    post,
    path = "/wizard/{session_id}/abort",
    responses(
        (status = 202, description = "Abort requested"),
        (status = 404, description = "Unknown session")
    ),
    params(("session_id" = Uuid, Path, description = "The wizard session ID."))
)]
pub async fn abort_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.sessions.load(session_id).await?;
    if !app_state.runtimes.abort(session_id).await {
        warn!(%session_id, "Abort requested but nothing is running");
    }
    Ok(StatusCode::ACCEPTED)
}
