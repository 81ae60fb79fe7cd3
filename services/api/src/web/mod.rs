pub mod books;
pub mod http_error;
pub mod reader;
pub mod rest;
pub mod state;
pub mod wizard;

use crate::config::ConfigError;
use crate::error::ApiError;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use picture_book_core::wizard::MAX_IMAGE_BYTES;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use rest::{create_session_handler, ApiDoc};
pub use state::AppState;

/// Multipart framing on top of the largest accepted photo.
const BODY_LIMIT: usize = MAX_IMAGE_BYTES as usize + 1024 * 1024;

/// Builds the complete application: wizard, reader and library routes plus Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static("x-user-id")]);

    let wizard_routes = Router::new()
        .route("/wizard/sessions", post(rest::create_session_handler))
        .route(
            "/wizard/{session_id}",
            get(rest::get_session_handler).delete(rest::delete_session_handler),
        )
        .route("/wizard/{session_id}/abort", post(rest::abort_handler))
        .route("/wizard/{session_id}/upload", post(wizard::upload_handler))
        .route(
            "/wizard/{session_id}/upload/confirm",
            post(wizard::confirm_upload_handler),
        )
        .route("/wizard/{session_id}/questions", get(wizard::questions_handler))
        .route(
            "/wizard/{session_id}/questions/answer",
            put(wizard::set_answer_handler),
        )
        .route(
            "/wizard/{session_id}/questions/previous",
            post(wizard::previous_question_handler),
        )
        .route(
            "/wizard/{session_id}/questions/next",
            post(wizard::next_question_handler),
        )
        .route("/wizard/{session_id}/themes", get(wizard::themes_handler))
        .route(
            "/wizard/{session_id}/themes/previous",
            post(wizard::previous_theme_handler),
        )
        .route(
            "/wizard/{session_id}/themes/next",
            post(wizard::next_theme_handler),
        )
        .route(
            "/wizard/{session_id}/themes/select",
            post(wizard::select_theme_handler),
        )
        .route(
            "/wizard/{session_id}/themes/confirm",
            post(wizard::confirm_theme_handler),
        )
        .route("/wizard/{session_id}/progress", get(wizard::progress_handler));

    let reader_routes = Router::new()
        .route("/storybook/{storybook_id}", get(reader::storybook_handler))
        .route("/api/books", get(books::list_books_handler))
        .route("/api/books/{book_id}", get(books::get_book_handler));

    let api_router = Router::new()
        .merge(wizard_routes)
        .merge(reader_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
