//! services/api/src/web/reader.rs
//!
//! The storybook reader route. Each request renders one page of a finished book.

use crate::web::http_error::AppError;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use picture_book_core::error::ReaderError;
use picture_book_core::wizard::{load_storybook, ReaderView, StoryBookReader};
use serde::Deserialize;
use std::sync::Arc;

/// The reader's page-turn buttons.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStep {
    Next,
    Previous,
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    pub page: Option<usize>,
    /// Turns one page from `page`.
    pub step: Option<PageStep>,
}

/// Render one page of a storybook. Out-of-range pages and page turns past
/// either end clamp to 1..=5.
#[utoipa::path(
    get,
    path = "/storybook/{storybook_id}",
    responses(
        (status = 200, description = "The requested page"),
        (status = 404, description = "No such storybook"),
        (status = 502, description = "The story backend failed")
    ),
    params(
        ("storybook_id" = i64, Path, description = "The storybook ID."),
        ("page" = Option<usize>, Query, description = "1-based page number."),
        ("step" = Option<String>, Query, description = "`next` or `previous`, applied after `page`.")
    )
)]
pub async fn storybook_handler(
    State(app_state): State<Arc<AppState>>,
    Path(storybook_id): Path<String>,
    Query(query): Query<ReaderQuery>,
) -> Result<Json<ReaderView>, AppError> {
    // A malformed id can never name a book.
    let storybook_id: i64 = storybook_id
        .trim()
        .parse()
        .map_err(|_| AppError::from(ReaderError::NotFound))?;

    let book = load_storybook(app_state.backend.as_ref(), storybook_id).await?;
    let mut reader = StoryBookReader::new(book, &app_state.normalizer);
    reader.go_to(query.page.unwrap_or(1));
    match query.step {
        Some(PageStep::Next) => reader.next(),
        Some(PageStep::Previous) => reader.previous(),
        None => reader.page(),
    };
    Ok(Json(reader.view()))
}
