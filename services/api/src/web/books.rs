//! services/api/src/web/books.rs
//!
//! Thin proxy routes over the backend's finished-book library. Records are
//! validated against a strict schema before they are handed to the client.

use crate::web::http_error::AppError;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use picture_book_core::domain::{BookDetail, BooksPage};
use picture_book_core::ports::PortError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

const LIST_FAILED: &str = "絵本一覧の取得に失敗しました";
const INVALID_ID: &str = "無効な絵本IDです";
const NOT_FOUND: &str = "絵本が見つかりません";
const DETAIL_FAILED: &str = "絵本の詳細取得に失敗しました";

#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

/// List finished books, one page at a time.
#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "A page of books"),
        (status = 500, description = "The backend failed or returned an unexpected shape")
    ),
    params(
        ("limit" = Option<u32>, Query, description = "Page size."),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from the previous page.")
    )
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<BooksPage>, AppError> {
    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u32>().ok());
    let cursor = query.cursor.as_deref().filter(|c| !c.is_empty());

    app_state
        .library
        .list_books(limit, cursor)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Failed to list books: {:?}", e);
            AppError::new(StatusCode::INTERNAL_SERVER_ERROR, LIST_FAILED)
        })
}

/// Fetch one finished book with all of its pages.
#[utoipa::path(
    get,
    path = "/api/books/{book_id}",
    responses(
        (status = 200, description = "The book with its pages"),
        (status = 400, description = "The id is not an integer"),
        (status = 404, description = "No such book"),
        (status = 500, description = "The backend failed or returned an unexpected shape")
    ),
    params(("book_id" = i64, Path, description = "The book ID; trailing non-digits are ignored."))
)]
pub async fn get_book_handler(
    State(app_state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<BookDetail>, AppError> {
    let book_id = leading_integer(&book_id)
        .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, INVALID_ID))?;

    let mut book = app_state.library.get_book(book_id).await.map_err(|e| match e {
        PortError::NotFound(_) | PortError::Rejected { status: 404, .. } => {
            AppError::new(StatusCode::NOT_FOUND, NOT_FOUND)
        }
        other => {
            error!("Failed to fetch book {}: {:?}", book_id, other);
            AppError::new(StatusCode::INTERNAL_SERVER_ERROR, DETAIL_FAILED)
        }
    })?;

    for page in &mut book.pages {
        page.image_url = app_state.normalizer.page_image(page.image_url.as_deref());
    }
    Ok(Json(book))
}

/// Reads the integer at the start of `raw`, ignoring leading whitespace and
/// anything after the digits, so `"12abc"` names book 12.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let digits_start = usize::from(trimmed.starts_with(['+', '-']));
    let digits_len = trimmed[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    trimmed[..digits_start + digits_len].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_ids_parse_like_a_leading_integer() {
        assert_eq!(leading_integer("12"), Some(12));
        assert_eq!(leading_integer("12abc"), Some(12));
        assert_eq!(leading_integer("  7 "), Some(7));
        assert_eq!(leading_integer("-3"), Some(-3));
        assert_eq!(leading_integer("abc"), None);
        assert_eq!(leading_integer("+"), None);
        assert_eq!(leading_integer(""), None);
    }
}
