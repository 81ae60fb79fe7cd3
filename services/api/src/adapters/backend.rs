//! services/api/src/adapters/backend.rs
//!
//! This module contains the HTTP adapter for the remote story backend.
//! It implements the `StoryBackendService` and `LibraryService` ports from the
//! `core` crate on top of `reqwest`.

use async_trait::async_trait;
use picture_book_core::domain::{
    BookDetail, BooksPage, ImageFile, ImageGenerationResult, ImageUrlUpdate, PageImageRequest,
    Question, QuestionList, StoryBook, StoryBookCreated, StoryPlot, StoryPlotList, StorySetting,
    ThemeSelection, UploadedImage,
};
use picture_book_core::ports::{LibraryService, PortError, PortResult, StoryBackendService};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to the story backend over its REST API.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    client: Client,
    base_url: String,
}

impl HttpBackendAdapter {
    /// Creates a new `HttpBackendAdapter` for the given base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request and decodes a successful JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> PortResult<T> {
        let response = self.send(request, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed {} response: {}", what, e)))
    }

    /// Sends a request and maps transport failures and non-2xx statuses to `PortError`.
    async fn send(&self, request: RequestBuilder, what: &str) -> PortResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        debug!(status = %status, "{} response received", what);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or(body);
        warn!(status = %status, "{} rejected by backend: {}", what, message);
        if status == StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(format!("{}: {}", what, message)));
        }
        Err(PortError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Deserialize)]
struct ErrorDetail {
    detail: serde_json::Value,
}

/// Pulls the human-readable part out of a `{ "detail": ... }` error body.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorDetail = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

//=========================================================================================
// `StoryBackendService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryBackendService for HttpBackendAdapter {
    async fn upload_image(&self, user_id: i64, file: ImageFile) -> PortResult<UploadedImage> {
        let part = multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| PortError::Unexpected(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        let request = self.client.post(self.url("/images/upload")).multipart(form);
        self.send_json(request, "image upload").await
    }

    async fn create_story_setting(&self, uploaded_image_id: i64) -> PortResult<StorySetting> {
        let request = self
            .client
            .post(self.url(&format!("/story/story_settings/{}", uploaded_image_id)));
        self.send_json(request, "story setting").await
    }

    async fn fetch_questions(&self, story_setting_id: i64) -> PortResult<Vec<Question>> {
        let request = self
            .client
            .get(self.url(&format!("/story/story_settings/{}/questions", story_setting_id)));
        let list: QuestionList = self.send_json(request, "questions").await?;
        Ok(list.questions)
    }

    async fn submit_answer(
        &self,
        story_setting_id: i64,
        field: &str,
        answer: &str,
    ) -> PortResult<()> {
        let request = self
            .client
            .post(self.url(&format!("/story/story_settings/{}/answers", story_setting_id)))
            .json(&json!({ "field": field, "answer": answer }));
        self.send(request, "answer").await.map(|_| ())
    }

    async fn start_story_generation(&self, story_setting_id: i64) -> PortResult<()> {
        let request = self
            .client
            .post(self.url("/story/story_generator"))
            .json(&json!({ "story_setting_id": story_setting_id }));
        self.send(request, "story generator").await.map(|_| ())
    }

    async fn fetch_story_plots(
        &self,
        user_id: i64,
        story_setting_id: i64,
        limit: usize,
    ) -> PortResult<Vec<StoryPlot>> {
        let request = self.client.get(self.url("/story/story_plots")).query(&[
            ("user_id", user_id.to_string()),
            ("story_setting_id", story_setting_id.to_string()),
            ("limit", limit.to_string()),
        ]);
        let list: StoryPlotList = self.send_json(request, "story plots").await?;
        Ok(list.items)
    }

    async fn select_theme(&self, story_setting_id: i64, theme: &str) -> PortResult<ThemeSelection> {
        let request = self
            .client
            .post(self.url("/story/select_theme"))
            .json(&json!({ "story_setting_id": story_setting_id, "selected_theme": theme }));
        self.send_json(request, "theme selection").await
    }

    async fn confirm_theme_and_create(
        &self,
        story_plot_id: i64,
        theme: &str,
    ) -> PortResult<StoryBookCreated> {
        let request = self
            .client
            .post(self.url("/storybook/confirm-theme-and-create"))
            .json(&json!({ "story_plot_id": story_plot_id, "selected_theme": theme }));
        self.send_json(request, "storybook creation").await
    }

    async fn generate_page_images(
        &self,
        request: &PageImageRequest,
    ) -> PortResult<ImageGenerationResult> {
        let http = self
            .client
            .post(self.url("/images/generation/generate-storyplot-all-pages-image-to-image"))
            .json(request);
        self.send_json(http, "image generation").await
    }

    async fn update_image_urls(&self, update: &ImageUrlUpdate) -> PortResult<()> {
        let request = self
            .client
            .post(self.url("/storybook/update-image-urls"))
            .json(update);
        self.send(request, "image url update").await.map(|_| ())
    }

    async fn fetch_storybook(&self, storybook_id: i64) -> PortResult<StoryBook> {
        let request = self
            .client
            .get(self.url(&format!("/storybook/{}", storybook_id)));
        self.send_json(request, "storybook").await
    }
}

//=========================================================================================
// `LibraryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl LibraryService for HttpBackendAdapter {
    async fn list_books(&self, limit: Option<u32>, cursor: Option<&str>) -> PortResult<BooksPage> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let request = self.client.get(self.url("/books")).query(&query);
        self.send_json(request, "book list").await
    }

    async fn get_book(&self, book_id: i64) -> PortResult<BookDetail> {
        let request = self.client.get(self.url(&format!("/books/{}", book_id)));
        self.send_json(request, "book detail").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> HttpBackendAdapter {
        HttpBackendAdapter::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn upload_sends_multipart_and_decodes_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "file_name": "photo.jpg",
                "file_path": "/srv/uploads/photo.jpg",
                "content_type": "image/jpeg",
                "size_bytes": 2048,
                "uploaded_at": "2025-08-01T10:00:00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = ImageFile {
            file_name: "photo.jpg".into(),
            content_type: "image/jpeg".into(),
            data: Bytes::from_static(b"\xff\xd8\xff"),
        };
        let uploaded = adapter(&server).upload_image(1, file).await.unwrap();
        assert_eq!(uploaded.id, 42);
        assert_eq!(uploaded.stored_path(), Some("/srv/uploads/photo.jpg"));
    }

    #[tokio::test]
    async fn answers_are_posted_as_field_answer_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/story/story_settings/7/answers"))
            .and(body_json(json!({"field": "name", "answer": "ミミ"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        adapter(&server).submit_answer(7, "name", "ミミ").await.unwrap();
    }

    #[tokio::test]
    async fn story_plots_pass_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story/story_plots"))
            .and(query_param("user_id", "1"))
            .and(query_param("story_setting_id", "7"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"story_plot_id": 1, "title": "もりのぼうけん"}]
            })))
            .mount(&server)
            .await;

        let plots = adapter(&server).fetch_story_plots(1, 7, 3).await.unwrap();
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].theme_key(), "もりのぼうけん");
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storybook/123"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "StoryBook not found"})))
            .mount(&server)
            .await;

        let err = adapter(&server).fetch_storybook(123).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(msg) if msg.contains("StoryBook not found")));
    }

    #[tokio::test]
    async fn server_errors_keep_status_and_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/story/story_generator"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = adapter(&server).start_story_generation(7).await.unwrap_err();
        assert_eq!(
            err,
            PortError::Rejected {
                status: 500,
                message: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_library_payload_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"books": "nope"})))
            .mount(&server)
            .await;

        let err = adapter(&server).list_books(None, None).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
