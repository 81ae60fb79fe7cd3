//! Shared harness: a wiremock story backend plus the real router on an ephemeral port.

#![allow(dead_code)]

use anyhow::Result;
use api_lib::adapters::{HttpBackendAdapter, InMemorySessionStore};
use api_lib::config::Config;
use api_lib::web::{self, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub backend: MockServer,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Creates a wizard session and returns its id.
    pub async fn create_session(&self) -> Result<String> {
        let response = self
            .client
            .post(self.url("/wizard/sessions"))
            .header("x-user-id", "1")
            .send()
            .await?;
        anyhow::ensure!(response.status() == 201, "unexpected status {}", response.status());
        let body: Value = response.json().await?;
        Ok(body["session_id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no session_id in {}", body))?
            .to_string())
    }

    pub async fn upload(&self, session_id: &str, file_name: &str, mime: &str, data: Vec<u8>) -> Result<reqwest::Response> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        Ok(self
            .client
            .post(self.url(&format!("/wizard/{}/upload", session_id)))
            .multipart(form)
            .send()
            .await?)
    }
}

pub async fn spawn_app() -> Result<TestApp> {
    let backend = MockServer::start().await;

    let vars: HashMap<&str, String> = HashMap::from([
        ("BIND_ADDRESS", "127.0.0.1:0".to_string()),
        ("BACKEND_URL", backend.uri()),
        ("BACKEND_TIMEOUT_SECS", "30".to_string()),
    ]);
    let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned())?);

    let adapter = Arc::new(HttpBackendAdapter::new(
        config.backend_url.clone(),
        config.backend_timeout,
    )?);
    let app_state = Arc::new(AppState::new(
        config.clone(),
        adapter.clone(),
        adapter,
        Arc::new(InMemorySessionStore::new()),
    ));
    let app = web::router(app_state)?;

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let address = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(TestApp {
        address,
        client: reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?,
        backend,
    })
}

/// Mounts the upload and story-setting endpoints: image 42 becomes setting 7.
pub async fn mount_upload(backend: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/images/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "file_name": "photo.jpg",
            "file_path": "/srv/uploads/photo.jpg",
            "content_type": "image/jpeg",
            "size_bytes": 2048
        })))
        .mount(backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/story/story_settings/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "story_setting_id": 7,
            "generated_data": {
                "protagonist_name": "ミミ",
                "protagonist_type": "うさぎ",
                "setting_place": "もり"
            }
        })))
        .mount(backend)
        .await;
}

/// Mounts three questions for setting 7; only the first is required.
pub async fn mount_questions(backend: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/story/story_settings/7/questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "questions": [
                {"field": "protagonist_name", "question": "主人公の名前は？", "type": "text_input", "required": true},
                {"field": "setting_place", "question": "どこのお話？", "type": "text_input", "required": false},
                {"field": "mood", "question": "どんな雰囲気？", "type": "select", "required": false,
                 "options": [{"value": "fun", "label": "たのしい"}]}
            ]
        })))
        .mount(backend)
        .await;
}

pub fn storybook_json() -> Value {
    json!({
        "id": 99,
        "title": "ミミのぼうけん",
        "description": "うさぎのミミがもりをたんけんするおはなし",
        "page_1": "むかしむかし",
        "page_2": "ミミはもりへ",
        "page_3": "かわをわたって",
        "page_4": "ともだちができた",
        "page_5": "おしまい",
        "page_1_image_url": "C:\\backend\\generated_images\\storyplot_i2i_all_1.png",
        "page_2_image_url": "https://storage.cloud.google.com/bucket/p2.png",
        "image_generation_status": "completed",
        "created_at": "2025-08-01T10:00:00"
    })
}
