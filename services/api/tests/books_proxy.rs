mod common;

use anyhow::Result;
use common::spawn_app;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn book_list_is_passed_through() -> Result<()> {
    let app = spawn_app().await?;
    Mock::given(method("GET"))
        .and(path("/books"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "books": [
                {"id": 1, "title": "ミミのぼうけん", "description": null, "created_at": "2025-08-01T10:00:00"},
                {"id": 2, "title": "うみのおはなし", "description": "なみのおと", "created_at": "2025-08-02T10:00:00"}
            ],
            "hasMore": true,
            "nextCursor": "2"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app.client.get(app.url("/api/books?limit=2")).send().await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["books"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["nextCursor"], "2");
    Ok(())
}

#[tokio::test]
async fn malformed_list_becomes_a_localized_500() -> Result<()> {
    let app = spawn_app().await?;
    Mock::given(method("GET"))
        .and(path("/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "books": [{"id": "one", "title": 3}],
            "hasMore": false
        })))
        .mount(&app.backend)
        .await;

    let response = app.client.get(app.url("/api/books")).send().await?;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"error": "絵本一覧の取得に失敗しました"}));
    Ok(())
}

#[tokio::test]
async fn non_numeric_book_id_is_a_400() -> Result<()> {
    let app = spawn_app().await?;
    let response = app.client.get(app.url("/api/books/abc")).send().await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "無効な絵本IDです");
    Ok(())
}

#[tokio::test]
async fn book_id_with_trailing_text_uses_its_leading_number() -> Result<()> {
    let app = spawn_app().await?;
    Mock::given(method("GET"))
        .and(path("/books/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "title": "ほしのおはなし",
            "description": null,
            "created_at": "2025-08-03T10:00:00",
            "pages": []
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app.client.get(app.url("/api/books/12abc")).send().await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["id"], 12);
    Ok(())
}

#[tokio::test]
async fn book_detail_maps_backend_failures() -> Result<()> {
    let app = spawn_app().await?;
    Mock::given(method("GET"))
        .and(path("/books/5"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/6"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&app.backend)
        .await;

    let missing = app.client.get(app.url("/api/books/5")).send().await?;
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await?;
    assert_eq!(body["error"], "絵本が見つかりません");

    let broken = app.client.get(app.url("/api/books/6")).send().await?;
    assert_eq!(broken.status(), 500);
    let body: Value = broken.json().await?;
    assert_eq!(body["error"], "絵本の詳細取得に失敗しました");
    Ok(())
}

#[tokio::test]
async fn book_detail_pages_get_browser_urls() -> Result<()> {
    let app = spawn_app().await?;
    Mock::given(method("GET"))
        .and(path("/books/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "title": "ミミのぼうけん",
            "description": null,
            "created_at": "2025-08-01T10:00:00",
            "pages": [
                {"id": 1, "pageNo": 1, "imageUrl": "C:\\out\\p1.png", "alt": "1ページ", "text": "むかしむかし"},
                {"id": 2, "pageNo": 2, "imageUrl": "/uploads/p2.png", "alt": "2ページ", "text": "もりへ"},
                {"id": 3, "pageNo": 3, "imageUrl": null, "alt": "3ページ", "text": "おしまい"}
            ]
        })))
        .mount(&app.backend)
        .await;

    let body: Value = app
        .client
        .get(app.url("/api/books/7"))
        .send()
        .await?
        .json()
        .await?;
    let base = app.backend.uri();
    assert_eq!(
        body["pages"][0]["imageUrl"],
        format!("{}/uploads/generated_images/p1.png", base)
    );
    assert_eq!(body["pages"][1]["imageUrl"], format!("{}/uploads/p2.png", base));
    assert_eq!(body["pages"][2]["imageUrl"], Value::Null);
    Ok(())
}
