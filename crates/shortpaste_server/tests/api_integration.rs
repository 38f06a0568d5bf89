mod support;

use axum::http::{header, StatusCode};
use serde_json::{json, Value};
use shortpaste_server::storage::StorageKind;
use support::{setup_server_with, setup_test_server};

#[tokio::test]
async fn test_document_lifecycle() {
    let (server, _temp) = setup_test_server();

    let create_response = server
        .post("/documents")
        .json(&json!({ "content": "Hello, World!" }))
        .await;
    assert_eq!(create_response.status_code(), StatusCode::OK);
    let created: Value = create_response.json();
    let key = created["key"].as_str().expect("key").to_string();
    assert_eq!(key.len(), 10);
    assert_eq!(created["isUrl"], false);

    let get_response = server.get(&format!("/documents/{}", key)).await;
    assert_eq!(get_response.status_code(), StatusCode::OK);
    let document: Value = get_response.json();
    assert_eq!(document["key"], key.as_str());
    assert_eq!(document["data"], "Hello, World!");
    assert_eq!(document["isUrl"], false);
    assert!(document["createdAt"].is_string());

    let raw_response = server.get(&format!("/raw/{}", key)).await;
    assert_eq!(raw_response.status_code(), StatusCode::OK);
    assert_eq!(raw_response.text(), "Hello, World!");
    let content_type = raw_response.header(header::CONTENT_TYPE);
    assert!(content_type
        .to_str()
        .expect("content type")
        .starts_with("text/plain"));

    let resolve_response = server.get(&format!("/{}", key)).await;
    assert_eq!(resolve_response.status_code(), StatusCode::FOUND);
    assert_eq!(
        resolve_response.header(header::LOCATION),
        format!("/raw/{}", key).as_str()
    );
}

#[tokio::test]
async fn test_url_documents_redirect_to_target() {
    let (server, _temp) = setup_test_server();

    let create_response = server
        .post("/documents")
        .json(&json!({ "content": "https://example.com/some/path?q=1" }))
        .await;
    assert_eq!(create_response.status_code(), StatusCode::OK);
    let created: Value = create_response.json();
    assert_eq!(created["isUrl"], true);
    let key = created["key"].as_str().expect("key").to_string();
    assert_eq!(key.len(), 7);

    let resolve_response = server.get(&format!("/{}", key)).await;
    assert_eq!(resolve_response.status_code(), StatusCode::FOUND);
    assert_eq!(
        resolve_response.header(header::LOCATION),
        "https://example.com/some/path?q=1"
    );

    let document: Value = server.get(&format!("/documents/{}", key)).await.json();
    assert_eq!(document["isUrl"], true);
}

#[tokio::test]
async fn test_slug_conflict_returns_409() {
    let (server, _temp) = setup_test_server();

    let first = server
        .post("/documents")
        .json(&json!({ "content": "first", "slug": "my-notes" }))
        .await;
    assert_eq!(first.status_code(), StatusCode::OK);
    let created: Value = first.json();
    assert_eq!(created["key"], "my-notes");

    let second = server
        .post("/documents")
        .json(&json!({ "content": "second", "slug": "my-notes" }))
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);
    let body: Value = second.json();
    assert!(body["message"].is_string());

    let document: Value = server.get("/documents/my-notes").await.json();
    assert_eq!(document["data"], "first");
}

#[tokio::test]
async fn test_rate_limit_rejects_with_retry_after() {
    let (server, _temp) = setup_server_with(|config| {
        let rule = config
            .rate_limits
            .categories
            .get_mut("normal")
            .expect("normal category");
        rule.total_requests = 3;
        rule.every = 60_000;
    });

    for n in 0..3 {
        let response = server
            .post("/documents")
            .json(&json!({ "content": format!("document {}", n) }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let rejected = server
        .post("/documents")
        .json(&json!({ "content": "one too many" }))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = rejected
        .header(header::RETRY_AFTER)
        .to_str()
        .expect("retry-after")
        .parse()
        .expect("seconds");
    assert!((1..=60).contains(&retry_after));
    let body: Value = rejected.json();
    assert!(body["message"].is_string());

    // Reads are never rate limited.
    let missing = server.get("/documents/nothing-here").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_document_returns_404_message() {
    let (server, _temp) = setup_test_server();

    for path in ["/documents/absent", "/raw/absent", "/absent"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
        let body: Value = response.json();
        assert_eq!(body["message"], "Document not found.");
    }
}

#[tokio::test]
async fn test_raw_body_with_slug_query() {
    let (server, _temp) = setup_test_server();

    let response = server
        .post("/documents")
        .add_query_param("slug", "raw-note")
        .text("plain body\nsecond line")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let created: Value = response.json();
    assert_eq!(created["key"], "raw-note");

    let raw = server.get("/raw/raw-note").await;
    assert_eq!(raw.text(), "plain body\nsecond line");
}

fn form_body(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--XB\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            name, value
        ));
    }
    body.push_str("--XB--\r\n");
    body
}

#[tokio::test]
async fn test_form_submission_uses_data_and_slug_fields() {
    let (server, _temp) = setup_test_server();

    let response = server
        .post("/documents")
        .content_type("multipart/form-data; boundary=XB")
        .bytes(form_body(&[("data", "hello"), ("slug", "myslug")]).into())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let created: Value = response.json();
    assert_eq!(created["key"], "myslug");
    assert_eq!(created["isUrl"], false);

    let raw = server.get("/raw/myslug").await;
    assert_eq!(raw.text(), "hello");

    let url = server
        .post("/documents")
        .content_type("multipart/form-data; boundary=XB")
        .bytes(form_body(&[("data", "https://example.com/form")]).into())
        .await;
    let created: Value = url.json();
    assert_eq!(created["isUrl"], true);
    assert_eq!(created["key"].as_str().expect("key").len(), 7);
}

#[tokio::test]
async fn test_form_submission_without_data_is_rejected() {
    let (server, _temp) = setup_test_server();

    let response = server
        .post("/documents")
        .content_type("multipart/form-data; boundary=XB")
        .bytes(form_body(&[("slug", "lonely")]).into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].is_string());

    let missing = server.get("/raw/lonely").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_extension_suffix_is_ignored() {
    let (server, _temp) = setup_test_server();

    server
        .post("/documents")
        .json(&json!({ "content": "fn main() {}", "slug": "snippet" }))
        .await;

    let document = server.get("/documents/snippet.rs").await;
    assert_eq!(document.status_code(), StatusCode::OK);
    let body: Value = document.json();
    assert_eq!(body["key"], "snippet");

    let raw = server.get("/raw/snippet.rs").await;
    assert_eq!(raw.text(), "fn main() {}");
}

#[tokio::test]
async fn test_bad_requests_return_400() {
    let (server, _temp) = setup_server_with(|config| config.max_document_length = 16);

    let cases = [
        json!({ "content": "ok", "slug": "ab" }),
        json!({ "content": "ok", "slug": "has space" }),
        json!({ "content": "" }),
        json!({ "content": "this is longer than sixteen bytes" }),
    ];
    for body in cases {
        let response = server.post("/documents").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", body);
        let message: Value = response.json();
        assert!(message["message"].is_string());
    }

    let malformed = server
        .post("/documents")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_backends_serve_documents() {
    for kind in [StorageKind::Redb, StorageKind::Memory] {
        let (server, _temp) = setup_server_with(|config| config.storage.kind = kind);

        let created: Value = server
            .post("/documents")
            .json(&json!({ "content": "backend check" }))
            .await
            .json();
        let key = created["key"].as_str().expect("key").to_string();

        let raw = server.get(&format!("/raw/{}", key)).await;
        assert_eq!(raw.status_code(), StatusCode::OK, "{}", kind);
        assert_eq!(raw.text(), "backend check");
    }
}
