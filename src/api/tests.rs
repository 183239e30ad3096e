use std::sync::Arc;

use reqwest::{header, StatusCode};
use serde_json::{json, Value};

use super::create_router;
use crate::testutil::test_state;
use crate::AppState;

const BOUNDARY: &str = "panel-config-test-boundary";

struct TestApp {
    _dir: tempfile::TempDir,
    base: String,
    client: reqwest::Client,
    state: Arc<AppState>,
}

impl TestApp {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = create_router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            _dir: dir,
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            state,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    async fn post_multipart(&self, path: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(parts))
            .send()
            .await
            .unwrap();
        (resp.status(), resp.json().await.unwrap())
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Minimal baseline JPEG: SOI, APP0, SOF0, SOS with a little scan data, EOI.
fn baseline_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    data.extend_from_slice(&[
        0xFF, 0xDA, 0x00, 0x0C, 0x03, 0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00,
    ]);
    data.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn sample_document() -> Value {
    json!({
        "site_meta": {"version": "1.0"},
        "site_info": {"site_name": "Test Site"},
        "devices": [
            {"id": "panel-1", "name": "Kitchen", "ip": "192.168.1.10"}
        ]
    })
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["version"], "0.0.0-test");
    assert_eq!(body["data"]["mode"], "local");
    assert_eq!(body["data"]["home_assistant"], false);
}

// ============================================================================
// Config
// ============================================================================

#[tokio::test]
async fn test_get_config_serves_default_when_nothing_published() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/api/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source"], "default");
    assert_eq!(body["data"]["config"]["site_info"]["site_name"], "My Home");
    assert!(!app.state.store.live_path().exists());
}

#[tokio::test]
async fn test_save_to_named_slot_then_load_and_list() {
    let app = TestApp::spawn().await;

    let mut doc = sample_document();
    doc["_filename"] = json!("kitchen");
    let (status, body) = app.post_json("/api/config/save", &doc).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["filename"], "kitchen.json");

    let (status, body) = app.get("/api/config/staging/kitchen.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["site_info"]["site_name"], "Test Site");
    assert!(body["data"]["site_meta"]["last_updated"].is_string());
    assert!(body["data"].get("_filename").is_none());

    let (status, body) = app.get("/api/config/staging").await;
    assert_eq!(status, StatusCode::OK);
    let files = body["data"]["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "kitchen.json");
}

#[tokio::test]
async fn test_save_live_publishes_document() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json("/api/config/save-live", &sample_document())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["url"], "/local/panel_widgets/site_settings.json");

    let (_, body) = app.get("/api/config").await;
    assert_eq!(body["data"]["source"], "published");
    assert_eq!(body["data"]["config"]["devices"][0]["id"], "panel-1");
}

#[tokio::test]
async fn test_make_live_missing_slot_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json("/api/config/make-live?slot=missing", &json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
    assert!(!app.state.store.live_path().exists());
}

#[tokio::test]
async fn test_load_missing_slot_is_not_found() {
    let app = TestApp::spawn().await;
    let (status, body) = app.get("/api/config/staging/nope.json").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_delete_staging() {
    let app = TestApp::spawn().await;

    let mut doc = sample_document();
    doc["_filename"] = json!("old.json");
    app.post_json("/api/config/save", &doc).await;

    let resp = app
        .client
        .delete(app.url("/api/config/staging/old.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = app.get("/api/config/staging/old.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_config() {
    let app = TestApp::spawn().await;

    let upload = serde_json::to_vec(&sample_document()).unwrap();
    let (status, body) = app
        .post_multipart("/api/config/import", &[Part::File("file", "site.json", &upload)])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Imported 1 devices to staging");
}

#[tokio::test]
async fn test_import_without_devices_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_multipart(
            "/api/config/import",
            &[Part::File("file", "site.json", br#"{"site_meta": {}}"#)],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_import_without_file_part() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_multipart("/api/config/import", &[Part::Text("other", "x")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["message"], "No file provided");
}

#[tokio::test]
async fn test_export_returns_attachment() {
    let app = TestApp::spawn().await;
    app.post_json("/api/config/save", &sample_document()).await;

    let resp = app
        .client
        .get(app.url("/api/config/export/site_backup"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"site_backup.json\""
    );

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["devices"][0]["id"], "panel-1");
}

#[tokio::test]
async fn test_validate_config_reports_duplicate_ip() {
    let app = TestApp::spawn().await;

    let doc = json!({
        "devices": [
            {"id": "a", "name": "Kitchen", "ip": "10.0.0.5"},
            {"id": "b", "name": "Hall", "ip": "10.0.0.5"}
        ]
    });
    let (status, body) = app.post_json("/api/config/validate", &doc).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], false);
    let violation = &body["data"]["violations"][0];
    assert_eq!(violation["rule"], "unique");
    assert_eq!(violation["field"], "devices[1].ip");
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_schema_lookup() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/api/schema").await;
    assert_eq!(status, StatusCode::OK);
    let names = body["data"]["widgets"].as_array().unwrap();
    assert!(names.contains(&json!("light")));

    let (status, body) = app.get("/api/schema/cover").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["properties"]["up_time_msecs"]["minimum"], 1000.0);

    let (status, _) = app.get("/api/schema/toaster").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_fragment() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json(
            "/api/schema/light/validate",
            &json!({"entity": "switch.kitchen", "name": "Kitchen", "type": "p"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], false);
    assert_eq!(body["data"]["violations"][0]["field"], "entity");
    assert_eq!(body["data"]["violations"][0]["rule"], "pattern");
}

// ============================================================================
// Entities
// ============================================================================

#[tokio::test]
async fn test_validate_entity_simulated_without_credentials() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post_json("/api/validate/entity", &json!({"entity": "light.kitchen"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["simulated"], true);
    assert_eq!(body["data"]["state"], "unavailable");
}

#[tokio::test]
async fn test_list_entities_empty_without_credentials() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/api/entities/light").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entities"], json!([]));
}

// ============================================================================
// Assets
// ============================================================================

#[tokio::test]
async fn test_upload_accepted_asset() {
    let app = TestApp::spawn().await;
    let jpeg = baseline_jpeg(720, 720);

    let (status, body) = app
        .post_multipart(
            "/api/assets",
            &[
                Part::Text("directory", "slideshow"),
                Part::File("file", "beach.jpg", &jpeg),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["filename"], "beach.jpg");
    assert_eq!(body["data"]["width"], 720);
    assert_eq!(body["data"]["encoding"], "baseline");

    let (status, body) = app.get("/api/assets?directory=slideshow").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["files"][0]["filename"], "beach.jpg");
    assert_eq!(body["data"]["files"][0]["byte_size"], jpeg.len() as u64);
}

#[tokio::test]
async fn test_upload_wrong_dimensions_is_rejected() {
    let app = TestApp::spawn().await;
    let jpeg = baseline_jpeg(100, 100);

    let (status, body) = app
        .post_multipart(
            "/api/assets",
            &[
                Part::Text("directory", "slideshow"),
                Part::File("file", "small.jpg", &jpeg),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("100x100"));
    assert!(!app.state.assets.root().join("slideshow").exists());
}

#[tokio::test]
async fn test_upload_directory_traversal_is_forbidden() {
    let app = TestApp::spawn().await;
    let jpeg = baseline_jpeg(720, 720);

    let (status, body) = app
        .post_multipart(
            "/api/assets",
            &[
                Part::Text("directory", "../../etc"),
                Part::File("file", "beach.jpg", &jpeg),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_upload_requires_directory() {
    let app = TestApp::spawn().await;
    let jpeg = baseline_jpeg(720, 720);

    let (status, _) = app
        .post_multipart("/api/assets", &[Part::File("file", "beach.jpg", &jpeg)])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_missing_asset_directory() {
    let app = TestApp::spawn().await;
    let (status, _) = app.get("/api/assets?directory=nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
