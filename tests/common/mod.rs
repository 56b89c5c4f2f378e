//! In-process mock of the CMS HTTP API for integration tests
//!
//! Binds to 127.0.0.1:0 and records every upload and entry it receives.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

use cms_media_ingest::config::Credential;
use cms_media_ingest::{Config, IngestSession, ProgressMode, RawMedia};

pub const API_TOKEN: &str = "test-token";
pub const PASSWORD: &str = "Sesame-42";

/// Body layout the mock uses for successful uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"assets": [record]}`
    Wrapped,
    /// `[record]`
    BareArray,
    /// `record`
    BareObject,
    /// `{}`
    Empty,
    /// `[record]` with no `_id`, numeric `size` sent as a string
    Untyped,
}

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReceivedEntry {
    pub collection: String,
    pub body: Value,
}

struct MockState {
    shape: ResponseShape,
    failing_uploads: HashSet<String>,
    fail_entries: bool,
    uploads: Vec<ReceivedUpload>,
    entries: Vec<ReceivedEntry>,
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockCms {
    pub addr: SocketAddr,
    state: Shared,
}

impl MockCms {
    pub async fn start() -> Self {
        Self::start_with(ResponseShape::Wrapped).await
    }

    pub async fn start_with(shape: ResponseShape) -> Self {
        let state = Arc::new(Mutex::new(MockState {
            shape,
            failing_uploads: HashSet::new(),
            fail_entries: false,
            uploads: Vec::new(),
            entries: Vec::new(),
        }));

        let app = Router::new()
            .route("/api/assets/upload", post(upload_asset))
            .route("/api/content/item/:collection", post(create_item))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Uploads of `filename` answer 500 until `heal` is called
    pub fn fail_upload_of(&self, filename: &str) {
        self.state.lock().unwrap().failing_uploads.insert(filename.to_string());
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_uploads.clear();
        state.fail_entries = false;
    }

    pub fn fail_entries(&self) {
        self.state.lock().unwrap().fail_entries = true;
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads().into_iter().map(|u| u.filename).collect()
    }

    pub fn entries(&self) -> Vec<ReceivedEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn config(&self) -> Config {
        Config {
            api_url: self.base_url(),
            api_token: API_TOKEN.to_string(),
            upload_password: Credential::new(PASSWORD),
            workers: 2,
            upload_timeout_secs: 10,
            entry_timeout_secs: 10,
            ..Default::default()
        }
    }

    pub fn session(&self) -> IngestSession {
        IngestSession::new(&self.config())
            .unwrap()
            .with_progress(ProgressMode::Hidden)
    }
}

async fn upload_asset(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
    }

    let mut received = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        received = Some(ReceivedUpload {
            field: name,
            filename,
            content_type,
            bytes,
        });
    }

    let Some(upload) = received else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "No file" })));
    };

    let mut state = state.lock().unwrap();
    if state.failing_uploads.contains(&upload.filename) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Storage failure" })));
    }

    let record = json!({
        "_id": format!("asset-{}", state.uploads.len() + 1),
        "path": format!("/storage/uploads/{}", upload.filename),
        "title": upload.filename,
        "mime": upload.content_type,
        "size": upload.bytes.len(),
        "folder": "",
    });
    let body = match state.shape {
        ResponseShape::Wrapped => json!({ "assets": [record] }),
        ResponseShape::BareArray => json!([record]),
        ResponseShape::BareObject => record,
        ResponseShape::Empty => json!({}),
        ResponseShape::Untyped => json!([{
            "path": format!("/storage/uploads/{}", upload.filename),
            "size": upload.bytes.len().to_string(),
        }]),
    };
    state.uploads.push(upload);

    (StatusCode::OK, Json(body))
}

async fn create_item(
    State(state): State<Shared>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
    }

    let mut state = state.lock().unwrap();
    if state.fail_entries {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Database failure" })));
    }

    let mut item = body.get("data").cloned().unwrap_or(Value::Null);
    if let Value::Object(map) = &mut item {
        map.insert("_id".to_string(), json!(format!("item-{}", state.entries.len() + 1)));
    }
    state.entries.push(ReceivedEntry { collection, body });

    (StatusCode::OK, Json(item))
}

/// A small PNG with a gradient, so crops are visible
pub fn png(name: &str, width: u32, height: u32) -> RawMedia {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    RawMedia::new(name, out.into_inner())
}

pub fn corrupt(name: &str) -> RawMedia {
    RawMedia::new(name, b"definitely not an image".to_vec())
}
