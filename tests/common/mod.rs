//! In-process stand-in for the remote API.
//!
//! Every request is recorded before it is answered, so tests can assert exactly how many calls
//! an operation made and what they carried.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cloud_uploader::client::LocalImageHandle;
use cloud_uploader::common::config::ApiConfig;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// How the fake answers one endpoint.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Reject {
        status: u16,
        message: Option<&'static str>,
    },
}

#[derive(Debug, Clone)]
pub struct Behavior {
    pub auth: Reply,
    pub auth_body: serde_json::Value,
    pub logout: Reply,
    pub upload: Reply,
    pub upload_delay: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            auth: Reply::Ok,
            auth_body: serde_json::json!({"apiKey": "K", "token": "T", "operatorId": "OP0001"}),
            logout: Reply::Ok,
            upload: Reply::Ok,
            upload_delay: Duration::ZERO,
        }
    }
}

struct Shared {
    requests: Mutex<Vec<RecordedRequest>>,
    behavior: Mutex<Behavior>,
}

pub struct FakeApi {
    pub base_url: String,
    shared: Arc<Shared>,
}

impl FakeApi {
    pub async fn start() -> Self {
        Self::start_with(Behavior::default()).await
    }

    pub async fn start_with(behavior: Behavior) -> Self {
        let shared = Arc::new(Shared {
            requests: Mutex::new(Vec::new()),
            behavior: Mutex::new(behavior),
        });

        let app = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/v1", addr),
            shared,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::with_base_url(self.base_url.clone())
    }

    pub fn set_behavior(&self, change: impl FnOnce(&mut Behavior)) {
        change(&mut self.shared.behavior.lock().unwrap());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    shared.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        headers,
        body,
    });
    let behavior = shared.behavior.lock().unwrap().clone();

    if method == Method::POST && path == "/v1/auth" {
        match behavior.auth {
            Reply::Ok => Json(behavior.auth_body).into_response(),
            reject => reply(reject),
        }
    } else if method == Method::POST && path == "/v1/auth/logout" {
        reply(behavior.logout)
    } else if method == Method::PUT && path.starts_with("/v1/files/private/") {
        tokio::time::sleep(behavior.upload_delay).await;
        reply(behavior.upload)
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn reply(reply: Reply) -> Response {
    match reply {
        Reply::Ok => StatusCode::OK.into_response(),
        Reply::Reject { status, message } => {
            let status = StatusCode::from_u16(status).unwrap();
            match message {
                Some(message) => (
                    status,
                    Json(serde_json::json!({"code": "ERR0001", "message": message})),
                )
                    .into_response(),
                None => status.into_response(),
            }
        }
    }
}

/// Bytes used for every test image.
pub const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-body";

/// Writes a test image into `dir` and returns its path.
pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, IMAGE_BYTES).unwrap();
    path
}

/// Handle in the `file://` form a picker hands out.
pub fn file_handle(path: &Path) -> LocalImageHandle {
    let uri = reqwest::Url::from_file_path(path).unwrap();
    LocalImageHandle::new(uri.as_str(), "image/jpeg")
}
