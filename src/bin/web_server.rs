//! Local web front-end for the session orchestrator.
//!
//! Stands in for the mobile form: a browser (or `curl`) signs in, picks or uploads an image,
//! sends it to the cloud, and signs out. One session per server process.
//!
//! ```bash
//! cargo run --bin web_server -- --config config/client.toml
//! curl -X POST localhost:3000/api/login -H 'content-type: application/json' \
//!   -d '{"mode":"root","email":"me@example.com","password":"..."}'
//! curl -X POST localhost:3000/api/select/library -F image=@cat.jpg
//! curl -X POST localhost:3000/api/upload -H 'content-type: application/json' \
//!   -d '{"destinationPath":"photos"}'
//! curl -X POST localhost:3000/api/logout
//! ```

use axum::{
    body::Bytes,
    extract::{multipart::Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use log::{error, info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;

use cloud_uploader::client::{
    FileAcquirer, IdentityInput, IdentityMode, ImageSource, Outcome, SessionOrchestrator,
};
use cloud_uploader::common::config::{load_config, ClientConfig};
use cloud_uploader::utils::logging::init_logger;
use cloud_uploader::utils::spool::Spool;
use cloud_uploader::{ClientError, ErrorKind};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the client configuration file (TOML format)
    #[arg(short, long)]
    config: String,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Directory browser uploads are written to before being selected
    #[arg(long, default_value = "user-data/spool")]
    spool_dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    mode: IdentityMode,
    #[serde(default)]
    email: String,
    #[serde(default)]
    operator_id: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    #[serde(default)]
    destination_path: String,
}

#[derive(Serialize)]
struct ActionResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type Failure = (StatusCode, Json<ErrorResponse>);

struct AppState {
    session: RwLock<SessionOrchestrator<FileAcquirer>>,
    /// The current spooled file only changes while the session write lock is held
    spool: Mutex<Spool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger(LevelFilter::Info, Some("reqwest=warn,hyper=warn"));
    let args = Args::parse();

    info!("🚀 Initializing web server...");

    let config: ClientConfig = load_config(&args.config)?;
    let acquirer = FileAcquirer::new(config.images.clone());
    let session = SessionOrchestrator::new(config.api.clone(), acquirer)?;

    let spool = Spool::open(&args.spool_dir).await?;

    let state = Arc::new(AppState {
        session: RwLock::new(session),
        spool: Mutex::new(spool),
    });

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/session", get(session_status))
        .route("/api/login", post(login_handler))
        .route("/api/select/camera", post(select_camera_handler))
        .route("/api/select/library", post(select_library_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/logout", post(logout_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("🌐 Web server running on http://{}", args.addr);

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "cloud-uploader",
    }))
}

async fn session_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(serde_json::json!({
        "state": session.state(),
        "authenticated": session.is_authenticated(),
        "image": session.current_image(),
    }))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ActionResponse>, Failure> {
    let identity = IdentityInput::from_form(
        req.mode,
        &req.email,
        &req.operator_id,
        &req.user_name,
        &req.password,
    )
    .map_err(failure)?;

    let mut session = state.session.write().await;
    let outcome = session.authenticate(identity).await.map_err(failure)?;
    Ok(respond(&outcome))
}

async fn select_camera_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActionResponse>, Failure> {
    let mut session = state.session.write().await;
    let outcome = session
        .select_image(ImageSource::Camera)
        .await
        .map_err(failure)?;

    // A capture replaces any spooled library pick.
    if let Outcome::ImageSelected(_) = outcome {
        state.spool.lock().await.release().await;
    }
    Ok(respond(&outcome))
}

/// Accepts a multipart `image` field, spools it to disk and selects it as a library pick.
async fn select_library_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ActionResponse>, Failure> {
    // Nothing is written to disk for a signed-out session.
    if !state.session.read().await.is_authenticated() {
        return Err(failure(ClientError::validation("Please authenticate first")));
    }

    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or("image.jpg"));
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read image data: {}", e)))?;
        upload = Some((file_name, data));
    }

    let (file_name, data) = upload.ok_or_else(|| bad_request("No image provided".to_string()))?;
    info!("📥 Received {} ({} bytes)", file_name, data.len());

    let path = state
        .spool
        .lock()
        .await
        .write(&file_name, &data)
        .await
        .map_err(|e| spool_failure(&file_name, e))?;

    let mut session = state.session.write().await;
    session.acquirer().queue_pick(path.clone());
    let result = session.select_image(ImageSource::Library).await;

    let mut spool = state.spool.lock().await;
    match &result {
        Ok(Outcome::ImageSelected(_)) => spool.keep(path).await,
        // Not selected, so the previous selection (if any) stays current.
        _ => spool.discard(&path).await,
    }
    drop(spool);

    let outcome = result.map_err(failure)?;
    Ok(respond(&outcome))
}

/// Holds only a read lock so a second upload reaches the in-flight check and is refused.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<ActionResponse>, Failure> {
    let session = state.session.read().await;
    let outcome = session
        .upload(&req.destination_path)
        .await
        .map_err(failure)?;
    Ok(respond(&outcome))
}

async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActionResponse>, Failure> {
    let mut session = state.session.write().await;
    let result = session.sign_out().await;
    // The session always ends signed out, so its spooled image goes too.
    state.spool.lock().await.release().await;
    let outcome = result.map_err(failure)?;
    Ok(respond(&outcome))
}

fn respond(outcome: &Outcome) -> Json<ActionResponse> {
    let detail = match outcome {
        Outcome::Uploaded(receipt) => serde_json::to_value(receipt).ok(),
        Outcome::ImageSelected(handle) => serde_json::to_value(handle).ok(),
        _ => None,
    };
    Json(ActionResponse {
        success: true,
        message: outcome.message(),
        detail,
    })
}

fn failure(err: ClientError) -> Failure {
    let status = match (&err, err.kind()) {
        (ClientError::UploadInFlight, _) => StatusCode::CONFLICT,
        (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
        (_, ErrorKind::Permission) => StatusCode::FORBIDDEN,
        (_, ErrorKind::Auth) => StatusCode::UNAUTHORIZED,
        (_, ErrorKind::Upload) | (_, ErrorKind::Transport) => StatusCode::BAD_GATEWAY,
    };
    error!("❌ {}", err);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn spool_failure(file_name: &str, e: std::io::Error) -> Failure {
    error!("❌ Spooling {} failed: {}", file_name, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "File reading failed".to_string(),
        }),
    )
}

fn bad_request(message: String) -> Failure {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

/// Keeps only the final component of a client-supplied file name.
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("image.jpg")
        .to_string()
}
