//! HTTP surface of the editor.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | top-level folders |
//! | GET | `/folder/{path}` | folder view |
//! | GET | `/folder/{path}/edit`, `/folder/{path}/edit-index` | raw document editor |
//! | POST | `/folder/{path}/edit`, `/folder/{path}/edit-index` | save document, 303 to folder |
//! | POST | `/folder/{path}/upload` | multipart image upload, 303 to folder |
//! | GET | `/content/{path}` | raw file with `ETag` |
//! | POST | `/deploy` | run the build, 303 back to the referring page |
//!
//! Folder routes use one wildcard per method; the trailing `edit`,
//! `edit-index`, or `upload` segment selects the action. A folder that is
//! itself named like an action is only reachable through its parent listing.
//!
//! Request bodies are capped by `max_body_mb`. Every extractor failure,
//! oversized bodies included, is answered with 400.

use crate::config::EditorConfig;
use crate::deploy::{BuildReport, BuildTrigger};
use crate::documents::{self, DocumentError, DocumentKind};
use crate::listing::{self, ListingError};
use crate::render::{self, BuildBanner, FolderView};
use crate::sandbox::{ContentRoot, SandboxError};
use crate::upload::{self, IncomingFile, UploadError};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EditorConfig>,
    pub root: ContentRoot,
    pub builder: Arc<BuildTrigger>,
}

impl AppState {
    pub fn new(config: EditorConfig) -> Self {
        let builder = BuildTrigger::from_config(&config);
        Self::with_builder(config, builder)
    }

    /// State with a custom build trigger.
    pub fn with_builder(config: EditorConfig, builder: BuildTrigger) -> Self {
        Self {
            root: ContentRoot::new(&config.content_root),
            builder: Arc::new(builder),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Request failure, rendered as an HTML error page.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, String::new()),
            AppError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            AppError::Internal(reason) => {
                error!(reason = %reason, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        };
        let page = render::render_error(
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            &detail,
        );
        (status, page).into_response()
    }
}

impl From<SandboxError> for AppError {
    fn from(_: SandboxError) -> Self {
        AppError::NotFound
    }
}

impl From<ListingError> for AppError {
    fn from(e: ListingError) -> Self {
        match e {
            ListingError::NotFound(_) | ListingError::Sandbox(_) => AppError::NotFound,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::Sandbox(_) | DocumentError::Escapes(_) => AppError::NotFound,
            DocumentError::Io(io) => AppError::Internal(io.to_string()),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        if e.is_client_error() {
            AppError::BadRequest(e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

fn bad_request(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(e.to_string())
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes();
    Router::new()
        .route("/", get(index))
        .route("/folder/*path", get(folder_get).post(folder_post))
        .route("/content/*path", get(content))
        .route("/deploy", post(deploy))
        .layer(from_fn(request_tracing))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, route = %route);
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| info!(status = response.status().as_u16(), "request finished"));
    response
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: EditorConfig) -> Result<(), ServerError> {
    let addr = config.socket_addr();
    let state = AppState::new(config);
    if let Err(e) = state.root.canonical() {
        warn!(error = %e, "content root is not available yet; pages will 404 until it exists");
    }
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        content_root = %state.root.path().display(),
        "content-desk listening"
    );
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct BannerQuery {
    build: Option<String>,
    msg: Option<String>,
}

impl BannerQuery {
    fn banner(&self) -> Option<BuildBanner> {
        BuildBanner::from_query(self.build.as_deref(), self.msg.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct EditForm {
    content: String,
}

const GET_ACTIONS: &[&str] = &["edit", "edit-index"];
const POST_ACTIONS: &[&str] = &["edit", "edit-index", "upload"];

/// Split `gallery/japan/edit` into (`gallery/japan`, `Some("edit")`).
///
/// A single segment is always a folder, never an action.
fn split_action<'a>(path: &'a str, actions: &[&str]) -> (&'a str, Option<&'a str>) {
    let trimmed = path.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((folder, last)) if actions.contains(&last) => (folder, Some(last)),
        _ => (trimmed, None),
    }
}

async fn index(
    State(state): State<AppState>,
    Query(query): Query<BannerQuery>,
) -> Result<Response, AppError> {
    let root = state.root.resolve_dir("")?;
    let folders = listing::list_subdirectories(&state.root, &root, "")?;
    Ok(render::render_index(&folders, query.banner().as_ref()).into_response())
}

async fn folder_get(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<BannerQuery>,
) -> Result<Response, AppError> {
    let (folder, action) = split_action(&path, GET_ACTIONS);
    let dir = state.root.resolve_dir(folder)?;
    let rel_path = state.root.relative(&dir)?;

    if let Some(kind) = action.and_then(DocumentKind::from_edit_segment) {
        let raw = documents::read_raw(&state.root, &dir, kind)?;
        return Ok(render::render_edit(&rel_path, kind, &raw).into_response());
    }

    if rel_path.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }
    let view = FolderView {
        subfolders: listing::list_subdirectories(&state.root, &dir, &rel_path)?,
        images: listing::list_images(&state.root, &dir, &rel_path)?,
        section: documents::read_parsed(&state.root, &dir, DocumentKind::Section)?,
        leaf: documents::read_parsed(&state.root, &dir, DocumentKind::Leaf)?,
        rel_path,
    };
    Ok(render::render_folder(&view, query.banner().as_ref()).into_response())
}

async fn folder_post(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let (folder, action) = split_action(&path, POST_ACTIONS);
    let Some(action) = action else {
        return Err(AppError::NotFound);
    };
    let dir = state.root.resolve_dir(folder)?;
    let rel_path = state.root.relative(&dir)?;

    if let Some(kind) = DocumentKind::from_edit_segment(action) {
        let Form(form) = Form::<EditForm>::from_request(request, &state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        documents::write_raw(&state.root, &dir, kind, &form.content)?;
    } else {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        let incoming = read_file_field(multipart).await?;
        let saved = upload::save_upload(
            &dir,
            incoming.as_ref(),
            state.config.upload.max_collision_attempts,
        )?;
        info!(folder = %rel_path, saved = %saved.display(), "image uploaded");
    }

    Ok(Redirect::to(&render::folder_href(&rel_path)).into_response())
}

/// First multipart field named `file`, if any.
async fn read_file_field(mut multipart: Multipart) -> Result<Option<IncomingFile>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_request)?;
        return Ok(Some(IncomingFile {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn content(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let file = state.root.resolve_file(&path)?;

    // Revalidation hashes in chunks so a 304 never buffers the file
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if let Some(candidates) = if_none_match {
        let etag = file_etag(&file)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if etag_matches(candidates, &etag) {
            return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
        }
    }

    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let etag = format!("\"{:x}\"", Sha256::digest(&bytes));

    let content_type = content_type_for(&path);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::ETAG, etag),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            // Content files never run script in the editor's origin
            (header::CONTENT_SECURITY_POLICY, "sandbox".to_string()),
        ],
        bytes,
    )
        .into_response())
}

async fn deploy(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let report = state.builder.run_build().await;
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    let target = deploy_redirect(referer, &report);
    info!(success = report.success, target = %target, "deploy finished");
    Redirect::to(&target).into_response()
}

// ============================================================================
// Helpers
// ============================================================================

/// Quoted SHA-256 hex digest of a file, read in fixed-size chunks.
async fn file_etag(path: &std::path::Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("\"{:x}\"", hasher.finalize()))
}

/// Whether an `If-None-Match` header value matches `etag`.
fn etag_matches(header_value: &str, etag: &str) -> bool {
    header_value
        .split(',')
        .map(|candidate| candidate.trim())
        .any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
}

/// `Content-Type` by file extension.
fn content_type_for(path: &str) -> &'static str {
    let ext = std::path::Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "md" | "markdown" => "text/markdown; charset=utf-8",
        "txt" | "bak" | "html" | "htm" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Path and query of a `Referer` value. Scheme and authority are dropped so
/// the redirect never leaves this server.
fn referer_path(referer: Option<&str>) -> &str {
    let Some(referer) = referer.map(str::trim) else {
        return "/";
    };
    let local = match referer.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(pos) => &rest[pos..],
            None => "/",
        },
        None => referer,
    };
    let local = local.split('#').next().unwrap_or("/");
    if local.starts_with('/') && !local.starts_with("//") {
        local
    } else {
        "/"
    }
}

/// Redirect target after a deploy: the referring page with `build` and `msg`
/// replacing any earlier build result.
fn deploy_redirect(referer: Option<&str>, report: &BuildReport) -> String {
    let local = referer_path(referer);
    let (path, query) = local.split_once('?').unwrap_or((local, ""));

    let mut pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    pairs.retain(|(key, _)| key != "build" && key != "msg");
    pairs.push(("build".to_string(), report.status_param().to_string()));
    pairs.push(("msg".to_string(), report.output_tail.clone()));

    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    format!("{}?{}", path, query)
}
