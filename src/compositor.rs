//! The meminator: downloads an image, captions it through a [`Renderer`] and
//! streams the result back. Both temporary files are [`ScopedFile`] guards,
//! so every exit path removes them.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::Stream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;

use crate::config::CompositorConfig;
use crate::models::{CaptionRequest, ErrorBody};
use crate::render::{CaptionStyle, ConvertRenderer, RenderError, Renderer};
use crate::scoped_file::ScopedFile;
use crate::server::health;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "meminator/0.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const STREAM_CHUNK_BYTES: usize = 64 * 1024;

// ── Error types ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("source returned {0}")]
    Status(StatusCode),
    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("writing temporary file: {0}")]
    Write(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("invalid request payload: {0}")]
    InvalidRequest(String),
    #[error("failed to download image: {0}")]
    Download(#[from] DownloadError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("temporary file error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for CompositeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CompositeError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "Invalid request payload".to_string())
            }
            CompositeError::Download(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to download image".to_string(),
            ),
            CompositeError::Render(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Subprocess failed: {e}"),
            ),
            CompositeError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to handle temporary file".to_string(),
            ),
        };
        if status.is_server_error() {
            tracing::warn!(error = %self, "caption request failed");
        } else {
            tracing::debug!(error = %self, "rejected caption request");
        }
        (status, Json(ErrorBody::new(message))).into_response()
    }
}

// ── State ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CompositorState {
    client: reqwest::Client,
    renderer: Arc<dyn Renderer>,
    style: Arc<CaptionStyle>,
    work_dir: Arc<PathBuf>,
    max_image_bytes: u64,
}

impl CompositorState {
    /// State backed by ImageMagick `convert`.
    pub fn from_config(config: &CompositorConfig) -> Result<Self, reqwest::Error> {
        let renderer = ConvertRenderer::new(config.convert_bin.clone(), config.render_timeout);
        Self::new(config, Arc::new(renderer))
    }

    pub fn new(config: &CompositorConfig, renderer: Arc<dyn Renderer>) -> Result<Self, reqwest::Error> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.download_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            renderer,
            style: Arc::new(CaptionStyle::default().with_font(config.font.clone())),
            work_dir: Arc::new(config.work_dir.clone()),
            max_image_bytes: config.max_image_bytes,
        })
    }

    /// Downloads, renders and returns a response whose body streams the
    /// rendered file. The rendered file is removed once the body is dropped.
    pub async fn compose(&self, request: &CaptionRequest) -> Result<Response, CompositeError> {
        let extension = file_extension(&request.image_url);
        let source = self.download(&request.image_url, &extension).await?;

        let rendered = ScopedFile::reserve(&self.work_dir, &extension);
        self.renderer
            .render(source.path(), &request.phrase, &self.style, rendered.path())
            .await?;
        drop(source);

        let file = tokio::fs::File::open(rendered.path()).await?;
        let body = Body::from_stream(stream_file(file, rendered));
        Ok((
            [(header::CONTENT_TYPE, content_type_for(&extension))],
            body,
        )
            .into_response())
    }

    #[tracing::instrument(skip(self, extension))]
    async fn download(&self, url: &str, extension: &str) -> Result<ScopedFile, DownloadError> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status()));
        }
        let limit = self.max_image_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(DownloadError::TooLarge { limit });
        }

        let (guard, mut file) = ScopedFile::create(&self.work_dir, extension).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > limit {
                return Err(DownloadError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        tracing::debug!(bytes = written, path = %guard.path().display(), "downloaded image");
        Ok(guard)
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: CompositorState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/applyPhraseToPicture", post(apply_phrase_to_picture))
        .with_state(state)
}

async fn apply_phrase_to_picture(
    State(state): State<CompositorState>,
    payload: Result<Json<CaptionRequest>, JsonRejection>,
) -> Result<Response, CompositeError> {
    let Json(request) = payload.map_err(|e| CompositeError::InvalidRequest(e.body_text()))?;
    if request.image_url.trim().is_empty() {
        return Err(CompositeError::InvalidRequest("imageUrl is required".to_string()));
    }
    state.compose(&request).await
}

// ── Helpers ──────────────────────────────────────────────────────────────────

// Yields the file in chunks and owns the guard until the stream ends or is
// dropped.
fn stream_file(
    file: tokio::fs::File,
    guard: ScopedFile,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures_util::stream::unfold(Some((file, guard)), |state| async move {
        let (mut file, guard) = state?;
        let mut buf = vec![0u8; STREAM_CHUNK_BYTES];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((file, guard))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Extension of the last path segment of `image_url`, with its leading dot,
/// or an empty string when there is none.
pub fn file_extension(image_url: &str) -> String {
    let last_segment = match Url::parse(image_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string)
            .unwrap_or_default(),
        Err(_) => image_url.rsplit('/').next().unwrap_or_default().to_string(),
    };
    match last_segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{ext}")
        }
        _ => String::new(),
    }
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "image/png",
    }
}
