// Shared helpers for the integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request},
    response::Response,
    Router,
};
use meme_composer::{CaptionStyle, RenderError, Renderer};

/// Serves `app` on an ephemeral localhost port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock server error: {}", e);
        }
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn json_post(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[derive(Debug, Clone)]
pub struct RenderCall {
    pub source: PathBuf,
    pub phrase: String,
    pub style: CaptionStyle,
    pub output: PathBuf,
}

/// Renderer double. Writes `RENDERED:<phrase>:<source bytes>` to the output
/// path, or fails after writing a partial file when `fail` or `time_out` is
/// set.
#[derive(Clone, Default)]
pub struct FakeRenderer {
    pub calls: Arc<Mutex<Vec<RenderCall>>>,
    pub fail: bool,
    pub time_out: bool,
}

impl FakeRenderer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn timing_out() -> Self {
        Self {
            time_out: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(
        &self,
        source: &Path,
        phrase: &str,
        style: &CaptionStyle,
        output: &Path,
    ) -> Result<(), RenderError> {
        self.calls.lock().unwrap().push(RenderCall {
            source: source.to_path_buf(),
            phrase: phrase.to_string(),
            style: style.clone(),
            output: output.to_path_buf(),
        });

        if self.time_out {
            tokio::fs::write(output, b"partial").await.unwrap();
            return Err(RenderError::TimedOut(Duration::from_millis(200)));
        }

        if self.fail {
            tokio::fs::write(output, b"partial").await.unwrap();
            return Err(RenderError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "convert: unable to read font".to_string(),
            });
        }

        let original = tokio::fs::read(source).await.unwrap();
        let mut rendered = format!("RENDERED:{}:", phrase).into_bytes();
        rendered.extend_from_slice(&original);
        tokio::fs::write(output, rendered).await.unwrap();
        Ok(())
    }
}
