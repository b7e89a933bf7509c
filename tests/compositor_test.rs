//! Meminator integration tests
//!
//! Drives the compositor router in-process against a mock image host and a
//! fake renderer, checking responses and temporary-file cleanup.

mod common;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use meme_composer::{compositor, config::CompositorConfig, CompositorState};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

use common::{
    body_bytes, body_json, closed_port_url, dir_is_empty, get as get_request, json_post, FakeRenderer,
    HitCounter,
};

const IMAGE_BYTES: &[u8] = b"\x89PNG-not-really-an-image";

async fn image_host(hits: HitCounter) -> String {
    async fn image(State(hits): State<HitCounter>) -> impl IntoResponse {
        hits.hit();
        ([(CONTENT_TYPE, "image/png")], IMAGE_BYTES)
    }
    async fn missing(State(hits): State<HitCounter>) -> impl IntoResponse {
        hits.hit();
        StatusCode::NOT_FOUND
    }
    let app = Router::new()
        .route("/cat.png", get(image))
        .route("/cat.jpg", get(image))
        .route("/gone.png", get(missing))
        .with_state(hits);
    common::spawn(app).await
}

fn setup(renderer: FakeRenderer) -> (TempDir, Router) {
    setup_with(renderer, |_| {})
}

fn setup_with(renderer: FakeRenderer, tweak: impl FnOnce(&mut CompositorConfig)) -> (TempDir, Router) {
    let work_dir = tempfile::tempdir().unwrap();
    let mut config = CompositorConfig {
        work_dir: work_dir.path().to_path_buf(),
        ..CompositorConfig::default()
    };
    tweak(&mut config);
    let state = CompositorState::new(&config, Arc::new(renderer)).unwrap();
    (work_dir, compositor::router(state))
}

#[cfg(test)]
mod compositor_tests {
    use super::*;

    #[tokio::test]
    async fn test_renders_and_streams_image() {
        let hits = HitCounter::default();
        let host = image_host(hits.clone()).await;
        let renderer = FakeRenderer::default();
        let (work_dir, app) = setup(renderer.clone());

        let payload = json!({"phrase": "this is fine", "imageUrl": format!("{host}/cat.jpg")});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "image/jpeg");
        let body = body_bytes(resp).await;
        let mut expected = b"RENDERED:this is fine:".to_vec();
        expected.extend_from_slice(IMAGE_BYTES);
        assert_eq!(body, expected);

        assert_eq!(hits.count(), 1);
        let calls = renderer.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.phrase, "this is fine");
        assert_eq!(call.style.resize_geometry(), "1000x1000>");
        assert_eq!(call.style.point_size, 48);
        assert_eq!(call.source.extension().unwrap(), "jpg");
        assert_eq!(call.output.extension().unwrap(), "jpg");
        assert_ne!(call.source, call.output);
        assert_eq!(call.source.parent(), Some(work_dir.path()));
        assert_eq!(call.output.parent(), Some(work_dir.path()));

        assert!(dir_is_empty(work_dir.path()), "temporary files left behind");
    }

    #[tokio::test]
    async fn test_empty_phrase_is_rendered() {
        let host = image_host(HitCounter::default()).await;
        let renderer = FakeRenderer::default();
        let (work_dir, app) = setup(renderer.clone());

        let payload = json!({"imageUrl": format!("{host}/cat.png")});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "image/png");
        assert!(!body_bytes(resp).await.is_empty());
        assert_eq!(renderer.calls()[0].phrase, "");
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_download_not_found_is_server_error() {
        let hits = HitCounter::default();
        let host = image_host(hits.clone()).await;
        let renderer = FakeRenderer::default();
        let (work_dir, app) = setup(renderer.clone());

        let payload = json!({"phrase": "bruh", "imageUrl": format!("{host}/gone.png")});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await, json!({"error": "Failed to download image"}));
        assert_eq!(hits.count(), 1);
        assert!(renderer.calls().is_empty());
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_unreachable_image_is_server_error() {
        let renderer = FakeRenderer::default();
        let (work_dir, app) = setup(renderer.clone());

        let url = format!("{}/cat.png", closed_port_url().await);
        let payload = json!({"phrase": "bruh", "imageUrl": url});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(renderer.calls().is_empty());
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_oversized_download_is_rejected() {
        let host = image_host(HitCounter::default()).await;
        let renderer = FakeRenderer::default();
        let (work_dir, app) = setup_with(renderer.clone(), |config| config.max_image_bytes = 4);

        let payload = json!({"phrase": "bruh", "imageUrl": format!("{host}/cat.png")});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(renderer.calls().is_empty());
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_render_failure_cleans_up_both_files() {
        let host = image_host(HitCounter::default()).await;
        let renderer = FakeRenderer::failing();
        let (work_dir, app) = setup(renderer.clone());

        let payload = json!({"phrase": "bruh", "imageUrl": format!("{host}/cat.png")});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Subprocess failed"), "{message}");
        assert!(message.contains("exit status: 1"), "{message}");

        assert_eq!(renderer.calls().len(), 1);
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_render_timeout_cleans_up_both_files() {
        let host = image_host(HitCounter::default()).await;
        let renderer = FakeRenderer::timing_out();
        let (work_dir, app) = setup(renderer.clone());

        let payload = json!({"phrase": "bruh", "imageUrl": format!("{host}/cat.png")});
        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", payload.to_string()))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Subprocess failed"), "{message}");
        assert!(message.contains("timed out"), "{message}");

        assert_eq!(renderer.calls().len(), 1);
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let hits = HitCounter::default();
        let _host = image_host(hits.clone()).await;
        let renderer = FakeRenderer::default();
        let (work_dir, app) = setup(renderer.clone());

        let resp = app
            .oneshot(json_post("/applyPhraseToPicture", "{\"phrase\": "))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({"error": "Invalid request payload"}));
        assert_eq!(hits.count(), 0);
        assert!(renderer.calls().is_empty());
        assert!(dir_is_empty(work_dir.path()));
    }

    #[tokio::test]
    async fn test_missing_or_empty_image_url_is_bad_request() {
        let renderer = FakeRenderer::default();
        let (_work_dir, app) = setup(renderer.clone());

        for body in [json!({"phrase": "bruh"}), json!({"phrase": "bruh", "imageUrl": ""})] {
            let resp = app
                .clone()
                .oneshot(json_post("/applyPhraseToPicture", body.to_string()))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        }
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let (_work_dir, app) = setup(FakeRenderer::default());
        let resp = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"status": "healthy"}));
    }
}
