//! Phrase and image-URL picker services. Each serves one random entry from
//! an immutable catalog injected at startup.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::catalog::Catalog;
use crate::models::{ImageUrlResponse, PhraseResponse};
use crate::server::health;

pub fn phrase_router(phrases: Catalog) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/phrase", get(pick_phrase))
        .with_state(Arc::new(phrases))
}

pub fn image_router(images: Catalog) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/imageUrl", get(pick_image_url))
        .with_state(Arc::new(images))
}

async fn pick_phrase(State(phrases): State<Arc<Catalog>>) -> impl IntoResponse {
    let phrase = phrases.pick().to_string();
    tracing::debug!(%phrase, "picked phrase");
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(PhraseResponse { phrase }),
    )
}

async fn pick_image_url(State(images): State<Arc<Catalog>>) -> impl IntoResponse {
    let image_url = images.pick().to_string();
    tracing::debug!(%image_url, "picked image");
    Json(ImageUrlResponse { image_url })
}
