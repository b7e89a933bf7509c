//! The backend-for-frontend: fetches a phrase and an image URL, hands the
//! merged payload to the meminator and streams the picture back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};

use crate::config::{FanOut, OrchestratorConfig};
use crate::models::ErrorBody;
use crate::server::health;

const USER_AGENT: &str = "backend-for-frontend/0.1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PICTURE_CONTENT_TYPE: &str = "image/png";

/// A downstream hop of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    PhrasePicker,
    ImagePicker,
    Meminator,
}

impl Dependency {
    fn client_message(self) -> &'static str {
        match self {
            Dependency::PhrasePicker => "Failed to fetch phrase",
            Dependency::ImagePicker => "Failed to fetch image",
            Dependency::Meminator => "Failed to fetch picture from meminator",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dependency::PhrasePicker => "phrase-picker",
            Dependency::ImagePicker => "image-picker",
            Dependency::Meminator => "meminator",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("returned {0}")]
    Status(StatusCode),
}

/// A failed hop. The client only learns which hop failed, the cause is logged.
#[derive(Debug, thiserror::Error)]
#[error("{dependency} request failed: {source}")]
pub struct PipelineError {
    pub dependency: Dependency,
    #[source]
    pub source: FetchError,
}

impl PipelineError {
    fn new(dependency: Dependency) -> impl FnOnce(FetchError) -> Self {
        move |source| Self { dependency, source }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        tracing::warn!(dependency = %self.dependency, error = %self.source, "create picture failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody::new(self.dependency.client_message())),
        )
            .into_response()
    }
}

#[derive(Debug)]
struct Endpoints {
    phrase: String,
    image: String,
    meminator: String,
}

#[derive(Clone)]
pub struct OrchestratorState {
    client: reqwest::Client,
    endpoints: Arc<Endpoints>,
    fan_out: FanOut,
}

impl OrchestratorState {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let endpoints = Endpoints {
            phrase: join_path(&config.phrase_picker_url, "/phrase"),
            image: join_path(&config.image_picker_url, "/imageUrl"),
            meminator: join_path(&config.meminator_url, "/applyPhraseToPicture"),
        };
        Ok(Self {
            client,
            endpoints: Arc::new(endpoints),
            fan_out: config.fan_out,
        })
    }

    /// Runs the whole pipeline. Any failed hop aborts the request; nothing is
    /// retried.
    pub async fn create_picture(&self) -> Result<Response, PipelineError> {
        let phrase = self.fetch_object(Dependency::PhrasePicker, &self.endpoints.phrase);
        let image = self.fetch_object(Dependency::ImagePicker, &self.endpoints.image);
        let (phrase, image) = match self.fan_out {
            // first error wins, the other fetch is dropped
            FanOut::Concurrent => tokio::try_join!(phrase, image)?,
            FanOut::Sequential => (phrase.await?, image.await?),
        };

        let payload = merge_objects(phrase, image);
        let response = self
            .post_meminator(&payload)
            .await
            .map_err(PipelineError::new(Dependency::Meminator))?;

        // clients always get png, whatever the meminator labelled the bytes
        let body = Body::from_stream(response.bytes_stream());
        Ok(([(header::CONTENT_TYPE, PICTURE_CONTENT_TYPE)], body).into_response())
    }

    async fn fetch_object(
        &self,
        dependency: Dependency,
        url: &str,
    ) -> Result<Map<String, Value>, PipelineError> {
        self.get_json(url)
            .await
            .map_err(PipelineError::new(dependency))
    }

    #[tracing::instrument(skip(self))]
    async fn get_json(&self, url: &str) -> Result<Map<String, Value>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.json::<Map<String, Value>>().await?)
    }

    #[tracing::instrument(skip(self, payload))]
    async fn post_meminator(&self, payload: &Map<String, Value>) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .post(&self.endpoints.meminator)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response)
    }
}

pub fn router(state: OrchestratorState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/createPicture", post(create_picture).get(create_picture))
        .with_state(state)
}

async fn create_picture(State(state): State<OrchestratorState>) -> Result<Response, PipelineError> {
    state.create_picture().await
}

/// Adds every key of `later` to `earlier`; on a collision `later` wins.
pub fn merge_objects(mut earlier: Map<String, Value>, later: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in later {
        earlier.insert(key, value);
    }
    earlier
}

fn join_path(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
