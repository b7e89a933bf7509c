//! Captioned-picture pipeline: two catalog pickers, the meminator that
//! draws a phrase onto a downloaded image, and the backend-for-frontend that
//! ties them together for a single client request.

pub mod catalog;
pub mod compositor;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod pickers;
pub mod render;
pub mod scoped_file;
pub mod server;
pub mod telemetry;

pub use catalog::Catalog;
pub use compositor::{CompositeError, CompositorState};
pub use models::CaptionRequest;
pub use orchestrator::{OrchestratorState, PipelineError};
pub use render::{CaptionStyle, RenderError, Renderer};
pub use scoped_file::ScopedFile;
