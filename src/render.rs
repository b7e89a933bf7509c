//! Caption rendering. The compositor only sees the [`Renderer`] trait; the
//! production implementation shells out to ImageMagick's `convert`.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

pub const MAX_WIDTH_PX: u32 = 1000;
pub const MAX_HEIGHT_PX: u32 = 1000;

/// Fixed drawing parameters applied to every caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionStyle {
    pub max_width_px: u32,
    pub max_height_px: u32,
    pub gravity: String,
    pub point_size: u32,
    pub fill: String,
    pub undercolor: String,
    pub font: String,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            max_width_px: MAX_WIDTH_PX,
            max_height_px: MAX_HEIGHT_PX,
            gravity: "North".to_string(),
            point_size: 48,
            fill: "white".to_string(),
            undercolor: "#00000080".to_string(),
            font: "Angkor-Regular".to_string(),
        }
    }
}

impl CaptionStyle {
    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    /// ImageMagick geometry that shrinks to fit the box and never enlarges.
    pub fn resize_geometry(&self) -> String {
        format!("{}x{}>", self.max_width_px, self.max_height_px)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("render tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("render tool timed out after {0:?}")]
    TimedOut(Duration),
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Draws `phrase` onto the image at `source` and writes the result to
    /// `output`, whose extension selects the encoded format.
    async fn render(
        &self,
        source: &Path,
        phrase: &str,
        style: &CaptionStyle,
        output: &Path,
    ) -> Result<(), RenderError>;
}

/// Runs ImageMagick `convert` as a child process. The child is killed if the
/// render times out or the calling future is dropped.
#[derive(Debug, Clone)]
pub struct ConvertRenderer {
    program: String,
    timeout: Duration,
}

impl ConvertRenderer {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Renderer for ConvertRenderer {
    #[tracing::instrument(skip(self, phrase, style), fields(program = %self.program))]
    async fn render(
        &self,
        source: &Path,
        phrase: &str,
        style: &CaptionStyle,
        output: &Path,
    ) -> Result<(), RenderError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(convert_args(source, phrase, style, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => return Err(RenderError::TimedOut(self.timeout)),
        };

        if !result.status.success() {
            return Err(RenderError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        tracing::debug!("render finished");
        Ok(())
    }
}

/// Argument vector for `convert`, in the order ImageMagick applies them.
pub fn convert_args(
    source: &Path,
    phrase: &str,
    style: &CaptionStyle,
    output: &Path,
) -> Vec<OsString> {
    vec![
        source.as_os_str().to_owned(),
        "-resize".into(),
        style.resize_geometry().into(),
        "-gravity".into(),
        style.gravity.clone().into(),
        "-pointsize".into(),
        style.point_size.to_string().into(),
        "-fill".into(),
        style.fill.clone().into(),
        "-undercolor".into(),
        style.undercolor.clone().into(),
        "-font".into(),
        style.font.clone().into(),
        "-annotate".into(),
        "0".into(),
        annotation_text(phrase).into(),
        output.as_os_str().to_owned(),
    ]
}

// A leading '@' makes ImageMagick read the text from a file.
fn annotation_text(phrase: &str) -> String {
    if phrase.starts_with('@') {
        format!("\\{phrase}")
    } else {
        phrase.to_string()
    }
}
