//! Environment-driven configuration, read once at startup and never mutated.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

pub const ORCHESTRATOR_PORT: u16 = 10115;
pub const IMAGE_PICKER_PORT: u16 = 10116;
pub const MEMINATOR_PORT: u16 = 10117;
pub const PHRASE_PICKER_PORT: u16 = 10118;

const DEFAULT_BUCKET_NAME: &str = "random-pictures";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;
const DEFAULT_CONVERT_BIN: &str = "convert";
const DEFAULT_FONT: &str = "Angkor-Regular";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

fn string_or<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Listening address shared by every service binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, defaulting to `0.0.0.0:<default_port>`.
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup, default_port)
    }

    fn from_lookup<F>(lookup: F, default_port: u16) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = SocketAddr::from(([0, 0, 0, 0], default_port));
        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", default)?,
        })
    }
}

/// How the orchestrator issues its two picker calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOut {
    /// Both at once; the first failure cancels the other.
    #[default]
    Concurrent,
    /// Phrase first, image only if the phrase succeeded.
    Sequential,
}

impl FromStr for FanOut {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concurrent" => Ok(FanOut::Concurrent),
            "sequential" => Ok(FanOut::Sequential),
            _ => Err(()),
        }
    }
}

/// Downstream addresses for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub phrase_picker_url: String,
    pub image_picker_url: String,
    pub meminator_url: String,
    pub timeout: Duration,
    pub fan_out: FanOut,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let phrase_default = format!("http://phrase-picker:{PHRASE_PICKER_PORT}");
        let image_default = format!("http://image-picker:{IMAGE_PICKER_PORT}");
        let meminator_default = format!("http://meminator:{MEMINATOR_PORT}");
        Ok(Self {
            phrase_picker_url: string_or(&lookup, "PHRASE_PICKER_URL", &phrase_default),
            image_picker_url: string_or(&lookup, "IMAGE_PICKER_URL", &image_default),
            meminator_url: string_or(&lookup, "MEMINATOR_URL", &meminator_default),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "DOWNSTREAM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            fan_out: parse_or(&lookup, "PICKER_FAN_OUT", FanOut::default())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Directory holding the downloaded and rendered temporary files.
    pub work_dir: PathBuf,
    pub max_image_bytes: u64,
    pub download_timeout: Duration,
    pub convert_bin: String,
    pub font: String,
    pub render_timeout: Duration,
}

impl CompositorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let work_dir = lookup("MEMINATOR_WORK_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Ok(Self {
            work_dir,
            max_image_bytes: parse_or(
                &lookup,
                "MEMINATOR_MAX_IMAGE_BYTES",
                DEFAULT_MAX_IMAGE_BYTES,
            )?,
            download_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DOWNSTREAM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            convert_bin: string_or(&lookup, "MEMINATOR_CONVERT_BIN", DEFAULT_CONVERT_BIN),
            font: string_or(&lookup, "MEMINATOR_FONT", DEFAULT_FONT),
            render_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MEMINATOR_RENDER_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            download_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            convert_bin: DEFAULT_CONVERT_BIN.to_string(),
            font: DEFAULT_FONT.to_string(),
            render_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImagePickerConfig {
    pub bucket_name: String,
}

impl ImagePickerConfig {
    /// Reads `BUCKET_NAME`, defaulting to `random-pictures`.
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bucket_name: string_or(&lookup, "BUCKET_NAME", DEFAULT_BUCKET_NAME),
        }
    }
}
