use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub fetch: FetchSettings,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Location of the fjall artifact index.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    /// Where staged inputs and produced outputs live.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    /// Upper bound on the request body. Inline inputs travel base64-encoded,
    /// so this caps roughly 3/4 of it in artifact bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,
    #[serde(default = "default_max_parameter_depth")]
    pub max_parameter_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ledger_path: default_ledger_path(),
            work_dir: default_work_dir(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_parameters: default_max_parameters(),
            max_parameter_depth: default_max_parameter_depth(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/artifacts")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("data/work")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(10 * 1024 * 1024) // 10 MB
}

fn default_max_parameters() -> usize {
    32
}

fn default_max_parameter_depth() -> usize {
    4
}

/// Which transformation engine backs the routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Out-of-process ImageMagick invocation.
    #[default]
    Magick,
    /// In-process `image`-crate pipeline.
    Library,
}

/// Transformation engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    #[serde(default = "default_magick_binary")]
    pub magick_binary: String,
    /// Wall-clock bound on one engine invocation. Unset means unbounded,
    /// which is acceptable for the in-process engine but risky for an
    /// external tool that can hang.
    pub handler_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            magick_binary: default_magick_binary(),
            handler_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_secs.map(Duration::from_secs)
    }
}

fn default_magick_binary() -> String {
    "magick".to_string()
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_artifact_ttl_hours")]
    pub artifact_ttl_hours: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { artifact_ttl_hours: default_artifact_ttl_hours() }
    }
}

impl RetentionConfig {
    pub fn artifact_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.artifact_ttl_hours))
    }
}

fn default_artifact_ttl_hours() -> u32 {
    24
}

/// Remote input fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl FetchSettings {
    pub fn to_fetch_config(&self) -> crate::dispatch::FetchConfig {
        crate::dispatch::FetchConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..crate::dispatch::FetchConfig::default()
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}
