use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Console configuration. Built once at startup and passed down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin of the attendance server.
    pub api_url: String,
    /// V4L2 device path for check-in captures.
    pub camera_device: String,
    /// JPEG quality for captured stills (1–100).
    pub jpeg_quality: u8,
    /// Frames discarded after opening the camera while exposure settles.
    pub warmup_frames: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            camera_device: "/dev/video0".to_string(),
            jpeg_quality: 90,
            warmup_frames: 4,
        }
    }
}

/// Host pattern images may be loaded from, derived from the API origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemotePattern {
    pub protocol: String,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub pathname: String,
}

impl Config {
    /// Defaults, then the TOML file at `path` (if any), then `ROLLCALL_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ROLLCALL_API_URL").filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(device) = lookup("ROLLCALL_CAMERA_DEVICE").filter(|v| !v.is_empty()) {
            self.camera_device = device;
        }
        self.jpeg_quality = env_parse(&lookup, "ROLLCALL_JPEG_QUALITY", self.jpeg_quality);
        self.warmup_frames = env_parse(&lookup, "ROLLCALL_WARMUP_FRAMES", self.warmup_frames);
    }

    /// Check the final values and normalize the API origin.
    pub fn validate(&mut self) -> Result<()> {
        Url::parse(&self.api_url).with_context(|| format!("invalid API URL {:?}", self.api_url))?;
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("jpeg_quality must be between 1 and 100, got {}", self.jpeg_quality);
        }
        Ok(())
    }

    pub fn image_allowlist(&self) -> Result<RemotePattern> {
        let url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid API URL {:?}", self.api_url))?;
        let protocol = if self.api_url.starts_with("https") { "https" } else { "http" };
        Ok(RemotePattern {
            protocol: protocol.to_string(),
            hostname: url.host_str().unwrap_or_default().to_string(),
            port: url.port(),
            pathname: "/**".to_string(),
        })
    }
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
