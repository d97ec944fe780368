//! Editor configuration.
//!
//! Handles loading, validating, and merging the editor's `config.toml`. Stock
//! defaults are overridden by an optional user config file, then by the `PORT`
//! environment variable, then by command-line flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_root = "exampleSite/content"  # Folder tree being edited
//! project_root = "."                    # Site project handed to the build
//! bind_address = "0.0.0.0"
//! port = 5050                           # PORT env var overrides this
//! max_body_mb = 25                      # Request body ceiling (uploads, edits)
//!
//! [upload]
//! max_collision_attempts = 10000        # photo-1.jpg, photo-2.jpg, ...
//!
//! [build]
//! command = ["hugo", "--minify"]
//! container_name = "hugo"               # docker exec target
//! compose_service = "hugo"              # docker compose exec target
//! image = "hugomods/hugo:latest"        # docker run fallback
//! timeout_secs = 300
//! tail_lines = 12
//! tail_chars = 700
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration, constructed once at startup and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Directory tree of content folders. Every served or written path must
    /// resolve beneath it.
    pub content_root: PathBuf,
    /// Static site project directory (where the build runs).
    pub project_root: PathBuf,
    pub bind_address: String,
    pub port: u16,
    /// Ceiling for request bodies, in MiB.
    pub max_body_mb: u64,
    pub upload: UploadConfig,
    pub build: BuildConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("exampleSite/content"),
            project_root: PathBuf::from("."),
            bind_address: "0.0.0.0".to_string(),
            port: 5050,
            max_body_mb: 25,
            upload: UploadConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "content_root must not be empty".into(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("port cannot be 0".into()));
        }
        if self.max_body_mb == 0 {
            return Err(ConfigError::Validation(
                "max_body_mb must be greater than 0".into(),
            ));
        }
        if self.upload.max_collision_attempts == 0 {
            return Err(ConfigError::Validation(
                "upload.max_collision_attempts must be greater than 0".into(),
            ));
        }
        if self.build.command.is_empty() || self.build.command[0].trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.command must name a program".into(),
            ));
        }
        if self.build.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "build.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.build.tail_lines == 0 || self.build.tail_chars == 0 {
            return Err(ConfigError::Validation(
                "build.tail_lines and build.tail_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Request body ceiling in bytes.
    pub fn max_body_bytes(&self) -> usize {
        (self.max_body_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Apply a `PORT` value from the environment. Unparseable values are
    /// ignored and the configured port is kept.
    pub fn apply_port_env(&mut self, value: Option<&str>) {
        if let Some(port) = value.and_then(|v| v.trim().parse::<u16>().ok()) {
            if port != 0 {
                self.port = port;
            }
        }
    }

    /// `bind_address:port` for the listener.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Upload handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Upper bound on `-N` suffixes tried before an upload is refused.
    pub max_collision_attempts: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_collision_attempts: 10_000,
        }
    }
}

/// External build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Build program and its arguments, run inside a container or locally.
    pub command: Vec<String>,
    /// Name of an already running container to `docker exec` into.
    pub container_name: String,
    /// Compose service to `docker compose exec` into.
    pub compose_service: String,
    /// Image for a one-off `docker run` with the project bind-mounted.
    pub image: String,
    pub timeout_secs: u64,
    /// Non-blank output lines kept from the end of a build's output.
    pub tail_lines: usize,
    /// Character ceiling for the joined tail (the suffix is kept).
    pub tail_chars: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["hugo".to_string(), "--minify".to_string()],
            container_name: "hugo".to_string(),
            compose_service: "hugo".to_string(),
            image: "hugomods/hugo:latest".to_string(),
            timeout_secs: 300,
            tail_lines: 12,
            tail_chars: 700,
        }
    }
}

impl BuildConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EditorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<EditorConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# content-desk configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Folder tree browsed and edited through the web front end. Every path the
# editor reads or writes must resolve beneath this directory.
content_root = "exampleSite/content"

# Static site project directory. The build runs here (or is bind-mounted
# into a one-off container from here).
project_root = "."

# Listener. The PORT environment variable overrides `port`.
bind_address = "0.0.0.0"
port = 5050

# Ceiling for request bodies (uploads and edited documents), in MiB.
max_body_mb = 25

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[upload]
# A colliding upload is saved as name-1.ext, name-2.ext, ...
# The upload is refused once this many suffixes are taken.
max_collision_attempts = 10000

# ---------------------------------------------------------------------------
# Site build (the Deploy button)
# ---------------------------------------------------------------------------
[build]
# Build program and arguments.
command = ["hugo", "--minify"]

# Tried in order: docker exec into a running container, docker compose exec
# into a service, a one-off docker run with the project mounted at /src.
# When docker is not installed the command runs locally in project_root.
container_name = "hugo"
compose_service = "hugo"
image = "hugomods/hugo:latest"

# Seconds before a build attempt is killed.
timeout_secs = 300

# How much build output is reported back: the last non-blank lines, then
# the last characters of those lines.
tail_lines = 12
tail_chars = 700
"##
}
