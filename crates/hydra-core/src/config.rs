//! Application configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for an SSR application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document shell configuration.
    #[serde(default)]
    pub document: DocumentConfig,

    /// Render configuration.
    #[serde(default)]
    pub render: RenderConfig,

    /// Response streaming configuration.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Build asset configuration.
    #[serde(default)]
    pub assets: AssetConfig,
}

impl AppConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: display,
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::Invalid("stream.chunk_size must be > 0".into()));
        }
        if self.document.root_id.is_empty() {
            return Err(ConfigError::Invalid("document.root_id must not be empty".into()));
        }
        Ok(())
    }

    /// Set the default page title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.document.title = title.into();
        self
    }

    /// Select streaming or buffered render.
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.render.mode = if enabled {
            RenderMode::Streaming
        } else {
            RenderMode::Buffered
        };
        self
    }

    /// Set the maximum bytes per transport write.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.stream.chunk_size = bytes;
        self
    }
}

/// Document shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// `lang` attribute of the `<html>` element.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Default page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Id of the root mount element.
    #[serde(default = "default_root_id")]
    pub root_id: String,

    /// Extra `<meta name=.. content=..>` pairs.
    #[serde(default)]
    pub meta: Vec<(String, String)>,
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_title() -> String {
    "Hydra".to_string()
}

fn default_root_id() -> String {
    "root".to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            title: default_title(),
            root_id: default_root_id(),
            meta: Vec::new(),
        }
    }
}

/// How the render engine produces markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Render the whole tree, then assemble.
    Buffered,
    /// Emit segments behind an all-ready completion signal.
    #[default]
    Streaming,
}

/// Render configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub mode: RenderMode,
}

/// Response streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Maximum bytes handed to the transport per write.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    8192
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// Build asset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Path to the bundler's chunk manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    /// URL prefix for chunk files.
    #[serde(default = "default_public_path")]
    pub public_path: String,
}

fn default_public_path() -> String {
    "/static/".to_string()
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            public_path: default_public_path(),
        }
    }
}
