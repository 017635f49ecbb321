//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use hydra_sdk::hydra_core::AppConfig;

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Application configuration.
    pub config: AppConfig,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from a config file, or the nearest one found walking up
    /// from the working directory.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config = match config_path {
            Some(path) => Self::load_file(&cwd.join(path))?,
            None => match Self::find_config(&cwd) {
                Some(path) => {
                    output.debug(&format!("Using config {}", path.display()));
                    Self::load_file(&path)?
                }
                None => agent_portal::portal_config(),
            },
        };

        Ok(Self { config, output, cwd })
    }

    /// Load a config file. A relative manifest path is taken relative to
    /// the file.
    fn load_file(path: &Path) -> Result<AppConfig> {
        let mut config = AppConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;

        if let (Some(manifest), Some(dir)) = (&config.assets.manifest, path.parent()) {
            if Path::new(manifest).is_relative() {
                config.assets.manifest = Some(dir.join(manifest).display().to_string());
            }
        }
        Ok(config)
    }

    /// Find a config file in the directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let config_names = ["hydra.toml", ".hydra.toml", "hydra.json"];

        let mut current = start.to_path_buf();
        loop {
            for name in &config_names {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }
}
