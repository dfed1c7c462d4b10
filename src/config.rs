//! Site configuration.
//!
//! Loads `stanza.toml` from the site root and layers CLI overrides on top.
//! The loaded config is leaked to `&'static` in `main` so helper closures
//! registered with the template engine can capture it freely.

use crate::cli::{Cli, Commands};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site-wide configuration from `stanza.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Base URL of the published site, e.g. `https://example.com`
    pub base_url: String,
    pub title: String,
    pub description: String,
    pub author: String,

    /// Content directory, relative to the site root
    pub content: PathBuf,
    /// Output directory, relative to the site root
    pub output: PathBuf,
    /// Templates directory, relative to the site root
    pub templates: PathBuf,

    /// Generate `atom.xml`
    pub generate_feed: bool,
    /// Maximum number of feed entries (0 = unlimited)
    pub feed_limit: usize,
    /// Generate `sitemap.xml`
    pub sitemap: bool,
    /// Enable smart punctuation in markdown rendering
    pub smart_punctuation: bool,

    pub serve: ServeConfig,

    /// Include draft pages. CLI-only, never read from the config file.
    #[serde(skip)]
    pub include_drafts: bool,

    /// Site root directory. Set from the CLI, never from the file.
    #[serde(skip)]
    pub(crate) root: PathBuf,

    /// Absolute output override used by the dev server (temp directory).
    #[serde(skip)]
    pub(crate) output_override: Option<PathBuf>,
}

/// Dev server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub interface: String,
    pub port: u16,
    /// Extra directory names the watcher should ignore
    pub watch_ignore: Vec<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: "127.0.0.1".to_owned(),
            port: 4141,
            watch_ignore: Vec::new(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            title: String::new(),
            description: String::new(),
            author: String::new(),
            content: PathBuf::from("content"),
            output: PathBuf::from("public"),
            templates: PathBuf::from("templates"),
            generate_feed: true,
            feed_limit: 0,
            sitemap: true,
            smart_punctuation: false,
            serve: ServeConfig::default(),
            include_drafts: false,
            root: PathBuf::from("."),
            output_override: None,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Apply CLI arguments on top of file values.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.root {
            self.root = root.clone();
        }
        self.include_drafts = cli.include_drafts();

        if let Commands::Serve {
            interface, port, ..
        } = &cli.command
        {
            if let Some(interface) = interface {
                self.serve.interface = interface.clone();
            }
            if let Some(port) = port {
                self.serve.port = *port;
            }
        }
    }

    /// Validate config state before a build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "base_url must be set".to_owned(),
            ));
        }
        if !self.content_dir().is_dir() {
            return Err(ConfigError::Validation(format!(
                "content directory not found: {}",
                self.content_dir().display()
            )));
        }
        Ok(())
    }

    pub fn set_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Redirect all output to `dir` (used by the dev server's temp directory).
    pub fn override_output(&mut self, dir: PathBuf) {
        self.output_override = Some(dir);
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.content)
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.output_override {
            Some(dir) => dir.clone(),
            None => self.root.join(&self.output),
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.templates)
    }

    /// Base URL without a trailing slash.
    pub fn site_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Absolute URL for a site-relative path.
    pub fn full_url(&self, path: &str) -> String {
        format!("{}/{}", self.site_url(), path.trim_start_matches('/'))
    }
}
