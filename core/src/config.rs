//! Configuration management for the lambda engine
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags (--unknown-events, etc.)
//! 2. Environment variables (LAMBDA_ENGINE_MAX_DEPTH, etc.)
//! 3. Config file (lambda.toml in the working directory or ~/.config/lambda/config.toml)
//! 4. Built-in defaults
//!
//! # Example Config File (lambda.toml)
//!
//! ```toml
//! [engine]
//! unknown_events = "error"
//! max_depth = 256
//!
//! [auth]
//! data_path = "/db/"
//! auth_file = "/auth.hl"
//!
//! [[auth.access]]
//! role = "*"
//! path = "/modules/"
//! access = "deny"
//! operation = "write"
//!
//! [io]
//! root = "./files"
//!
//! [log]
//! filter = "lambda_core=debug"
//! ```
//!
//! # Environment Variables
//!
//! - LAMBDA_CONFIG_PATH
//! - LAMBDA_ENGINE_UNKNOWN_EVENTS
//! - LAMBDA_ENGINE_MAX_DEPTH
//! - LAMBDA_AUTH_DATA_PATH
//! - LAMBDA_AUTH_FILE
//! - LAMBDA_IO_ROOT
//! - LAMBDA_LOG

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::auth::{AccessRule, PathAuthorizer};
use crate::executor::UnknownEventPolicy;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub io: IoConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Interpreter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// What to do when a node names an event nobody handles
    #[serde(default)]
    pub unknown_events: UnknownEventPolicy,

    /// Maximum nesting of block executions
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Authorization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Folder whose content only root may read
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// File holding credentials, never readable by other roles
    #[serde(default = "default_auth_file")]
    pub auth_file: String,

    #[serde(default)]
    pub access: Vec<AccessRule>,
}

/// File keyword settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    /// Folder that lambda paths are relative to
    #[serde(default = "default_io_root")]
    pub root: PathBuf,
}

/// Logging settings, used when RUST_LOG is not set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub filter: Option<String>,
}

// Default value functions for serde
fn default_max_depth() -> usize {
    256
}
fn default_data_path() -> String {
    "/db/".to_string()
}
fn default_auth_file() -> String {
    "/auth.hl".to_string()
}
fn default_io_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_events: UnknownEventPolicy::default(),
            max_depth: default_max_depth(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            auth_file: default_auth_file(),
            access: Vec::new(),
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            root: default_io_root(),
        }
    }
}

impl AuthConfig {
    pub fn authorizer(&self) -> PathAuthorizer {
        PathAuthorizer::new(&self.data_path, &self.auth_file, self.access.clone())
    }
}

impl Config {
    /// Load configuration with full priority chain:
    /// CLI flags → env vars → config file → defaults
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Create a builder for constructing config with overrides
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for constructing Config with optional overrides
#[derive(Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    unknown_events: Option<UnknownEventPolicy>,
    max_depth: Option<usize>,
    io_root: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Override the config file path
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override the unknown event policy
    pub fn unknown_events(mut self, policy: Option<UnknownEventPolicy>) -> Self {
        self.unknown_events = policy;
        self
    }

    /// Override the maximum execution depth
    pub fn max_depth(mut self, max: Option<usize>) -> Self {
        self.max_depth = max;
        self
    }

    /// Override the I/O root folder
    pub fn io_root(mut self, root: Option<PathBuf>) -> Self {
        self.io_root = root;
        self
    }

    /// Ignore `.env`, environment variables and default file locations
    ///
    /// Only an explicit config path and overrides are applied.
    pub fn isolated(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Build the final config by applying priority chain
    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            // Load .env file if present (do this first, so env vars can override it)
            let _ = dotenvy::dotenv();
        }

        // Step 1: Start with defaults
        let mut config = Config::default();

        // Step 2: Try to load from config file
        if let Some(file_config) = self.load_from_file()? {
            config = file_config;
        }

        // Step 3: Overlay environment variables
        if !self.skip_env {
            self.apply_env_vars(&mut config)?;
        }

        // Step 4: Apply CLI overrides (highest priority)
        self.apply_overrides(&mut config);

        if config.engine.max_depth == 0 {
            anyhow::bail!("engine.max_depth must be at least 1");
        }

        Ok(config)
    }

    /// Try to load config from file (searches default locations if no path specified)
    fn load_from_file(&self) -> Result<Option<Config>> {
        let config_path = if let Some(path) = &self.config_path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {:?}", path);
            }
            Some(path.clone())
        } else if self.skip_env {
            None
        } else if let Ok(path_str) = env::var("LAMBDA_CONFIG_PATH") {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                anyhow::bail!("Config file not found: {:?}", path);
            }
            Some(path)
        } else {
            self.find_config_file()
        };

        match config_path {
            Some(path) => Ok(Some(Config::from_file(&path)?)),
            None => Ok(None),
        }
    }

    /// Search for config file in default locations
    fn find_config_file(&self) -> Option<PathBuf> {
        // 1. Working directory: ./lambda.toml
        let project_config = PathBuf::from("lambda.toml");
        if project_config.exists() {
            return Some(project_config);
        }

        // 2. User config: ~/.config/lambda/config.toml
        if let Some(home) = env::var_os("HOME") {
            let user_config = PathBuf::from(home)
                .join(".config")
                .join("lambda")
                .join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Apply environment variables to config
    fn apply_env_vars(&self, config: &mut Config) -> Result<()> {
        if let Ok(policy) = env::var("LAMBDA_ENGINE_UNKNOWN_EVENTS") {
            config.engine.unknown_events = policy
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid LAMBDA_ENGINE_UNKNOWN_EVENTS")?;
        }

        if let Ok(max) = env::var("LAMBDA_ENGINE_MAX_DEPTH") {
            config.engine.max_depth = max
                .parse()
                .with_context(|| format!("Invalid LAMBDA_ENGINE_MAX_DEPTH: {}", max))?;
        }

        if let Ok(path) = env::var("LAMBDA_AUTH_DATA_PATH") {
            config.auth.data_path = path;
        }

        if let Ok(file) = env::var("LAMBDA_AUTH_FILE") {
            config.auth.auth_file = file;
        }

        if let Ok(root) = env::var("LAMBDA_IO_ROOT") {
            config.io.root = PathBuf::from(root);
        }

        if let Ok(filter) = env::var("LAMBDA_LOG") {
            config.log.filter = Some(filter);
        }

        Ok(())
    }

    /// Apply CLI overrides (highest priority)
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(policy) = self.unknown_events {
            config.engine.unknown_events = policy;
        }

        if let Some(max) = self.max_depth {
            config.engine.max_depth = max;
        }

        if let Some(root) = &self.io_root {
            config.io.root = root.clone();
        }
    }
}
