// Configuration loading and validation
use crate::error::ConfigError;
use crate::lifecycle::{self, ContextTypes};
use crate::pipeline::FilterChain;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub context: ContextSettings,
    pub logging: LogSettings,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ContextSettings {
    /// Name of a registered context type.
    pub context_type: String,
    /// Log each request's filter trace when it completes.
    pub log_summary: bool,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LogSettings {
    pub enabled: bool,
    pub level: String,
}

impl Default for ContextSettings {
    fn default() -> Self {
        ContextSettings { context_type: "default".to_string(), log_summary: true }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings { enabled: true, level: "info".to_string() }
    }
}

impl Config {
    /// Replace unusable values with defaults. Returns false if anything was replaced.
    pub fn validate(&mut self) -> bool {
        let mut valid = true;
        if self.context.context_type.trim().is_empty() {
            tracing::warn!("context_type is empty, using 'default'");
            self.context.context_type = "default".to_string();
            valid = false;
        }
        if crate::log::parse_level(&self.logging.level).is_none() {
            tracing::warn!(level = %self.logging.level, "unknown log level, using 'info'");
            self.logging.level = "info".to_string();
            valid = false;
        }
        valid
    }

    /// Start logging and select the configured context type. A context type
    /// that is unknown or fails to build is fatal.
    pub fn apply(&self, types: &ContextTypes) -> Result<(), ConfigError> {
        crate::log::init(self.logging.enabled, &self.logging.level);
        lifecycle::configure(&self.context.context_type, types)?;
        Ok(())
    }

    pub fn filter_chain(&self) -> FilterChain {
        FilterChain::new().with_summary_logging(self.context.log_summary)
    }
}

pub fn parse_config(txt: &str, path: &str) -> Result<Config, ConfigError> {
    let mut cfg: Config = toml::from_str(txt).map_err(|source| ConfigError::Parse { path: path.to_string(), source })?;
    cfg.validate();
    Ok(cfg)
}

/// Read `path`. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let p = path.as_ref().display().to_string();
    match fs::read_to_string(path.as_ref()) {
        Ok(txt) => {
            let cfg = parse_config(&txt, &p)?;
            tracing::info!(path = %p, "loaded config");
            Ok(cfg)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %p, "no config file, using defaults");
            Ok(Config::default())
        }
        Err(source) => Err(ConfigError::Read { path: p, source }),
    }
}
