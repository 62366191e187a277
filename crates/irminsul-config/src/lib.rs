//! Configuration loading for Irminsul.
//! Reads irminsul.toml from the current directory or the path in the IRMINSUL_CONFIG env var.
//! Every field has a default, so an empty file is a valid configuration.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use irminsul_common::EntityKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "./data/irminsul.lancedb".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Where documents come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
}

fn default_base_url()        -> String { "https://wiki.biligame.com/ys".to_string() }
fn default_accept_language() -> String { "zh-CN,zh;q=0.9,en;q=0.8".to_string() }
fn default_allowed_hosts()   -> Vec<String> { vec!["wiki.biligame.com".to_string()] }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            accept_language: default_accept_language(),
            allowed_hosts: default_allowed_hosts(),
        }
    }
}

/// Pacing, retry, timeout, and connection limits for the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: f64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_max_connections_per_host")]
    pub max_connections_per_host: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

fn default_rps()                      -> f64   { 1.0 }
fn default_min_delay()                -> f64   { 1.0 }
fn default_max_delay()                -> f64   { 3.0 }
fn default_max_retries()              -> u32   { 3 }
fn default_retry_delay()              -> f64   { 2.0 }
fn default_backoff_factor()           -> f64   { 2.0 }
fn default_timeout()                  -> u64   { 30 }
fn default_max_connections()          -> usize { 10 }
fn default_max_connections_per_host() -> usize { 5 }
fn default_concurrency()              -> usize { 1 }

/// Upper bound on `scraper.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 16;

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            backoff_factor: default_backoff_factor(),
            timeout_secs: default_timeout(),
            max_connections: default_max_connections(),
            max_connections_per_host: default_max_connections_per_host(),
            concurrency: default_concurrency(),
            user_agents: default_user_agents(),
        }
    }
}

/// Seconds to a `Duration`, saturating. Negative and NaN inputs become zero.
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

impl ScraperConfig {
    /// Minimum spacing between two permitted requests at the steady-state rate.
    pub fn min_request_interval(&self) -> Duration {
        saturating_secs(1.0 / self.requests_per_second)
    }

    pub fn jitter_window(&self) -> (Duration, Duration) {
        (saturating_secs(self.min_delay_secs), saturating_secs(self.max_delay_secs))
    }

    pub fn retry_delay(&self) -> Duration {
        saturating_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-kind override of the fields that count as a change during reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub significant_fields: HashMap<EntityKind, Vec<String>>,
}

/// Optional replacements for the built-in default catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub characters: Option<Vec<String>>,
    pub weapons: Option<Vec<String>>,
    pub artifacts: Option<Vec<String>>,
    pub monsters: Option<Vec<String>>,
}

impl CatalogConfig {
    pub fn override_for(&self, kind: EntityKind) -> Option<&[String]> {
        match kind {
            EntityKind::Character   => self.characters.as_deref(),
            EntityKind::Weapon      => self.weapons.as_deref(),
            EntityKind::ArtifactSet => self.artifacts.as_deref(),
            EntityKind::Monster     => self.monsters.as_deref(),
        }
    }

    fn slot_mut(&mut self, kind: EntityKind) -> &mut Option<Vec<String>> {
        match kind {
            EntityKind::Character   => &mut self.characters,
            EntityKind::Weapon      => &mut self.weapons,
            EntityKind::ArtifactSet => &mut self.artifacts,
            EntityKind::Monster     => &mut self.monsters,
        }
    }
}

/// Env var that replaces the catalog for a kind (comma-separated natural keys).
pub fn catalog_env_var(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Character   => "IRMINSUL_CHARACTERS",
        EntityKind::Weapon      => "IRMINSUL_WEAPONS",
        EntityKind::ArtifactSet => "IRMINSUL_ARTIFACTS",
        EntityKind::Monster     => "IRMINSUL_MONSTERS",
    }
}

mod tests;

impl Config {
    /// Load configuration from irminsul.toml.
    /// Checks IRMINSUL_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("IRMINSUL_CONFIG")
            .unwrap_or_else(|_| "irminsul.toml".to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit path, then apply env overrides and validate.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::NotFound(path.to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides_from(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        let result = match path {
            Some(p) => Self::load_from(p),
            None => Self::load(),
        };
        match result {
            Err(ConfigError::NotFound(missing)) => {
                tracing::warn!(path = %missing, "Config file not found, using defaults");
                let mut config = Self::default();
                config.apply_overrides_from(|name| std::env::var(name).ok());
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies catalog overrides from environment-like lookups.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for kind in EntityKind::ALL {
            if let Some(raw) = lookup(catalog_env_var(kind)) {
                let keys: Vec<String> = raw
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                if !keys.is_empty() {
                    *self.catalog.slot_mut(kind) = Some(keys);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scraper;
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let finite = [
            ("scraper.requests_per_second", s.requests_per_second),
            ("scraper.min_delay_secs", s.min_delay_secs),
            ("scraper.max_delay_secs", s.max_delay_secs),
            ("scraper.retry_delay_secs", s.retry_delay_secs),
            ("scraper.backoff_factor", s.backoff_factor),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} must be a finite number, got {value}"));
        }

        if s.requests_per_second <= 0.0 {
            return invalid(format!("scraper.requests_per_second must be > 0, got {}", s.requests_per_second));
        }
        if s.min_delay_secs < 0.0 || s.max_delay_secs < s.min_delay_secs {
            return invalid(format!(
                "scraper jitter window [{}, {}] must satisfy 0 <= min <= max",
                s.min_delay_secs, s.max_delay_secs
            ));
        }
        if s.max_retries == 0 || s.max_retries > MAX_RETRIES_LIMIT {
            return invalid(format!(
                "scraper.max_retries must be between 1 and {MAX_RETRIES_LIMIT}, got {}",
                s.max_retries
            ));
        }
        if s.retry_delay_secs < 0.0 || s.backoff_factor < 1.0 {
            return invalid("scraper.retry_delay_secs must be >= 0 and backoff_factor >= 1".to_string());
        }
        if s.timeout_secs == 0 {
            return invalid("scraper.timeout_secs must be > 0".to_string());
        }
        if s.max_connections == 0 || s.max_connections_per_host == 0 {
            return invalid("scraper connection limits must be > 0".to_string());
        }
        if s.concurrency == 0 {
            return invalid("scraper.concurrency must be > 0".to_string());
        }
        if s.user_agents.is_empty() {
            return invalid("scraper.user_agents must not be empty".to_string());
        }
        if self.source.base_url.trim().is_empty() {
            return invalid("source.base_url must not be empty".to_string());
        }
        Ok(())
    }
}
