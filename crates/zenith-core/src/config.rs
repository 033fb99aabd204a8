//! # Configuration
//!
//! Loads the configuration for the active environment and exposes it as a [`Config`]
//! value, which the orchestrator registers as the reserved `zenith:config` orb.
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. `<root>/config/default.toml`, when present
//! 2. `<root>/config/<environment>.toml`, which must exist
//! 3. Environment variables prefixed with `ZENITH_`, `__` separating nested keys
//!    (`ZENITH_HEARTBEAT__INTERVAL_MS=250` sets `heartbeat.interval_ms`).
//!    [`ENVIRONMENT_VAR`] and [`ROOT_VAR`] select the process setup and are not
//!    configuration keys.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::value::Dict;
use figment::Figment;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Result, ZenithError};

/// Type tag carried by typed configuration orbs.
pub const ORB_TYPE_CONFIG: &str = "config";

/// Variable selecting the environment.
pub const ENVIRONMENT_VAR: &str = "ZENITH_ENV";

pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Variable an embedding binary may read to locate its application root.
pub const ROOT_VAR: &str = "ZENITH_ROOT";

pub const DEFAULT_ENV_PREFIX: &str = "ZENITH_";

const CONFIG_DIR: &str = "config";
const BASE_FILE: &str = "default.toml";

/// Prefix-stripped variable names skipped by the environment layer.
const PROCESS_KEYS: [&str; 2] = ["env", "root"];

/// Environment named by [`ENVIRONMENT_VAR`], or [`DEFAULT_ENVIRONMENT`].
pub fn active_environment() -> String {
    std::env::var(ENVIRONMENT_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// Configuration for one environment.
#[derive(Clone)]
pub struct Config {
    environment: String,
    figment: Figment,
}

impl Config {
    pub fn from_figment(environment: impl Into<String>, figment: Figment) -> Self {
        Self {
            environment: environment.into(),
            figment,
        }
    }

    /// Builds a config from an inline TOML document.
    pub fn from_toml_str(environment: impl Into<String>, toml: &str) -> Self {
        Self::from_figment(environment, Figment::from(Toml::string(toml)))
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Deserializes the value at a dotted key.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.figment
            .extract_inner(key)
            .map_err(|e| ZenithError::configuration(&self.environment, e))
    }

    /// Like [`Config::get`], but a missing key yields `default`.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        if self.contains(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.figment.contains(key)
    }

    pub fn figment(&self) -> &Figment {
        &self.figment
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Resolves `<root>/config/<environment>.toml` into a [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root_dir.join(CONFIG_DIR)
    }

    pub async fn load_config(&self, environment: &str) -> Result<Config> {
        let dir = self.config_dir();
        let env_file = dir.join(format!("{environment}.toml"));
        if !file_exists(&env_file).await {
            return Err(ZenithError::configuration(
                environment,
                format!("{} not found", env_file.display()),
            ));
        }

        let mut figment = Figment::new();
        let base = dir.join(BASE_FILE);
        if base != env_file && file_exists(&base).await {
            debug!(file = %base.display(), "Merging base configuration");
            figment = figment.merge(Toml::file(&base));
        }
        figment = figment
            .merge(Toml::file(&env_file))
            .merge(Env::prefixed(&self.env_prefix).split("__").ignore(&PROCESS_KEYS));

        // Providers are lazy; extracting once surfaces parse errors now.
        figment
            .extract::<Dict>()
            .map_err(|e| ZenithError::configuration(environment, e))?;

        info!(environment, file = %env_file.display(), "Configuration loaded");
        Ok(Config::from_figment(environment, figment))
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
