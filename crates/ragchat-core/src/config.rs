use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

pub const LOCAL_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DOCKER_BASE_URL: &str = "http://0.0.0.0:8000";

/// Deployment environment the backend runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Local,
    Docker,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Docker => "docker",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(Environment::Local),
            "docker" => Some(Environment::Docker),
            _ => None,
        }
    }

    /// Unrecognized names fall back to `Local`.
    pub fn from_name(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            tracing::warn!(environment = s, "unknown environment, using local");
            Environment::Local
        })
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Local => LOCAL_BASE_URL,
            Environment::Docker => DOCKER_BASE_URL,
        }
    }
}

/// Contents of `<config_dir>/ragchat/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub environment: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragchat").join("config.json"))
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub environment: Option<String>,
}

/// Backend endpoint, resolved once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub environment: Environment,
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Local)
    }
}

impl ApiConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.base_url().to_string(),
        }
    }

    /// Resolve from overrides first, then the config file, then defaults.
    pub fn resolve(overrides: &Overrides, file: &Config) -> Self {
        let environment = overrides
            .environment
            .as_deref()
            .or(file.environment.as_deref())
            .map(Environment::from_name)
            .unwrap_or_default();

        let explicit = overrides
            .base_url
            .as_deref()
            .or(file.base_url.as_deref())
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty());

        match explicit {
            Some(url) => Self {
                environment,
                base_url: url.to_string(),
            },
            None => Self::for_environment(environment),
        }
    }

    /// Load the config file (falling back to defaults if unreadable) and resolve.
    pub fn load(overrides: &Overrides) -> Self {
        let file = Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read config file, using defaults");
            Config::new()
        });
        let resolved = Self::resolve(overrides, &file);
        tracing::info!(
            environment = resolved.environment.as_str(),
            base_url = %resolved.base_url,
            "backend endpoint resolved"
        );
        resolved
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
