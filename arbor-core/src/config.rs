//! Application configuration.
//!
//! [`AppConfig`] can be built in code, parsed from TOML, or read from
//! `ARBOR_*` environment variables (a `.env` file is loaded first).
//!
//! ```
//! use arbor_core::{AppConfig, Mode};
//!
//! let config = AppConfig::new()
//!     .base_path("/api")
//!     .mode(Mode::Production)
//!     .strict_methods(true);
//!
//! assert_eq!(config.base_path, "/api");
//! assert!(!config.warns_late_routes());
//! ```

use crate::pattern::normalize_path;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Prefix of the environment variables read by [`AppConfig::from_env`]
pub const ENV_PREFIX: &str = "ARBOR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Runtime mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Route suggestions on 404, warnings for late routes
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn is_development(&self) -> bool {
        *self == Mode::Development
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            _ => Err(ConfigError::InvalidValue {
                key: "env".into(),
                value: s.to_string(),
            }),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix stripped from every request path before matching.
    /// Empty means no prefix.
    #[serde(deserialize_with = "deserialize_base_path")]
    pub base_path: String,
    pub mode: Mode,
    /// Answer 405 with an `Allow` header instead of 404 when only the
    /// method differs
    pub strict_methods: bool,
    /// Warn about routes registered after `compile()`. Unset follows the mode.
    pub warn_late_routes: Option<bool>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_path(mut self, base_path: impl AsRef<str>) -> Self {
        self.base_path = clean_base_path(base_path.as_ref());
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn strict_methods(mut self, enabled: bool) -> Self {
        self.strict_methods = enabled;
        self
    }

    pub fn warn_late_routes(mut self, enabled: bool) -> Self {
        self.warn_late_routes = Some(enabled);
        self
    }

    pub fn warns_late_routes(&self) -> bool {
        self.warn_late_routes
            .unwrap_or_else(|| self.mode.is_development())
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Read `ARBOR_ENV`, `ARBOR_BASE_PATH`, `ARBOR_STRICT_METHODS` and
    /// `ARBOR_WARN_LATE_ROUTES`, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();
        Self::from_env_map(&EnvLoader::new(Some(ENV_PREFIX.to_string())).load())
    }

    /// Build from already loaded, prefix-stripped, lowercased variables
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(mode) = vars.get("env") {
            config.mode = mode.parse()?;
        }
        if let Some(base_path) = vars.get("base_path") {
            config.base_path = clean_base_path(base_path);
        }
        if let Some(value) = vars.get("strict_methods") {
            config.strict_methods = parse_bool("strict_methods", value)?;
        }
        if let Some(value) = vars.get("warn_late_routes") {
            config.warn_late_routes = Some(parse_bool("warn_late_routes", value)?);
        }
        Ok(config)
    }
}

fn clean_base_path(raw: &str) -> String {
    match normalize_path(raw).as_str() {
        "/" => String::new(),
        path => path.to_string(),
    }
}

fn deserialize_base_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(clean_base_path(&raw))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load matching variables with the prefix stripped and keys lowercased
    pub fn load(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        for (key, value) in env::vars() {
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key
                        .strip_prefix(prefix.as_str())
                        .and_then(|rest| rest.strip_prefix('_'))
                    {
                        vars.insert(rest.to_lowercase(), value);
                    }
                }
                None => {
                    vars.insert(key.to_lowercase(), value);
                }
            }
        }
        vars
    }

    /// Load a single variable, `KEY` becoming `PREFIX_KEY`
    pub fn load_var(&self, key: &str) -> Result<String, ConfigError> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };
        Ok(env::var(full_key)?)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
