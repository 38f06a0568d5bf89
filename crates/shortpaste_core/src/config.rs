//! Configuration loading from a JSON file and environment variables.

use crate::constants::*;
use crate::error::AppError;
use crate::keygen::{KeyGenerator, KeyGeneratorKind};
use crate::ratelimit::RateLimitRule;
use crate::storage::StorageKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for shortpaste.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Length of keys assigned to regular documents.
    pub key_length: usize,
    /// Length of keys assigned to URL aliases.
    pub url_key_length: usize,
    pub max_document_length: usize,
    pub max_key_attempts: usize,
    pub key_generator: GeneratorConfig,
    pub url_key_generator: GeneratorConfig,
    pub rate_limits: RateLimitConfig,
    pub storage: StorageConfig,
    /// Static documents loaded at startup, keyed by their fixed key.
    pub documents: BTreeMap<String, PathBuf>,
    /// Take the client identity from `X-Forwarded-For`.
    pub trust_proxy: bool,
}

/// Key generator selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "type")]
    pub kind: KeyGeneratorKind,
}

/// Rate-limit categories by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub categories: BTreeMap<String, RateLimitRule>,
}

/// Storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: StorageKind,
    /// Upper bound on one storage call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORAGE_PATH),
            kind: StorageKind::File,
            timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            NORMAL_CATEGORY.to_string(),
            RateLimitRule {
                total_requests: DEFAULT_NORMAL_TOTAL_REQUESTS,
                every: DEFAULT_NORMAL_EVERY_MS,
            },
        );
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            key_length: DEFAULT_KEY_LENGTH,
            url_key_length: DEFAULT_URL_KEY_LENGTH,
            max_document_length: DEFAULT_MAX_DOCUMENT_LENGTH,
            max_key_attempts: DEFAULT_MAX_KEY_ATTEMPTS,
            key_generator: GeneratorConfig {
                kind: KeyGeneratorKind::Phonetic,
            },
            url_key_generator: GeneratorConfig {
                kind: KeyGeneratorKind::Random,
            },
            rate_limits: RateLimitConfig { categories },
            storage: StorageConfig::default(),
            documents: BTreeMap::new(),
            trust_proxy: false,
        }
    }
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: PathBuf) -> PathBuf {
    let Some(rest) = path.to_str().and_then(|p| p.strip_prefix("~/")) else {
        return path;
    };
    match resolve_home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}

fn resolve_home_dir() -> Option<PathBuf> {
    // HOME on Unix, USERPROFILE on Windows
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{}='{}' is not a valid value", name, value)))
}

impl Config {
    /// Load configuration from `SHORTPASTE_CONFIG` (if set) and the environment.
    ///
    /// # Returns
    /// A validated [`Config`].
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the file cannot be read or parsed, an
    /// override is malformed, or validation fails.
    pub fn load() -> Result<Self, AppError> {
        let file_contents = match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                let path = expand_tilde(PathBuf::from(path.trim()));
                let contents = std::fs::read_to_string(&path).map_err(|err| {
                    AppError::Config(format!("cannot read {}: {}", path.display(), err))
                })?;
                tracing::info!("Loaded configuration from {}", path.display());
                Some(contents)
            }
            _ => None,
        };
        Self::from_sources(file_contents.as_deref(), |name| env::var(name).ok())
    }

    /// Build configuration from optional JSON text and an env lookup.
    ///
    /// # Arguments
    /// - `file_contents`: JSON configuration; defaults apply to missing fields.
    /// - `lookup`: Environment lookup used for overrides.
    ///
    /// # Errors
    /// Same as [`Config::load`].
    pub fn from_sources<F>(file_contents: Option<&str>, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match file_contents {
            Some(text) => serde_json::from_str(text)
                .map_err(|err| AppError::Config(format!("invalid configuration: {}", err)))?,
            None => Config::default(),
        };
        config.apply_overrides(lookup)?;
        config.storage.path = expand_tilde(config.storage.path);
        config.documents = config
            .documents
            .into_iter()
            .map(|(name, path)| (name, expand_tilde(path)))
            .collect();
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            self.host = host.trim().to_string();
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_env("PORT", &port)?;
        }
        if let Some(path) = lookup("STORAGE_PATH").filter(|v| !v.trim().is_empty()) {
            self.storage.path = PathBuf::from(path.trim());
        }
        if let Some(kind) = lookup("STORAGE_TYPE") {
            self.storage.kind = kind.parse().map_err(AppError::Config)?;
        }
        if let Some(length) = lookup("KEY_LENGTH") {
            self.key_length = parse_env("KEY_LENGTH", &length)?;
        }
        if let Some(length) = lookup("URL_KEY_LENGTH") {
            self.url_key_length = parse_env("URL_KEY_LENGTH", &length)?;
        }
        if let Some(max) = lookup("MAX_DOCUMENT_LENGTH") {
            self.max_document_length = parse_env("MAX_DOCUMENT_LENGTH", &max)?;
        }
        if let Some(flag) = lookup("TRUST_PROXY") {
            self.trust_proxy = parse_env_flag(&flag).ok_or_else(|| {
                AppError::Config(format!("TRUST_PROXY='{}' is not a boolean", flag))
            })?;
        }
        Ok(())
    }

    /// Reject configurations the store cannot operate with.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("keyLength", self.key_length),
            ("urlKeyLength", self.url_key_length),
            ("maxDocumentLength", self.max_document_length),
            ("maxKeyAttempts", self.max_key_attempts),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::Config(format!("{} must be at least 1", name)));
        }
        if self.storage.timeout_ms == 0 {
            return Err(AppError::Config(
                "storage.timeoutMs must be at least 1".to_string(),
            ));
        }
        for (name, rule) in &self.rate_limits.categories {
            if rule.total_requests == 0 || rule.every == 0 {
                return Err(AppError::Config(format!(
                    "rateLimits.categories.{} needs totalRequests and every above 0",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Generator for regular document keys.
    pub fn content_keys(&self) -> KeyGenerator {
        KeyGenerator::new(self.key_generator.kind, self.key_length)
    }

    /// Generator for URL alias keys.
    pub fn url_keys(&self) -> KeyGenerator {
        KeyGenerator::new(self.url_key_generator.kind, self.url_key_length)
    }

    /// Storage call timeout.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.timeout_ms)
    }
}
