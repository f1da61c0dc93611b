//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (NETFIRST_*)
//! 2. TOML config file (if NETFIRST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::GenerationId;
use crate::worker::WorkerConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (NETFIRST_*)
/// 2. TOML config file (if NETFIRST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via NETFIRST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Namespace shared by every cache generation of this application.
    ///
    /// Set via NETFIRST_NAMESPACE environment variable.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Version suffix of the current generation. Bump to force a full refresh.
    ///
    /// Set via NETFIRST_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL of the controlled application.
    ///
    /// Manifest entries and relative request URLs resolve against it, and
    /// only requests under it are intercepted.
    /// Set via NETFIRST_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Core assets cached on install, relative to `scope`.
    ///
    /// Set via NETFIRST_MANIFEST environment variable (`[./,./tracker.html]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Activate right after a successful install.
    ///
    /// Set via NETFIRST_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via NETFIRST_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    ///
    /// Set via NETFIRST_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via NETFIRST_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    ///
    /// Set via NETFIRST_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./netfirst-cache.sqlite")
}

fn default_namespace() -> String {
    "time-tracker-cache".into()
}

fn default_version() -> String {
    "v3".into()
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_manifest() -> Vec<String> {
    vec!["./".into(), "./tracker.html".into(), "./icon-512x512.png".into()]
}

fn default_user_agent() -> String {
    "netfirst/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            namespace: default_namespace(),
            version: default_version(),
            scope: default_scope(),
            manifest: default_manifest(),
            skip_waiting: true,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Identifier of the current cache generation.
    pub fn generation(&self) -> GenerationId {
        GenerationId::new(&self.namespace, &self.version)
    }

    /// Parsed scope URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `scope` is not an absolute URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.scope).map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })
    }

    /// Settings injected into the worker.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig {
            generation: self.generation(),
            scope: self.scope_url()?,
            manifest: self.manifest.clone(),
            skip_waiting: self.skip_waiting,
        })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `NETFIRST_`
    /// 2. TOML file from `NETFIRST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("NETFIRST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("NETFIRST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./netfirst-cache.sqlite"));
        assert_eq!(config.namespace, "time-tracker-cache");
        assert_eq!(config.version, "v3");
        assert_eq!(config.manifest, vec!["./", "./tracker.html", "./icon-512x512.png"]);
        assert!(config.skip_waiting);
        assert_eq!(config.user_agent, "netfirst/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_generation_from_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation().name(), "time-tracker-cache-v3");
    }

    #[test]
    fn test_worker_config() {
        let config = AppConfig { scope: "https://app.example.com/tracker/".into(), ..Default::default() };
        let worker = config.worker_config().unwrap();
        assert_eq!(worker.scope.as_str(), "https://app.example.com/tracker/");
        assert_eq!(worker.manifest.len(), 3);
        assert!(worker.skip_waiting);
    }

    #[test]
    fn test_worker_config_bad_scope() {
        let config = AppConfig { scope: "not a url".into(), ..Default::default() };
        assert!(matches!(config.worker_config(), Err(ConfigError::Invalid { field, .. }) if field == "scope"));
    }

    #[test]
    fn test_load_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "netfirst.toml",
                r#"
                namespace = "shop"
                version = "v1"
                manifest = ["./", "./app.js"]
                "#,
            )?;
            jail.set_env("NETFIRST_CONFIG_FILE", "netfirst.toml");
            jail.set_env("NETFIRST_VERSION", "v2");
            jail.set_env("NETFIRST_SKIP_WAITING", "false");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.namespace, "shop");
            assert_eq!(config.version, "v2");
            assert_eq!(config.manifest, vec!["./", "./app.js"]);
            assert!(!config.skip_waiting);
            assert_eq!(config.generation().name(), "shop-v2");
            Ok(())
        });
    }
}
