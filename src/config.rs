//! Configuration module for filevault.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, VaultError};

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Base URL under which uploaded files are publicly reachable.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8080
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_jwt_access_expiry() -> u64 {
    72 * 60 * 60 // 72 hours
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            public_base_url: default_public_base_url(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (e.g. `sqlite://data/filevault.db` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://data/filevault.db".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_db_max_connections(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory where uploaded blobs are written.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// URL path prefix under which the upload directory is served.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Only the owner may mint a share link for a file.
    #[serde(default)]
    pub share_requires_owner: bool,
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize) * 1024 * 1024
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            public_prefix: default_public_prefix(),
            max_upload_size_mb: default_max_upload_size(),
            share_requires_owner: false,
        }
    }
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// No cache; every read goes to the database.
    None,
    /// In-process cache.
    #[default]
    Memory,
    /// Redis server.
    Redis,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Redis connection URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Redis password, merged into `redis_url` when set.
    #[serde(default)]
    pub redis_password: Option<String>,
    /// TTL of cached share URLs in seconds.
    #[serde(default = "default_share_ttl")]
    pub share_ttl_secs: u64,
    /// TTL of cached per-owner listings in seconds (unset = no expiry).
    #[serde(default)]
    pub listing_ttl_secs: Option<u64>,
}

fn default_share_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            redis_password: None,
            share_ttl_secs: default_share_ttl(),
            listing_ttl_secs: None,
        }
    }
}

/// Expiry sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Whether the sweeper runs at all.
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,
    /// Interval between sweep cycles in seconds.
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweeper_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filevault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VaultError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables (first non-empty wins):
    /// - `FILEVAULT_JWT_SECRET`, `JWT_SECRET_KEY`: JWT secret key
    /// - `DATABASE_URL`, `DB_CONNECTION_STRING`: database URL
    /// - `REDIS_URL`: Redis URL (also selects the redis backend)
    /// - `REDIS_PASSWORD`: Redis password
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = first_env(&["FILEVAULT_JWT_SECRET", "JWT_SECRET_KEY"]) {
            self.web.jwt_secret = secret;
        }
        if let Some(url) = first_env(&["DATABASE_URL", "DB_CONNECTION_STRING"]) {
            self.database.url = url;
        }
        if let Some(url) = first_env(&["REDIS_URL"]) {
            self.cache.redis_url = Some(url);
            self.cache.backend = CacheBackend::Redis;
        }
        if let Some(password) = first_env(&["REDIS_PASSWORD"]) {
            self.cache.redis_password = Some(password);
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - JWT secret is not set
    /// - Redis backend is selected without a URL
    /// - the public prefix is `/` or not an absolute path
    /// - the sweep interval is zero
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(VaultError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FILEVAULT_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            return Err(VaultError::Config(
                "cache backend is redis but redis_url is not set".to_string(),
            ));
        }
        let prefix = self.files.public_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') || prefix.len() < 2 {
            return Err(VaultError::Config(format!(
                "files.public_prefix must be a non-root path starting with '/': {:?}",
                self.files.public_prefix
            )));
        }
        if self.sweeper.interval_secs == 0 {
            return Err(VaultError::Config(
                "sweeper.interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.public_base_url, "http://localhost:8080");
        assert!(config.web.cors_origins.is_empty());
        assert!(config.web.jwt_secret.is_empty());
        assert_eq!(config.web.jwt_access_token_expiry_secs, 259200);

        assert_eq!(config.database.url, "sqlite://data/filevault.db");
        assert_eq!(config.database.max_connections, 5);

        assert_eq!(config.files.upload_dir, "uploads");
        assert_eq!(config.files.public_prefix, "/uploads");
        assert_eq!(config.files.max_upload_size_mb, 10);
        assert_eq!(config.files.max_upload_bytes(), 10 * 1024 * 1024);
        assert!(!config.files.share_requires_owner);

        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.share_ttl_secs, 3600);
        assert!(config.cache.listing_ttl_secs.is_none());

        assert!(config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_secs, 3600);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/filevault.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[web]
host = "127.0.0.1"
port = 3000
public_base_url = "https://files.example.com"
cors_origins = ["http://localhost:5173"]
jwt_secret = "test-secret-key"
jwt_access_token_expiry_secs = 600

[database]
url = "postgres://vault@localhost/vault"
max_connections = 20

[files]
upload_dir = "/var/lib/filevault"
public_prefix = "/files"
max_upload_size_mb = 50
share_requires_owner = true

[cache]
backend = "redis"
redis_url = "redis://localhost:6379"
share_ttl_secs = 60
listing_ttl_secs = 300

[sweeper]
enabled = false
interval_secs = 120

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.web.public_base_url, "https://files.example.com");
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.web.jwt_secret, "test-secret-key");
        assert_eq!(config.web.jwt_access_token_expiry_secs, 600);
        assert_eq!(config.database.url, "postgres://vault@localhost/vault");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.files.upload_dir, "/var/lib/filevault");
        assert_eq!(config.files.public_prefix, "/files");
        assert_eq!(config.files.max_upload_size_mb, 50);
        assert!(config.files.share_requires_owner);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(
            config.cache.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
        assert_eq!(config.cache.share_ttl_secs, 60);
        assert_eq!(config.cache.listing_ttl_secs, Some(300));
        assert!(!config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_secs, 120);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[web]
port = 9000

[cache]
backend = "none"
"#;

        let config = Config::parse(toml).unwrap();

        // Specified values
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.cache.backend, CacheBackend::None);

        // Default values
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.cache.share_ttl_secs, 3600);
        assert_eq!(config.files.upload_dir, "uploads");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.web.port, 8080);
        assert_eq!(config.sweeper.interval_secs, 3600);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(VaultError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_cache_backend() {
        let result = Config::parse("[cache]\nbackend = \"memcached\"\n");
        assert!(matches!(result, Err(VaultError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");

        assert!(result.is_err());
        assert!(matches!(result, Err(VaultError::Io(_))));
    }

    #[test]
    fn test_apply_env_overrides_jwt_secret() {
        let original = std::env::var("FILEVAULT_JWT_SECRET").ok();

        std::env::set_var("FILEVAULT_JWT_SECRET", "env-secret-key");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.web.jwt_secret, "env-secret-key");

        if let Some(val) = original {
            std::env::set_var("FILEVAULT_JWT_SECRET", val);
        } else {
            std::env::remove_var("FILEVAULT_JWT_SECRET");
        }
    }

    #[test]
    fn test_apply_env_overrides_redis_password_ignores_empty() {
        let original = std::env::var("REDIS_PASSWORD").ok();

        std::env::set_var("REDIS_PASSWORD", "");

        let mut config = Config::default();
        config.cache.redis_password = Some("original".to_string());
        config.apply_env_overrides();

        // Should not override with empty string
        assert_eq!(config.cache.redis_password.as_deref(), Some("original"));

        if let Some(val) = original {
            std::env::set_var("REDIS_PASSWORD", val);
        } else {
            std::env::remove_var("REDIS_PASSWORD");
        }
    }

    #[test]
    fn test_validate_no_secret() {
        let config = Config::default();

        let result = config.validate();
        assert!(result.is_err());
        if let Err(VaultError::Config(msg)) = result {
            assert!(msg.contains("jwt_secret"));
        }
    }

    #[test]
    fn test_validate_public_prefix() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();

        config.files.public_prefix = "/".to_string();
        assert!(config.validate().is_err());

        config.files.public_prefix = "uploads".to_string();
        assert!(config.validate().is_err());

        config.files.public_prefix = "/uploads/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_redis_without_url() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.cache.backend = CacheBackend::Redis;

        assert!(config.validate().is_err());

        config.cache.redis_url = Some("redis://localhost".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.sweeper.interval_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();

        assert!(config.validate().is_ok());
    }
}
