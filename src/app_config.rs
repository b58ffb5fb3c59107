//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with SOCIAL_VIDEO_, sections split by `__`)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like database passwords should be kept in environment variables,
//! not in the config file.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    /// Image shown for videos that have neither a poster nor generated thumbnails.
    /// Relative paths are resolved against `base_url`.
    pub placeholder_image: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Social Video".to_string(),
            base_url: "http://localhost:8080/".to_string(),
            placeholder_image: "static/images/video-placeholder.png".to_string(),
        }
    }
}

impl SiteConfig {
    /// Absolute URL of the placeholder image.
    pub fn placeholder_url(&self) -> String {
        match url::Url::parse(&self.base_url).and_then(|base| base.join(&self.placeholder_image)) {
            Ok(url) => url.to_string(),
            Err(e) => {
                log::warn!(
                    "Could not resolve placeholder image against {}: {}",
                    self.base_url,
                    e
                );
                self.placeholder_image.clone()
            }
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (should be in env var SOCIAL_VIDEO_DATABASE__URL)
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Log every statement sqlx executes
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            min_connections: 1,
            sqlx_logging: false,
        }
    }
}

/// Object cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time to live for every entry in seconds
    pub ttl_seconds: u64,
    pub max_capacity: u64,
    /// Group holding video rows and id-list query results
    pub video_group: String,
    /// Group holding total-count query results. Defaults to `video_group`;
    /// point it elsewhere to keep count entries in their own partition.
    pub count_group: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_capacity: 10_000,
            video_group: "bp_video".to_string(),
            count_group: "bp_video".to_string(),
        }
    }
}

/// Video repository policy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VideoConfig {
    /// Refuse to save videos that are not linked to an activity entry.
    /// Off by default: forum uploads may be saved before their activity exists.
    pub require_activity_id: bool,
    /// Let search terms also match a user slug. Hooks may still override this.
    pub include_user_search: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Local storage path
    pub local_path: String,
    /// Public URL the local path is served under
    pub public_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: "./uploads".to_string(),
            public_url: "http://localhost:8080/uploads/".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub video: VideoConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file (optional) - use from_file for full path support
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables, e.g.
            // SOCIAL_VIDEO_DATABASE__URL, SOCIAL_VIDEO_CACHE__TTL_SECONDS
            .add_source(
                Environment::with_prefix("SOCIAL_VIDEO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        log::info!("Configuration loaded: site.name = {}", config.site.name);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "Social Video");
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert!(!config.video.require_activity_id);
        assert!(!config.video.include_user_search);
    }

    #[test]
    fn test_count_group_shares_video_group_by_default() {
        let config = AppConfig::default();
        assert_eq!(config.cache.count_group, config.cache.video_group);
    }

    #[test]
    fn test_placeholder_url_is_resolved_against_base_url() {
        let site = SiteConfig {
            base_url: "https://videos.example.com/community/".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(
            site.placeholder_url(),
            "https://videos.example.com/community/static/images/video-placeholder.png"
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        // Create a temporary config file
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Test Community"
base_url = "https://test.example.com/"

[cache]
ttl_seconds = 60
count_group = "bp_video_count"

[video]
require_activity_id = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Test Community");
        assert_eq!(config.site.base_url, "https://test.example.com/");
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.cache.count_group, "bp_video_count");
        assert!(config.video.require_activity_id);
        // Defaults should still apply for unspecified values
        assert_eq!(config.cache.video_group, "bp_video");
        assert_eq!(config.storage.local_path, "./uploads");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "Social Video");
        assert_eq!(config.database.max_connections, 10);
    }
}
