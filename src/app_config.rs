//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with CANVASS_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the database URL stay in environment variables, not in the
//! config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Canvass".to_string(),
            description: "A survey platform built in Rust".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Content limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum length of a free-text answer
    pub max_answer_length: u32,
    /// Maximum number of options attachable to one question
    pub max_options_per_question: u32,
    /// Page size for audit log listings
    pub audit_page_size: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_answer_length: 50000,
            max_options_per_question: 50,
            audit_page_size: 50,
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Disable to stop writing audit rows entirely
    pub enabled: bool,
    /// Record the client IP address on audit rows
    pub record_ip: bool,
    /// Record the User-Agent header on audit rows
    pub record_user_agent: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            record_ip: true,
            record_user_agent: true,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub limits: LimitsConfig,
    pub audit: AuditConfig,
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
            // Add config file (optional)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables (CANVASS_ prefix)
            // e.g., CANVASS_SITE_NAME, CANVASS_AUDIT_ENABLED
            .add_source(
                Environment::with_prefix("CANVASS")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reload configuration from file
    pub fn reload() -> Result<(), ConfigError> {
        let new_config = Self::load()?;
        if let Ok(mut config) = APP_CONFIG.write() {
            *config = new_config;
            log::info!("Configuration reloaded");
        }
        Ok(())
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = APP_CONFIG.read().unwrap();
    log::info!("Configuration loaded: site.name = {}", config.site.name);
}

// Convenience functions for accessing global config

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get site configuration
pub fn site() -> SiteConfig {
    get_config().site
}

/// Get limits configuration
pub fn limits() -> LimitsConfig {
    get_config().limits
}

/// Get audit configuration
pub fn audit() -> AuditConfig {
    get_config().audit
}
