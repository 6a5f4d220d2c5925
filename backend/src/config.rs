//! Configuration management for the Butcher Shop Ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with BUTCHER__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Activity log configuration
    pub activity: ActivityConfig,

    /// First-start seeding
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Directory receiving backup copies
    pub backup_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivityConfig {
    /// File receiving audit entries the database refused
    pub fallback_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    /// Password given to the `admin` account on first start
    pub admin_password: String,

    /// Insert default categories and starter cuts on first start
    pub seed_catalog: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("BUTCHER__ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("database.path", "butcher.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.backup_dir", "backups")?
            .set_default("jwt.secret", "development-secret-key")?
            .set_default("jwt.access_token_expiry", 43200)?
            .set_default("activity.fallback_path", "activity_fallback.log")?
            .set_default("bootstrap.admin_password", "admin123")?
            .set_default("bootstrap.seed_catalog", true)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (BUTCHER__ prefix)
            .add_source(
                Environment::with_prefix("BUTCHER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration for tests and tools, rooted at `dir`
    pub fn for_directory(dir: &std::path::Path) -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                path: dir.join("butcher.db").to_string_lossy().into_owned(),
                max_connections: 5,
                backup_dir: dir.join("backups").to_string_lossy().into_owned(),
            },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                access_token_expiry: 3600,
            },
            activity: ActivityConfig {
                fallback_path: dir
                    .join("activity_fallback.log")
                    .to_string_lossy()
                    .into_owned(),
            },
            bootstrap: BootstrapConfig {
                admin_password: "admin123".to_string(),
                seed_catalog: true,
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
        }
    }
}
