use dotenvy::dotenv;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url:            String,
    pub db_max_connections:      u32,
    pub db_acquire_timeout_secs: u64,

    // Backend
    pub backend_host:     String,
    pub backend_port:     u16,

    // Access control
    /// Put `/admin/departments*` behind the identity headers and the
    /// super_admin policy. Off by default: those routes are open.
    pub require_provisioning_auth: bool,

    // Seed the super admin at startup
    pub seed_super_admin: bool,

    // App
    pub app_env:          String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
            match env::var(key) {
                Ok(raw) => raw
                    .trim()
                    .parse::<T>()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
                Err(_) => Ok(default),
            }
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let seed_default = app_env == "development";

        Ok(Self {
            database_url:            env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://assessments.db?mode=rwc".into()),
            db_max_connections:      parse_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,

            backend_host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            backend_port: parse_or("BACKEND_PORT", 8080)?,

            require_provisioning_auth: parse_or("REQUIRE_PROVISIONING_AUTH", false)?,
            seed_super_admin:          parse_or("SEED_SUPER_ADMIN", seed_default)?,

            app_env,
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }

    /// Configuration used by the in-process tests: in-memory store, open
    /// provisioning routes.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url:              "sqlite::memory:".into(),
            db_max_connections:        1,
            db_acquire_timeout_secs:   5,
            backend_host:              "127.0.0.1".into(),
            backend_port:              0,
            require_provisioning_auth: false,
            seed_super_admin:          false,
            app_env:                   "test".into(),
        }
    }
}
