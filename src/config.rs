use crate::error::Result;
use crate::models::{AmbiguityPolicy, DuplicatePolicy};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...`, or `memory://` for a dry-run store
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

/// Import pipeline defaults, overridable per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub ambiguity_policy: AmbiguityPolicy,
    pub default_tax_rate: u32,
    pub invoice_status: String,
    pub home_country: String,
}

/// Display limits for long result lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub max_warnings: usize,
    pub max_errors: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Skip,
            ambiguity_policy: AmbiguityPolicy::FirstCandidate,
            default_tax_rate: 19,
            invoice_status: "paid".to_string(),
            home_country: "DE".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100,
            max_errors: 20,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/reconcile".to_string(),
                max_connections: 20,
                run_migrations: true,
            },
            import: ImportConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional config file, then `RECONCILE__*` variables.
    /// `DATABASE_URL`, `SERVER_HOST` and `SERVER_PORT` still win.
    pub fn from_env() -> Result<Self> {
        let file =
            std::env::var("RECONCILE_CONFIG").unwrap_or_else(|_| "config/default".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(&file).required(false))
            .add_source(
                Environment::with_prefix("RECONCILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_scheme_selects_in_process_store() {
        let mut cfg = AppConfig::default();
        assert!(!cfg.database.is_memory());
        cfg.database.url = "memory://".to_string();
        assert!(cfg.database.is_memory());
    }

    #[test]
    fn defaults_match_home_jurisdiction() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.import.default_tax_rate, 19);
        assert_eq!(cfg.import.duplicate_policy, DuplicatePolicy::Skip);
        assert_eq!(cfg.report.max_errors, 20);
    }
}
