use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Which document store backs the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// trace | debug | info | warn | error
    pub level: String,
}

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "postgres://localhost/backoffice";
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_MAX_CONNECTIONS,
            },
            store: StoreConfig {
                backend: StoreBackend::Postgres,
            },
            log: LogConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then `backoffice.toml` (optional),
    /// then `BACKOFFICE__SECTION__KEY` environment variables. The plain
    /// `DATABASE_URL`, `SERVER_HOST` and `SERVER_PORT` variables win last.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("backoffice")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )?
            .set_default("store.backend", "postgres")?
            .set_default("log.level", defaults.log.level)?
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("BACKOFFICE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option(
                "server.port",
                std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse::<i64>().ok()),
            )?
            .build()?;

        settings.try_deserialize()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Maps the configured level name onto a tracing level, falling back to INFO.
    pub fn tracing_level(&self) -> tracing::Level {
        self.log
            .level
            .trim()
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_postgres() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.store.backend, StoreBackend::Postgres);
        assert_eq!(cfg.database.max_connections, 20);
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let mut cfg = AppConfig::default();
        cfg.log.level = "loud".to_string();
        assert_eq!(cfg.tracing_level(), tracing::Level::INFO);
        cfg.log.level = "debug".to_string();
        assert_eq!(cfg.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn store_backend_deserializes_lowercase() {
        let backend: StoreBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(backend, StoreBackend::Memory);
    }
}
