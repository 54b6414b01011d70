use clap::{Parser, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Identity service row API (PostgREST)
    Rest,
    /// Direct Postgres connection
    Postgres,
    /// In-process tables, for local development
    Memory,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "merlin-api", version, about = "Merlin identity and records API")]
pub struct Config {
    /// Base URL of the identity & data service
    #[arg(long, env = "SUPABASE_URL")]
    pub ids_url: String,

    /// Project API key sent with every identity service call
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub ids_key: String,

    /// Where per-user records live
    #[arg(long, env = "MERLIN_STORE", value_enum, default_value_t = StoreBackend::Rest)]
    pub store: StoreBackend,

    /// Postgres connection string, required with `--store postgres`
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "MERLIN_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    /// Comma-separated list of allowed browser origins
    #[arg(long, env = "MERLIN_CORS_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("identity service URL '{0}' is not a valid http(s) URL")]
    InvalidIdsUrl(String),
    #[error("identity service key must not be empty")]
    EmptyIdsKey,
    #[error("--store postgres requires DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("invalid listen address {0}")]
    InvalidAddress(String),
}

/// Settings that passed validation.
#[derive(Debug, Clone)]
pub struct Validated {
    pub ids_url: Url,
    pub ids_key: String,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub addr: std::net::SocketAddr,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Reject configuration the server could start with but never serve
    /// a request from.
    pub fn validate(self) -> Result<Validated, ConfigError> {
        let ids_url = Url::parse(self.ids_url.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .ok_or_else(|| ConfigError::InvalidIdsUrl(self.ids_url.clone()))?;

        let ids_key = self.ids_key.trim().to_string();
        if ids_key.is_empty() {
            return Err(ConfigError::EmptyIdsKey);
        }

        let database_url = self
            .database_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if self.store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let addr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))?;

        let cors_origins = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Validated {
            ids_url,
            ids_key,
            store: self.store,
            database_url,
            db_max_connections: self.db_max_connections,
            addr,
            cors_origins,
        })
    }
}
