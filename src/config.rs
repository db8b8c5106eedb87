use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default location of the optional TOML file; override with
/// `SUBSCRIPTIONS_CONFIG`.
pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub db: DbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Server-side cap on a single statement, 0 disables it.
    pub statement_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            database: "subscriptions".to_string(),
            url: None,
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            statement_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load `.env` if present, then extract the layered configuration.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::figment().extract()?)
    }

    /// Defaults, then the TOML file, then `POSTGRES_*` variables, then
    /// `SUBSCRIPTIONS__SECTION__KEY` variables. Later layers win.
    pub fn figment() -> Figment {
        let file = std::env::var("SUBSCRIPTIONS_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("POSTGRES_").map(|key| format!("db.{key}").into()))
            .merge(Env::prefixed("SUBSCRIPTIONS__").split("__"))
    }
}
