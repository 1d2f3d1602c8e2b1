//! Application settings.
//!
//! Values come from an optional `settings.toml` (see `--config`) and are
//! overridden by `MONEYFLOW__*` environment variables, e.g.
//! `MONEYFLOW__AUTH__SECRET`.

use std::path::Path;

use chrono::TimeDelta;
use config::{Config, ConfigError, Environment, File};
use engine::Argon2Settings;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    /// Any connection string sea-orm understands.
    Url(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
            Database::Url(url) => url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
    /// Connection attempts at startup before giving up.
    pub connect_attempts: u32,
    pub connect_retry_secs: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            database: Database::Sqlite("moneyflow.db".to_string()),
            connect_attempts: 10,
            connect_retry_secs: 2,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default)]
    pub argon2: Argon2Settings,
}

fn default_token_ttl_minutes() -> i64 {
    60
}

impl Auth {
    /// Token lifetime; must be a positive number of minutes chrono can hold.
    pub fn token_ttl(&self) -> Result<TimeDelta, ConfigError> {
        TimeDelta::try_minutes(self.token_ttl_minutes)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "auth.token_ttl_minutes out of range: {}",
                    self.token_ttl_minutes
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Categories {
    pub defaults: Vec<String>,
}

impl Default for Categories {
    fn default() -> Self {
        let defaults = [
            "Food & Dining",
            "Groceries",
            "Transport",
            "Shopping",
            "Bills & Utilities",
            "Entertainment",
            "Health & Medical",
            "Education",
            "Travel",
            "Gifts",
            "Personal Care",
            "Subscriptions",
            "Insurance",
            "Savings",
            "Other",
        ];
        Self {
            defaults: defaults.into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Spending {
    pub large_expense_threshold: Decimal,
}

impl Default for Spending {
    fn default() -> Self {
        Self {
            large_expense_threshold: Decimal::new(500, 0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub auth: Auth,
    #[serde(default)]
    pub categories: Categories,
    #[serde(default)]
    pub spending: Spending,
}

impl Settings {
    /// Load `path` (if it exists) and the environment on top of it.
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("MONEYFLOW").separator("__"))
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        if settings.auth.secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.secret must not be empty".to_string()));
        }
        settings.auth.token_ttl()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let settings = from_toml("[auth]\nsecret = \"s3cret\"\n").unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.server.connect_attempts, 10);
        assert_eq!(settings.server.connect_retry_secs, 2);
        assert_eq!(settings.auth.token_ttl_minutes, 60);
        assert_eq!(settings.auth.argon2.memory_kib, 65536);
        assert_eq!(settings.categories.defaults.len(), 15);
        assert_eq!(settings.spending.large_expense_threshold, Decimal::new(500, 0));
        assert_eq!(
            settings.server.database.url(),
            "sqlite:moneyflow.db?mode=rwc"
        );
    }

    #[test]
    fn database_variants() {
        let settings = from_toml(
            "[auth]\nsecret = \"x\"\n[server]\nport = 9000\ndatabase = \"memory\"\n",
        )
        .unwrap();
        assert_eq!(settings.server.database.url(), "sqlite::memory:");

        let settings = from_toml(
            "[auth]\nsecret = \"x\"\n[server.database]\nurl = \"postgres://localhost/money\"\n",
        )
        .unwrap();
        assert_eq!(settings.server.database.url(), "postgres://localhost/money");
    }

    #[test]
    fn token_ttl_must_be_positive_and_in_range() {
        let ttl = |minutes: i64| {
            from_toml(&format!(
                "[auth]\nsecret = \"x\"\ntoken_ttl_minutes = {minutes}\n"
            ))
            .unwrap()
            .auth
            .token_ttl()
        };
        assert_eq!(ttl(90).unwrap(), TimeDelta::minutes(90));
        assert!(ttl(0).is_err());
        assert!(ttl(-5).is_err());
        assert!(ttl(i64::MAX).is_err());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(from_toml("[app]\nlevel = \"debug\"\n").is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "moneyflow-settings-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[auth]\nsecret = \"  \"\n").unwrap();
        let result = Settings::new(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
