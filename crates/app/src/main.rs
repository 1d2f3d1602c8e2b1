use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use config::ConfigError;
use engine::{Argon2Hasher, AuthManager, AuthSettings, Engine, EngineError};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "moneyflow")]
#[command(about = "Personal income and expense tracker API")]
struct Cli {
    /// Settings file; missing files are skipped.
    #[arg(long, env = "MONEYFLOW_CONFIG", default_value = "settings.toml")]
    config: PathBuf,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("invalid settings: {0}")]
    Settings(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] DbErr),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Connect and migrate, retrying while the database is not reachable yet.
async fn connect(server: &settings::Server) -> Result<DatabaseConnection, DbErr> {
    let attempts = server.connect_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match Database::connect(server.database.url()).await {
            Ok(db) => Migrator::up(&db, None).await.map(|()| db),
            Err(err) => Err(err),
        };
        match result {
            Ok(db) => return Ok(db),
            Err(err) if attempt < attempts => {
                tracing::warn!(
                    "database not ready (attempt {attempt}/{attempts}): {err}; retrying in {}s",
                    server.connect_retry_secs
                );
                tokio::time::sleep(Duration::from_secs(server.connect_retry_secs)).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!("giving up on the database after {attempts} attempts");
                return Err(err);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "moneyflow={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    tracing::info!("Using database {:?}", settings.server.database);
    let db = connect(&settings.server).await?;

    let engine = Engine::builder().database(db).build().await?;
    engine
        .seed_default_categories(&settings.categories.defaults)
        .await?;

    let hasher = Argon2Hasher::new(settings.auth.argon2)?;
    let auth = AuthManager::new(
        engine.clone(),
        hasher,
        &AuthSettings {
            secret: settings.auth.secret.clone(),
            token_ttl: settings.auth.token_ttl()?,
        },
    )?;

    let state = server::ServerState {
        engine: Arc::new(engine),
        auth: Arc::new(auth),
        large_expense_threshold: settings.spending.large_expense_threshold,
    };

    if let Err(err) = server::run(state, &settings.server.bind, settings.server.port).await {
        tracing::error!("server failed: {err}");
        return Err(err.into());
    }
    Ok(())
}
