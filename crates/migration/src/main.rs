use clap::{Parser, Subcommand};
use sea_orm::Database;
use sea_orm_migration::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "migration")]
#[command(about = "Manage the moneyflow database schema")]
struct Cli {
    /// Connection string; defaults to the local SQLite file the server uses.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./moneyflow.db?mode=rwc"
    )]
    database_url: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Apply pending migrations (default).
    Up,
    /// Roll back the last migration.
    Down,
    /// Drop every table and reapply all migrations.
    Fresh,
    /// List applied and pending migrations.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), DbErr> {
    let cli = Cli::parse();
    let db = Database::connect(&cli.database_url).await?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => migration::Migrator::up(&db, None).await,
        Command::Down => migration::Migrator::down(&db, Some(1)).await,
        Command::Fresh => migration::Migrator::fresh(&db).await,
        Command::Status => migration::Migrator::status(&db).await,
    }
}
