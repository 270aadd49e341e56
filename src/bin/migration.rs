use clap::{Parser, Subcommand};
use inventory_sales_api::{
    config,
    db::{self, DbConfig},
    migrator::Migrator,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "migration",
    about = "Apply or inspect the inventory database schema",
    version
)]
struct Cli {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back applied migrations
    Down {
        /// Number of migrations to roll back; all when omitted
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Drop every table and reapply all migrations
    Fresh,
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::init_tracing("info", false);

    let database_url = match cli.database_url {
        Some(url) => url,
        None => config::load_config()?.database_url,
    };

    let pool = db::establish_connection_with_config(&DbConfig {
        url: database_url,
        max_connections: 1,
        ..Default::default()
    })
    .await?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => db::run_migrations(&pool).await?,
        Command::Down { steps } => {
            info!(?steps, "Rolling back migrations");
            Migrator::down(&pool, steps).await?;
        }
        Command::Fresh => {
            info!("Dropping all tables and reapplying migrations");
            Migrator::fresh(&pool).await?;
        }
        Command::Status => {
            let applied = Migrator::get_applied_migrations(&pool).await?;
            let pending = Migrator::get_pending_migrations(&pool).await?;
            for migration in &applied {
                println!("applied  {}", migration.name());
            }
            for migration in &pending {
                println!("pending  {}", migration.name());
            }
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
