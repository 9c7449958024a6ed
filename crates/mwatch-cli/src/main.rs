mod accounts;
mod args;
mod ingest;
mod projects;
mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::accounts::AccountCommands;
use crate::projects::ProjectCommands;
use crate::report::AlertsCommands;

#[derive(Debug, Parser)]
#[command(name = "mwatch-cli")]
#[command(about = "mwatch mention monitoring command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Manage monitoring projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Run one ingestion pass for a project
    Ingest {
        #[arg(long)]
        project: Uuid,
        /// Run even if the project is paused
        #[arg(long)]
        force: bool,
        /// Pause the project once the pass completes
        #[arg(long)]
        auto_pause: bool,
    },
    /// Run a single scheduler tick over all due projects
    Tick,
    /// Show dashboard metrics for a project
    Metrics {
        #[arg(long)]
        project: Uuid,
        /// Window start, `YYYY-MM-DD` or RFC 3339
        #[arg(long, value_parser = args::parse_instant)]
        from: Option<chrono::DateTime<chrono::Utc>>,
        /// Window end, `YYYY-MM-DD` or RFC 3339
        #[arg(long, value_parser = args::parse_instant)]
        to: Option<chrono::DateTime<chrono::Utc>>,
    },
    /// List, read and summarize alerts
    Alerts {
        #[command(subcommand)]
        command: AlertsCommands,
    },
    /// Show connector health and recent audit entries for a project
    Health {
        #[arg(long)]
        project: Uuid,
        /// Audit entries to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
    /// Show monthly mention usage for an account
    Usage {
        #[arg(long)]
        account: Uuid,
        /// Month as `YYYY-MM` (defaults to the current UTC month)
        #[arg(long, value_parser = args::parse_month)]
        month: Option<String>,
    },
    /// List registered connectors in run order
    Connectors,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("mwatch-cli: no command given; see --help");
        return Ok(());
    };

    let config = mwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Connectors => report::run_connectors(&config),
        command => run_with_pool(&config, command).await,
    }
}

async fn run_with_pool(config: &mwatch_core::AppConfig, command: Commands) -> anyhow::Result<()> {
    let pool_config = mwatch_db::PoolConfig::from_app_config(config);
    let pool = mwatch_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                mwatch_db::ping(&pool).await?;
                println!("database reachable");
            }
            DbCommands::Migrate => {
                let applied = mwatch_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Account { command } => accounts::run(&pool, command).await?,
        Commands::Project { command } => projects::run(&pool, command).await?,
        Commands::Ingest {
            project,
            force,
            auto_pause,
        } => ingest::run_ingest(config, &pool, project, force, auto_pause).await?,
        Commands::Tick => ingest::run_tick(config, &pool).await?,
        Commands::Metrics { project, from, to } => {
            report::run_metrics(&pool, project, from, to).await?;
        }
        Commands::Alerts { command } => report::run_alerts(&pool, command).await?,
        Commands::Health { project, limit } => report::run_health(&pool, project, limit).await?,
        Commands::Usage { account, month } => {
            report::run_usage(&pool, account, month.as_deref()).await?;
        }
        Commands::Connectors => report::run_connectors(config)?,
    }

    pool.close().await;
    Ok(())
}
