//! Account command handlers.

use clap::Subcommand;
use mwatch_core::{plan_limits, Account, DEFAULT_PLAN};
use uuid::Uuid;

/// Sub-commands available under `account`.
#[derive(Debug, Subcommand)]
pub enum AccountCommands {
    /// Create an account, or update it when `--id` already exists
    Upsert {
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Plan name (individual, team, pro)
        #[arg(long, default_value = DEFAULT_PLAN)]
        plan: String,
        /// Opt the account out of alert emails
        #[arg(long)]
        no_email_alerts: bool,
    },
    /// Show an account and its plan limits
    Show {
        #[arg(long)]
        id: Uuid,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: AccountCommands) -> anyhow::Result<()> {
    match command {
        AccountCommands::Upsert {
            id,
            email,
            name,
            plan,
            no_email_alerts,
        } => {
            let account = Account {
                id: id.unwrap_or_else(Uuid::new_v4),
                email,
                full_name: name,
                plan,
                email_alerts_enabled: !no_email_alerts,
            };
            let row = mwatch_db::upsert_account(pool, &account).await?;
            println!("account {} ({}) on plan {}", row.id, row.email, row.plan);
        }
        AccountCommands::Show { id } => {
            let row = mwatch_db::get_account(pool, id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("account {id} not found"))?;
            let limits = plan_limits(&row.plan);
            println!("id:            {}", row.id);
            println!("email:         {}", row.email);
            println!("name:          {}", row.full_name);
            println!("plan:          {}", row.plan);
            println!("email alerts:  {}", row.email_alerts_enabled);
            println!(
                "limits:        {} keywords, {} mentions/month, every {}+ min",
                limits.keyword_limit, limits.mentions_per_month, limits.min_interval_minutes
            );
        }
    }
    Ok(())
}
