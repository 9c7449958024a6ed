//! Read-only query handlers: metrics, alerts, connector health, usage and
//! the connector catalogue.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use mwatch_core::{month_key, plan_limits};
use mwatch_sources::{default_registry, SourcesConfig};
use uuid::Uuid;

/// Sub-commands available under `alerts`.
#[derive(Debug, Subcommand)]
pub enum AlertsCommands {
    /// List recent alerts for an account, newest first
    List {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        project: Option<Uuid>,
        /// Only alerts not yet marked read
        #[arg(long)]
        unread: bool,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Mark an alert as read
    Read {
        #[arg(long)]
        id: Uuid,
    },
    /// Alert counts for the last day and week
    Stats {
        #[arg(long)]
        account: Uuid,
    },
}

fn fmt_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Print the dashboard summary for a project.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_metrics(
    pool: &sqlx::PgPool,
    project_id: Uuid,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let metrics = mwatch_db::project_metrics(pool, project_id, from, to).await?;

    println!("total mentions: {}", metrics.total_mentions);
    if metrics.total_mentions == 0 {
        return Ok(());
    }

    println!("\nvolume by day:");
    for day in &metrics.volume {
        println!("  {}  {}", day.day.format("%Y-%m-%d"), day.count);
    }
    for (title, counts) in [
        ("sentiment", &metrics.sentiment_share),
        ("top sources", &metrics.top_sources),
        ("top authors", &metrics.top_authors),
    ] {
        println!("\n{title}:");
        for entry in counts {
            println!("  {:<30}{}", entry.label, entry.count);
        }
    }
    Ok(())
}

/// Dispatch an `alerts` sub-command.
///
/// # Errors
///
/// Returns an error if the database query fails or the alert to mark read
/// does not exist (or is already read).
pub(crate) async fn run_alerts(pool: &sqlx::PgPool, command: AlertsCommands) -> anyhow::Result<()> {
    match command {
        AlertsCommands::List {
            account,
            project,
            unread,
            limit,
        } => {
            let alerts = mwatch_db::list_alerts(pool, account, project, unread, limit).await?;
            if alerts.is_empty() {
                println!("no alerts found");
                return Ok(());
            }
            println!(
                "{:<38}{:<18}{:<20}{:<6}MESSAGE",
                "ID", "CREATED", "TYPE", "READ"
            );
            for alert in &alerts {
                println!(
                    "{:<38}{:<18}{:<20}{:<6}{}",
                    alert.id.to_string(),
                    fmt_time(alert.created_at),
                    alert.alert_type.as_str(),
                    if alert.read_at.is_some() { "yes" } else { "no" },
                    alert.message
                );
            }
        }
        AlertsCommands::Read { id } => match mwatch_db::mark_alert_read(pool, id, Utc::now()).await
        {
            Ok(()) => println!("marked alert {id} read"),
            Err(mwatch_db::DbError::NotFound) => {
                anyhow::bail!("alert {id} not found or already read")
            }
            Err(e) => return Err(e.into()),
        },
        AlertsCommands::Stats { account } => {
            let stats = mwatch_db::alert_stats(pool, account, Utc::now()).await?;
            println!("last 24h:  {}", stats.today);
            println!("last 7d:   {}", stats.this_week);
            println!("unread:    {}", stats.unread);
            if !stats.by_type.is_empty() {
                println!("\nby type (7d):");
                for (alert_type, count) in &stats.by_type {
                    println!("  {alert_type:<24}{count}");
                }
            }
        }
    }
    Ok(())
}

/// Print per-connector health and the most recent audit entries.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_health(
    pool: &sqlx::PgPool,
    project_id: Uuid,
    limit: i64,
) -> anyhow::Result<()> {
    let health = mwatch_db::list_connector_health(pool, project_id).await?;
    if health.is_empty() {
        println!("no connector health recorded yet; run `ingest` first");
    } else {
        println!("{:<14}{:<10}{:<18}LAST ERROR", "CONNECTOR", "STATUS", "CHECKED");
        for record in &health {
            println!(
                "{:<14}{:<10}{:<18}{}",
                record.connector_id,
                record.status.as_str(),
                fmt_time(record.last_checked_at),
                record.last_error
            );
        }
    }

    let entries = mwatch_db::list_audit_entries(pool, project_id, limit).await?;
    if !entries.is_empty() {
        println!("\nrecent audit entries:");
        for entry in &entries {
            println!(
                "  {} [{}] {}: {}",
                fmt_time(entry.created_at),
                entry.level,
                entry.connector_id,
                entry.message
            );
        }
    }
    Ok(())
}

/// Print an account's mention count for `month` against its plan.
///
/// # Errors
///
/// Returns an error if the account does not exist or the query fails.
pub(crate) async fn run_usage(
    pool: &sqlx::PgPool,
    account_id: Uuid,
    month: Option<&str>,
) -> anyhow::Result<()> {
    let account = mwatch_db::get_account(pool, account_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account {account_id} not found"))?;
    let month = month.map_or_else(|| month_key(Utc::now()), str::to_string);
    let used = mwatch_db::get_usage(pool, account_id, &month)
        .await?
        .map_or(0, |u| u.mentions_count);
    let limit = plan_limits(&account.plan).mentions_per_month;

    println!(
        "{month}: {used} / {limit} mentions ({} plan){}",
        account.plan,
        if used >= limit { ", limit reached" } else { "" }
    );
    Ok(())
}

/// Print the connector catalogue in run order.
///
/// # Errors
///
/// Returns an error if the HTTP client behind the registry cannot be built.
pub(crate) fn run_connectors(config: &mwatch_core::AppConfig) -> anyhow::Result<()> {
    let registry = default_registry(&SourcesConfig::from_app_config(config))?;
    println!(
        "{:<12}{:<24}{:<9}{:<10}{:<8}LIMITS",
        "ID", "NAME", "DEFAULT", "REALTIME", "SEARCH"
    );
    for d in registry.descriptors() {
        println!(
            "{:<12}{:<24}{:<9}{:<10}{:<8}{}",
            d.id,
            d.display_name,
            if d.enabled_by_default { "on" } else { "off" },
            d.capabilities.realtime,
            d.capabilities.search,
            d.capabilities.limits
        );
    }
    Ok(())
}
