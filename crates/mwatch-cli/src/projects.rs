//! Project command handlers.
//!
//! Creation validates keywords and schedule against the owning account's
//! plan before anything is written.

use std::collections::BTreeMap;

use clap::Subcommand;
use mwatch_core::{plan_limits, validate_project_settings, Project};
use uuid::Uuid;

use crate::args::parse_source_flag;

/// Sub-commands available under `project`.
#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    /// Create an active project for an account
    Create {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        name: String,
        /// Keyword to track (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Boolean filter, e.g. `budget AND (nepal OR kathmandu)`
        #[arg(long, default_value = "")]
        query: String,
        /// Minutes between scheduled passes
        #[arg(long, default_value = "30")]
        schedule: i32,
        #[arg(long, default_value = "")]
        geo: String,
        /// Connector override as `id=on|off` (repeatable)
        #[arg(long = "source", value_parser = parse_source_flag)]
        sources: Vec<(String, bool)>,
    },
    /// List projects, optionally for one account
    List {
        #[arg(long)]
        account: Option<Uuid>,
    },
    /// Delete a project and everything recorded for it
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: ProjectCommands) -> anyhow::Result<()> {
    match command {
        ProjectCommands::Create {
            account,
            name,
            keywords,
            query,
            schedule,
            geo,
            sources,
        } => {
            let owner = mwatch_db::get_account(pool, account)
                .await?
                .ok_or_else(|| anyhow::anyhow!("account {account} not found"))?;
            let limits = plan_limits(&owner.plan);
            let keywords = validate_project_settings(&owner.plan, &limits, &keywords, schedule)?;

            let project = mwatch_db::create_project(
                pool,
                &mwatch_db::NewProject {
                    account_id: account,
                    name,
                    keywords,
                    boolean_query: query,
                    sources: sources.into_iter().collect::<BTreeMap<_, _>>(),
                    schedule_minutes: schedule,
                    geo_focus: geo,
                },
            )
            .await?;
            println!("created project {} ({})", project.id, project.name);
        }
        ProjectCommands::List { account } => {
            let projects = mwatch_db::list_projects(pool, account).await?;
            if projects.is_empty() {
                println!("no projects found; create one with `project create`");
                return Ok(());
            }
            println!(
                "{:<38}{:<24}{:<8}{:<7}{:<18}KEYWORDS",
                "ID", "NAME", "STATUS", "EVERY", "LAST RUN"
            );
            for project in &projects {
                print_project_line(project);
            }
        }
        ProjectCommands::Delete { id } => {
            mwatch_db::delete_project(pool, id).await?;
            println!("deleted project {id}");
        }
    }
    Ok(())
}

fn print_project_line(project: &Project) {
    let last_run = project.last_run_at.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    );
    println!(
        "{:<38}{:<24}{:<8}{:<7}{:<18}{}",
        project.id.to_string(),
        project.name,
        project.status.as_str(),
        format!("{}m", project.schedule_minutes),
        last_run,
        project.keywords.join(", ")
    );
}
