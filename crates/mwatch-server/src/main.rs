mod realtime;
mod scheduler;

use std::sync::Arc;

use mwatch_engine::{Scheduler, SchedulerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = mwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = mwatch_db::PoolConfig::from_app_config(&config);
    let pool = mwatch_db::connect_pool(&config.database_url, pool_config).await?;
    mwatch_db::run_migrations(&pool).await?;

    let engine = mwatch_engine::build_engine(&config, pool.clone())?;
    let alert_logger = realtime::spawn_alert_logger(engine.realtime.subscribe());

    let tick = Arc::new(Scheduler::new(
        Arc::clone(&engine.orchestrator),
        SchedulerConfig::from_app_config(&config),
    ));
    let mut jobs = scheduler::build_scheduler(tick, &config.scheduler_cron).await?;
    tracing::info!(
        env = ?config.env,
        cron = %config.scheduler_cron,
        max_concurrent = config.scheduler_max_concurrent_projects,
        "mwatch-server started"
    );

    shutdown_signal().await;
    jobs.shutdown().await?;
    alert_logger.abort();
    pool.close().await;
    tracing::info!("mwatch-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
