use anyhow::{Context, Result};
use common::apps;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use worker::{Exit, HttpCoordinator, Worker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("worker=debug,reqwest=info")),
        )
        .init();

    let config = WorkerConfig::from_env()?;
    let app = apps::by_name(&config.app).with_context(|| format!("aplicación desconocida: {}", config.app))?;

    // Nombre de host (solo para info)
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let coordinator = HttpCoordinator::new(config.master_base_url.clone(), config.request_timeout)?;
    info!(
        "worker {} con app {} contra {} (work dir {})",
        hostname,
        app.name(),
        config.master_base_url,
        config.work_dir.display()
    );

    let report = Worker::new(coordinator, app, config, hostname).run().await;

    match report.exit {
        Exit::JobDone => info!("job terminado, saliendo"),
        other => warn!("saliendo sin que el job termine: {:?}", other),
    }
    Ok(())
}
