use anyhow::Result;
use master::{failover, handlers, AppState, MasterConfig, Scheduler};
use std::{env, sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("master=debug,tower_http=info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: master inputfiles...");
        std::process::exit(1);
    }

    let config = MasterConfig::from_env()?;
    let inputs = master::config::expand_inputs(&args)?;

    let scheduler = Arc::new(Scheduler::new(inputs, config.n_reduce, config.lease_timeout));

    // reaper de leases en segundo plano
    tokio::spawn(failover::run_failover_loop(
        scheduler.clone(),
        config.reaper_interval,
    ));

    // router HTTP
    let app = handlers::build_router(AppState::new(scheduler.clone()));

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("master escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler, config.done_grace))
        .await?;

    info!("master apagado");
    Ok(())
}

/// Termina cuando el job está hecho (tras un margen para que los workers
/// vean JOB_DONE) o con Ctrl-C.
async fn shutdown_signal(scheduler: Arc<Scheduler>, grace: Duration) {
    let job_done = async {
        while !scheduler.done() {
            sleep(Duration::from_secs(1)).await;
        }
        info!("job terminado, apagando en {:?}", grace);
        sleep(grace).await;
    };

    tokio::select! {
        _ = job_done => {}
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C recibido"),
    }
}
