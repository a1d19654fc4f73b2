use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{JobStatus, PhaseProgress, Task, WorkerInfo};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Igual que en el worker:
/// - En Docker: MASTER_URL=http://master:8080
/// - Local: default http://localhost:8080
fn master_base_url() -> String {
    env::var("MASTER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para consultar al master")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estado del job: progreso por fase y si terminó
    Status,
    /// Lista todas las tareas del catálogo
    Tasks,
    /// Lista los workers registrados
    Workers,
    /// Junta y ordena las salidas mr-out-* de un directorio local
    Output {
        #[arg(value_name = "WORK_DIR", default_value = ".")]
        dir: PathBuf,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = master_base_url();

    match cli.command {
        Commands::Status => {
            let job: JobStatus = get_json(&client, &base_url, "/api/v1/job").await?;
            println!("Job:");
            println!("  terminado: {}", job.done);
            println!("  entradas : {}", job.inputs.len());
            println!("  n_reduce : {}", job.n_reduce);
            print_progress("map", &job.map);
            print_progress("reduce", &job.reduce);
            println!("  leases vencidos: {}", job.expired_leases);
            println!("  iniciado: {}", job.started_at);
        }

        Commands::Tasks => {
            let tasks: Vec<Task> = get_json(&client, &base_url, "/api/v1/tasks").await?;
            for t in tasks {
                let owner = t.owner.map(|w| w.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:<6} {:>4}  {:<11} worker={:<4} intentos={} {}",
                    t.phase.to_string(),
                    t.id,
                    t.state.to_string(),
                    owner,
                    t.attempts,
                    t.input_path.as_deref().unwrap_or("")
                );
            }
        }

        Commands::Workers => {
            let workers: Vec<WorkerInfo> = get_json(&client, &base_url, "/api/v1/workers").await?;
            if workers.is_empty() {
                println!("No hay workers registrados.");
            }
            for w in workers {
                println!("Worker {}", w.worker_id);
                println!("  host       : {}", w.hostname);
                println!("  activo     : {}", w.active);
                println!("  registrado : {}", w.registered_at);
                println!(
                    "  tareas     : started={}, ok={}, failed={}, revocadas={}",
                    w.tasks_started, w.tasks_completed, w.tasks_failed, w.revocations
                );
                println!();
            }
        }

        Commands::Output { dir } => {
            for line in merged_output(&dir)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

async fn get_json<T: DeserializeOwned>(client: &Client, base_url: &str, path: &str) -> Result<T> {
    let url = format!("{}{}", base_url, path);
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("no se pudo contactar al master en {}", base_url))?;

    if !resp.status().is_success() {
        bail!("Error consultando {} (status {})", path, resp.status());
    }
    Ok(resp.json().await?)
}

fn print_progress(name: &str, p: &PhaseProgress) {
    let pct = if p.total > 0 {
        (p.completed as f64 / p.total as f64) * 100.0
    } else {
        100.0
    };
    println!(
        "  {:<6}: total={}, idle={}, en curso={}, completadas={} ({:.1}%)",
        name, p.total, p.idle, p.in_progress, p.completed, pct
    );
}

/// Todas las líneas de los `mr-out-*` del directorio, ordenadas.
fn merged_output(dir: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("no se pudo leer {}", dir.display()))? {
        let path = entry?.path();
        let is_output = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("mr-out-"))
            .unwrap_or(false);
        if !is_output {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        lines.extend(text.lines().map(str::to_string));
    }

    lines.sort();
    Ok(lines)
}
