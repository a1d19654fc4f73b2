use std::sync::Arc;

use common::{engine, MapReduceApp, SchedulerError, Task, TaskOutput, TaskRef, TaskState, WorkerId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cleanup::{CleanupQueue, CleanupSnapshot};
use crate::client::{CallError, Coordinator};
use crate::config::WorkerConfig;

/// Por qué terminó el loop del worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// El master avisó que el job terminó
    JobDone,
    /// El master rechazó el registro
    RegistrationFailed,
    /// Demasiados fallos de transporte seguidos
    CoordinatorUnreachable,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub registrations: u64,
    pub maps_done: u64,
    pub reduces_done: u64,
    /// Tareas que el engine no pudo ejecutar
    pub failed: u64,
    /// Reportes de fin que el master descartó
    pub rejected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub exit: Exit,
    pub stats: WorkerStats,
    pub cleanup: CleanupSnapshot,
}

enum Next {
    Continue,
    Reregister,
}

/// Loop principal del worker.
/// - Se registra en el master.
/// - Pide tareas y las ejecuta de a una.
/// - Reporta el resultado; si el master lo rechaza, vuelve a registrarse.
pub struct Worker<C> {
    coordinator: C,
    app: Arc<dyn MapReduceApp>,
    config: WorkerConfig,
    hostname: String,
    stats: WorkerStats,
}

impl<C: Coordinator> Worker<C> {
    pub fn new(coordinator: C, app: Arc<dyn MapReduceApp>, config: WorkerConfig, hostname: String) -> Self {
        Self {
            coordinator,
            app,
            config,
            hostname,
            stats: WorkerStats::default(),
        }
    }

    pub async fn run(mut self) -> WorkerReport {
        let cleanup = CleanupQueue::spawn(self.config.cleanup_attempts, self.config.cleanup_backoff);

        let exit = self.run_loop(&cleanup).await;
        let cleanup = cleanup.shutdown().await;

        info!(
            "worker terminó ({:?}): {} map, {} reduce, {} fallidas, {} rechazadas; limpieza: {} borrados, {} sin borrar",
            exit,
            self.stats.maps_done,
            self.stats.reduces_done,
            self.stats.failed,
            self.stats.rejected,
            cleanup.removed,
            cleanup.failed
        );

        WorkerReport {
            exit,
            stats: self.stats,
            cleanup,
        }
    }

    async fn run_loop(&mut self, cleanup: &CleanupQueue) -> Exit {
        let mut worker_id = match self.register().await {
            Ok(id) => id,
            Err(exit) => return exit,
        };
        let mut transport_failures = 0u32;

        loop {
            let next = match self.coordinator.fetch_task(worker_id).await {
                Ok(task) => {
                    transport_failures = 0;
                    self.process(task, worker_id, cleanup).await
                }
                Err(CallError::Rejected(SchedulerError::NoTaskAvailable)) => {
                    transport_failures = 0;
                    debug!("worker {} pidió tarea pero no hay", worker_id);
                    sleep(self.config.poll_interval).await;
                    Next::Continue
                }
                Err(CallError::Rejected(SchedulerError::JobDone)) => {
                    info!("el master avisó que el job terminó");
                    return Exit::JobDone;
                }
                Err(CallError::Rejected(e)) if e.requires_reregistration() => {
                    warn!("worker {} rechazado: {}", worker_id, e);
                    Next::Reregister
                }
                Err(CallError::Rejected(e)) => {
                    transport_failures = 0;
                    warn!("respuesta inesperada al pedir tarea: {}", e);
                    sleep(self.config.poll_interval).await;
                    Next::Continue
                }
                Err(CallError::Transport(e)) => {
                    transport_failures += 1;
                    warn!(
                        "master inalcanzable ({}/{}): {}",
                        transport_failures, self.config.max_transport_failures, e
                    );
                    if transport_failures >= self.config.max_transport_failures {
                        return Exit::CoordinatorUnreachable;
                    }
                    sleep(self.config.poll_interval).await;
                    Next::Continue
                }
            };

            if let Next::Reregister = next {
                worker_id = match self.register().await {
                    Ok(id) => id,
                    Err(exit) => return exit,
                };
            }
        }
    }

    /// Pide una identidad nueva. Los fallos de transporte se reintentan
    /// (el master puede estar arrancando).
    async fn register(&mut self) -> Result<WorkerId, Exit> {
        let mut failures = 0u32;

        loop {
            match self.coordinator.register(&self.hostname).await {
                Ok(id) => {
                    self.stats.registrations += 1;
                    info!("registrado como worker {} (host {})", id, self.hostname);
                    return Ok(id);
                }
                Err(CallError::Transport(e)) => {
                    failures += 1;
                    warn!(
                        "no se pudo registrar ({}/{}): {}",
                        failures, self.config.max_transport_failures, e
                    );
                    if failures >= self.config.max_transport_failures {
                        return Err(Exit::CoordinatorUnreachable);
                    }
                    sleep(self.config.poll_interval).await;
                }
                Err(e @ CallError::Rejected(_)) => {
                    warn!("registro rechazado: {}", e);
                    return Err(Exit::RegistrationFailed);
                }
            }
        }
    }

    async fn process(&mut self, task: Task, worker_id: WorkerId, cleanup: &CleanupQueue) -> Next {
        let task_ref = TaskRef {
            task_id: task.id,
            phase: task.phase,
            worker_id,
        };
        info!(
            "worker {} ejecuta tarea {} {} (intento {})",
            worker_id, task.phase, task.id, task.attempts
        );

        // el engine hace IO bloqueante
        let app = self.app.clone();
        let work_dir = self.config.work_dir.clone();
        let result = tokio::task::spawn_blocking(move || engine::execute(app.as_ref(), &task, &work_dir)).await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("tarea {} {} falló: {}", task_ref.phase, task_ref.task_id, e);
                return self.give_back(task_ref).await;
            }
            Err(e) => {
                warn!("panic ejecutando tarea {} {}: {}", task_ref.phase, task_ref.task_id, e);
                return self.give_back(task_ref).await;
            }
        };

        match self.report_done(task_ref).await {
            Ok(()) => {
                match output {
                    TaskOutput::Map(files) => {
                        self.stats.maps_done += 1;
                        debug!("map {} escribió {} particiones", task_ref.task_id, files.len());
                    }
                    TaskOutput::Reduce(out) => {
                        self.stats.reduces_done += 1;
                        debug!("reduce {} escribió {}", task_ref.task_id, out.output.display());
                        // sólo tras la aceptación: un reduce reasignado todavía los necesita
                        cleanup.enqueue(out.consumed);
                    }
                }
                Next::Continue
            }
            Err(CallError::Rejected(e)) => {
                self.stats.rejected += 1;
                warn!(
                    "el master descartó el resultado de {} {}: {}; re-registrando",
                    task_ref.phase, task_ref.task_id, e
                );
                Next::Reregister
            }
            Err(CallError::Transport(e)) => {
                // el lease vencerá y la tarea se repetirá en otro worker
                warn!(
                    "no se pudo reportar {} {}: {}",
                    task_ref.phase, task_ref.task_id, e
                );
                Next::Continue
            }
        }
    }

    async fn report_done(&self, task_ref: TaskRef) -> Result<(), CallError> {
        let mut retries = 0u32;

        loop {
            match self.coordinator.complete_task(task_ref).await {
                Err(CallError::Transport(e)) if retries < self.config.report_retries => {
                    retries += 1;
                    warn!("reintentando reporte de {} {}: {}", task_ref.phase, task_ref.task_id, e);
                    sleep(self.config.poll_interval).await;
                }
                // el intento anterior se aplicó y sólo se perdió la respuesta:
                // el master chequea el dueño antes que el estado, así que la
                // tarea Completed es nuestra
                Err(CallError::Rejected(SchedulerError::InvalidState {
                    state: TaskState::Completed,
                    ..
                })) if retries > 0 => {
                    info!(
                        "el reporte previo de {} {} ya había sido aceptado",
                        task_ref.phase, task_ref.task_id
                    );
                    return Ok(());
                }
                other => return other,
            }
        }
    }

    /// Devuelve la tarea a la cola sin esperar al lease. Best-effort.
    async fn give_back(&mut self, task_ref: TaskRef) -> Next {
        self.stats.failed += 1;

        match self.coordinator.fail_task(task_ref).await {
            Ok(()) => Next::Continue,
            Err(CallError::Rejected(e)) if e.requires_reregistration() => {
                warn!("no se pudo devolver {} {}: {}", task_ref.phase, task_ref.task_id, e);
                Next::Reregister
            }
            Err(e) => {
                warn!("no se pudo devolver {} {}: {}", task_ref.phase, task_ref.task_id, e);
                Next::Continue
            }
        }
    }
}
