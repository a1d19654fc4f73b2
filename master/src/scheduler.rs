use chrono::{DateTime, Utc};
use common::{JobStatus, Phase, SchedulerError, Task, TaskRef, WorkerId, WorkerInfo};
use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Expired};
use crate::registry::WorkerRegistry;

struct SchedulerState {
    catalog: Catalog,
    registry: WorkerRegistry,
    expired_leases: u64,
}

/// Coordinador de un job map/reduce. Catálogo y registro viven detrás de un
/// único mutex: cada operación pública es una sola sección crítica.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    lease_timeout: Duration,
    started_at: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(inputs: Vec<String>, n_reduce: u32, lease_timeout: Duration) -> Self {
        info!(
            "job creado: {} tareas map, {} tareas reduce, lease={:?}",
            inputs.len(),
            n_reduce,
            lease_timeout
        );
        Self {
            state: Mutex::new(SchedulerState {
                catalog: Catalog::new(inputs, n_reduce),
                registry: WorkerRegistry::new(),
                expired_leases: 0,
            }),
            lease_timeout,
            started_at: Utc::now(),
        }
    }

    // Toda sección crítica deja el estado consistente, así que un panic
    // en otro handler no invalida los datos.
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lease_timeout(&self) -> Duration {
        self.lease_timeout
    }

    pub fn register_worker(&self, hostname: String) -> WorkerId {
        let mut st = self.lock();
        let id = st.registry.register(hostname.clone());
        info!(
            "worker registrado: {} (host={}, activos={})",
            id,
            hostname,
            st.registry.active_count()
        );
        id
    }

    /// Entrega la primera tarea Idle respetando la barrera map -> reduce.
    pub fn fetch_task(&self, worker_id: WorkerId) -> Result<Task, SchedulerError> {
        self.fetch_task_at(worker_id, Instant::now())
    }

    pub fn fetch_task_at(&self, worker_id: WorkerId, now: Instant) -> Result<Task, SchedulerError> {
        let mut st = self.lock();

        if !st.registry.is_active(worker_id) {
            return Err(SchedulerError::UnregisteredWorker { worker_id });
        }
        if st.catalog.all_completed(Phase::Reduce) {
            return Err(SchedulerError::JobDone);
        }

        // barrera: reduce sólo cuando todas las map están Completed
        let phase = if st.catalog.all_completed(Phase::Map) {
            Phase::Reduce
        } else {
            Phase::Map
        };

        let Some(task_id) = st.catalog.first_idle(phase) else {
            if phase == Phase::Map && st.catalog.any_in_progress(Phase::Map) {
                debug!("worker {} espera la barrera: quedan map en curso", worker_id);
            } else {
                debug!("worker {} pidió tarea pero no hay {} idle", worker_id, phase);
            }
            return Err(SchedulerError::NoTaskAvailable);
        };

        let task = st.catalog.assign(phase, task_id, worker_id, now)?;
        st.registry.record_started(worker_id);

        info!(
            "asignando tarea {} {} (input={:?}, intento {}) al worker {}",
            phase, task.id, task.input_path, task.attempts, worker_id
        );
        Ok(task)
    }

    /// Acepta la finalización sólo si el que reporta es el dueño actual y la
    /// tarea sigue InProgress. Un error deja el catálogo intacto.
    pub fn complete_task(&self, r: &TaskRef) -> Result<(), SchedulerError> {
        let mut st = self.lock();

        if let Err(e) = st.catalog.complete(r) {
            warn!("finalización rechazada de worker {}: {}", r.worker_id, e);
            return Err(e);
        }
        st.registry.record_completed(r.worker_id);

        info!(
            "tarea {} {} completada por worker {}",
            r.phase, r.task_id, r.worker_id
        );
        if st.catalog.all_completed(Phase::Reduce) {
            info!("todas las tareas reduce completadas, job terminado");
        }
        Ok(())
    }

    /// El dueño informa que no pudo ejecutar la tarea: vuelve a Idle sin
    /// esperar a que venza el lease. El worker sigue activo.
    pub fn fail_task(&self, r: &TaskRef) -> Result<(), SchedulerError> {
        let mut st = self.lock();

        if let Err(e) = st.catalog.release(r) {
            warn!("reporte de fallo rechazado de worker {}: {}", r.worker_id, e);
            return Err(e);
        }
        st.registry.record_failed(r.worker_id);

        warn!(
            "worker {} reportó fallo en tarea {} {}, vuelve a la cola",
            r.worker_id, r.phase, r.task_id
        );
        Ok(())
    }

    pub fn done(&self) -> bool {
        self.lock().catalog.all_completed(Phase::Reduce)
    }

    /// Pasada del reaper: toda tarea con lease vencido vuelve a Idle y su
    /// dueño queda revocado.
    pub fn check_leases(&self) -> Vec<Expired> {
        self.check_leases_at(Instant::now())
    }

    pub fn check_leases_at(&self, now: Instant) -> Vec<Expired> {
        let mut st = self.lock();
        let expired = st.catalog.expire(now, self.lease_timeout);

        for e in &expired {
            if let Some(owner) = e.owner {
                st.registry.revoke(owner);
            }
        }
        st.expired_leases += expired.len() as u64;

        expired
    }

    pub fn job_status(&self) -> JobStatus {
        let st = self.lock();
        JobStatus {
            done: st.catalog.all_completed(Phase::Reduce),
            map: st.catalog.progress(Phase::Map),
            reduce: st.catalog.progress(Phase::Reduce),
            n_reduce: st.catalog.n_reduce(),
            inputs: st.catalog.inputs().to_vec(),
            started_at: self.started_at,
            expired_leases: st.expired_leases,
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().catalog.snapshot()
    }

    pub fn workers(&self) -> Vec<WorkerInfo> {
        self.lock().registry.list()
    }
}
