use chrono::Utc;
use common::{Phase, PhaseProgress, SchedulerError, Task, TaskId, TaskRef, TaskState, WorkerId};
use std::time::{Duration, Instant};

/// Entrada del catálogo: la tarea más el inicio de su lease (reloj monotónico).
#[derive(Debug, Clone)]
struct Slot {
    task: Task,
    lease_start: Option<Instant>,
}

/// Tarea recuperada por el reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired {
    pub phase: Phase,
    pub task_id: TaskId,
    pub owner: Option<WorkerId>,
}

/// Registro autoritativo de todas las tareas del job: dos arenas del mismo
/// tipo indexadas por id, con las mismas rutinas de transición para ambas fases.
#[derive(Debug)]
pub struct Catalog {
    inputs: Vec<String>,
    map: Vec<Slot>,
    reduce: Vec<Slot>,
}

impl Catalog {
    pub fn new(inputs: Vec<String>, n_reduce: u32) -> Self {
        let n_map = inputs.len() as u32;

        let map = inputs
            .iter()
            .enumerate()
            .map(|(id, input)| Slot {
                task: Task::new_map(id as TaskId, input.clone(), n_map, n_reduce),
                lease_start: None,
            })
            .collect();

        let reduce = (0..n_reduce)
            .map(|id| Slot {
                task: Task::new_reduce(id, n_map, n_reduce),
                lease_start: None,
            })
            .collect();

        Self { inputs, map, reduce }
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn n_reduce(&self) -> u32 {
        self.reduce.len() as u32
    }

    fn arena(&self, phase: Phase) -> &[Slot] {
        match phase {
            Phase::Map => &self.map,
            Phase::Reduce => &self.reduce,
        }
    }

    fn slot_mut(&mut self, phase: Phase, task_id: TaskId) -> Result<&mut Slot, SchedulerError> {
        let arena = match phase {
            Phase::Map => &mut self.map,
            Phase::Reduce => &mut self.reduce,
        };
        arena
            .get_mut(task_id as usize)
            .ok_or(SchedulerError::OutOfBounds { phase, task_id })
    }

    pub fn get(&self, phase: Phase, task_id: TaskId) -> Result<&Task, SchedulerError> {
        self.arena(phase)
            .get(task_id as usize)
            .map(|s| &s.task)
            .ok_or(SchedulerError::OutOfBounds { phase, task_id })
    }

    /// Primera tarea Idle en orden de catálogo.
    pub fn first_idle(&self, phase: Phase) -> Option<TaskId> {
        self.arena(phase)
            .iter()
            .find(|s| s.task.state == TaskState::Idle)
            .map(|s| s.task.id)
    }

    pub fn all_completed(&self, phase: Phase) -> bool {
        self.arena(phase)
            .iter()
            .all(|s| s.task.state == TaskState::Completed)
    }

    pub fn any_in_progress(&self, phase: Phase) -> bool {
        self.arena(phase)
            .iter()
            .any(|s| s.task.state == TaskState::InProgress)
    }

    /// Idle -> InProgress. Devuelve la copia que se entrega al worker.
    pub fn assign(
        &mut self,
        phase: Phase,
        task_id: TaskId,
        worker_id: WorkerId,
        now: Instant,
    ) -> Result<Task, SchedulerError> {
        let slot = self.slot_mut(phase, task_id)?;
        if slot.task.state != TaskState::Idle {
            return Err(SchedulerError::InvalidState {
                phase,
                task_id,
                state: slot.task.state,
            });
        }

        slot.task.state = TaskState::InProgress;
        slot.task.owner = Some(worker_id);
        slot.task.assigned_at = Some(Utc::now());
        slot.task.attempts += 1;
        slot.lease_start = Some(now);

        Ok(slot.task.clone())
    }

    /// Chequeo común de complete/release: rango, dueño y estado, en ese orden.
    fn owned_in_progress(&mut self, r: &TaskRef) -> Result<&mut Slot, SchedulerError> {
        let slot = self.slot_mut(r.phase, r.task_id)?;

        if slot.task.owner != Some(r.worker_id) {
            return Err(SchedulerError::WrongWorker {
                phase: r.phase,
                task_id: r.task_id,
                worker_id: r.worker_id,
                owner: slot.task.owner,
            });
        }
        if slot.task.state != TaskState::InProgress {
            return Err(SchedulerError::InvalidState {
                phase: r.phase,
                task_id: r.task_id,
                state: slot.task.state,
            });
        }

        Ok(slot)
    }

    /// InProgress -> Completed. El dueño se conserva como dato histórico.
    pub fn complete(&mut self, r: &TaskRef) -> Result<(), SchedulerError> {
        let slot = self.owned_in_progress(r)?;
        slot.task.state = TaskState::Completed;
        slot.lease_start = None;
        Ok(())
    }

    /// InProgress -> Idle a pedido del dueño (falló la ejecución).
    pub fn release(&mut self, r: &TaskRef) -> Result<(), SchedulerError> {
        let slot = self.owned_in_progress(r)?;
        reset(slot);
        Ok(())
    }

    /// Vuelve a Idle toda tarea InProgress cuyo lease venció.
    pub fn expire(&mut self, now: Instant, lease: Duration) -> Vec<Expired> {
        let mut expired = Vec::new();

        for slot in self.map.iter_mut().chain(self.reduce.iter_mut()) {
            if slot.task.state != TaskState::InProgress {
                continue;
            }
            let Some(start) = slot.lease_start else {
                continue;
            };
            if now.saturating_duration_since(start) > lease {
                expired.push(Expired {
                    phase: slot.task.phase,
                    task_id: slot.task.id,
                    owner: slot.task.owner,
                });
                reset(slot);
            }
        }

        expired
    }

    pub fn progress(&self, phase: Phase) -> PhaseProgress {
        let mut p = PhaseProgress::default();
        for s in self.arena(phase) {
            p.total += 1;
            match s.task.state {
                TaskState::Idle => p.idle += 1,
                TaskState::InProgress => p.in_progress += 1,
                TaskState::Completed => p.completed += 1,
            }
        }
        p
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.map
            .iter()
            .chain(self.reduce.iter())
            .map(|s| s.task.clone())
            .collect()
    }
}

fn reset(slot: &mut Slot) {
    slot.task.state = TaskState::Idle;
    slot.task.owner = None;
    slot.lease_start = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec!["a.txt".into(), "b.txt".into()], 3)
    }

    fn task_ref(phase: Phase, task_id: TaskId, worker_id: WorkerId) -> TaskRef {
        TaskRef {
            task_id,
            phase,
            worker_id,
        }
    }

    #[test]
    fn new_crea_tareas_idle_con_conteos() {
        let c = catalog();

        assert_eq!(c.progress(Phase::Map).total, 2);
        assert_eq!(c.progress(Phase::Reduce).total, 3);
        assert_eq!(c.progress(Phase::Map).idle, 2);
        assert_eq!(c.progress(Phase::Reduce).idle, 3);

        let m1 = c.get(Phase::Map, 1).unwrap();
        assert_eq!(m1.input_path.as_deref(), Some("b.txt"));
        assert_eq!((m1.total_map_tasks, m1.total_reduce_buckets), (2, 3));

        let r2 = c.get(Phase::Reduce, 2).unwrap();
        assert_eq!(r2.input_path, None);
        assert_eq!((r2.total_map_tasks, r2.total_reduce_buckets), (2, 3));
    }

    #[test]
    fn get_fuera_de_rango() {
        let c = catalog();
        assert_eq!(
            c.get(Phase::Reduce, 3),
            Err(SchedulerError::OutOfBounds {
                phase: Phase::Reduce,
                task_id: 3
            })
        );
    }

    #[test]
    fn assign_solo_desde_idle() {
        let mut c = catalog();
        let now = Instant::now();

        let t = c.assign(Phase::Map, 0, 7, now).unwrap();
        assert_eq!(t.state, TaskState::InProgress);
        assert_eq!(t.owner, Some(7));
        assert_eq!(t.attempts, 1);
        assert_eq!(c.first_idle(Phase::Map), Some(1));

        let again = c.assign(Phase::Map, 0, 8, now);
        assert!(matches!(again, Err(SchedulerError::InvalidState { .. })));
        assert_eq!(c.get(Phase::Map, 0).unwrap().owner, Some(7));
    }

    #[test]
    fn complete_verifica_rango_dueno_y_estado() {
        let mut c = catalog();
        c.assign(Phase::Map, 0, 7, Instant::now()).unwrap();

        assert!(matches!(
            c.complete(&task_ref(Phase::Map, 9, 7)),
            Err(SchedulerError::OutOfBounds { .. })
        ));
        assert!(matches!(
            c.complete(&task_ref(Phase::Map, 0, 8)),
            Err(SchedulerError::WrongWorker { owner: Some(7), .. })
        ));
        assert_eq!(c.get(Phase::Map, 0).unwrap().state, TaskState::InProgress);

        c.complete(&task_ref(Phase::Map, 0, 7)).unwrap();
        assert_eq!(c.get(Phase::Map, 0).unwrap().state, TaskState::Completed);

        assert!(matches!(
            c.complete(&task_ref(Phase::Map, 0, 7)),
            Err(SchedulerError::InvalidState {
                state: TaskState::Completed,
                ..
            })
        ));
    }

    #[test]
    fn release_vuelve_a_idle_y_limpia_dueno() {
        let mut c = catalog();
        c.assign(Phase::Map, 1, 7, Instant::now()).unwrap();

        c.release(&task_ref(Phase::Map, 1, 7)).unwrap();

        let t = c.get(Phase::Map, 1).unwrap();
        assert_eq!(t.state, TaskState::Idle);
        assert_eq!(t.owner, None);
        assert_eq!(c.first_idle(Phase::Map), Some(0));
    }

    #[test]
    fn expire_solo_afecta_leases_vencidos() {
        let mut c = catalog();
        let t0 = Instant::now();
        let lease = Duration::from_secs(10);

        c.assign(Phase::Map, 0, 1, t0).unwrap();
        c.assign(Phase::Map, 1, 2, t0 + Duration::from_secs(8)).unwrap();

        let expired = c.expire(t0 + Duration::from_secs(11), lease);

        assert_eq!(
            expired,
            vec![Expired {
                phase: Phase::Map,
                task_id: 0,
                owner: Some(1)
            }]
        );
        assert_eq!(c.get(Phase::Map, 0).unwrap().state, TaskState::Idle);
        assert_eq!(c.get(Phase::Map, 0).unwrap().owner, None);
        assert_eq!(c.get(Phase::Map, 1).unwrap().state, TaskState::InProgress);
    }

    #[test]
    fn expire_no_toca_tareas_completadas() {
        let mut c = catalog();
        let t0 = Instant::now();
        c.assign(Phase::Map, 0, 1, t0).unwrap();
        c.complete(&task_ref(Phase::Map, 0, 1)).unwrap();

        let expired = c.expire(t0 + Duration::from_secs(60), Duration::from_secs(1));

        assert!(expired.is_empty());
        assert_eq!(c.get(Phase::Map, 0).unwrap().state, TaskState::Completed);
    }

    #[test]
    fn catalogo_sin_entradas_tiene_la_fase_map_completa() {
        let c = Catalog::new(Vec::new(), 2);
        assert!(c.all_completed(Phase::Map));
        assert!(!c.any_in_progress(Phase::Map));
        assert!(!c.all_completed(Phase::Reduce));
    }
}
