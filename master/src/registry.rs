use chrono::{DateTime, Utc};
use common::{WorkerId, WorkerInfo};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct WorkerMeta {
    pub hostname: String,
    pub active: bool,
    pub registered_at: DateTime<Utc>,

    // Métricas
    pub tasks_started: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub revocations: u64,
}

/// Emite y revoca identidades de worker. Los ids salen de un contador
/// monotónico, así que nunca se repiten mientras viva el master.
#[derive(Debug)]
pub struct WorkerRegistry {
    next_id: WorkerId,
    workers: BTreeMap<WorkerId, WorkerMeta>,
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            workers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, hostname: String) -> WorkerId {
        let id = self.next_id;
        self.next_id += 1;

        self.workers.insert(
            id,
            WorkerMeta {
                hostname,
                active: true,
                registered_at: Utc::now(),
                tasks_started: 0,
                tasks_completed: 0,
                tasks_failed: 0,
                revocations: 0,
            },
        );
        id
    }

    pub fn is_active(&self, id: WorkerId) -> bool {
        self.workers.get(&id).map(|m| m.active).unwrap_or(false)
    }

    /// Marca la identidad como inactiva. Devuelve true si estaba activa.
    pub fn revoke(&mut self, id: WorkerId) -> bool {
        match self.workers.get_mut(&id) {
            Some(meta) if meta.active => {
                meta.active = false;
                meta.revocations += 1;
                true
            }
            _ => false,
        }
    }

    pub fn record_started(&mut self, id: WorkerId) {
        if let Some(meta) = self.workers.get_mut(&id) {
            meta.tasks_started += 1;
        }
    }

    pub fn record_completed(&mut self, id: WorkerId) {
        if let Some(meta) = self.workers.get_mut(&id) {
            meta.tasks_completed += 1;
        }
    }

    pub fn record_failed(&mut self, id: WorkerId) {
        if let Some(meta) = self.workers.get_mut(&id) {
            meta.tasks_failed += 1;
        }
    }

    pub fn active_count(&self) -> usize {
        self.workers.values().filter(|m| m.active).count()
    }

    pub fn list(&self) -> Vec<WorkerInfo> {
        self.workers
            .iter()
            .map(|(id, meta)| WorkerInfo {
                worker_id: *id,
                hostname: meta.hostname.clone(),
                active: meta.active,
                registered_at: meta.registered_at,
                tasks_started: meta.tasks_started,
                tasks_completed: meta.tasks_completed,
                tasks_failed: meta.tasks_failed,
                revocations: meta.revocations,
            })
            .collect()
    }
}
