use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conteo de tareas de una fase por estado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub total: u32,
    pub idle: u32,
    pub in_progress: u32,
    pub completed: u32,
}

impl PhaseProgress {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Vista derivada del catálogo: el job no se guarda como entidad propia.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub done: bool,
    pub map: PhaseProgress,
    pub reduce: PhaseProgress,
    pub n_reduce: u32,
    pub inputs: Vec<String>,
    pub started_at: DateTime<Utc>,

    /// Tareas recuperadas por vencimiento de lease desde el arranque
    pub expired_leases: u64,
}
