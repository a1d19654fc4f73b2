use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::worker::WorkerId;

/// Índice de la tarea dentro de su fase (posición en el catálogo).
pub type TaskId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => write!(f, "map"),
            Phase::Reduce => write!(f, "reduce"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Idle,
    InProgress,
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Idle => write!(f, "idle"),
            TaskState::InProgress => write!(f, "in-progress"),
            TaskState::Completed => write!(f, "completed"),
        }
    }
}

/// Una unidad de trabajo map o reduce, tal como viaja al worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub phase: Phase,
    pub state: TaskState,

    /// Archivo de entrada (sólo tareas map)
    pub input_path: Option<String>,

    /// Worker que tiene la tarea asignada
    pub owner: Option<WorkerId>,

    /// Cuándo se entregó por última vez (informativo, el lease usa reloj monotónico)
    pub assigned_at: Option<DateTime<Utc>>,

    pub total_map_tasks: u32,
    pub total_reduce_buckets: u32,

    /// Veces que la tarea fue entregada
    pub attempts: u32,
}

impl Task {
    pub fn new_map(id: TaskId, input_path: String, total_map_tasks: u32, total_reduce_buckets: u32) -> Self {
        Self {
            id,
            phase: Phase::Map,
            state: TaskState::Idle,
            input_path: Some(input_path),
            owner: None,
            assigned_at: None,
            total_map_tasks,
            total_reduce_buckets,
            attempts: 0,
        }
    }

    pub fn new_reduce(id: TaskId, total_map_tasks: u32, total_reduce_buckets: u32) -> Self {
        Self {
            id,
            phase: Phase::Reduce,
            state: TaskState::Idle,
            input_path: None,
            owner: None,
            assigned_at: None,
            total_map_tasks,
            total_reduce_buckets,
            attempts: 0,
        }
    }

    /// Referencia con la que el dueño reporta la tarea.
    /// Devuelve None si la tarea no tiene dueño.
    pub fn to_ref(&self) -> Option<TaskRef> {
        self.owner.map(|worker_id| TaskRef {
            task_id: self.id,
            phase: self.phase,
            worker_id,
        })
    }
}

/// Identifica una tarea asignada: (fase, id) + el worker que la reporta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub task_id: TaskId,
    pub phase: Phase,
    pub worker_id: WorkerId,
}
