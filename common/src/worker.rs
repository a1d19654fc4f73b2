use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Phase, TaskId, TaskRef};

/// Identidad de worker emitida por el registro del master. Nunca se reutiliza.
pub type WorkerId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegisterRequest {
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegisterResponse {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignmentRequest {
    pub worker_id: WorkerId,
}

/// Cuerpo de /tasks/complete y /tasks/fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteRequest {
    pub task_id: TaskId,
    pub phase: Phase,
    pub worker_id: WorkerId,
}

impl From<TaskRef> for TaskCompleteRequest {
    fn from(r: TaskRef) -> Self {
        Self {
            task_id: r.task_id,
            phase: r.phase,
            worker_id: r.worker_id,
        }
    }
}

impl From<TaskCompleteRequest> for TaskRef {
    fn from(r: TaskCompleteRequest) -> Self {
        Self {
            task_id: r.task_id,
            phase: r.phase,
            worker_id: r.worker_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteResponse {
    pub ok: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub worker_id: WorkerId,
    pub hostname: String,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub tasks_started: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub revocations: u64,
}
