use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::{Phase, TaskId, TaskState};
use crate::worker::WorkerId;

/// Errores de aplicación del master. Viajan como cuerpo JSON
/// (`{"code": "WRONG_WORKER", ...}`) para que el worker pueda distinguirlos
/// de un fallo de transporte.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerError {
    #[error("worker {worker_id} no está registrado o fue revocado")]
    UnregisteredWorker { worker_id: WorkerId },

    /// Transitorio: reintentar tras un backoff.
    #[error("no hay tareas disponibles por ahora")]
    NoTaskAvailable,

    #[error("el job terminó")]
    JobDone,

    #[error("tarea {phase} {task_id} fuera de rango")]
    OutOfBounds { phase: Phase, task_id: TaskId },

    #[error("tarea {phase} {task_id} no pertenece al worker {worker_id} (dueño: {owner:?})")]
    WrongWorker {
        phase: Phase,
        task_id: TaskId,
        worker_id: WorkerId,
        owner: Option<WorkerId>,
    },

    #[error("tarea {phase} {task_id} está {state}, se esperaba in-progress")]
    InvalidState {
        phase: Phase,
        task_id: TaskId,
        state: TaskState,
    },
}

impl SchedulerError {
    /// Errores tras los cuales el worker debe volver a registrarse.
    pub fn requires_reregistration(&self) -> bool {
        matches!(
            self,
            SchedulerError::UnregisteredWorker { .. }
                | SchedulerError::WrongWorker { .. }
                | SchedulerError::InvalidState { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn el_error_viaja_con_codigo_y_campos() {
        let err = SchedulerError::WrongWorker {
            phase: Phase::Map,
            task_id: 1,
            worker_id: 2,
            owner: Some(3),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "WRONG_WORKER");
        assert_eq!(json["phase"], "MAP");
        assert_eq!(json["owner"], 3);

        let back: SchedulerError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn variantes_sin_campos_se_decodifican() {
        let err: SchedulerError =
            serde_json::from_str(r#"{"code":"NO_TASK_AVAILABLE"}"#).unwrap();
        assert_eq!(err, SchedulerError::NoTaskAvailable);
        assert!(!err.requires_reregistration());
        assert!(SchedulerError::UnregisteredWorker { worker_id: 1 }.requires_reregistration());
    }
}
