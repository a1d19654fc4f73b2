use async_trait::async_trait;
use common::{
    SchedulerError, Task, TaskAssignmentRequest, TaskCompleteRequest, TaskCompleteResponse, TaskRef,
    WorkerId, WorkerRegisterRequest, WorkerRegisterResponse,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Resultado de una llamada al coordinador.
#[derive(Debug, Error)]
pub enum CallError {
    /// El coordinador respondió y rechazó la operación
    #[error("el master rechazó la llamada: {0}")]
    Rejected(#[from] SchedulerError),

    /// No hubo respuesta utilizable (red caída, timeout, cuerpo ilegible)
    #[error("fallo de transporte: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        CallError::Transport(e.to_string())
    }
}

/// Las cuatro llamadas que un worker hace al coordinador.
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn register(&self, hostname: &str) -> Result<WorkerId, CallError>;
    async fn fetch_task(&self, worker_id: WorkerId) -> Result<Task, CallError>;
    async fn complete_task(&self, task: TaskRef) -> Result<(), CallError>;
    async fn fail_task(&self, task: TaskRef) -> Result<(), CallError>;
}

/// Cliente HTTP contra la API del master.
#[derive(Clone)]
pub struct HttpCoordinator {
    client: Client,
    base_url: String,
}

impl HttpCoordinator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, CallError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let res = self.client.post(&url).json(body).send().await?;

        let status = res.status();
        if status.is_success() {
            return Ok(res.json().await?);
        }

        // los rechazos del scheduler vienen con cuerpo tipado
        let bytes = res.bytes().await?;
        match serde_json::from_slice::<SchedulerError>(&bytes) {
            Ok(err) => Err(CallError::Rejected(err)),
            Err(_) => Err(CallError::Transport(format!(
                "status {} inesperado en {}: {}",
                status,
                path,
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn register(&self, hostname: &str) -> Result<WorkerId, CallError> {
        let req = WorkerRegisterRequest {
            hostname: hostname.to_string(),
        };
        let res: WorkerRegisterResponse = self.post("/api/v1/workers/register", &req).await?;
        Ok(res.worker_id)
    }

    async fn fetch_task(&self, worker_id: WorkerId) -> Result<Task, CallError> {
        self.post("/api/v1/tasks/next", &TaskAssignmentRequest { worker_id })
            .await
    }

    async fn complete_task(&self, task: TaskRef) -> Result<(), CallError> {
        let req: TaskCompleteRequest = task.into();
        let _: TaskCompleteResponse = self.post("/api/v1/tasks/complete", &req).await?;
        Ok(())
    }

    async fn fail_task(&self, task: TaskRef) -> Result<(), CallError> {
        let req: TaskCompleteRequest = task.into();
        let _: TaskCompleteResponse = self.post("/api/v1/tasks/fail", &req).await?;
        Ok(())
    }
}
