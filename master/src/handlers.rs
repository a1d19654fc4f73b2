use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use common::{
    JobStatus, Task, TaskAssignmentRequest, TaskCompleteRequest, TaskCompleteResponse, TaskRef,
    WorkerInfo, WorkerRegisterRequest, WorkerRegisterResponse,
};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/job", get(get_job))
        .route("/api/v1/tasks", get(list_tasks))
        .route("/api/v1/workers", get(list_workers))
        .route("/api/v1/workers/register", post(register_worker))
        .route("/api/v1/tasks/next", post(assign_task))
        .route("/api/v1/tasks/complete", post(complete_task))
        .route("/api/v1/tasks/fail", post(fail_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Estado derivado del job (conteos por fase, done)
async fn get_job(State(state): State<AppState>) -> Json<JobStatus> {
    Json(state.scheduler.job_status())
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.scheduler.tasks())
}

async fn list_workers(State(state): State<AppState>) -> Json<Vec<WorkerInfo>> {
    Json(state.scheduler.workers())
}

// Registra un worker nuevo (siempre asigna una identidad fresca)
async fn register_worker(
    State(state): State<AppState>,
    Json(req): Json<WorkerRegisterRequest>,
) -> Json<WorkerRegisterResponse> {
    let worker_id = state.scheduler.register_worker(req.hostname);
    Json(WorkerRegisterResponse { worker_id })
}

// Asigna la siguiente tarea idle (si hay)
async fn assign_task(
    State(state): State<AppState>,
    Json(req): Json<TaskAssignmentRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state.scheduler.fetch_task(req.worker_id)?;
    Ok(Json(task))
}

// Worker reporta que terminó una tarea
async fn complete_task(
    State(state): State<AppState>,
    Json(req): Json<TaskCompleteRequest>,
) -> Result<Json<TaskCompleteResponse>, ApiError> {
    let task_ref: TaskRef = req.into();
    state.scheduler.complete_task(&task_ref)?;
    Ok(Json(TaskCompleteResponse { ok: true }))
}

// Worker reporta que no pudo ejecutar una tarea
async fn fail_task(
    State(state): State<AppState>,
    Json(req): Json<TaskCompleteRequest>,
) -> Result<Json<TaskCompleteResponse>, ApiError> {
    let task_ref: TaskRef = req.into();
    state.scheduler.fail_task(&task_ref)?;
    Ok(Json(TaskCompleteResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use common::{Phase, SchedulerError};
    use serde::{de::DeserializeOwned, Serialize};
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    fn app(files: usize, n_reduce: u32) -> (Router, Arc<Scheduler>) {
        let inputs = (0..files).map(|i| format!("in-{}.txt", i)).collect();
        let scheduler = Arc::new(Scheduler::new(inputs, n_reduce, Duration::from_secs(10)));
        (build_router(AppState::new(scheduler.clone())), scheduler)
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(app: &Router, uri: &str, body: &B) -> (StatusCode, R) {
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn register(app: &Router) -> u64 {
        let (status, res): (_, WorkerRegisterResponse) = post_json(
            app,
            "/api/v1/workers/register",
            &WorkerRegisterRequest {
                hostname: "test".into(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        res.worker_id
    }

    #[tokio::test]
    async fn health_responde_ok() {
        let (app, _) = app(1, 1);
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn flujo_register_next_complete() {
        let (app, scheduler) = app(1, 1);
        let worker_id = register(&app).await;

        let (status, task): (_, Task) =
            post_json(&app, "/api/v1/tasks/next", &TaskAssignmentRequest { worker_id }).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task.phase, Phase::Map);
        assert_eq!(task.input_path.as_deref(), Some("in-0.txt"));

        let req = TaskCompleteRequest {
            task_id: task.id,
            phase: task.phase,
            worker_id,
        };
        let (status, res): (_, TaskCompleteResponse) =
            post_json(&app, "/api/v1/tasks/complete", &req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(res.ok);
        assert_eq!(scheduler.job_status().map.completed, 1);

        // segunda vez: la tarea ya no está en progreso
        let (status, err): (_, SchedulerError) =
            post_json(&app, "/api/v1/tasks/complete", &req).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(matches!(err, SchedulerError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn next_sin_registro_da_forbidden() {
        let (app, _) = app(1, 1);
        let (status, err): (_, SchedulerError) =
            post_json(&app, "/api/v1/tasks/next", &TaskAssignmentRequest { worker_id: 42 }).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(err, SchedulerError::UnregisteredWorker { worker_id: 42 });
    }

    #[tokio::test]
    async fn next_sin_tareas_da_no_task_available() {
        let (app, _) = app(1, 1);
        let worker_id = register(&app).await;

        let _: (_, Task) = post_json(&app, "/api/v1/tasks/next", &TaskAssignmentRequest { worker_id }).await;
        let (status, err): (_, SchedulerError) =
            post_json(&app, "/api/v1/tasks/next", &TaskAssignmentRequest { worker_id }).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err, SchedulerError::NoTaskAvailable);
    }

    #[tokio::test]
    async fn fail_devuelve_la_tarea_a_la_cola() {
        let (app, scheduler) = app(1, 1);
        let worker_id = register(&app).await;
        let (_, task): (_, Task) =
            post_json(&app, "/api/v1/tasks/next", &TaskAssignmentRequest { worker_id }).await;

        let req = TaskCompleteRequest {
            task_id: task.id,
            phase: task.phase,
            worker_id,
        };
        let (status, _): (_, TaskCompleteResponse) = post_json(&app, "/api/v1/tasks/fail", &req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(scheduler.job_status().map.idle, 1);
    }

    #[tokio::test]
    async fn job_y_listados() {
        let (app, _) = app(2, 3);
        register(&app).await;

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/job").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let job: JobStatus = serde_json::from_slice(&bytes).unwrap();
        assert!(!job.done);
        assert_eq!((job.map.total, job.reduce.total), (2, 3));

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let tasks: Vec<Task> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(tasks.len(), 5);

        let res = app
            .oneshot(Request::get("/api/v1/workers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let workers: Vec<WorkerInfo> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(workers.len(), 1);
        assert!(workers[0].active);
    }
}
