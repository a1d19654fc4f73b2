use common::apps::WordCount;
use common::{Phase, SchedulerError, TaskRef};
use master::{handlers, AppState, Scheduler};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::net::TcpListener;
use worker::{CallError, Coordinator, Exit, HttpCoordinator, Worker, WorkerConfig};

async fn serve(scheduler: Arc<Scheduler>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = handlers::build_router(AppState::new(scheduler));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> HttpCoordinator {
    HttpCoordinator::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn rechazos_llegan_tipados() {
    let scheduler = Arc::new(Scheduler::new(vec!["a.txt".into()], 1, Duration::from_secs(10)));
    let coordinator = client(&serve(scheduler).await);

    let err = coordinator.fetch_task(42).await.unwrap_err();
    assert!(matches!(
        err,
        CallError::Rejected(SchedulerError::UnregisteredWorker { worker_id: 42 })
    ));

    let id = coordinator.register("test").await.unwrap();
    let task = coordinator.fetch_task(id).await.unwrap();
    assert_eq!(task.phase, Phase::Map);
    assert_eq!(task.owner, Some(id));

    let err = coordinator.fetch_task(id).await.unwrap_err();
    assert!(matches!(err, CallError::Rejected(SchedulerError::NoTaskAvailable)));

    let stale = TaskRef {
        task_id: task.id,
        phase: task.phase,
        worker_id: id + 1,
    };
    let err = coordinator.complete_task(stale).await.unwrap_err();
    assert!(matches!(err, CallError::Rejected(ref e) if e.requires_reregistration()));

    coordinator.complete_task(task.to_ref().unwrap()).await.unwrap();
}

#[tokio::test]
async fn master_caido_es_fallo_de_transporte() {
    // puerto libre sin nadie escuchando
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let coordinator = client(&format!("http://{}", addr));
    let err = coordinator.register("test").await.unwrap_err();
    assert!(matches!(err, CallError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_completo_sobre_http() {
    let inputs_dir = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let input = inputs_dir.path().join("pg-0.txt");
    fs::write(&input, "uno dos dos").unwrap();

    let scheduler = Arc::new(Scheduler::new(
        vec![input.to_string_lossy().to_string()],
        2,
        Duration::from_secs(10),
    ));
    let base_url = serve(scheduler.clone()).await;

    let config = WorkerConfig {
        master_base_url: base_url.clone(),
        work_dir: work_dir.path().to_path_buf(),
        poll_interval: Duration::from_millis(5),
        ..WorkerConfig::default()
    };
    let report = Worker::new(client(&base_url), Arc::new(WordCount), config, "http".into())
        .run()
        .await;

    assert_eq!(report.exit, Exit::JobDone);
    assert!(scheduler.done());

    let mut lines: Vec<String> = (0..2)
        .flat_map(|y| {
            fs::read_to_string(work_dir.path().join(format!("mr-out-{}", y)))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["dos 2", "uno 1"]);
}
