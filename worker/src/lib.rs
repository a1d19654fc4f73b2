pub mod cleanup;
pub mod client;
pub mod config;
pub mod worker;

pub use cleanup::{CleanupQueue, CleanupSnapshot};
pub use client::{CallError, Coordinator, HttpCoordinator};
pub use config::WorkerConfig;
pub use worker::{Exit, Worker, WorkerReport, WorkerStats};
