pub mod catalog;
pub mod config;
pub mod error;
pub mod failover;
pub mod handlers;
pub mod registry;
pub mod scheduler;
pub mod state;

pub use config::MasterConfig;
pub use scheduler::Scheduler;
pub use state::AppState;
