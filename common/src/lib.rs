pub mod app;
pub mod apps;
pub mod codec;
pub mod commit;
pub mod engine;
pub mod error;
pub mod job;
pub mod partition;
pub mod task;
pub mod worker;

pub use app::MapReduceApp;
pub use codec::{CodecError, KeyValue};
pub use engine::{EngineError, ReduceOutput, TaskOutput};
pub use error::SchedulerError;
pub use job::{JobStatus, PhaseProgress};
pub use task::{Phase, Task, TaskId, TaskRef, TaskState};
pub use worker::{
    TaskAssignmentRequest, TaskCompleteRequest, TaskCompleteResponse, WorkerId, WorkerInfo,
    WorkerRegisterRequest, WorkerRegisterResponse,
};
