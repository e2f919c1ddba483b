//! Batch orchestration: validate, expand, fetch concurrently, filter and
//! dispatch.
//!
//! A batch is validated as a whole before anything touches the network.
//! Each expanded task then runs on its own tokio task:
//! fetch → filter → dispatch. The batch completes when the slowest task
//! does.

mod plan;
mod runner;
mod types;

pub use plan::{follow_up_requests, plan_batch};
pub use runner::TaskOrchestrator;
pub use types::{BatchReport, FetchRequest, FetchTask, TaskOutcome, ValidationError};
