//! Paged search and multi-page export jobs.

mod coordinator;
mod task;

pub use coordinator::{ExportOutcome, ExportScope, JobCoordinator};
pub use task::{pages_for, Task, TaskIdGenerator, TaskKind};
