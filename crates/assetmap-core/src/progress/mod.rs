//! Progress tracking for long-running search and export tasks.

mod bus;
mod tracker;
mod types;

pub use bus::{ProgressBus, Subscription};
pub use tracker::{DismissPolicy, ProgressTracker};
pub use types::{
    LogType, ProgressEvent, ProgressLogEntry, ProgressSnapshot, ProgressStatus, SummaryCounter,
    SummaryItem,
};
