//! Task identity.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::dialect::Platform;

/// What a task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Search,
    Export,
}

/// One identified long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub query: String,
}

impl Task {
    pub fn search(task_id: String, platform: Platform, query: impl Into<String>) -> Self {
        Self {
            task_id,
            kind: TaskKind::Search,
            platform: Some(platform),
            query: query.into(),
        }
    }

    /// An export; `platform` is `None` when it spans every platform.
    pub fn export(task_id: String, platform: Option<Platform>, query: impl Into<String>) -> Self {
        Self {
            task_id,
            kind: TaskKind::Export,
            platform,
            query: query.into(),
        }
    }
}

/// Millisecond-clock task id source.
///
/// Ids embed the wall clock in milliseconds but never repeat: when two tasks
/// start within the same millisecond (or the clock steps back) the later one
/// gets the previous stamp plus one.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    last: AtomicI64,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next strictly increasing millisecond stamp.
    pub fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// `export_<millis>`
    pub fn export_id(&self) -> String {
        format!("export_{}", self.next_stamp())
    }

    /// `export_<platform>_<millis>`
    pub fn platform_export_id(&self, platform: Platform) -> String {
        format!("export_{}_{}", platform.as_str(), self.next_stamp())
    }

    /// `search_<millis>`
    pub fn search_id(&self) -> String {
        format!("search_{}", self.next_stamp())
    }
}

/// Pages needed to cover `results` at `page_size` per page.
///
/// Zero results (or a zero page size) need zero pages.
pub fn pages_for(results: u64, page_size: u32) -> u32 {
    if results == 0 || page_size == 0 {
        return 0;
    }
    let pages = results.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}
