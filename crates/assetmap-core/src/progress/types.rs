//! Types for progress tracking of search and export tasks.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::ProgressConfig;

/// Lifecycle status of a tracked task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Nothing started yet
    #[default]
    Idle,
    /// Task in flight
    Running,
    /// Task finished successfully
    Success,
    /// Task failed
    Error,
    /// Task was cancelled
    Cancelled,
}

impl ProgressStatus {
    /// No further events are expected after a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressStatus::Success | ProgressStatus::Error | ProgressStatus::Cancelled
        )
    }

    /// Whether the consumer may dismiss the tracker in this state.
    pub fn is_closable(&self) -> bool {
        !matches!(self, ProgressStatus::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgressStatus::Idle => "Preparing",
            ProgressStatus::Running => "In progress",
            ProgressStatus::Success => "Completed",
            ProgressStatus::Error => "Failed",
            ProgressStatus::Cancelled => "Cancelled",
        }
    }
}

/// Severity of a progress log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    #[default]
    Info,
    Success,
    Error,
    Warning,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Info => "info",
            LogType::Success => "success",
            LogType::Error => "error",
            LogType::Warning => "warning",
        }
    }

    /// Parse the wire value; missing or unknown types are `Info`.
    pub fn parse_or_info(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("success") => LogType::Success,
            Some("error") => LogType::Error,
            Some("warning") => LogType::Warning,
            _ => LogType::Info,
        }
    }
}

/// A progress update emitted by the external job runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub task_id: String,
    pub percent: f64,
    pub status: ProgressStatus,
    #[serde(default)]
    pub status_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
    /// "info" | "success" | "error" | "warning"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_results: Option<u64>,
}

impl ProgressEvent {
    pub fn new(
        task_id: impl Into<String>,
        percent: f64,
        status: ProgressStatus,
        status_text: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            percent,
            status,
            status_text: status_text.into(),
            log_message: None,
            log_type: None,
            current_page: None,
            total_pages: None,
            total_results: None,
            fetched_results: None,
        }
    }

    pub fn with_log(mut self, message: impl Into<String>, log_type: LogType) -> Self {
        self.log_message = Some(message.into());
        self.log_type = Some(log_type.as_str().to_string());
        self
    }

    pub fn with_pages(mut self, current_page: Option<u32>, total_pages: Option<u32>) -> Self {
        self.current_page = current_page;
        self.total_pages = total_pages;
        self
    }

    pub fn with_results(mut self, total_results: Option<u64>, fetched_results: Option<u64>) -> Self {
        self.total_results = total_results;
        self.fetched_results = fetched_results;
        self
    }

    /// True when the event carries at least one page/result counter.
    pub fn has_counters(&self) -> bool {
        self.current_page.is_some()
            || self.total_pages.is_some()
            || self.total_results.is_some()
            || self.fetched_results.is_some()
    }
}

/// One line of the tracker log, stamped when it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLogEntry {
    pub received_at: DateTime<Local>,
    pub message: String,
    #[serde(rename = "type")]
    pub log_type: LogType,
}

impl ProgressLogEntry {
    pub fn now(message: impl Into<String>, log_type: LogType) -> Self {
        Self {
            received_at: Local::now(),
            message: message.into(),
            log_type,
        }
    }

    /// Wall-clock label shown next to the message.
    pub fn time_label(&self) -> String {
        self.received_at
            .format(ProgressConfig::LOG_TIME_FORMAT)
            .to_string()
    }
}

/// Counters that can appear in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryCounter {
    TotalPages,
    CurrentPage,
    TotalResults,
    Fetched,
}

impl SummaryCounter {
    pub fn label(&self) -> &'static str {
        match self {
            SummaryCounter::TotalPages => "Total pages",
            SummaryCounter::CurrentPage => "Current page",
            SummaryCounter::TotalResults => "Total results",
            SummaryCounter::Fetched => "Fetched",
        }
    }
}

/// One summary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub counter: SummaryCounter,
    pub value: u64,
}

impl SummaryItem {
    /// Summary built from only the counters present in `event`, in display order.
    pub fn from_event(event: &ProgressEvent) -> Vec<SummaryItem> {
        [
            (SummaryCounter::TotalPages, event.total_pages.map(u64::from)),
            (SummaryCounter::CurrentPage, event.current_page.map(u64::from)),
            (SummaryCounter::TotalResults, event.total_results),
            (SummaryCounter::Fetched, event.fetched_results),
        ]
        .into_iter()
        .filter_map(|(counter, value)| value.map(|value| SummaryItem { counter, value }))
        .collect()
    }
}

/// Everything an observer needs to render a tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub open: bool,
    pub title: String,
    pub task_id: Option<String>,
    pub status: ProgressStatus,
    pub percent: f64,
    pub status_text: String,
    pub logs: Vec<ProgressLogEntry>,
    pub summary: Vec<SummaryItem>,
    /// Whether a cancel action is offered while running.
    pub cancellable: bool,
    /// Incremented on every change.
    pub revision: u64,
}

impl ProgressSnapshot {
    pub fn is_closable(&self) -> bool {
        self.status.is_closable()
    }
}
