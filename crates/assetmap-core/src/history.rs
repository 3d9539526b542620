//! Query history browsing and replay.
//!
//! History is persisted by the backend. The browser keeps the last loaded
//! list, filters it locally, and replays a record as a new export through the
//! job coordinator with an auto-dismissing tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProgressConfig;
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};
use crate::jobs::{ExportOutcome, JobCoordinator};
use crate::progress::{DismissPolicy, ProgressTracker};

/// One persisted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// Lowercase platform key, as stored. May name a platform this core does not know.
    pub platform: String,
    pub query: String,
    pub results_count: u64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl HistoryRecord {
    pub fn platform_kind(&self) -> Result<Platform> {
        self.platform.parse()
    }

    /// Only successful queries that returned something can be re-exported.
    pub fn is_exportable(&self) -> bool {
        self.success && self.results_count > 0
    }
}

/// Local filter over loaded records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// `None` keeps every platform.
    pub platform: Option<Platform>,
    pub keyword: String,
}

impl HistoryFilter {
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        if let Some(platform) = self.platform {
            if record.platform != platform.as_str() {
                return false;
            }
        }
        let keyword = self.keyword.trim().to_lowercase();
        keyword.is_empty()
            || record.query.to_lowercase().contains(&keyword)
            || record.platform.to_lowercase().contains(&keyword)
    }
}

/// Counts over the loaded records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// History view state.
#[derive(Debug)]
pub struct HistoryBrowser {
    coordinator: JobCoordinator,
    records: Vec<HistoryRecord>,
    filter: HistoryFilter,
    tracker: ProgressTracker,
}

impl HistoryBrowser {
    pub fn new(coordinator: JobCoordinator) -> Self {
        let tracker = ProgressTracker::new("Export history record")
            .with_policy(DismissPolicy::AutoAfter(ProgressConfig::AUTO_DISMISS_DELAY));
        Self {
            coordinator,
            records: Vec::new(),
            filter: HistoryFilter::default(),
            tracker,
        }
    }

    /// Replace the local list with the backend's.
    pub async fn reload(&mut self) -> Result<&[HistoryRecord]> {
        self.records = self.coordinator.backend().get_query_history().await?;
        debug!("Loaded {} history records", self.records.len());
        Ok(&self.records)
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn filter(&self) -> &HistoryFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: HistoryFilter) {
        self.filter = filter;
    }

    /// Records passing the current filter, in stored order.
    pub fn visible(&self) -> Vec<&HistoryRecord> {
        self.records
            .iter()
            .filter(|record| self.filter.matches(record))
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn stats(&self) -> HistoryStats {
        let succeeded = self.records.iter().filter(|r| r.success).count();
        HistoryStats {
            total: self.records.len(),
            succeeded,
            failed: self.records.len() - succeeded,
        }
    }

    /// Delete one record. On failure the local list is left as it was.
    ///
    /// If only the follow-up reload fails, the record is dropped locally and
    /// the delete still counts as done.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.coordinator.backend().delete_query_history(id).await?;
        if let Err(e) = self.reload().await {
            warn!("History reload after deleting {} failed: {}", id, e);
            self.records.retain(|record| record.id != id);
        }
        Ok(())
    }

    /// Delete everything. On failure the local list is left as it was.
    pub async fn clear(&mut self) -> Result<()> {
        self.coordinator.backend().clear_all_history().await?;
        if let Err(e) = self.reload().await {
            warn!("History reload after clearing failed: {}", e);
            self.records.clear();
        }
        Ok(())
    }

    /// Write the stored history to a CSV file under `export_path`.
    pub async fn export_csv(&self, export_path: &str) -> Result<String> {
        if self.records.is_empty() {
            return Err(AssetMapError::empty("history"));
        }
        self.coordinator
            .backend()
            .export_query_history(export_path)
            .await
    }

    /// The tracker used by [`HistoryBrowser::export_record`].
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Re-run the record with `id` as a platform export.
    pub async fn export_record(&self, id: &str) -> Result<ExportOutcome> {
        let record = self.find(id).ok_or_else(|| AssetMapError::Validation {
            field: "id".into(),
            message: format!("no history record {}", id),
        })?;
        if !record.is_exportable() {
            warn!("Refusing to export history record {}", id);
            return Err(AssetMapError::Validation {
                field: "history_record".into(),
                message: "only successful queries with results can be exported".into(),
            });
        }
        self.coordinator
            .export_history_record(record, &self.tracker)
            .await
    }
}
