//! Search and export orchestration.

use tracing::{debug, info, warn};

use super::task::{pages_for, Task, TaskIdGenerator};
use crate::backend::{ExportRequest, SearchRequest, SearchResultPage, SharedBackend};
use crate::config::{ExportConfig, ProgressConfig};
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};
use crate::history::HistoryRecord;
use crate::progress::{LogType, ProgressBus, ProgressStatus, ProgressTracker};

/// Which export command a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// The result pages of the current query on one platform.
    Current,
    /// Everything the platform returns for the query, up to the page limit.
    Platform,
    /// The query on every platform, as one call without progress events.
    AllPlatforms,
}

impl ExportScope {
    pub fn label(&self) -> &'static str {
        match self {
            ExportScope::Current => "current",
            ExportScope::Platform => "platform",
            ExportScope::AllPlatforms => "all",
        }
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub task: Task,
    /// File written by the backend; `None` for all-platform exports.
    pub path: Option<String>,
}

/// Drives backend calls and keeps progress trackers in step with them.
///
/// Callers own the "one task per tracker at a time" rule: the coordinator
/// opens whatever tracker it is handed.
#[derive(Clone)]
pub struct JobCoordinator {
    backend: SharedBackend,
    bus: ProgressBus,
    ids: std::sync::Arc<TaskIdGenerator>,
}

impl std::fmt::Debug for JobCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCoordinator").finish_non_exhaustive()
    }
}

impl JobCoordinator {
    /// `bus` must be the bus the backend's progress events are published to.
    pub fn new(backend: SharedBackend, bus: ProgressBus) -> Self {
        Self {
            backend,
            bus,
            ids: std::sync::Arc::new(TaskIdGenerator::new()),
        }
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    pub fn task_ids(&self) -> &TaskIdGenerator {
        &self.ids
    }

    /// Run one search page.
    ///
    /// With a tracker, it goes 30% while preparing, 60% while the call is in
    /// flight, then 100% success or error. Failures are always returned.
    pub async fn search(
        &self,
        request: &SearchRequest,
        tracker: Option<&ProgressTracker>,
    ) -> Result<SearchResultPage> {
        if request.query.trim().is_empty() {
            return Err(AssetMapError::empty("query"));
        }

        let task = Task::search(self.ids.search_id(), request.platform, request.query.as_str());
        if let Some(tracker) = tracker {
            tracker.open(task.task_id.as_str(), "Preparing search...");
            tracker.set_progress(ProgressConfig::SEARCH_PREPARE_PERCENT, "Preparing search...");
            tracker.log(
                format!(
                    "Searching {}: {}",
                    request.platform.display_name(),
                    request.query
                ),
                LogType::Info,
            );
            tracker.set_progress(
                ProgressConfig::SEARCH_IN_FLIGHT_PERCENT,
                format!("Querying {}...", request.platform.display_name()),
            );
        }

        debug!(
            "Search {} on {} page {} (size {})",
            task.task_id, request.platform, request.page, request.page_size
        );
        match self.backend.search_assets(request).await {
            Ok(page) => {
                if let Some(tracker) = tracker {
                    tracker.finish(
                        ProgressStatus::Success,
                        100.0,
                        format!("Found {} results", page.total),
                        Some((
                            format!(
                                "Search finished: {} total, {} on this page",
                                page.total,
                                page.results.len()
                            ),
                            LogType::Success,
                        )),
                    );
                }
                Ok(page)
            }
            Err(err) => {
                warn!("Search {} on {} failed: {}", task.task_id, request.platform, err);
                if let Some(tracker) = tracker {
                    let text = format!("Failed: {}", err.user_message());
                    tracker.finish(
                        ProgressStatus::Error,
                        100.0,
                        text.clone(),
                        Some((text, LogType::Error)),
                    );
                }
                Err(err)
            }
        }
    }

    /// Run an export and track it.
    ///
    /// Current and platform scopes are reported by the backend's own progress
    /// events; this only opens the tracker and folds a rejected call into it.
    /// The all-platforms scope gets one synthetic final update instead.
    pub async fn export(
        &self,
        scope: ExportScope,
        platform: Platform,
        request: &ExportRequest,
        tracker: &ProgressTracker,
    ) -> Result<ExportOutcome> {
        request.validate()?;
        let bound = (scope != ExportScope::AllPlatforms).then_some(platform);
        let task = Task::export(self.ids.export_id(), bound, request.query.as_str());
        self.run_export(task, scope, platform, request, tracker)
            .await
    }

    async fn run_export(
        &self,
        task: Task,
        scope: ExportScope,
        platform: Platform,
        request: &ExportRequest,
        tracker: &ProgressTracker,
    ) -> Result<ExportOutcome> {
        let task_id = task.task_id.clone();
        tracker.open(task_id.as_str(), "Preparing export...");
        tracker.log(
            format!(
                "Export started: scope={}, platform={}, pages={}",
                scope.label(),
                platform.display_name(),
                request.pages
            ),
            LogType::Info,
        );
        info!("Export {} started ({} on {})", task_id, scope.label(), platform);

        match scope {
            ExportScope::Current | ExportScope::Platform => {
                let subscription = tracker.attach(&self.bus);
                let result = self
                    .backend
                    .export_results_with_progress(&task_id, platform, request)
                    .await;
                subscription.dispose();

                match result {
                    Ok(path) => {
                        info!("Export {} wrote {}", task_id, path);
                        Ok(ExportOutcome {
                            task,
                            path: Some(path),
                        })
                    }
                    Err(err) => {
                        warn!("Export {} failed: {}", task_id, err);
                        tracker.fail(&err.user_message());
                        Err(err)
                    }
                }
            }
            ExportScope::AllPlatforms => {
                tracker.set_progress(0.0, "Exporting all platforms...");
                match self.backend.export_all_platforms(request).await {
                    Ok(()) => {
                        tracker.finish(
                            ProgressStatus::Success,
                            100.0,
                            "All platforms exported",
                            Some(("All platforms exported".to_string(), LogType::Success)),
                        );
                        Ok(ExportOutcome { task, path: None })
                    }
                    Err(err) => {
                        warn!("Export {} failed: {}", task_id, err);
                        tracker.fail(&err.user_message());
                        Err(err)
                    }
                }
            }
        }
    }

    /// Re-run a history record as a platform export.
    ///
    /// Only successful records with results qualify. The export covers
    /// every result at the history page size, with no time window.
    pub async fn export_history_record(
        &self,
        record: &HistoryRecord,
        tracker: &ProgressTracker,
    ) -> Result<ExportOutcome> {
        if !record.is_exportable() {
            return Err(AssetMapError::Validation {
                field: "history_record".into(),
                message: format!(
                    "record {} cannot be exported (success: {}, results: {})",
                    record.id, record.success, record.results_count
                ),
            });
        }
        let platform: Platform = record.platform.parse()?;
        let pages = pages_for(record.results_count, ExportConfig::HISTORY_PAGE_SIZE);
        if pages == 0 {
            return Err(AssetMapError::ZeroPages);
        }

        let request = ExportRequest::new(record.query.clone(), pages, ExportConfig::HISTORY_PAGE_SIZE);
        request.validate()?;
        let task = Task::export(
            self.ids.platform_export_id(platform),
            Some(platform),
            record.query.as_str(),
        );
        self.run_export(task, ExportScope::Platform, platform, &request, tracker)
            .await
    }

    /// Forward a cancel request. The tracker only changes when the backend
    /// reports the task as cancelled.
    pub async fn cancel_export(&self, task_id: &str) -> Result<()> {
        debug!("Requesting cancellation of {}", task_id);
        self.backend.cancel_export(task_id).await
    }
}
