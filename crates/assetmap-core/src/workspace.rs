//! The asset-query view: composer, held results and trackers together.

use tracing::debug;

use crate::backend::{AssetRecord, ExportRequest, SearchRequest, SearchResultPage};
use crate::composer::{LocationFilter, QueryComposer};
use crate::config::ExportConfig;
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};
use crate::jobs::{ExportOutcome, ExportScope, JobCoordinator};
use crate::progress::{ProgressStatus, ProgressTracker};

/// State of one query view.
#[derive(Debug)]
pub struct QueryWorkspace {
    coordinator: JobCoordinator,
    composer: QueryComposer,
    results: SearchResultPage,
    page: u32,
    page_size: u32,
    search_tracker: ProgressTracker,
    export_tracker: ProgressTracker,
}

impl QueryWorkspace {
    pub fn new(coordinator: JobCoordinator, platform: Platform, page_size: u32) -> Self {
        Self {
            coordinator,
            composer: QueryComposer::new(platform),
            results: SearchResultPage::default(),
            page: 1,
            page_size: page_size.max(1),
            search_tracker: ProgressTracker::new("Search"),
            export_tracker: ProgressTracker::new("Export").with_cancel(true),
        }
    }

    pub fn composer(&self) -> &QueryComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut QueryComposer {
        &mut self.composer
    }

    pub fn platform(&self) -> Platform {
        self.composer.platform()
    }

    pub fn results(&self) -> &[AssetRecord] {
        &self.results.results
    }

    pub fn total(&self) -> u64 {
        self.results.total
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search_tracker(&self) -> &ProgressTracker {
        &self.search_tracker
    }

    pub fn export_tracker(&self) -> &ProgressTracker {
        &self.export_tracker
    }

    /// Change platform, dropping the query, suggestions and held results.
    pub fn switch_platform(&mut self, platform: Platform) {
        self.composer.switch_platform(platform);
        self.results = SearchResultPage::default();
        self.page = 1;
    }

    pub fn apply_location(&mut self, filter: &LocationFilter) -> bool {
        self.composer.apply_location(filter)
    }

    /// Run the composed query from the first page.
    pub async fn search(&mut self) -> Result<&SearchResultPage> {
        self.run_search(1).await
    }

    /// Fetch another page (and page size) of the current query.
    pub async fn change_page(&mut self, page: u32, page_size: u32) -> Result<&SearchResultPage> {
        if page_size == 0 {
            return Err(AssetMapError::Validation {
                field: "page_size".into(),
                message: "page size must be positive".into(),
            });
        }
        self.page_size = page_size;
        self.run_search(page.max(1)).await
    }

    async fn run_search(&mut self, page: u32) -> Result<&SearchResultPage> {
        let request = SearchRequest::new(
            self.composer.platform(),
            self.composer.text().trim(),
            page,
            self.page_size,
        );
        let results = self
            .coordinator
            .search(&request, Some(&self.search_tracker))
            .await?;
        debug!(
            "Holding {} of {} results (page {})",
            results.results.len(),
            results.total,
            page
        );
        self.results = results;
        self.page = page;
        Ok(&self.results)
    }

    /// Export the pages currently shown for the composed query.
    pub async fn export_current(&self) -> Result<ExportOutcome> {
        if self.results.is_empty() {
            return Err(AssetMapError::empty("results"));
        }
        let request = ExportRequest::new(
            self.composer.text().trim(),
            ExportConfig::CURRENT_VIEW_PAGES,
            self.page_size,
        );
        self.coordinator
            .export(
                ExportScope::Current,
                self.composer.platform(),
                &request,
                &self.export_tracker,
            )
            .await
    }

    /// Ask the backend to stop the running export.
    ///
    /// The export tracker only moves to `cancelled` once the backend reports it.
    pub async fn cancel_export(&self) -> Result<()> {
        let snapshot = self.export_tracker.snapshot();
        match snapshot.task_id {
            Some(task_id) if snapshot.status == ProgressStatus::Running => {
                self.coordinator.cancel_export(&task_id).await
            }
            _ => Err(AssetMapError::Validation {
                field: "export".into(),
                message: "no export is running".into(),
            }),
        }
    }
}
