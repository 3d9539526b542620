//! Contract with the backend command surface.
//!
//! The core never talks to the recon platforms itself. Searches, exports,
//! translation, key storage, settings and history persistence all live behind
//! [`ReconBackend`]. [`RpcBackend`] implements it over the local IPC
//! transport; tests substitute in-memory implementations.

mod rpc;
mod types;

pub use rpc::RpcBackend;
pub use types::{
    ApiKeyEntry, ApiKeyList, AssetRecord, ConversionResult, ExportRequest, KeyValidation,
    SearchRequest, SearchResultPage, TimeRange,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};
use crate::history::HistoryRecord;
use crate::settings::Settings;

/// Shared handle to a backend.
pub type SharedBackend = Arc<dyn ReconBackend>;

/// Commands the core consumes.
///
/// Every method suspends the caller until the backend answers. Progress of
/// `export_results_with_progress` is reported separately, as events on the
/// progress bus keyed by `task_id`.
#[async_trait]
pub trait ReconBackend: Send + Sync {
    async fn search_assets(&self, request: &SearchRequest) -> Result<SearchResultPage>;

    /// Export `request.pages` pages for one platform. Returns the written file path.
    async fn export_results_with_progress(
        &self,
        task_id: &str,
        platform: Platform,
        request: &ExportRequest,
    ) -> Result<String>;

    /// Export the query from every platform. Emits no progress events.
    async fn export_all_platforms(&self, request: &ExportRequest) -> Result<()>;

    /// Ask the backend to stop a running export.
    ///
    /// Optional: backends that cannot cancel keep the default.
    async fn cancel_export(&self, task_id: &str) -> Result<()> {
        let _ = task_id;
        Err(AssetMapError::Unsupported {
            command: "cancel_export".to_string(),
        })
    }

    async fn get_query_history(&self) -> Result<Vec<HistoryRecord>>;
    async fn delete_query_history(&self, id: &str) -> Result<()>;
    async fn clear_all_history(&self) -> Result<()>;
    /// Write the whole history to a CSV file under `export_path`. Returns the file path.
    async fn export_query_history(&self, export_path: &str) -> Result<String>;

    /// Platform keys the translator knows, possibly including ones this core does not.
    async fn get_supported_platforms(&self) -> Result<Vec<String>>;
    /// `Ok(true)` when valid; a syntax problem is a `Backend` error carrying the message.
    async fn validate_query_syntax(&self, query: &str, platform: Platform) -> Result<bool>;
    async fn convert_query(&self, query: &str, from: Platform, to: Platform) -> Result<String>;
    async fn convert_query_to_all(&self, query: &str, from: Platform)
        -> Result<Vec<ConversionResult>>;

    async fn get_api_keys(&self, platform: Platform) -> Result<ApiKeyList>;
    async fn add_api_key(&self, platform: Platform, api_key: &str, email: Option<&str>)
        -> Result<()>;
    async fn delete_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<()>;
    async fn validate_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<KeyValidation>;

    async fn get_settings(&self) -> Result<Settings>;
    async fn save_settings(&self, settings: &Settings) -> Result<()>;
}
