//! Asset Mapping Core - Headless library for multi-platform asset search.
//!
//! This crate lets an operator query four internet-asset search engines
//! (Hunter, FOFA, Quake, DayDayMap) through one interface. It owns the
//! per-platform query dialects, the query composer, and the orchestration of
//! paginated search and export jobs with live progress. Network access to the
//! engines, query translation and persistence live behind the
//! [`ReconBackend`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use assetmap_core::{JobCoordinator, ProgressBus, RpcBackend, QueryWorkspace, Platform};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> assetmap_core::Result<()> {
//!     let bus = ProgressBus::global().clone();
//!     let backend = RpcBackend::connect("127.0.0.1:7420".parse().unwrap(), bus.clone()).await?;
//!     let coordinator = JobCoordinator::new(Arc::new(backend), bus);
//!
//!     let mut workspace = QueryWorkspace::new(coordinator, Platform::Fofa, 20);
//!     workspace.composer_mut().select("domain=\"example.com\"");
//!     let page = workspace.search().await?;
//!     println!("Found {} assets", page.total);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cancel;
pub mod composer;
pub mod config;
pub mod dialect;
pub mod error;
pub mod history;
pub mod ipc;
pub mod jobs;
pub mod keys;
pub mod progress;
pub mod settings;
pub mod telemetry;
pub mod translate;
pub mod workspace;

// Re-export commonly used types
pub use backend::{
    ExportRequest, ReconBackend, RpcBackend, SearchRequest, SearchResultPage, SharedBackend,
    TimeRange,
};
pub use cancel::CancellationToken;
pub use composer::{LocationFilter, QueryComposer};
pub use dialect::{dialect_for, Platform, PlatformDialect, SyntaxHint};
pub use error::{AssetMapError, Result};
pub use history::{HistoryBrowser, HistoryFilter, HistoryRecord};
pub use jobs::{pages_for, ExportOutcome, ExportScope, JobCoordinator, Task, TaskKind};
pub use keys::{BatchOutcome, KeyManager};
pub use progress::{
    DismissPolicy, ProgressBus, ProgressEvent, ProgressSnapshot, ProgressStatus, ProgressTracker,
    Subscription,
};
pub use settings::{Settings, SettingsService, ThemeMode, ThemeStore};
pub use translate::{ConversionTarget, TranslationFacade};
pub use workspace::QueryWorkspace;
