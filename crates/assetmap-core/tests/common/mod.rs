//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use assetmap_core::backend::{
    ApiKeyList, ConversionResult, KeyValidation, SearchResultPage,
};
use assetmap_core::{
    AssetMapError, ExportRequest, HistoryRecord, JobCoordinator, Platform, ProgressBus,
    ProgressEvent, ProgressSnapshot, ProgressStatus, ProgressTracker, ReconBackend, Result,
    SearchRequest, Settings,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A recorded export call.
#[derive(Debug, Clone)]
pub struct ExportCall {
    pub task_id: Option<String>,
    pub platform: Option<Platform>,
    pub request: ExportRequest,
}

#[derive(Default)]
pub struct MockState {
    /// Command names in call order.
    pub calls: Vec<String>,
    /// Commands that fail with a backend error.
    pub failing: HashSet<&'static str>,
    pub search_result: SearchResultPage,
    /// `(percent, status)` published for each export before it returns.
    pub export_script: Vec<(f64, ProgressStatus)>,
    pub exports: Vec<ExportCall>,
    /// Tracker whose state `export_all_platforms` records while it runs.
    pub watched_tracker: Option<ProgressTracker>,
    pub seen_during_export_all: Vec<ProgressSnapshot>,
    pub history: Vec<HistoryRecord>,
    pub supported: Vec<String>,
    pub conversions: Vec<ConversionResult>,
    pub keys: HashMap<Platform, Vec<(String, Option<String>)>>,
    /// Keys `add_api_key` rejects.
    pub rejected_keys: HashSet<String>,
    /// Keys `validate_api_key` reports as invalid.
    pub invalid_keys: HashSet<String>,
    pub settings: Settings,
    pub saved_settings: Option<Settings>,
}

pub struct MockBackend {
    pub bus: ProgressBus,
    pub state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(bus: ProgressBus) -> Arc<Self> {
        let state = MockState {
            supported: Platform::ALL.iter().map(|p| p.as_str().to_string()).collect(),
            ..MockState::default()
        };
        Arc::new(Self {
            bus,
            state: Mutex::new(state),
        })
    }

    pub fn fail(&self, command: &'static str) {
        self.state.lock().unwrap().failing.insert(command);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls().iter().filter(|c| *c == command).count()
    }

    fn enter(&self, command: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(command.to_string());
        if state.failing.contains(command) {
            return Err(AssetMapError::Backend {
                command: command.to_string(),
                message: format!("{} failed", command),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReconBackend for MockBackend {
    async fn search_assets(&self, _request: &SearchRequest) -> Result<SearchResultPage> {
        self.enter("search_assets")?;
        Ok(self.state.lock().unwrap().search_result.clone())
    }

    async fn export_results_with_progress(
        &self,
        task_id: &str,
        platform: Platform,
        request: &ExportRequest,
    ) -> Result<String> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state.exports.push(ExportCall {
                task_id: Some(task_id.to_string()),
                platform: Some(platform),
                request: request.clone(),
            });
            state.export_script.clone()
        };
        for (percent, status) in script {
            self.bus.publish(&ProgressEvent::new(task_id, percent, status, "exporting"));
        }
        self.enter("export_results_with_progress")?;
        Ok(format!("/exports/{}.xlsx", task_id))
    }

    async fn export_all_platforms(&self, request: &ExportRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.exports.push(ExportCall {
            task_id: None,
            platform: None,
            request: request.clone(),
        });
        let seen = state.watched_tracker.as_ref().map(ProgressTracker::snapshot);
        state.seen_during_export_all.extend(seen);
        drop(state);
        self.enter("export_all_platforms")
    }

    async fn get_query_history(&self) -> Result<Vec<HistoryRecord>> {
        self.enter("get_query_history")?;
        Ok(self.state.lock().unwrap().history.clone())
    }

    async fn delete_query_history(&self, id: &str) -> Result<()> {
        self.enter("delete_query_history")?;
        self.state.lock().unwrap().history.retain(|r| r.id != id);
        Ok(())
    }

    async fn clear_all_history(&self) -> Result<()> {
        self.enter("clear_all_history")?;
        self.state.lock().unwrap().history.clear();
        Ok(())
    }

    async fn export_query_history(&self, export_path: &str) -> Result<String> {
        self.enter("export_query_history")?;
        Ok(format!("{}/query_history.csv", export_path))
    }

    async fn get_supported_platforms(&self) -> Result<Vec<String>> {
        self.enter("get_supported_platforms")?;
        Ok(self.state.lock().unwrap().supported.clone())
    }

    async fn validate_query_syntax(&self, query: &str, _platform: Platform) -> Result<bool> {
        self.enter("validate_query_syntax")?;
        if query.contains("((") {
            return Err(AssetMapError::Backend {
                command: "validate_query_syntax".into(),
                message: "unbalanced parentheses".into(),
            });
        }
        Ok(true)
    }

    async fn convert_query(&self, query: &str, _from: Platform, to: Platform) -> Result<String> {
        self.enter("convert_query")?;
        Ok(format!("{}:{}", to, query))
    }

    async fn convert_query_to_all(
        &self,
        _query: &str,
        _from: Platform,
    ) -> Result<Vec<ConversionResult>> {
        self.enter("convert_query_to_all")?;
        Ok(self.state.lock().unwrap().conversions.clone())
    }

    async fn get_api_keys(&self, platform: Platform) -> Result<ApiKeyList> {
        self.enter("get_api_keys")?;
        let state = self.state.lock().unwrap();
        let keys = state.keys.get(&platform).cloned().unwrap_or_default();
        Ok(ApiKeyList {
            api_keys: keys.iter().map(|(k, _)| k.clone()).collect(),
            emails: platform
                .requires_email()
                .then(|| keys.iter().map(|(_, e)| e.clone().unwrap_or_default()).collect()),
        })
    }

    async fn add_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<()> {
        self.enter("add_api_key")?;
        let mut state = self.state.lock().unwrap();
        if state.rejected_keys.contains(api_key) {
            return Err(AssetMapError::Backend {
                command: "add_api_key".into(),
                message: "duplicate key".into(),
            });
        }
        state
            .keys
            .entry(platform)
            .or_default()
            .push((api_key.to_string(), email.map(String::from)));
        Ok(())
    }

    async fn delete_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        _email: Option<&str>,
    ) -> Result<()> {
        self.enter("delete_api_key")?;
        if let Some(keys) = self.state.lock().unwrap().keys.get_mut(&platform) {
            keys.retain(|(k, _)| k != api_key);
        }
        Ok(())
    }

    async fn validate_api_key(
        &self,
        _platform: Platform,
        api_key: &str,
        _email: Option<&str>,
    ) -> Result<KeyValidation> {
        self.enter("validate_api_key")?;
        let valid = !self.state.lock().unwrap().invalid_keys.contains(api_key);
        Ok(KeyValidation {
            valid,
            message: (!valid).then(|| "key rejected".to_string()),
            quota: valid.then(|| serde_json::json!(100)),
        })
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.enter("get_settings")?;
        Ok(self.state.lock().unwrap().settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.enter("save_settings")?;
        self.state.lock().unwrap().saved_settings = Some(settings.clone());
        Ok(())
    }
}

/// A mock backend and a coordinator sharing one bus.
pub fn setup() -> (Arc<MockBackend>, JobCoordinator) {
    let bus = ProgressBus::new();
    let backend = MockBackend::new(bus.clone());
    let coordinator = JobCoordinator::new(backend.clone(), bus);
    (backend, coordinator)
}

pub fn history_record(
    id: &str,
    platform: &str,
    query: &str,
    results_count: u64,
    success: bool,
) -> HistoryRecord {
    HistoryRecord {
        id: id.to_string(),
        platform: platform.to_string(),
        query: query.to_string(),
        results_count,
        timestamp: Utc::now(),
        success,
        error_message: (!success).then(|| "request failed".to_string()),
    }
}
