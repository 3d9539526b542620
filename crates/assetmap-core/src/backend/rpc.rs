//! [`ReconBackend`] over the local IPC transport.
//!
//! Command names and camelCase parameter names match the backend's command
//! table; results are decoded into the typed wire structs.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::net::SocketAddr;
use tracing::debug;

use super::types::{
    ApiKeyList, ConversionResult, ExportRequest, KeyValidation, SearchRequest, SearchResultPage,
};
use super::ReconBackend;
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};
use crate::history::HistoryRecord;
use crate::ipc::IpcClient;
use crate::progress::ProgressBus;
use crate::settings::Settings;

/// Backend reached through an [`IpcClient`].
#[derive(Debug)]
pub struct RpcBackend {
    client: IpcClient,
}

impl RpcBackend {
    pub fn new(client: IpcClient) -> Self {
        Self { client }
    }

    /// Connect to a backend server, publishing progress to `bus`.
    pub async fn connect(addr: SocketAddr, bus: ProgressBus) -> Result<Self> {
        Ok(Self::new(IpcClient::connect_with_bus(addr, bus).await?))
    }

    pub fn client(&self) -> &IpcClient {
        &self.client
    }

    async fn invoke<T: DeserializeOwned>(&self, command: &str, params: serde_json::Value) -> Result<T> {
        let value = self.client.call(command, params).await?;
        serde_json::from_value(value).map_err(|e| AssetMapError::Json {
            message: format!("Unexpected result for {}: {}", command, e),
            source: Some(e),
        })
    }

    async fn invoke_unit(&self, command: &str, params: serde_json::Value) -> Result<()> {
        self.client.call(command, params).await?;
        Ok(())
    }
}

fn export_params(request: &ExportRequest) -> serde_json::Map<String, serde_json::Value> {
    let (start_date, end_date) = request.wire_dates();
    let mut params = serde_json::Map::new();
    params.insert("query".into(), json!(request.query));
    params.insert("pages".into(), json!(request.pages));
    params.insert("pageSize".into(), json!(request.page_size));
    params.insert("timeRange".into(), json!(request.time_range.as_str()));
    params.insert("startDate".into(), json!(start_date));
    params.insert("endDate".into(), json!(end_date));
    params
}

#[async_trait]
impl ReconBackend for RpcBackend {
    async fn search_assets(&self, request: &SearchRequest) -> Result<SearchResultPage> {
        self.invoke(
            "search_assets",
            json!({
                "platform": request.platform,
                "query": request.query,
                "page": request.page,
                "pageSize": request.page_size,
            }),
        )
        .await
    }

    async fn export_results_with_progress(
        &self,
        task_id: &str,
        platform: Platform,
        request: &ExportRequest,
    ) -> Result<String> {
        let mut params = export_params(request);
        params.insert("taskId".into(), json!(task_id));
        params.insert("platform".into(), json!(platform));
        debug!("Starting export {} on {}", task_id, platform);
        self.invoke("export_results_with_progress", serde_json::Value::Object(params))
            .await
    }

    async fn export_all_platforms(&self, request: &ExportRequest) -> Result<()> {
        self.invoke_unit(
            "export_all_platforms",
            serde_json::Value::Object(export_params(request)),
        )
        .await
    }

    async fn cancel_export(&self, task_id: &str) -> Result<()> {
        self.invoke_unit("cancel_export", json!({ "taskId": task_id }))
            .await
    }

    async fn get_query_history(&self) -> Result<Vec<HistoryRecord>> {
        self.invoke("get_query_history", json!({})).await
    }

    async fn delete_query_history(&self, id: &str) -> Result<()> {
        self.invoke_unit("delete_query_history", json!({ "id": id }))
            .await
    }

    async fn clear_all_history(&self) -> Result<()> {
        self.invoke_unit("clear_all_history", json!({})).await
    }

    async fn export_query_history(&self, export_path: &str) -> Result<String> {
        self.invoke("export_query_history", json!({ "exportPath": export_path }))
            .await
    }

    async fn get_supported_platforms(&self) -> Result<Vec<String>> {
        self.invoke("get_supported_platforms", json!({})).await
    }

    async fn validate_query_syntax(&self, query: &str, platform: Platform) -> Result<bool> {
        self.invoke(
            "validate_query_syntax",
            json!({ "query": query, "platform": platform }),
        )
        .await
    }

    async fn convert_query(&self, query: &str, from: Platform, to: Platform) -> Result<String> {
        self.invoke(
            "convert_query",
            json!({ "query": query, "fromPlatform": from, "toPlatform": to }),
        )
        .await
    }

    async fn convert_query_to_all(
        &self,
        query: &str,
        from: Platform,
    ) -> Result<Vec<ConversionResult>> {
        self.invoke(
            "convert_query_to_all",
            json!({ "query": query, "fromPlatform": from }),
        )
        .await
    }

    async fn get_api_keys(&self, platform: Platform) -> Result<ApiKeyList> {
        self.invoke("get_api_keys", json!({ "platform": platform }))
            .await
    }

    async fn add_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<()> {
        self.invoke_unit(
            "add_api_key",
            json!({ "platform": platform, "apiKey": api_key, "email": email }),
        )
        .await
    }

    async fn delete_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<()> {
        self.invoke_unit(
            "delete_api_key",
            json!({ "platform": platform, "apiKey": api_key, "email": email }),
        )
        .await
    }

    async fn validate_api_key(
        &self,
        platform: Platform,
        api_key: &str,
        email: Option<&str>,
    ) -> Result<KeyValidation> {
        self.invoke(
            "validate_api_key",
            json!({ "platform": platform, "apiKey": api_key, "email": email }),
        )
        .await
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.invoke("get_settings", json!({})).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.invoke_unit("save_settings", json!({ "settings": settings }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TimeRange;
    use crate::ipc::protocol::{read_frame, write_frame, IpcRequest};
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Records every request and answers each with `result`.
    async fn recording_server(
        result: serde_json::Value,
    ) -> (SocketAddr, Arc<Mutex<Vec<IpcRequest>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            while let Ok(Some(frame)) = read_frame(&mut socket).await {
                let request: IpcRequest = serde_json::from_slice(&frame).unwrap();
                let reply = json!({"jsonrpc": "2.0", "id": request.id, "result": result});
                log.lock().unwrap().push(request);
                write_frame(&mut socket, reply.to_string().as_bytes()).await.unwrap();
            }
        });
        (addr, seen)
    }

    #[tokio::test]
    async fn test_export_sends_camel_case_params() {
        let (addr, seen) = recording_server(json!("/tmp/out.xlsx")).await;
        let backend = RpcBackend::connect(addr, ProgressBus::new()).await.unwrap();

        let request = ExportRequest::new("domain=\"a.com\"", 3, 100).with_custom_range(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        );
        let path = backend
            .export_results_with_progress("export_fofa_1", Platform::Fofa, &request)
            .await
            .unwrap();
        assert_eq!(path, "/tmp/out.xlsx");

        let requests = seen.lock().unwrap();
        let params = &requests[0].params;
        assert_eq!(requests[0].method, "export_results_with_progress");
        assert_eq!(params["taskId"], "export_fofa_1");
        assert_eq!(params["platform"], "fofa");
        assert_eq!(params["pageSize"], 100);
        assert_eq!(params["timeRange"], "custom");
        assert_eq!(params["startDate"], "2024-05-01");
        assert_eq!(params["endDate"], "2024-05-31");
    }

    #[tokio::test]
    async fn test_non_custom_range_sends_null_dates() {
        let (addr, seen) = recording_server(serde_json::Value::Null).await;
        let backend = RpcBackend::connect(addr, ProgressBus::new()).await.unwrap();

        let request = ExportRequest::new("port=\"80\"", 1, 50).with_time_range(TimeRange::LastMonth);
        backend.export_all_platforms(&request).await.unwrap();

        let requests = seen.lock().unwrap();
        let params = &requests[0].params;
        assert_eq!(params["timeRange"], "30d");
        assert!(params["startDate"].is_null());
        assert!(params["endDate"].is_null());
        assert!(params.get("platform").is_none());
    }

    #[tokio::test]
    async fn test_search_decodes_result_page() {
        let (addr, _) = recording_server(json!({
            "total": 2,
            "results": [
                {"url": "http://a", "ip": "1.1.1.1", "port": "80"},
                {"url": "http://b", "ip": "2.2.2.2", "port": "443", "country": "CN"}
            ]
        }))
        .await;
        let backend = RpcBackend::connect(addr, ProgressBus::new()).await.unwrap();
        let page = backend
            .search_assets(&SearchRequest::new(Platform::Hunter, "ip=\"1.1.1.1\"", 1, 20))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results[1].country.as_deref(), Some("CN"));
    }

    #[tokio::test]
    async fn test_unexpected_result_shape_is_json_error() {
        let (addr, _) = recording_server(json!({"unexpected": true})).await;
        let backend = RpcBackend::connect(addr, ProgressBus::new()).await.unwrap();
        let err = backend.get_supported_platforms().await.unwrap_err();
        assert!(matches!(err, AssetMapError::Json { .. }));
    }
}
