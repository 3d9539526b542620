//! Integration tests for the query view.

mod common;

use assetmap_core::backend::AssetRecord;
use assetmap_core::{
    AssetMapError, LocationFilter, Platform, ProgressStatus, QueryWorkspace, SearchResultPage,
};
use common::setup;

fn hosts(total: u64, shown: usize) -> SearchResultPage {
    SearchResultPage {
        total,
        results: (0..shown)
            .map(|i| AssetRecord {
                ip: format!("192.168.1.{}", i),
                port: "443".into(),
                ..AssetRecord::default()
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_search_holds_first_page() {
    let (backend, coordinator) = setup();
    backend.state.lock().unwrap().search_result = hosts(45, 20);

    let mut workspace = QueryWorkspace::new(coordinator, Platform::Hunter, 20);
    workspace.composer_mut().set_text("ip=\"192.168.1.1\"");
    workspace.search().await.unwrap();

    assert_eq!(workspace.page(), 1);
    assert_eq!(workspace.total(), 45);
    assert_eq!(workspace.results().len(), 20);
    assert_eq!(workspace.search_tracker().status(), ProgressStatus::Success);
}

#[tokio::test]
async fn test_blank_query_keeps_previous_results() {
    let (backend, coordinator) = setup();
    backend.state.lock().unwrap().search_result = hosts(2, 2);

    let mut workspace = QueryWorkspace::new(coordinator, Platform::Quake, 10);
    workspace.composer_mut().set_text("port: 443");
    workspace.search().await.unwrap();

    workspace.composer_mut().clear();
    let err = workspace.search().await.unwrap_err();
    assert!(err.is_local_guard());
    assert_eq!(workspace.results().len(), 2);
    assert_eq!(backend.call_count("search_assets"), 1);
}

#[tokio::test]
async fn test_change_page_updates_page_and_size() {
    let (backend, coordinator) = setup();
    backend.state.lock().unwrap().search_result = hosts(120, 50);

    let mut workspace = QueryWorkspace::new(coordinator, Platform::Fofa, 20);
    workspace.composer_mut().set_text("port=\"443\"");
    workspace.change_page(3, 50).await.unwrap();
    assert_eq!(workspace.page(), 3);
    assert_eq!(workspace.page_size(), 50);

    let err = workspace.change_page(1, 0).await.unwrap_err();
    assert!(matches!(err, AssetMapError::Validation { .. }));
    assert_eq!(workspace.page(), 3);
}

#[tokio::test]
async fn test_switch_platform_resets_view() {
    let (backend, coordinator) = setup();
    backend.state.lock().unwrap().search_result = hosts(5, 5);

    let mut workspace = QueryWorkspace::new(coordinator, Platform::Fofa, 20);
    workspace.composer_mut().set_text("port=\"443\"");
    workspace.change_page(2, 20).await.unwrap();

    workspace.switch_platform(Platform::DayDayMap);
    assert_eq!(workspace.platform(), Platform::DayDayMap);
    assert_eq!(workspace.composer().text(), "");
    assert!(workspace.results().is_empty());
    assert_eq!(workspace.page(), 1);
}

#[tokio::test]
async fn test_apply_location_rewrites_query() {
    let (_backend, coordinator) = setup();
    let mut workspace = QueryWorkspace::new(coordinator, Platform::Hunter, 20);

    assert!(!workspace.apply_location(&LocationFilter::new(None, Some("  "), false)));
    assert_eq!(workspace.composer().text(), "");

    assert!(workspace.apply_location(&LocationFilter::new(Some("Zhejiang"), None, false)));
    assert!(workspace.composer().text().contains("Zhejiang"));
}

#[tokio::test]
async fn test_export_current_needs_results() {
    let (backend, coordinator) = setup();
    let workspace = QueryWorkspace::new(coordinator, Platform::Hunter, 20);

    let err = workspace.export_current().await.unwrap_err();
    assert!(matches!(err, AssetMapError::EmptyInput { .. }));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_export_current_sends_one_page_of_view_size() {
    let (backend, coordinator) = setup();
    {
        let mut state = backend.state.lock().unwrap();
        state.search_result = hosts(80, 40);
        state.export_script = vec![(100.0, ProgressStatus::Success)];
    }

    let mut workspace = QueryWorkspace::new(coordinator, Platform::Quake, 40);
    workspace.composer_mut().set_text("  port: 443 ");
    workspace.search().await.unwrap();
    let outcome = workspace.export_current().await.unwrap();
    assert!(outcome.path.is_some());
    assert_eq!(workspace.export_tracker().status(), ProgressStatus::Success);

    let exports = backend.state.lock().unwrap().exports.clone();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].platform, Some(Platform::Quake));
    assert_eq!(exports[0].request.query, "port: 443");
    assert_eq!(exports[0].request.pages, 1);
    assert_eq!(exports[0].request.page_size, 40);
}

#[tokio::test]
async fn test_export_tracker_offers_cancel() {
    let (backend, coordinator) = setup();
    {
        let mut state = backend.state.lock().unwrap();
        state.search_result = hosts(300, 100);
        state.export_script = vec![(40.0, ProgressStatus::Running)];
    }

    let mut workspace = QueryWorkspace::new(coordinator, Platform::Fofa, 100);
    assert!(workspace.export_tracker().snapshot().cancellable);
    assert!(!workspace.search_tracker().snapshot().cancellable);

    let err = workspace.cancel_export().await.unwrap_err();
    assert!(matches!(err, AssetMapError::Validation { .. }));

    workspace.composer_mut().set_text("port=\"443\"");
    workspace.search().await.unwrap();
    let outcome = workspace.export_current().await.unwrap();

    let snapshot = workspace.export_tracker().snapshot();
    assert!(snapshot.cancellable);
    assert_eq!(snapshot.status, ProgressStatus::Running);
    assert_eq!(snapshot.task_id.as_deref(), Some(outcome.task.task_id.as_str()));

    let err = workspace.cancel_export().await.unwrap_err();
    assert!(matches!(err, AssetMapError::Unsupported { ref command } if command == "cancel_export"));
}
