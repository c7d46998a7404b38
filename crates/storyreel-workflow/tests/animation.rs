mod common;

use common::*;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storyreel_core::models::VideoProvider;
use storyreel_core::{ErrorMetadata, WorkflowConfig, WorkflowError};
use storyreel_workflow::{ReloadScope, StageReport, WorkflowSession};
use uuid::Uuid;

async fn mock_animate(
    server: &mut ServerGuard,
    project_id: Uuid,
    provider: &str,
    status: usize,
    body: String,
) -> Mock {
    server
        .mock(
            "POST",
            format!("/api/v1/generation/animate-scenes/{}", project_id).as_str(),
        )
        .match_query(Matcher::UrlEncoded("provider".into(), provider.into()))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn accepted(tasks: usize) -> String {
    let tasks: Vec<_> = (0..tasks)
        .map(|i| {
            json!({
                "scene_id": Uuid::new_v4(),
                "scene_title": format!("Escena {}", i + 1),
                "task_id": format!("task-{}", i),
                "provider": "veo"
            })
        })
        .collect();
    json!({ "tasks": tasks, "total_scenes": tasks.len(), "animated": tasks.len(), "failed": 0 })
        .to_string()
}

/// Scene list that answers `pending` until `ready_after` requests were served.
async fn mock_scene_progress(
    server: &mut ServerGuard,
    project_id: Uuid,
    ready_after: Option<usize>,
) -> (Mock, Arc<AtomicUsize>) {
    let served = Arc::new(AtomicUsize::new(0));
    let counter = served.clone();
    let mock = server
        .mock("GET", format!("/api/v1/scenes/project/{}", project_id).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = match ready_after {
                Some(after) if n >= after => "video_ready",
                _ => "image_ready",
            };
            scenes_json(project_id, &[status, status]).into_bytes()
        })
        .create_async()
        .await;
    (mock, served)
}

/// Session with two scenes and two image assets cached, plus the project and
/// assets mocks that must stay registered.
async fn ready_session(
    server: &mut ServerGuard,
    project_id: Uuid,
    config: WorkflowConfig,
) -> (WorkflowSession, Vec<Mock>) {
    let project = mock_project(server, project_id).await;
    let assets = mock_assets(server, project_id, 2).await;
    let mut session = session(server, project_id, config);
    session.reload(ReloadScope::All).await;
    (session, vec![project, assets])
}

#[tokio::test]
async fn test_requires_image_assets() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    let animate = server
        .mock(
            "POST",
            format!("/api/v1/generation/animate-scenes/{}", project_id).as_str(),
        )
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut session = session(&server, project_id, fast_config());
    let err = session
        .animate_scenes(VideoProvider::Veo)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Primero debes generar las imágenes");
    animate.assert_async().await;
}

#[tokio::test]
async fn test_polls_until_every_scene_has_video() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    // Served: initial reload, two pending polls, then ready.
    let (scenes, served) = mock_scene_progress(&mut server, project_id, Some(3)).await;
    let (mut session, _keep) = ready_session(&mut server, project_id, fast_config()).await;
    let animate = mock_animate(&mut server, project_id, "veo", 200, accepted(2)).await;

    let observer = Observer::start(&session);
    let report = session
        .animate_scenes(VideoProvider::Veo)
        .await
        .unwrap();
    let snapshots = observer.finish();

    assert_eq!(
        report,
        StageReport::Animated {
            started: 2,
            ready: 2,
            total: 2
        }
    );
    animate.assert_async().await;
    // Initial reload, three polls, closing reload.
    assert_eq!(served.load(Ordering::SeqCst), 5);
    drop(scenes);

    let messages = messages(&snapshots);
    assert!(messages.iter().any(|m| m == "Iniciando animación con Veo 3.1..."));
    assert!(messages.iter().any(|m| m == "Todas las animaciones completadas"));
    assert_non_decreasing(&running_percents(&snapshots));
    assert!(session.snapshot().state.is_idle());
    assert!(session.scenes().iter().all(|scene| scene.is_video_ready()));
}

#[tokio::test]
async fn test_rejected_start_alerts_and_never_polls() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    let (_scenes, served) = mock_scene_progress(&mut server, project_id, None).await;
    let (mut session, _keep) = ready_session(&mut server, project_id, fast_config()).await;
    let _animate = mock_animate(
        &mut server,
        project_id,
        "sora",
        402,
        json!({ "detail": "No credits" }).to_string(),
    )
    .await;

    let err = session
        .animate_scenes(VideoProvider::Sora)
        .await
        .unwrap_err();
    assert!(err.is_alert());
    assert_eq!(err.client_message(), "Error: No credits");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(served.load(Ordering::SeqCst), 1);

    let snapshot = session.snapshot();
    assert!(snapshot.state.is_idle());
    assert_eq!(snapshot.progress.percent, 0.0);
    assert!(snapshot.progress.message.is_empty());
}

#[tokio::test]
async fn test_rejection_without_structured_detail_uses_default() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    let _scenes = mock_scene_progress(&mut server, project_id, None).await;
    let (mut session, _keep) = ready_session(&mut server, project_id, fast_config()).await;
    let _animate = mock_animate(&mut server, project_id, "kling", 500, "{}".to_string()).await;

    let err = session
        .animate_scenes(VideoProvider::Kling)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error: No se pudieron animar las escenas");

    let mut server = new_server().await;
    let _scenes = mock_scene_progress(&mut server, project_id, None).await;
    let (mut session, _keep) = ready_session(&mut server, project_id, fast_config()).await;
    let _animate =
        mock_animate(&mut server, project_id, "kling", 502, "Bad Gateway".to_string()).await;
    let err = session
        .animate_scenes(VideoProvider::Kling)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error: No se pudieron animar las escenas");
}

#[tokio::test]
async fn test_ceiling_times_out_and_keeps_notice() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    let _scenes = mock_scene_progress(&mut server, project_id, None).await;
    let config = WorkflowConfig {
        animation_poll_interval_ms: 10,
        animation_timeout_ms: 80,
        ..fast_config()
    };
    let (mut session, _keep) = ready_session(&mut server, project_id, config).await;
    let _animate = mock_animate(&mut server, project_id, "veo", 200, accepted(2)).await;

    let err = session
        .animate_scenes(VideoProvider::Veo)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Timeout(_)));

    let snapshot = session.snapshot();
    assert!(snapshot.state.is_idle());
    assert_eq!(
        snapshot.progress.message,
        "Tiempo de espera agotado. Revisa el estado manualmente."
    );
    assert_eq!(snapshot.progress.error, None);
}

#[tokio::test]
async fn test_failed_polls_are_skipped() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    let (healthy, _) = mock_scene_progress(&mut server, project_id, None).await;
    let (mut session, _keep) = ready_session(&mut server, project_id, fast_config()).await;
    let _animate = mock_animate(&mut server, project_id, "veo", 200, accepted(2)).await;
    healthy.remove_async().await;

    let failing = server
        .mock("GET", format!("/api/v1/scenes/project/{}", project_id).as_str())
        .with_status(503)
        .expect_at_least(2)
        .create_async()
        .await;

    let token = session.cancellation_token();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        token.cancel();
    });

    let err = session
        .animate_scenes(VideoProvider::Veo)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, WorkflowError::Cancelled(_)));
    failing.assert_async().await;
    assert!(session.snapshot().state.is_idle());
}

#[tokio::test]
async fn test_scene_rows_with_nulls_still_finish() {
    let mut server = new_server().await;
    let project_id = Uuid::new_v4();
    let served = Arc::new(AtomicUsize::new(0));
    let counter = served.clone();
    let _scenes = server
        .mock("GET", format!("/api/v1/scenes/project/{}", project_id).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = if n >= 2 { json!("video_ready") } else { json!(null) };
            let rows: Vec<_> = (1..=2)
                .map(|order| {
                    json!({
                        "id": Uuid::new_v4(),
                        "project_id": project_id,
                        "order": order,
                        "title": null,
                        "description": "Andén",
                        "image_prompt": null,
                        "status": status,
                        "notes": null
                    })
                })
                .collect();
            serde_json::Value::Array(rows).to_string().into_bytes()
        })
        .create_async()
        .await;
    let (mut session, _keep) = ready_session(&mut server, project_id, fast_config()).await;
    assert_eq!(session.scenes().len(), 2);
    let _animate = mock_animate(&mut server, project_id, "veo", 200, accepted(2)).await;

    let report = session
        .animate_scenes(VideoProvider::Veo)
        .await
        .unwrap();

    assert_eq!(
        report,
        StageReport::Animated {
            started: 2,
            ready: 2,
            total: 2
        }
    );
    assert!(session.scenes().iter().all(|scene| scene.is_video_ready()));
}
