#![allow(dead_code)]

use mockito::{Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use storyreel_api_client::ApiClient;
use storyreel_core::{ClientConfig, WorkflowConfig};
use storyreel_workflow::{WorkflowSession, WorkflowSnapshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Millisecond-scale timings.
pub fn fast_config() -> WorkflowConfig {
    WorkflowConfig {
        analysis_tick_ms: 10,
        analysis_display_delay_ms: 40,
        images_complete_delay_ms: 40,
        images_fatal_delay_ms: 40,
        animation_poll_interval_ms: 10,
        animation_timeout_ms: 2_000,
        animation_display_delay_ms: 40,
        ..WorkflowConfig::default()
    }
}

pub fn session(server: &ServerGuard, project_id: Uuid, config: WorkflowConfig) -> WorkflowSession {
    let client = ApiClient::new(&ClientConfig::new(server.url())).unwrap();
    WorkflowSession::new(client, project_id, config)
}

pub fn project_json(project_id: Uuid) -> Value {
    json!({
        "id": project_id,
        "title": "El último tren",
        "description": null,
        "original_script": "INT. ESTACIÓN - NOCHE. Un tren llega vacío.",
        "status": "scenes_ready",
        "style": "cinematic",
        "duration_target": 60,
        "created_at": "2025-03-01T10:00:00",
        "updated_at": "2025-03-01T10:05:00.123456"
    })
}

pub fn scene_json(project_id: Uuid, order: i32, status: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "project_id": project_id,
        "order": order,
        "title": format!("Escena {}", order),
        "description": "Plano general",
        "dialogue": null,
        "image_prompt": "train station at night",
        "duration": 5.0,
        "notes": null,
        "status": status,
        "video_url": null,
        "video_status": null,
        "video_provider": null
    })
}

pub fn scenes_json(project_id: Uuid, statuses: &[&str]) -> String {
    let scenes: Vec<Value> = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| scene_json(project_id, i as i32 + 1, status))
        .collect();
    Value::Array(scenes).to_string()
}

pub fn image_assets_json(count: usize) -> String {
    let assets: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": Uuid::new_v4(),
                "scene_id": Uuid::new_v4(),
                "type": "image",
                "url": format!("https://cdn.test/scene-{}.png", i + 1),
                "status": "completed",
                "scene_order": i + 1,
                "scene_title": format!("Escena {}", i + 1),
                "metadata": {"provider": "gemini"},
                "created_at": "2025-03-01T10:10:00Z"
            })
        })
        .collect();
    Value::Array(assets).to_string()
}

/// Encode payloads as a server-sent event body.
pub fn sse_body(events: &[Value]) -> String {
    events
        .iter()
        .map(|event| format!("data: {}\n\n", event))
        .collect()
}

pub async fn mock_project(server: &mut ServerGuard, project_id: Uuid) -> Mock {
    server
        .mock("GET", format!("/api/v1/projects/{}", project_id).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(project_json(project_id).to_string())
        .create_async()
        .await
}

pub async fn mock_scenes(server: &mut ServerGuard, project_id: Uuid, statuses: &[&str]) -> Mock {
    server
        .mock("GET", format!("/api/v1/scenes/project/{}", project_id).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(scenes_json(project_id, statuses))
        .create_async()
        .await
}

pub async fn mock_assets(server: &mut ServerGuard, project_id: Uuid, images: usize) -> Mock {
    server
        .mock(
            "GET",
            format!("/api/v1/scenes/project/{}/assets", project_id).as_str(),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(image_assets_json(images))
        .create_async()
        .await
}

pub async fn new_server() -> ServerGuard {
    Server::new_async().await
}

/// Records every snapshot published while it runs.
pub struct Observer {
    seen: Arc<Mutex<Vec<WorkflowSnapshot>>>,
    handle: JoinHandle<()>,
}

impl Observer {
    pub fn start(session: &WorkflowSession) -> Self {
        let mut rx = session.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                sink.lock().unwrap().push(snapshot);
            }
        });
        Self { seen, handle }
    }

    pub fn finish(self) -> Vec<WorkflowSnapshot> {
        self.handle.abort();
        let seen = self.seen.lock().unwrap();
        seen.clone()
    }
}

/// Percentages observed while a stage was running and reporting, in order.
/// Cleared snapshots (empty message) mark the end of an invocation.
pub fn running_percents(snapshots: &[WorkflowSnapshot]) -> Vec<f64> {
    snapshots
        .iter()
        .filter(|snapshot| !snapshot.state.is_idle() && !snapshot.progress.message.is_empty())
        .map(|snapshot| snapshot.progress.percent)
        .collect()
}

pub fn messages(snapshots: &[WorkflowSnapshot]) -> Vec<String> {
    snapshots
        .iter()
        .map(|snapshot| snapshot.progress.message.clone())
        .collect()
}

pub fn assert_non_decreasing(percents: &[f64]) {
    for pair in percents.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {:?}", percents);
    }
}
