//! Workflow session: cached project state, observable progress and the
//! single-stage-at-a-time guard.

use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use storyreel_api_client::{ApiClient, ApiError};
use storyreel_core::models::{scene, Asset, Project, Scene};
use storyreel_core::{
    ErrorMetadata, ErrorSeverity, LogLevel, Stage, WorkflowConfig, WorkflowError,
    WorkflowProgress, WorkflowState,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What observers see: the running stage and its progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub progress: WorkflowProgress,
}

/// Successful end of a stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StageReport {
    Analyzed {
        total_scenes: u32,
    },
    /// Counts are absent when the stream ended without a `complete` event
    /// and the optimistic stream policy applied.
    ImagesGenerated {
        generated: Option<u32>,
        total: Option<u32>,
    },
    Animated {
        started: usize,
        ready: usize,
        total: usize,
    },
}

/// Which cached collections a reload refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadScope {
    ProjectAndScenes,
    All,
}

/// Publishes progress to the snapshot channel.
#[derive(Debug, Clone)]
pub(crate) struct Reporter {
    status: Arc<watch::Sender<WorkflowSnapshot>>,
}

impl Reporter {
    /// Monotonic within the invocation.
    pub(crate) fn progress(&self, percent: f64, message: impl Into<String>) {
        let message = message.into();
        self.status.send_modify(|snapshot| {
            snapshot.progress.advance(percent);
            snapshot.progress.message = message;
        });
    }

    pub(crate) fn message(&self, message: impl Into<String>) {
        let message = message.into();
        self.status
            .send_modify(|snapshot| snapshot.progress.message = message);
    }

    pub(crate) fn persistent_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.status
            .send_modify(|snapshot| snapshot.progress.error = Some(error));
    }

    pub(crate) fn clear(&self) {
        self.status.send_modify(|snapshot| snapshot.progress.clear());
    }

    pub(crate) fn percent(&self) -> f64 {
        self.status.borrow().progress.percent
    }
}

/// Marks a stage as running; returns the session to idle when dropped, so a
/// stage future that is dropped mid-flight cannot leave the state stuck.
pub(crate) struct StageGuard {
    reporter: Reporter,
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        self.reporter
            .status
            .send_modify(|snapshot| snapshot.state = WorkflowState::Idle);
    }
}

/// One client session over a project.
///
/// Stage methods take `&mut self`, so one session runs at most one stage at a
/// time. Dropping the session cancels whatever is still outstanding.
pub struct WorkflowSession {
    pub(crate) client: ApiClient,
    pub(crate) project_id: Uuid,
    pub(crate) config: WorkflowConfig,
    project: Option<Project>,
    scenes: Vec<Scene>,
    assets: Vec<Asset>,
    pub(crate) reporter: Reporter,
    pub(crate) shutdown: CancellationToken,
}

impl WorkflowSession {
    /// Session with an empty cache. Nothing is fetched until [`reload`](Self::reload).
    pub fn new(client: ApiClient, project_id: Uuid, config: WorkflowConfig) -> Self {
        let (status, _) = watch::channel(WorkflowSnapshot::default());
        Self {
            client,
            project_id,
            config,
            project: None,
            scenes: Vec::new(),
            assets: Vec::new(),
            reporter: Reporter {
                status: Arc::new(status),
            },
            shutdown: CancellationToken::new(),
        }
    }

    /// Session with the project, its scenes and assets loaded. Fails when the
    /// project itself cannot be fetched.
    pub async fn open(
        client: ApiClient,
        project_id: Uuid,
        config: WorkflowConfig,
    ) -> anyhow::Result<Self> {
        let project = client
            .get_project(project_id)
            .await
            .with_context(|| format!("Failed to load project {}", project_id))?;

        let mut session = Self::new(client, project_id, config);
        session.project = Some(project);
        session.reload(ReloadScope::All).await;
        Ok(session)
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    /// Scenes sorted by order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn image_assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|asset| asset.is_image())
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.reporter.status.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.reporter.status.borrow().clone()
    }

    /// Clears the persistent error.
    pub fn dismiss_error(&self) {
        self.reporter
            .status
            .send_modify(|snapshot| snapshot.progress.error = None);
    }

    /// Token cancelled on teardown. Cancelling a clone tears the session down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops any outstanding stream, poll or delay.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Replace cached collections with the remote state. Each collection is
    /// replaced only when its fetch succeeds; failures are logged.
    pub async fn reload(&mut self, scope: ReloadScope) {
        let client = &self.client;
        let project_id = self.project_id;
        let (project, scenes, assets) = tokio::join!(
            client.get_project(project_id),
            client.list_scenes(project_id),
            async {
                match scope {
                    ReloadScope::All => Some(client.list_assets(project_id).await),
                    ReloadScope::ProjectAndScenes => None,
                }
            }
        );

        match project {
            Ok(project) => self.project = Some(project),
            Err(e) => tracing::warn!(%project_id, error = %e, "Failed to reload project"),
        }

        match scenes {
            Ok(mut scenes) => {
                let duplicates = scene::sort_by_order(&mut scenes);
                if !duplicates.is_empty() {
                    tracing::warn!(%project_id, ?duplicates, "Scenes share an order index");
                }
                self.scenes = scenes;
            }
            Err(e) => tracing::warn!(%project_id, error = %e, "Failed to reload scenes"),
        }

        match assets {
            Some(Ok(assets)) => self.assets = assets,
            Some(Err(e)) => tracing::warn!(%project_id, error = %e, "Failed to reload assets"),
            None => {}
        }

        tracing::debug!(
            %project_id,
            scenes = self.scenes.len(),
            assets = self.assets.len(),
            "Project state reloaded"
        );
    }

    /// Enter `stage`: rejects a second stage, resets progress and the
    /// persistent error.
    pub(crate) fn begin(&self, stage: Stage) -> Result<StageGuard, WorkflowError> {
        let mut busy = None;
        self.reporter.status.send_if_modified(|snapshot| {
            if let Some(running) = snapshot.state.stage() {
                busy = Some(running);
                return false;
            }
            snapshot.state = WorkflowState::running(stage);
            snapshot.progress.reset();
            true
        });

        if let Some(running) = busy {
            return Err(WorkflowError::StageBusy { running });
        }

        tracing::info!(project_id = %self.project_id, %stage, "Stage started");
        Ok(StageGuard {
            reporter: self.reporter.clone(),
        })
    }

    /// Display delay before the closing reload; cut short by teardown.
    pub(crate) async fn pause(&self, stage: Stage, delay: Duration) -> Result<(), WorkflowError> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(self.cancelled(stage)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    pub(crate) fn cancelled(&self, stage: Stage) -> WorkflowError {
        self.fail(stage, WorkflowError::Cancelled(stage))
    }

    /// Terminal failure: logs, records persistent errors, clears progress.
    pub(crate) fn fail(&self, stage: Stage, err: WorkflowError) -> WorkflowError {
        log_failure(self.project_id, stage, &err);
        if err.severity() == ErrorSeverity::Persistent {
            self.reporter.persistent_error(err.client_message());
        }
        self.reporter.clear();
        err
    }
}

impl Drop for WorkflowSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Where the alert text of a rejected request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RejectionDetail {
    /// JSON `detail`, else the raw body text.
    DetailOrBody,
    /// JSON `detail` only.
    DetailOnly,
}

/// Map a client failure: a typed status rejection becomes an alert carrying
/// the extracted detail, anything else is a transport failure.
pub(crate) fn classify_request_error(
    err: &anyhow::Error,
    source: RejectionDetail,
    rejected_fallback: &str,
    transport_message: impl FnOnce(&str) -> String,
) -> WorkflowError {
    match err.downcast_ref::<ApiError>() {
        Some(api) => {
            let detail = match source {
                RejectionDetail::DetailOrBody => api.detail(),
                RejectionDetail::DetailOnly => api.structured_detail(),
            };
            WorkflowError::RemoteRejection {
                status: api.status(),
                detail: detail.unwrap_or_else(|| rejected_fallback.to_string()),
            }
        }
        None => {
            let cause = err.root_cause().to_string();
            let cause = if cause.trim().is_empty() {
                "Error de conexión"
            } else {
                cause.as_str()
            };
            WorkflowError::Transport(transport_message(cause))
        }
    }
}

fn log_failure(project_id: Uuid, stage: Stage, err: &WorkflowError) {
    let code = err.error_code();
    let alert = err.is_alert();
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(%project_id, %stage, error_code = code, alert, error = %err, "Stage ended")
        }
        LogLevel::Warn => {
            tracing::warn!(%project_id, %stage, error_code = code, alert, error = %err, "Stage failed")
        }
        LogLevel::Error => {
            tracing::error!(%project_id, %stage, error_code = code, alert, error = %err, "Stage failed")
        }
    }
}
