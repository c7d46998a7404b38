use storyreel_core::models::scene::count_video_ready;
use storyreel_core::models::VideoProvider;
use storyreel_core::progress::{animation_percent, COMPLETE};
use storyreel_core::{ErrorMetadata, Stage, WorkflowError};

use crate::poller::{PollOutcome, PollProbe, Poller};
use crate::session::{
    classify_request_error, RejectionDetail, ReloadScope, StageReport, WorkflowSession,
};

const NO_IMAGES: &str = "Primero debes generar las imágenes";
const REJECTED: &str = "No se pudieron animar las escenas";
const ALL_ANIMATED: &str = "Todas las animaciones completadas";
const TIMED_OUT: &str = "Tiempo de espera agotado. Revisa el estado manualmente.";

impl WorkflowSession {
    /// Start animating every scene with an image, then poll the scene list
    /// until each scene has its video or the ceiling elapses.
    pub async fn animate_scenes(
        &mut self,
        provider: VideoProvider,
    ) -> Result<StageReport, WorkflowError> {
        if self.image_assets().next().is_none() {
            return Err(WorkflowError::Validation(NO_IMAGES.to_string()));
        }

        let stage = Stage::AnimatingScenes;
        let _guard = self.begin(stage)?;
        self.reporter.progress(
            0.0,
            format!("Iniciando animación con {}...", provider.display_name()),
        );

        let started = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(self.cancelled(stage)),
            started = self.client.animate_scenes(self.project_id, provider) => started,
        };
        let started = match started {
            Ok(response) => response.tasks.len(),
            Err(e) => {
                let err = classify_request_error(
                    &e,
                    RejectionDetail::DetailOnly,
                    REJECTED,
                    |cause| format!("Error al animar las escenas: {}", cause),
                );
                return Err(self.fail(stage, err));
            }
        };

        tracing::info!(project_id = %self.project_id, %provider, tasks = started, "Animation started");
        self.reporter
            .message(format!("{} animaciones iniciadas", started));

        let poller = Poller::new(
            self.config.animation_poll_interval(),
            self.config.animation_timeout(),
        );
        let client = self.client.clone();
        let reporter = self.reporter.clone();
        let project_id = self.project_id;

        let outcome = poller
            .run(&self.shutdown, move |attempt| {
                let client = client.clone();
                let reporter = reporter.clone();
                async move {
                    let scenes = match client.list_scenes(project_id).await {
                        Ok(scenes) => scenes,
                        Err(e) => {
                            tracing::warn!(%project_id, attempt, error = %e, "Animation status poll failed");
                            return PollProbe::Pending;
                        }
                    };

                    let total = scenes.len();
                    let ready = count_video_ready(&scenes);
                    let percent = animation_percent(ready, total);
                    reporter.progress(percent, format!("Animando escenas: {}/{}", ready, total));
                    tracing::debug!(%project_id, attempt, ready, total, "Animation status polled");

                    if total > 0 && (ready == total || percent >= COMPLETE) {
                        PollProbe::Ready((ready, total))
                    } else {
                        PollProbe::Pending
                    }
                }
            })
            .await;

        match outcome {
            PollOutcome::Succeeded((ready, total)) => {
                self.reporter.progress(COMPLETE, ALL_ANIMATED);
                tracing::info!(project_id = %self.project_id, ready, total, "All scenes animated");

                self.pause(stage, self.config.animation_display_delay()).await?;
                self.reload(ReloadScope::All).await;
                self.reporter.clear();
                Ok(StageReport::Animated {
                    started,
                    ready,
                    total,
                })
            }
            PollOutcome::TimedOut { attempts } => {
                // Progress stays visible with the timeout notice.
                let err = WorkflowError::Timeout(TIMED_OUT.to_string());
                tracing::warn!(
                    project_id = %self.project_id,
                    attempts,
                    error_code = err.error_code(),
                    "Animation polling timed out"
                );
                self.reporter.message(TIMED_OUT);
                Err(err)
            }
            PollOutcome::Cancelled => Err(self.cancelled(stage)),
        }
    }
}
