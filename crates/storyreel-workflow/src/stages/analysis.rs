use storyreel_core::{Stage, WorkflowError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::session::{
    classify_request_error, RejectionDetail, ReloadScope, StageReport, WorkflowSession,
};

const NO_SCRIPT: &str = "No hay guión para analizar";
const ANALYZING: &str = "Analizando guión con IA...";
const REJECTED: &str = "No se pudo analizar el guión";

impl WorkflowSession {
    /// Split `script` into scenes.
    ///
    /// While the request is pending a synthetic ramp advances progress by
    /// `analysis_step` every `analysis_tick`, never past `analysis_ramp_cap`.
    /// On success the project and scenes are reloaded after a display delay.
    pub async fn analyze_script(&mut self, script: &str) -> Result<StageReport, WorkflowError> {
        if script.trim().is_empty() {
            return Err(WorkflowError::Validation(NO_SCRIPT.to_string()));
        }

        let stage = Stage::AnalyzingScript;
        let _guard = self.begin(stage)?;
        self.reporter.progress(0.0, ANALYZING);

        let result = {
            let request = self.client.analyze_script(self.project_id, script);
            tokio::pin!(request);

            let tick = self.config.analysis_tick();
            let mut ramp = interval_at(Instant::now() + tick, tick);
            ramp.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return Err(self.cancelled(stage)),
                    result = &mut request => break result,
                    _ = ramp.tick() => {
                        let next = (self.reporter.percent() + self.config.analysis_step)
                            .min(self.config.analysis_ramp_cap);
                        self.reporter.progress(next, ANALYZING);
                    }
                }
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let err = classify_request_error(
                    &e,
                    RejectionDetail::DetailOrBody,
                    REJECTED,
                    |cause| format!("Error al analizar el guión: {}", cause),
                );
                return Err(self.fail(stage, err));
            }
        };

        let total_scenes = response.total_scenes;
        tracing::info!(project_id = %self.project_id, total_scenes, "Script analyzed");
        self.reporter
            .progress(100.0, format!("{} escenas creadas", total_scenes));

        self.pause(stage, self.config.analysis_display_delay()).await?;
        self.reload(ReloadScope::ProjectAndScenes).await;
        self.reporter.clear();

        Ok(StageReport::Analyzed { total_scenes })
    }
}
