use storyreel_api_client::{ApiError, ImageEvent};
use storyreel_core::error::is_escalating_code;
use storyreel_core::models::ImageProvider;
use storyreel_core::progress::{image_progress_percent, scene_complete_percent, IMAGE_PROGRESS_FLOOR};
use storyreel_core::{Stage, StreamFailurePolicy, WorkflowError};

use crate::session::{ReloadScope, StageReport, WorkflowSession};

const NO_SCENES: &str = "No hay escenas para generar imágenes";
const CONNECTING: &str = "Conectando con el servidor...";
const OPEN_REJECTED: &str = "Error al generar las imágenes";
const NOTHING_GENERATED: &str = "No se pudo generar ninguna imagen. Probá con otro proveedor.";
const CONNECTION_LOST: &str =
    "Error de conexión con el servidor. Verificá que el backend esté corriendo.";
const ASSUMED_COMPLETE: &str = "Generación completada";

/// How the session reacts to one stream event.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ImageStep {
    Update {
        percent: Option<f64>,
        message: String,
        /// Promoted to the persistent error; the stream stays open.
        escalate: bool,
    },
    Finish(ImageTerminal),
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ImageTerminal {
    Completed {
        generated: Option<u32>,
        total: Option<u32>,
        message: String,
    },
    Fatal {
        error_code: Option<String>,
        message: String,
    },
    Failed(String),
}

pub(crate) fn step(event: ImageEvent) -> ImageStep {
    match event {
        ImageEvent::Start { message, .. } => ImageStep::Update {
            percent: Some(IMAGE_PROGRESS_FLOOR),
            message,
            escalate: false,
        },
        ImageEvent::Progress {
            current,
            total,
            message,
            ..
        } => ImageStep::Update {
            percent: Some(image_progress_percent(current, total)),
            message,
            escalate: false,
        },
        ImageEvent::SceneComplete {
            scene,
            total,
            message,
            ..
        } => ImageStep::Update {
            percent: Some(scene_complete_percent(scene, total)),
            message,
            escalate: false,
        },
        ImageEvent::SceneError {
            message,
            error_code,
            ..
        } => ImageStep::Update {
            percent: None,
            message,
            escalate: is_escalating_code(error_code.as_deref()),
        },
        ImageEvent::FatalError {
            message,
            error_code,
        } => ImageStep::Finish(ImageTerminal::Fatal {
            error_code,
            message,
        }),
        ImageEvent::Complete {
            generated,
            total,
            message,
        } => ImageStep::Finish(ImageTerminal::Completed {
            generated,
            total,
            message,
        }),
        ImageEvent::Error { message } => ImageStep::Finish(ImageTerminal::Failed(message)),
        ImageEvent::Unknown => ImageStep::Ignore,
    }
}

/// How the stream loop ended.
enum StreamEnd {
    Terminal(ImageTerminal),
    /// Connection failure, or end of stream without a terminal event.
    Interrupted(anyhow::Error),
}

impl WorkflowSession {
    /// Generate one image per scene over the server-sent event stream.
    pub async fn generate_images(
        &mut self,
        provider: ImageProvider,
    ) -> Result<StageReport, WorkflowError> {
        if self.scenes().is_empty() {
            return Err(WorkflowError::Validation(NO_SCENES.to_string()));
        }

        let stage = Stage::GeneratingImages;
        let _guard = self.begin(stage)?;
        self.reporter.progress(0.0, CONNECTING);
        tracing::info!(project_id = %self.project_id, %provider, "Opening image stream");

        let end = {
            let opened = tokio::select! {
                _ = self.shutdown.cancelled() => return Err(self.cancelled(stage)),
                opened = self.client.open_image_stream(self.project_id, provider) => opened,
            };

            match opened {
                Err(e) => match e.downcast_ref::<ApiError>() {
                    Some(api) => {
                        let err = WorkflowError::RemoteRejection {
                            status: api.status(),
                            detail: api.detail().unwrap_or_else(|| OPEN_REJECTED.to_string()),
                        };
                        return Err(self.fail(stage, err));
                    }
                    None => StreamEnd::Interrupted(e),
                },
                Ok(mut events) => loop {
                    let next = tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => return Err(self.cancelled(stage)),
                        next = events.next_event() => next,
                    };

                    let event = match next {
                        Some(Ok(event)) => event,
                        Some(Err(e)) => break StreamEnd::Interrupted(e),
                        None => {
                            break StreamEnd::Interrupted(anyhow::anyhow!(
                                "Image stream closed before a terminal event"
                            ))
                        }
                    };

                    tracing::debug!(project_id = %self.project_id, ?event, "Image stream event");
                    match step(event) {
                        ImageStep::Update {
                            percent,
                            message,
                            escalate,
                        } => {
                            if escalate {
                                self.reporter.persistent_error(message.clone());
                            }
                            match percent {
                                Some(percent) => self.reporter.progress(percent, message),
                                None => self.reporter.message(message),
                            }
                        }
                        ImageStep::Finish(terminal) => break StreamEnd::Terminal(terminal),
                        ImageStep::Ignore => {}
                    }
                },
            }
        };

        match end {
            StreamEnd::Terminal(ImageTerminal::Completed {
                generated,
                total,
                message,
            }) => {
                self.reporter.progress(100.0, message);
                if generated == Some(0) {
                    self.reporter.persistent_error(NOTHING_GENERATED);
                }
                tracing::info!(project_id = %self.project_id, ?generated, ?total, "Image generation complete");

                self.pause(stage, self.config.images_complete_delay()).await?;
                self.reload(ReloadScope::All).await;
                self.reporter.clear();

                if generated == Some(0) {
                    return Err(self.fail(
                        stage,
                        WorkflowError::NothingGenerated(NOTHING_GENERATED.to_string()),
                    ));
                }
                Ok(StageReport::ImagesGenerated { generated, total })
            }
            StreamEnd::Terminal(ImageTerminal::Fatal {
                error_code,
                message,
            }) => {
                self.reporter.persistent_error(message.clone());
                self.reporter.message(message.clone());

                self.pause(stage, self.config.images_fatal_delay()).await?;
                self.reload(ReloadScope::All).await;

                let err = WorkflowError::from_generation_code(error_code.as_deref(), message);
                Err(self.fail(stage, err))
            }
            StreamEnd::Terminal(ImageTerminal::Failed(message)) => {
                Err(self.fail(stage, WorkflowError::GenerationFailed(message)))
            }
            StreamEnd::Interrupted(e) => {
                let percent = self.reporter.percent();
                tracing::warn!(project_id = %self.project_id, percent, error = %format!("{:#}", e), "Image stream interrupted");

                match self.config.stream_failure_policy() {
                    StreamFailurePolicy::OptimisticAbove(threshold) if percent > threshold => {
                        self.reporter.progress(100.0, ASSUMED_COMPLETE);
                        self.pause(stage, self.config.images_complete_delay()).await?;
                        self.reload(ReloadScope::All).await;
                        self.reporter.clear();
                        Ok(StageReport::ImagesGenerated {
                            generated: None,
                            total: None,
                        })
                    }
                    _ => Err(self.fail(stage, WorkflowError::Transport(CONNECTION_LOST.to_string()))),
                }
            }
        }
    }
}
