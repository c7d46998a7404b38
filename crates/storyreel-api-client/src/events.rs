//! Typed events of the image generation stream.

use anyhow::Result;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;

use crate::sse::{SseDecoder, SseMessage};

/// One payload of `generate-images-stream`, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageEvent {
    Start {
        #[serde(default)]
        total: Option<u32>,
        #[serde(default)]
        message: String,
    },
    Progress {
        current: u32,
        total: u32,
        #[serde(default)]
        scene_title: Option<String>,
        #[serde(default)]
        message: String,
    },
    SceneComplete {
        scene: u32,
        total: u32,
        #[serde(default)]
        image_url: Option<String>,
        #[serde(default)]
        message: String,
    },
    /// Non-fatal; the stream continues.
    SceneError {
        #[serde(default)]
        scene: Option<u32>,
        #[serde(default)]
        message: String,
        #[serde(default)]
        error_code: Option<String>,
    },
    FatalError {
        #[serde(default)]
        message: String,
        #[serde(default)]
        error_code: Option<String>,
    },
    Complete {
        #[serde(default)]
        generated: Option<u32>,
        #[serde(default)]
        total: Option<u32>,
        #[serde(default)]
        message: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl ImageEvent {
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Events after which the server sends nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImageEvent::FatalError { .. } | ImageEvent::Complete { .. } | ImageEvent::Error { .. }
        )
    }
}

/// Pull-based reader of [`ImageEvent`]s over a byte stream.
///
/// Payloads that are not valid JSON are logged and skipped. Nothing is read
/// after a terminal event. Dropping the reader closes the underlying
/// connection.
pub struct ImageEventStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<SseMessage>,
    finished: bool,
}

impl ImageEventStream {
    pub fn new<S>(body: S) -> Self
    where
        S: futures::Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            body: body.boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// Next event, `None` at end of stream, `Err` on a transport failure.
    pub async fn next_event(&mut self) -> Option<Result<ImageEvent>> {
        loop {
            while let Some(message) = self.pending.pop_front() {
                match ImageEvent::parse(&message.data) {
                    Ok(event) => {
                        if event.is_terminal() {
                            self.finished = true;
                            self.pending.clear();
                        }
                        return Some(Ok(event));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, data = %message.data, "Ignoring malformed stream payload");
                    }
                }
            }

            if self.finished {
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(anyhow::Error::new(e).context("Image stream interrupted")));
                }
                None => {
                    self.finished = true;
                    if !self.decoder.is_idle() {
                        tracing::debug!("Image stream ended inside an event");
                    }
                }
            }
        }
    }
}
