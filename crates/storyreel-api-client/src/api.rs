//! Domain methods for the backend API client.
//!
//! Response types live in `storyreel_core::models`.

use crate::{ApiClient, ImageEventStream};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use storyreel_core::models::{
    AnalyzeScriptRequest, AnalyzeScriptResponse, AnimateScenesResponse, Asset,
    CreateProjectRequest, ImageProvider, Project, Scene, VideoProvider, VideoProviderInfo,
};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use validator::Validate;

impl ApiClient {
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.get("/projects/", &[]).await
    }

    pub async fn get_project(&self, project_id: Uuid) -> Result<Project> {
        self.get(&format!("/projects/{}", project_id), &[]).await
    }

    /// Validates the request locally before sending it.
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        request
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid input: {}", e))?;
        self.post_json("/projects/", request).await
    }

    pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
        self.delete(&format!("/projects/{}", project_id)).await
    }

    pub async fn list_scenes(&self, project_id: Uuid) -> Result<Vec<Scene>> {
        self.get(&format!("/scenes/project/{}", project_id), &[])
            .await
    }

    pub async fn list_assets(&self, project_id: Uuid) -> Result<Vec<Asset>> {
        self.get(&format!("/scenes/project/{}/assets", project_id), &[])
            .await
    }

    /// Split a script into scenes. Runs for as long as the language model
    /// does, so the request timeout does not apply.
    pub async fn analyze_script(
        &self,
        project_id: Uuid,
        script: &str,
    ) -> Result<AnalyzeScriptResponse> {
        let request = AnalyzeScriptRequest {
            project_id,
            script: script.to_string(),
        };
        self.post_json_untimed("/generation/analyze-script", &request)
            .await
    }

    /// Start animating every scene that has an image. The backend submits one
    /// provider task per scene before answering, so the request timeout does
    /// not apply.
    pub async fn animate_scenes(
        &self,
        project_id: Uuid,
        provider: VideoProvider,
    ) -> Result<AnimateScenesResponse> {
        self.post_query_untimed(
            &format!("/generation/animate-scenes/{}", project_id),
            &[("provider", provider.as_str().to_string())],
        )
        .await
    }

    /// Capabilities of the video providers, keyed by provider id.
    pub async fn list_video_providers(&self) -> Result<BTreeMap<String, VideoProviderInfo>> {
        self.get("/generation/video-providers", &[]).await
    }

    /// Open the server-sent event stream of an image generation run.
    pub async fn open_image_stream(
        &self,
        project_id: Uuid,
        provider: ImageProvider,
    ) -> Result<ImageEventStream> {
        let url = self.build_url(&format!("/generation/generate-images-stream/{}", project_id));
        let response = self
            .get_stream(&url, &[("provider", provider.as_str().to_string())])
            .await?;
        Ok(ImageEventStream::from_response(response))
    }

    /// Stream an asset to `destination`. Returns the number of bytes written.
    pub async fn download_asset(&self, asset: &Asset, destination: &Path) -> Result<u64> {
        use futures::StreamExt;

        let response = self.get_stream(&asset.url, &[]).await?;
        let mut file = tokio::fs::File::create(destination)
            .await
            .with_context(|| format!("Failed to create file: {}", destination.display()))?;

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("Failed to read asset body")?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write file: {}", destination.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.context("Failed to flush file")?;

        tracing::debug!(asset_id = %asset.id, bytes = written, path = %destination.display(), "Asset downloaded");
        Ok(written)
    }
}
