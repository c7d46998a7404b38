//! Domain models mirrored from the remote service.

pub mod asset;
pub mod generation;
pub mod project;
pub mod provider;
pub mod scene;
pub mod timestamp;

pub use asset::{Asset, AssetType};
pub use generation::{
    AnalyzeScriptRequest, AnalyzeScriptResponse, AnimateScenesResponse, AnimationTask,
    ErrorPayload, VideoProviderInfo,
};
pub use project::{CreateProjectRequest, Project, ProjectStatus};
pub use provider::{ImageProvider, VideoProvider};
pub use scene::{Scene, SceneStatus};
