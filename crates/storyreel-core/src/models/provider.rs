//! Generation providers selectable per stage invocation.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider '{0}'")]
pub struct UnknownProvider(pub String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    Dalle,
    Aimlapi,
    Higgsfield,
    #[default]
    Gemini,
}

impl ImageProvider {
    pub const ALL: [ImageProvider; 4] = [
        ImageProvider::Dalle,
        ImageProvider::Aimlapi,
        ImageProvider::Higgsfield,
        ImageProvider::Gemini,
    ];

    /// Value of the `provider` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageProvider::Dalle => "dalle",
            ImageProvider::Aimlapi => "aimlapi",
            ImageProvider::Higgsfield => "higgsfield",
            ImageProvider::Gemini => "gemini",
        }
    }
}

impl Display for ImageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageProvider::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    #[default]
    Veo,
    Kling,
    Sora,
}

impl VideoProvider {
    pub const ALL: [VideoProvider; 3] = [VideoProvider::Veo, VideoProvider::Kling, VideoProvider::Sora];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoProvider::Veo => "veo",
            VideoProvider::Kling => "kling",
            VideoProvider::Sora => "sora",
        }
    }

    /// Human-readable name used in progress messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            VideoProvider::Veo => "Veo 3.1",
            VideoProvider::Kling => "Kling",
            VideoProvider::Sora => "Sora",
        }
    }
}

impl Display for VideoProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoProvider::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}
