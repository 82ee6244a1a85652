//! Generation settings passed through to the API collaborator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target aspect ratio for generated videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 9:16 vertical (shorts/reels)
    #[default]
    Portrait,
    /// 16:9 horizontal
    Landscape,
    /// 1:1 square
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Batch-wide parameters forwarded to every generation call.
///
/// The engine treats these as opaque: only the generation collaborator
/// interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Model identifier understood by the Opal API
    pub model: String,
    /// Target aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Directory the collaborator downloads finished videos into
    pub output_dir: PathBuf,
}

impl GenerationSettings {
    pub fn new(model: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            aspect_ratio: AspectRatio::default(),
            output_dir: output_dir.into(),
        }
    }

    /// Set the target aspect ratio.
    pub fn with_aspect_ratio(mut self, aspect: AspectRatio) -> Self {
        self.aspect_ratio = aspect;
        self
    }
}
