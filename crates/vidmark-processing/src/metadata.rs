//! Media metadata types

use serde::{Deserialize, Serialize};

/// Video metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Container duration; recordings straight from a browser often lack one
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub framerate: Option<f32>,
    pub has_audio: bool,
}
