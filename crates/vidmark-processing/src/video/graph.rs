//! Declarative overlay graph for the external engine.
//!
//! The graph is always the same: the watermark (input 1) is forced to
//! `WATERMARK_SIZE`x`WATERMARK_SIZE` and composited on every frame of the source
//! (input 0), `WATERMARK_MARGIN` units from the top and right edges.

use std::fmt;
use std::path::PathBuf;

use vidmark_core::constants::{WATERMARK_MARGIN, WATERMARK_SIZE};
use vidmark_storage::{ArtifactHandle, WatermarkAsset};

pub const SOURCE_INPUT: usize = 0;
pub const WATERMARK_INPUT: usize = 1;

const SCALED_WATERMARK_LABEL: &str = "wm";
const OUTPUT_LABEL: &str = "out";

/// A stream endpoint in the filter graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pad {
    /// Video stream of the numbered input
    Input(usize),
    /// Intermediate or final labelled stream
    Label(&'static str),
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Input(index) => write!(f, "[{}:v]", index),
            Pad::Label(name) => write!(f, "[{}]", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStep {
    /// Forced scale, aspect ratio not preserved
    Scale {
        input: Pad,
        width: u32,
        height: u32,
        output: Pad,
    },
    /// Composite `overlay` on `base`, anchored top-right
    Overlay {
        base: Pad,
        overlay: Pad,
        margin: u32,
        output: Pad,
    },
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStep::Scale {
                input,
                width,
                height,
                output,
            } => write!(f, "{}scale={}:{}{}", input, width, height, output),
            // W and w are evaluated per frame against the base and overlay sizes
            FilterStep::Overlay {
                base,
                overlay,
                margin,
                output,
            } => write!(
                f,
                "{}{}overlay=W-w-{}:{}{}",
                base, overlay, margin, margin, output
            ),
        }
    }
}

/// One overlay operation: exactly one source, one watermark, one destination.
///
/// Jobs are built once and consumed by the executor; a failed job is discarded.
#[derive(Debug)]
pub struct TransformJob {
    source: PathBuf,
    watermark: PathBuf,
    output: ArtifactHandle,
    steps: Vec<FilterStep>,
    audio_codec: String,
}

impl TransformJob {
    pub fn source(&self) -> &std::path::Path {
        &self.source
    }

    pub fn watermark(&self) -> &std::path::Path {
        &self.watermark
    }

    pub fn output(&self) -> &ArtifactHandle {
        &self.output
    }

    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    pub fn into_output(self) -> ArtifactHandle {
        self.output
    }

    /// Render the graph as an FFmpeg `-filter_complex` expression.
    pub fn filter_complex(&self) -> String {
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Full engine argument list, inputs in graph order.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            self.source.to_string_lossy().to_string(),
            "-i".to_string(),
            self.watermark.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            self.filter_complex(),
            "-map".to_string(),
            Pad::Label(OUTPUT_LABEL).to_string(),
            // Optional: sources without audio still succeed
            "-map".to_string(),
            format!("{}:a?", SOURCE_INPUT),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-f".to_string(),
            "mp4".to_string(),
            self.output.path().to_string_lossy().to_string(),
        ]
    }
}

/// Builds the fixed watermark overlay job.
#[derive(Debug, Clone)]
pub struct TransformGraphBuilder {
    audio_codec: String,
}

impl Default for TransformGraphBuilder {
    fn default() -> Self {
        Self {
            audio_codec: "copy".to_string(),
        }
    }
}

impl TransformGraphBuilder {
    pub fn new(audio_codec: impl Into<String>) -> Self {
        Self {
            audio_codec: audio_codec.into(),
        }
    }

    /// Pure construction; no I/O.
    pub fn build(
        &self,
        source: &ArtifactHandle,
        watermark: &WatermarkAsset,
        output: ArtifactHandle,
    ) -> TransformJob {
        let scaled = Pad::Label(SCALED_WATERMARK_LABEL);
        let steps = vec![
            FilterStep::Scale {
                input: Pad::Input(WATERMARK_INPUT),
                width: WATERMARK_SIZE,
                height: WATERMARK_SIZE,
                output: scaled,
            },
            FilterStep::Overlay {
                base: Pad::Input(SOURCE_INPUT),
                overlay: scaled,
                margin: WATERMARK_MARGIN,
                output: Pad::Label(OUTPUT_LABEL),
            },
        ];

        TransformJob {
            source: source.path().to_path_buf(),
            watermark: watermark.path().to_path_buf(),
            output,
            steps,
            audio_codec: self.audio_codec.clone(),
        }
    }
}
