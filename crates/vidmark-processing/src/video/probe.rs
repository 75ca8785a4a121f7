//! Video probe - metadata extraction through ffprobe

use crate::metadata::VideoMetadata;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct VideoProbe {
    ffprobe_path: String,
}

impl VideoProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self> {
        let ffprobe_path = ffprobe_path.into();
        super::validate_binary_path(&ffprobe_path)
            .map_err(|e| anyhow!("Invalid ffprobe_path: {}", e))?;
        Ok(Self { ffprobe_path })
    }

    /// Extract metadata of the first video stream of a file.
    #[tracing::instrument(skip(self), fields(process.executable.path = %self.ffprobe_path))]
    pub async fn probe(&self, video_path: &Path) -> Result<VideoMetadata> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(video_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;

        let metadata = parse_probe_output(&probe_data)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            video_duration = metadata.duration,
            width = metadata.width,
            height = metadata.height,
            codec = %metadata.codec,
            "Video probe completed"
        );

        Ok(metadata)
    }
}

fn parse_probe_output(probe_data: &serde_json::Value) -> Result<VideoMetadata> {
    let streams = probe_data["streams"]
        .as_array()
        .ok_or_else(|| anyhow!("No streams found"))?;

    let stream = streams
        .iter()
        .find(|s| s["codec_type"] == "video")
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let has_audio = streams.iter().any(|s| s["codec_type"] == "audio");

    let duration = probe_data["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok());

    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse width"))? as u32;

    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse height"))? as u32;

    let codec = stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    let framerate = stream["r_frame_rate"].as_str().and_then(|r| {
        let (num, den) = r.split_once('/')?;
        let num: f32 = num.parse().ok()?;
        let den: f32 = den.parse().ok()?;
        (den != 0.0).then(|| num / den)
    });

    Ok(VideoMetadata {
        duration,
        width,
        height,
        codec,
        framerate,
        has_audio,
    })
}
