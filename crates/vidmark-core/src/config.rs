//! Configuration module
//!
//! Settings are read once at process startup from the environment (and a `.env`
//! file when present). Nothing here is reconfigured per request.

use std::env;
use std::path::PathBuf;

const SERVER_PORT: u16 = 4000;
const MAX_VIDEO_SIZE_MB: usize = 500;
const DEFAULT_WATERMARK_PATH: &str = "./public/assets/imgs/watermark.png";
const DEFAULT_AUDIO_CODEC: &str = "copy";

/// Log output format for the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Engine binary, resolved once at startup
    pub ffmpeg_path: String,
    /// When set, produced outputs are probed before being streamed back
    pub ffprobe_path: Option<String>,
    pub watermark_path: PathBuf,
    /// Directory holding per-request transient artifacts
    pub artifact_dir: PathBuf,
    pub max_video_size_bytes: usize,
    /// Optional hardening; the baseline has no transform timeout
    pub transform_timeout_secs: Option<u64>,
    pub audio_codec: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let ffmpeg_path = lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string());
        if ffmpeg_path.trim().is_empty() {
            return Err(anyhow::anyhow!("FFMPEG_PATH must not be empty"));
        }

        let ffprobe_path = lookup("FFPROBE_PATH").filter(|p| !p.trim().is_empty());

        let watermark_path = PathBuf::from(
            lookup("WATERMARK_PATH").unwrap_or_else(|| DEFAULT_WATERMARK_PATH.to_string()),
        );

        let artifact_dir = lookup("ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("vidmark"));

        let max_video_size_mb = lookup("MAX_VIDEO_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_VIDEO_SIZE_MB);

        let transform_timeout_secs = match lookup("TRANSFORM_TIMEOUT_SECS") {
            Some(secs) => {
                let secs: u64 = secs.parse().map_err(|_| {
                    anyhow::anyhow!("TRANSFORM_TIMEOUT_SECS must be a number of seconds")
                })?;
                // 0 keeps the transform unbounded
                (secs > 0).then_some(secs)
            }
            None => None,
        };

        let audio_codec = lookup("AUDIO_CODEC").unwrap_or_else(|| DEFAULT_AUDIO_CODEC.to_string());

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Config {
            server_port,
            environment,
            ffmpeg_path,
            ffprobe_path,
            watermark_path,
            artifact_dir,
            max_video_size_bytes: max_video_size_mb * 1024 * 1024,
            transform_timeout_secs,
            audio_codec,
            log_format,
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
