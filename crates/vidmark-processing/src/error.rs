use std::io;
use thiserror::Error;

/// Terminal failure of one transform job.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid engine path: {0}")]
    InvalidEnginePath(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Engine exited with status {status:?}: {diagnostic}")]
    Engine {
        status: Option<i32>,
        diagnostic: String,
    },

    #[error("Engine produced no usable output: {0}")]
    MissingOutput(String),

    #[error("Transform exceeded {secs}s")]
    TimedOut { secs: u64 },

    #[error("Output validation failed: {0}")]
    Probe(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransformError {
    /// Human-readable explanation suitable for the caller.
    pub fn diagnostic(&self) -> String {
        match self {
            TransformError::Engine { diagnostic, .. } => diagnostic.clone(),
            TransformError::Spawn { .. } | TransformError::InvalidEnginePath(_) => {
                "video engine is unavailable".to_string()
            }
            TransformError::MissingOutput(_) => "no output was produced".to_string(),
            TransformError::TimedOut { secs } => format!("processing exceeded {}s", secs),
            TransformError::Probe(msg) => msg.clone(),
            TransformError::Io(e) => e.to_string(),
        }
    }
}
