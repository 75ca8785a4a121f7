//! Video watermarking module

pub mod executor;
pub mod graph;
pub mod probe;

pub use executor::{FFmpegExecutor, TransformExecutor};
pub use graph::{FilterStep, Pad, TransformGraphBuilder, TransformJob};
pub use probe::VideoProbe;

/// Validate that a binary path doesn't contain shell metacharacters
pub(crate) fn validate_binary_path(path: &str) -> Result<(), String> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.trim().is_empty() {
        return Err("path is empty".to_string());
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(format!("path contains dangerous characters: {}", path));
    }
    Ok(())
}
