//! Shared artifact name generation.
//!
//! Name format: `{kind}-{unix_nanos}-{uuid}.{ext}`.

use crate::traits::ArtifactKind;
use chrono::Utc;
use uuid::Uuid;

const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 8;

/// Generate a unique file name for an artifact of the given kind.
pub fn generate_artifact_name(kind: ArtifactKind, id: Uuid, extension: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}-{}-{}.{}", kind, nanos, id, sanitize_extension(extension))
}

/// Keep only short ASCII alphanumeric extensions; anything else becomes `bin`.
pub fn sanitize_extension(extension: &str) -> String {
    let ext = extension.trim().trim_start_matches('.');
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return FALLBACK_EXTENSION.to_string();
    }
    ext.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("webm"), "webm");
        assert_eq!(sanitize_extension(".MP4"), "mp4");
        assert_eq!(sanitize_extension("../../x"), "bin");
        assert_eq!(sanitize_extension("a/b"), "bin");
        assert_eq!(sanitize_extension(""), "bin");
        assert_eq!(sanitize_extension("averyverylongext"), "bin");
    }

    #[test]
    fn test_names_are_unique() {
        let a = generate_artifact_name(ArtifactKind::Output, Uuid::new_v4(), "mp4");
        let b = generate_artifact_name(ArtifactKind::Output, Uuid::new_v4(), "mp4");
        assert_ne!(a, b);
        assert!(a.starts_with("output-"));
        assert!(a.ends_with(".mp4"));
    }
}
