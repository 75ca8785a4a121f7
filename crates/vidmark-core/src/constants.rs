//! Fixed parameters of the watermark overlay and output format.

/// Side length, in output pixels, the watermark is forced to before compositing.
pub const WATERMARK_SIZE: u32 = 80;

/// Distance from the top and right edges of the source frame.
pub const WATERMARK_MARGIN: u32 = 10;

/// Extension of every produced artifact.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Content type of every produced artifact.
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// Multipart field that carries the uploaded clip.
pub const VIDEO_FIELD_NAME: &str = "video";
