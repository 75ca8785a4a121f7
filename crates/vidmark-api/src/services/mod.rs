//! Per-request services: artifact ownership and the outbound response.

pub mod lifecycle;
pub mod streamer;
