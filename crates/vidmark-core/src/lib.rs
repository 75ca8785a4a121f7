//! Vidmark Core Library
//!
//! This crate provides the configuration, error taxonomy and constants shared
//! by the storage, processing and API crates.

pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
