//! Minirag Core Library
//!
//! Foundational utilities shared by the pipeline and its collaborator
//! clients:
//! - Error taxonomy (`RagError`, `RagResult`, `Stage`)
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{RagError, RagResult, Stage};
