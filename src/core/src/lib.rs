//! Container Factory Core - Foundational Types
//!
//! Configuration, error taxonomy and log level handling shared by the
//! build runtime and the command-line / HTTP front-ends.

pub mod config;
pub mod error;
pub mod log;

// Re-export commonly used types
pub use config::FactoryConfig;
pub use error::{FactoryError, Result};
pub use log::LogLevel;

/// Container Factory version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
