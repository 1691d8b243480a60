//! Gantry Core - shared infrastructure for the Gantry framework
//!
//! Error handling, logging bootstrap and configuration types used by the
//! service layer and the web server.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
