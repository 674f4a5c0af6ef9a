//! Core utilities shared by the lumen crates.
//!
//! This crate provides foundational types and utilities:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Configuration management

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, PresentPreference, RendererConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::{DEFAULT_FILTER, init_logging};
pub use timer::{MAX_FRAME_TIME, Timer};
