//! Error types shared by the lumen crates.

use thiserror::Error;

/// Errors raised outside the Vulkan layer.
///
/// GPU-side failures live in `lumen_rhi::RhiError`; this type covers the host
/// side: windows, configuration files and plain IO.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Native surface creation errors
    #[error("Surface error: {0}")]
    Surface(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the core [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
