//! Configuration management (`lumen.toml`).
//!
//! Every field has a default, so an empty or partial file is valid. The
//! application decides where the file lives; [`Config::load`] only reads it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Window settings
    #[serde(default)]
    pub window: WindowConfig,
    /// Renderer settings
    #[serde(default)]
    pub renderer: RendererConfig,
}

/// Initial window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Initial inner width in physical pixels (default: 1280)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Initial inner height in physical pixels (default: 720)
    #[serde(default = "default_height")]
    pub height: u32,
    /// Window title (default: "Lumen")
    #[serde(default = "default_title")]
    pub title: String,
}

/// Present mode preference for the swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresentPreference {
    /// Mailbox, then immediate, then FIFO.
    #[default]
    LowLatency,
    /// Always FIFO.
    Vsync,
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Enable the Khronos validation layer (default: on in debug builds)
    #[serde(default = "default_validation")]
    pub validation: bool,
    /// Use a negative-height viewport so +Y points up in clip space (default: false)
    #[serde(default)]
    pub flip_viewport_y: bool,
    /// Color the swapchain pass clears to (default: near black)
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
    /// Present mode preference (default: low_latency)
    #[serde(default)]
    pub present_mode: PresentPreference,
    /// Directory holding the compiled SPIR-V shaders (default: "shaders/spirv")
    #[serde(default = "default_shader_dir")]
    pub shader_dir: PathBuf,
}

fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_title() -> String {
    "Lumen".to_string()
}
fn default_validation() -> bool {
    cfg!(debug_assertions)
}
fn default_clear_color() -> [f32; 4] {
    [0.01, 0.01, 0.01, 1.0]
}
fn default_shader_dir() -> PathBuf {
    PathBuf::from("shaders/spirv")
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            validation: default_validation(),
            flip_viewport_y: false,
            clear_color: default_clear_color(),
            present_mode: PresentPreference::default(),
            shader_dir: default_shader_dir(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the configuration at `path`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error rather than a silent fallback.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_toml(&text)?;
                tracing::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "Lumen");
        assert!(!config.renderer.flip_viewport_y);
        assert_eq!(config.renderer.clear_color, [0.01, 0.01, 0.01, 1.0]);
        assert_eq!(config.renderer.present_mode, PresentPreference::LowLatency);
        assert_eq!(config.renderer.shader_dir, PathBuf::from("shaders/spirv"));
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial_renderer() {
        let toml_str = r#"
[renderer]
flip_viewport_y = true
present_mode = "vsync"
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert!(config.renderer.flip_viewport_y);
        assert_eq!(config.renderer.present_mode, PresentPreference::Vsync);
        assert_eq!(config.renderer.clear_color, [0.01, 0.01, 0.01, 1.0]);
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = Config::from_toml("[window]\nwidth = \"wide\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("lumen-config-that-does-not-exist.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("lumen-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[window]\ntitle = \"Test\"\nwidth = 640\n").unwrap();
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.window.title, "Test");
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
    }
}
