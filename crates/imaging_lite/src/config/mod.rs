//! Configuration system

pub use serde::{Deserialize, Serialize};

use crate::core::tokens;
use crate::foundation::math::Mat4;
use crate::render_params::{ColorCorrection, RenderParams};
use std::path::PathBuf;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Host-side render configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend id; empty selects the registry default
    pub backend: String,
    /// Output width and height in pixels
    pub resolution: (u32, u32),
    /// Sample budget per image
    pub samples: u32,
    /// Background color
    pub clear_color: [f32; 4],
    /// Color output conversion
    pub color_correction: ColorCorrection,
    /// Output channels to render
    pub aovs: Vec<String>,
    /// Delay between convergence polls
    pub poll_interval_ms: u64,
    /// Convergence polls before giving up
    pub max_polls: u32,
    /// Directory output images are written to
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: String::new(),
            resolution: (512, 512),
            samples: 64,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            color_correction: ColorCorrection::SRgb,
            aovs: vec![tokens::AOV_COLOR.to_string(), tokens::AOV_DEPTH.to_string()],
            poll_interval_ms: 0,
            max_polls: 1024,
            output_dir: PathBuf::from("renders"),
        }
    }
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Render parameters for a free camera
    pub fn to_render_params(&self, view_matrix: Mat4, proj_matrix: Mat4) -> RenderParams {
        RenderParams {
            plugin_id: self.backend.clone(),
            samples: self.samples,
            clear_color: self.clear_color,
            color_correction_mode: self.color_correction,
            render_resolution: self.resolution,
            view_matrix,
            proj_matrix,
            aovs: self.aovs.clone(),
            ..RenderParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            backend = "SoftwarePreview"
            resolution = [64, 32]
            color_correction = "disabled"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, "SoftwarePreview");
        assert_eq!(config.resolution, (64, 32));
        assert_eq!(config.color_correction, ColorCorrection::Disabled);
        assert_eq!(config.samples, 64);
    }

    #[test]
    fn test_round_trip_through_files() {
        let dir = std::env::temp_dir();
        let config = EngineConfig { samples: 3, ..EngineConfig::default() };
        for name in ["imaging_lite_config_test.toml", "imaging_lite_config_test.ron"] {
            let path = dir.join(name);
            let path = path.to_str().unwrap();
            config.save_to_file(path).unwrap();
            assert_eq!(EngineConfig::load_from_file(path).unwrap(), config);
            std::fs::remove_file(path).unwrap();
        }
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = EngineConfig::default().save_to_file("config.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_render_params_from_config() {
        let config = EngineConfig::default();
        let params = config.to_render_params(Mat4::identity(), Mat4::identity());
        assert_eq!(params.render_resolution, (512, 512));
        assert_eq!(params.color_correction_mode, ColorCorrection::SRgb);
        assert_eq!(params.aovs, config.aovs);
    }
}
