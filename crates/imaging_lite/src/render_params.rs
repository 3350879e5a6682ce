//! Per-invocation render parameters

use crate::core::tokens;
use crate::foundation::math::Mat4;
use crate::foundation::time::TimeCode;
use serde::{Deserialize, Serialize};

/// How the color output is converted before it reaches the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorCorrection {
    /// Linear values are passed through untouched
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
    /// Linear values are mapped through the sRGB display curve
    #[serde(rename = "sRGB")]
    SRgb,
}

/// Everything a one-shot render needs from the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Backend to render with; empty selects the registry default
    pub plugin_id: String,
    /// Scene time
    pub frame: TimeCode,
    /// Sample budget handed to the backend as `maxSamples`
    pub samples: u32,
    /// Background color
    pub clear_color: [f32; 4],
    /// Color output conversion
    pub color_correction_mode: ColorCorrection,
    /// Output width and height in pixels
    pub render_resolution: (u32, u32),
    /// Free camera world-to-view matrix
    pub view_matrix: Mat4,
    /// Free camera projection matrix
    pub proj_matrix: Mat4,
    /// Output channels to enable, in order
    pub aovs: Vec<String>,
    /// Draw prims whose purpose is `guide`
    pub show_guides: bool,
    /// Draw prims whose purpose is `proxy`
    pub show_proxy: bool,
    /// Draw prims whose purpose is `render`
    pub show_render: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            plugin_id: String::new(),
            frame: TimeCode::Default,
            samples: 64,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            color_correction_mode: ColorCorrection::Disabled,
            render_resolution: (100, 100),
            view_matrix: Mat4::identity(),
            proj_matrix: Mat4::identity(),
            aovs: vec![tokens::AOV_COLOR.to_string()],
            show_guides: false,
            show_proxy: true,
            show_render: false,
        }
    }
}

impl RenderParams {
    /// Render tags drawn by the render task
    pub fn render_tags(&self) -> Vec<String> {
        let mut tags = vec![tokens::GEOMETRY.to_string()];
        if self.show_guides {
            tags.push(tokens::GUIDE.to_string());
        }
        if self.show_proxy {
            tags.push(tokens::PROXY.to_string());
        }
        if self.show_render {
            tags.push(tokens::RENDER.to_string());
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = RenderParams::default();
        assert_eq!(params.samples, 64);
        assert_eq!(params.render_resolution, (100, 100));
        assert_eq!(params.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert!(params.frame.is_default());
    }

    #[test]
    fn test_render_tags_follow_purpose_flags() {
        let mut params = RenderParams::default();
        assert_eq!(params.render_tags(), vec!["geometry", "proxy"]);
        params.show_proxy = false;
        params.show_guides = true;
        params.show_render = true;
        assert_eq!(params.render_tags(), vec!["geometry", "guide", "render"]);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let params: RenderParams =
            ron::from_str("(samples: 4, color_correction_mode: sRGB, aovs: [\"color\", \"depth\"])").unwrap();
        assert_eq!(params.samples, 4);
        assert_eq!(params.color_correction_mode, ColorCorrection::SRgb);
        assert_eq!(params.aovs.len(), 2);
        assert_eq!(params.render_resolution, (100, 100));
    }
}
