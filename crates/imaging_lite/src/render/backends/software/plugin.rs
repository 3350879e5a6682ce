use crate::render::api::{RenderDelegate, RendererPlugin};
use crate::render::RenderResult;

use super::delegate::SoftwareDelegate;

/// Plugin creating software render delegates
#[derive(Debug, Clone)]
pub struct SoftwarePlugin {
    id: &'static str,
    display_name: &'static str,
    priority: i32,
    progressive: bool,
}

impl SoftwarePlugin {
    /// Progressive backend: accumulates up to `maxSamples` samples and
    /// supports pause, resume, stop and restart
    pub const fn progressive() -> Self {
        Self {
            id: "SoftwareProgressive",
            display_name: "Software Progressive",
            priority: 10,
            progressive: true,
        }
    }

    /// Preview backend: one sample per image, no background control
    pub const fn preview() -> Self {
        Self {
            id: "SoftwarePreview",
            display_name: "Software Preview",
            priority: 0,
            progressive: false,
        }
    }
}

impl RendererPlugin for SoftwarePlugin {
    fn id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.display_name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn create_render_delegate(&self) -> RenderResult<Box<dyn RenderDelegate>> {
        log::debug!("Creating {} render delegate", self.display_name);
        Ok(Box::new(SoftwareDelegate::new(self.progressive)))
    }
}
