//! Renderer plugin interface

use crate::render::api::RenderDelegate;
use crate::render::RenderResult;

/// Factory for one rendering backend
pub trait RendererPlugin: Send + Sync {
    /// Stable identifier
    fn id(&self) -> &str;

    /// Name shown to users
    fn display_name(&self) -> &str;

    /// Ordering weight; higher priorities are listed first and become the
    /// default backend
    fn priority(&self) -> i32 {
        0
    }

    /// Whether the backend can run on this host
    fn is_supported(&self) -> bool {
        true
    }

    /// Instantiate a render delegate
    fn create_render_delegate(&self) -> RenderResult<Box<dyn RenderDelegate>>;
}
