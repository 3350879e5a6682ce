//! Render delegate interface

use crate::core::ScenePath;
use crate::render::api::{
    AovDescriptor, RenderBuffer, RenderPass, RenderPassState, RenderSettingDescriptor,
    RprimCollection,
};
use crate::render::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Backend object owning settings and the pass and buffer factories
///
/// Background execution control (`pause`, `resume`, `stop`, `restart`)
/// takes `&self` and must be safe to call while the backend renders on its
/// own threads. Backends without such control keep the `false` defaults.
pub trait RenderDelegate {
    /// Settings the backend exposes
    fn render_settings_descriptors(&self) -> Vec<RenderSettingDescriptor> {
        Vec::new()
    }

    /// Current value of a setting, `None` for unknown keys
    fn render_setting(&self, key: &str) -> Option<Value>;

    /// Store a setting value
    fn set_render_setting(&mut self, key: &str, value: Value);

    /// Default descriptor for an output channel; `Format::Invalid` when the
    /// channel is unsupported
    fn default_aov_descriptor(&self, aov_name: &str) -> AovDescriptor;

    /// Whether render buffers can be created
    fn supports_render_buffers(&self) -> bool;

    /// Create a pass drawing `collection`
    fn create_render_pass(&self, collection: &RprimCollection) -> Box<dyn RenderPass>;

    /// Create the state object handed to passes
    fn create_render_pass_state(&self) -> RenderPassState {
        RenderPassState::new()
    }

    /// Create a render buffer bprim; `None` when unsupported
    fn create_render_buffer(&self, id: &ScenePath) -> Option<Arc<dyn RenderBuffer>>;

    /// Whether background rendering can be paused
    fn is_pause_supported(&self) -> bool {
        false
    }

    /// Pause background rendering
    fn pause(&self) -> bool {
        false
    }

    /// Resume background rendering
    fn resume(&self) -> bool {
        false
    }

    /// Stop background rendering
    fn stop(&self) -> bool {
        false
    }

    /// Restart background rendering from scratch
    fn restart(&self) -> bool {
        false
    }

    /// Backend-defined statistics
    fn render_stats(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }
}
