//! Backend interfaces
//!
//! The traits a rendering backend implements (plugin, delegate, pass,
//! buffer) and the value types exchanged across them.

pub mod format;
pub mod params;
pub mod render_buffer;
pub mod render_delegate;
pub mod render_pass;
pub mod render_pass_state;
pub mod renderer_plugin;
pub mod settings;

pub use format::{AovDescriptor, Format, RenderBufferDescriptor, Viewport};
pub use params::{AovBinding, RenderTaskParams, RprimCollection};
pub use render_buffer::{MappedBuffer, RenderBuffer};
pub use render_delegate::RenderDelegate;
pub use render_pass::RenderPass;
pub use render_pass_state::RenderPassState;
pub use renderer_plugin::RendererPlugin;
pub use settings::{RenderSettingDescriptor, SettingControl, SettingWidget};
