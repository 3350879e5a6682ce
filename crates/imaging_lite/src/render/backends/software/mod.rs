//! Software rendering backend
//!
//! Ray casts the implicit drawables of the scene index on the CPU. Two
//! plugins share the implementation: a progressive one that accumulates
//! jittered samples across executions and supports pause and stop, and a
//! single-sample preview.

mod delegate;
mod plugin;
mod raycast;
mod render_buffer;
mod render_pass;

pub use delegate::SoftwareDelegate;
pub use plugin::SoftwarePlugin;
pub use render_buffer::SoftwareRenderBuffer;
pub use render_pass::SoftwareRenderPass;

/// Setting enabling light shading; a headlight is used when disabled
pub const ENABLE_LIGHTING: &str = "enableLighting";
/// Setting for the ambient term added to lit shading
pub const AMBIENT: &str = "ambient";
/// Free-form string setting carried for host applications
pub const LABEL: &str = "label";
/// Render stats key reporting accumulated samples
pub const SAMPLES: &str = "samples";
