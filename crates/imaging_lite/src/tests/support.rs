//! Test doubles and scene helpers shared by the facade scenarios

use crate::core::ScenePath;
use crate::engine::Engine;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::render::api::{
    AovDescriptor, RenderBuffer, RenderDelegate, RenderPass, RenderPassState, RendererPlugin, RprimCollection,
    Viewport,
};
use crate::render::camera::CameraLens;
use crate::render::index::RenderIndex;
use crate::render::value::Value;
use crate::render::{PluginRegistry, RenderError, RenderResult};
use crate::render_params::RenderParams;
use crate::scene::{Prim, Stage};
use std::sync::Arc;

pub const UNSUPPORTED: &str = "Unsupported";
pub const FAILING: &str = "Failing";
pub const BUFFERLESS: &str = "Bufferless";
pub const PROGRESSIVE: &str = "SoftwareProgressive";
pub const PREVIEW: &str = "SoftwarePreview";

/// Pass that draws nothing and is always done
#[derive(Debug, Default)]
pub struct NullPass {
    collection: RprimCollection,
}

impl RenderPass for NullPass {
    fn collection(&self) -> &RprimCollection {
        &self.collection
    }

    fn set_collection(&mut self, collection: RprimCollection) {
        self.collection = collection;
    }

    fn execute(&mut self, _state: &RenderPassState, _index: &RenderIndex, _render_tags: &[String]) -> RenderResult<()> {
        Ok(())
    }

    fn is_converged(&self) -> bool {
        true
    }
}

/// Delegate without settings, outputs or render buffers
#[derive(Debug, Default)]
pub struct NullDelegate;

impl RenderDelegate for NullDelegate {
    fn render_setting(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set_render_setting(&mut self, _key: &str, _value: Value) {}

    fn default_aov_descriptor(&self, _aov_name: &str) -> AovDescriptor {
        AovDescriptor::invalid()
    }

    fn supports_render_buffers(&self) -> bool {
        false
    }

    fn create_render_pass(&self, collection: &RprimCollection) -> Box<dyn RenderPass> {
        Box::new(NullPass { collection: collection.clone() })
    }

    fn create_render_buffer(&self, _id: &ScenePath) -> Option<Arc<dyn RenderBuffer>> {
        None
    }
}

/// Highest priority plugin that never runs on this host
pub struct UnsupportedPlugin;

impl RendererPlugin for UnsupportedPlugin {
    fn id(&self) -> &str {
        UNSUPPORTED
    }

    fn display_name(&self) -> &str {
        "Unsupported Backend"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn create_render_delegate(&self) -> RenderResult<Box<dyn RenderDelegate>> {
        Ok(Box::new(NullDelegate))
    }
}

/// Plugin whose delegate construction always fails
pub struct FailingPlugin;

impl RendererPlugin for FailingPlugin {
    fn id(&self) -> &str {
        FAILING
    }

    fn display_name(&self) -> &str {
        "Failing Backend"
    }

    fn create_render_delegate(&self) -> RenderResult<Box<dyn RenderDelegate>> {
        Err(RenderError::DelegateCreationFailed("no device available".to_string()))
    }
}

/// Plugin producing [`NullDelegate`]s
pub struct BufferlessPlugin;

impl RendererPlugin for BufferlessPlugin {
    fn id(&self) -> &str {
        BUFFERLESS
    }

    fn display_name(&self) -> &str {
        "Bufferless Backend"
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn create_render_delegate(&self) -> RenderResult<Box<dyn RenderDelegate>> {
        Ok(Box::new(NullDelegate))
    }
}

/// Built-in backends plus the test doubles
pub fn registry() -> Arc<PluginRegistry> {
    Arc::new(
        PluginRegistry::with_builtin_plugins()
            .with_plugin(UnsupportedPlugin)
            .with_plugin(FailingPlugin)
            .with_plugin(BufferlessPlugin),
    )
}

pub fn path(text: &str) -> ScenePath {
    text.parse().unwrap()
}

/// Unit sphere at the origin under a distant light, with a camera five units
/// up +Z
pub fn ball_stage() -> Arc<Stage> {
    let mut stage = Stage::new();
    stage.define(path("/World/ball"), Prim::sphere(1.0));
    stage.define(path("/World/sun"), Prim::distant_light(1.0, Vec3::new(1.0, 1.0, 1.0)));
    stage.define(
        path("/World/cam"),
        Prim::camera(CameraLens::default()).with_translation(Vec3::new(0.0, 0.0, 5.0)),
    );
    Arc::new(stage)
}

pub fn empty_stage() -> Arc<Stage> {
    Arc::new(Stage::new())
}

/// View and projection looking at the origin from +Z
pub fn front_camera() -> (Mat4, Mat4) {
    let view = Mat4::look_at_rh(&Point3::new(0.0, 0.0, 5.0), &Point3::origin(), &Vec3::y());
    let projection = Mat4::new_perspective(1.0, std::f64::consts::FRAC_PI_4, 0.1, 100.0);
    (view, projection)
}

/// Engine on `backend` with a square viewport, the front camera and the
/// given outputs enabled
pub fn configured_engine(backend: &str, size: u32, aovs: &[&str]) -> Engine {
    let mut engine = Engine::new(registry());
    engine.select_backend(backend).unwrap();
    engine.set_render_viewport(Viewport::from_size(size, size)).unwrap();
    let (view, projection) = front_camera();
    engine.set_camera_state(view, projection).unwrap();
    for aov in aovs {
        engine.set_renderer_aov(aov).unwrap();
    }
    engine
}

pub fn params_with_samples(samples: u32) -> RenderParams {
    RenderParams { samples, ..RenderParams::default() }
}

/// Native-endian `f32` values of a byte buffer
pub fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Native-endian `i32` values of a byte buffer
pub fn ints(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| i32::from_ne_bytes(chunk.try_into().unwrap()))
        .collect()
}

pub fn stat(engine: &Engine, key: &str) -> Option<Value> {
    engine.render_stats().get(key).cloned()
}
