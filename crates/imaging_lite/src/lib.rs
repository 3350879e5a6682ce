//! # Imaging Lite
//!
//! A lightweight scene-rendering engine facade over pluggable render
//! delegates.
//!
//! ## Features
//!
//! - **Backend plugins**: backends are discovered by id through an explicit,
//!   reference-counted plugin registry
//! - **Scene index**: path-addressed cameras, lights, drawables, buffers and
//!   tasks with dirty-bit change tracking
//! - **Progressive rendering**: one render cycle per call, convergence
//!   polled by the host
//! - **Output channels**: color, depth, normal and prim id buffers copied
//!   into caller-owned memory
//! - **Software backends**: CPU ray-casting delegates for previews and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imaging_lite::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stage = Stage::new();
//!     stage.define("/World/ball".parse()?, Prim::sphere(1.0));
//!     let stage = Arc::new(stage);
//!     let root = ScenePath::absolute_root();
//!
//!     let mut engine = Engine::with_builtin_backends()?;
//!     let camera = engine.frame_stage(&stage, &root, TimeCode::Default)?;
//!     engine.set_render_viewport(Viewport::from_size(256, 256))?;
//!     engine.set_camera_state(camera.world_to_view, camera.projection)?;
//!     engine.set_renderer_aov("color")?;
//!
//!     let params = RenderParams::default();
//!     engine.render(&stage, &root, &params)?;
//!     while !engine.is_converged()? {
//!         engine.render(&stage, &root, &params)?;
//!     }
//!
//!     let mut pixels = vec![0_u8; 256 * 256 * 16];
//!     engine.get_renderer_aov("color", &mut pixels)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod foundation;
pub mod render;
pub mod render_once;
pub mod render_params;
pub mod scene;
pub mod session;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineError, EngineResult};
pub use render_once::{render_to_buffers, RenderSummary};
pub use render_params::{ColorCorrection, RenderParams};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig},
        core::{tokens, ScenePath},
        foundation::{
            math::{Mat4, Vec3, Vec4},
            time::TimeCode,
        },
        render::{Camera, Format, PluginRegistry, RendererPlugin, Value, Viewport},
        scene::{Prim, Purpose, Stage, UpAxis},
        ColorCorrection, Engine, EngineError, RenderParams,
    };
}
