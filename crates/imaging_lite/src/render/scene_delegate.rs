//! Scene delegate interface
//!
//! A scene delegate is the data source the scene index pulls prim state from
//! during sync. Every prim records the id of the delegate that inserted it.

use crate::core::{tokens, ScenePath};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::RenderBufferDescriptor;
use crate::render::rprim::Geometry;
use crate::render::value::Value;
use crate::render::{RenderError, RenderResult};

/// Source of prim data for the scene index
pub trait SceneDelegate {
    /// Path under which this delegate's prims live
    fn delegate_id(&self) -> &ScenePath;

    /// Generic keyed lookup
    fn get(&self, id: &ScenePath, key: &str) -> RenderResult<Value>;

    /// Local to world transform of a prim
    fn transform(&self, id: &ScenePath) -> RenderResult<Mat4>;

    /// Visibility of a prim
    fn visible(&self, _id: &ScenePath) -> RenderResult<bool> {
        Ok(true)
    }

    /// Camera parameter lookup
    fn camera_param(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        self.get(id, key)
    }

    /// Light parameter lookup
    fn light_param(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        self.get(id, key)
    }

    /// Allocation descriptor of a render buffer prim
    fn render_buffer_descriptor(&self, id: &ScenePath) -> RenderResult<RenderBufferDescriptor> {
        Ok(self
            .get(id, tokens::RENDER_BUFFER_DESCRIPTOR)?
            .extract(id, tokens::RENDER_BUFFER_DESCRIPTOR)?)
    }

    /// Render tags a task filters drawables by
    fn task_render_tags(&self, _task_id: &ScenePath) -> RenderResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Render tag of a drawable
    fn render_tag(&self, _id: &ScenePath) -> RenderResult<String> {
        Ok(tokens::GEOMETRY.to_string())
    }

    /// Surface of a drawable
    fn geometry(&self, id: &ScenePath) -> RenderResult<Geometry> {
        Err(RenderError::UnsupportedPrimType {
            path: id.clone(),
            type_name: "drawable".to_string(),
        })
    }

    /// Linear display color of a drawable
    fn display_color(&self, _id: &ScenePath) -> RenderResult<Vec3> {
        Ok(Vec3::repeat(0.5))
    }
}
