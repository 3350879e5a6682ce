//! Per-task render pass state

use crate::core::ScenePath;
use crate::foundation::math::Mat4;
use crate::render::api::{AovBinding, Viewport};
use crate::render::camera::Camera;
use crate::render::{RenderError, RenderResult};

/// State a render task hands to its pass every cycle: output bindings,
/// camera and viewport, plus the matrices derived from them in `prepare`
#[derive(Debug, Clone, Default)]
pub struct RenderPassState {
    aov_bindings: Vec<AovBinding>,
    camera_id: Option<ScenePath>,
    camera: Option<Camera>,
    viewport: Viewport,
    world_to_view: Mat4,
    projection: Mat4,
    world_to_ndc: Mat4,
    ndc_to_world: Mat4,
    prepared: bool,
    bound: bool,
}

impl RenderPassState {
    /// Create an empty pass state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the output bindings
    pub fn set_aov_bindings(&mut self, bindings: Vec<AovBinding>) {
        self.aov_bindings = bindings;
    }

    /// Output bindings, with buffer handles resolved by the render task
    pub fn aov_bindings(&self) -> &[AovBinding] {
        &self.aov_bindings
    }

    /// Snapshot the camera and target viewport
    pub fn set_camera_and_viewport(&mut self, camera_id: ScenePath, camera: Camera, viewport: Viewport) {
        self.camera_id = Some(camera_id);
        self.camera = Some(camera);
        self.viewport = viewport;
        self.prepared = false;
    }

    /// Camera snapshot
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Path of the camera sprim
    pub fn camera_id(&self) -> Option<&ScenePath> {
        self.camera_id.as_ref()
    }

    /// Target viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Derive the conformed projection and world/NDC matrices
    pub fn prepare(&mut self) -> RenderResult<()> {
        let (Some(camera_id), Some(camera)) = (&self.camera_id, &self.camera) else {
            self.prepared = false;
            return Ok(());
        };

        let projection = camera.conformed_projection(self.viewport.aspect_ratio());
        let world_to_ndc = projection * camera.world_to_view;
        let ndc_to_world = world_to_ndc
            .try_inverse()
            .ok_or_else(|| RenderError::SingularCamera(camera_id.clone()))?;

        self.world_to_view = camera.world_to_view;
        self.projection = projection;
        self.world_to_ndc = world_to_ndc;
        self.ndc_to_world = ndc_to_world;
        self.prepared = true;
        Ok(())
    }

    /// Whether `prepare` succeeded with a camera bound
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// World to camera space
    pub fn world_to_view(&self) -> &Mat4 {
        &self.world_to_view
    }

    /// Conformed projection
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// World to normalized device coordinates
    pub fn world_to_ndc(&self) -> &Mat4 {
        &self.world_to_ndc
    }

    /// Normalized device coordinates to world
    pub fn ndc_to_world(&self) -> &Mat4 {
        &self.ndc_to_world
    }

    /// Mark the state as in use by an executing pass
    pub fn bind(&mut self) {
        self.bound = true;
    }

    /// Release the state after pass execution
    pub fn unbind(&mut self) {
        self.bound = false;
    }

    /// Whether a pass is currently executing with this state
    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Point3, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_prepare_without_camera_is_not_an_error() {
        let mut state = RenderPassState::new();
        assert!(state.prepare().is_ok());
        assert!(!state.is_prepared());
    }

    #[test]
    fn test_prepare_derives_inverse_matrices() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let projection = Mat4::perspective(1.0, 1.0, 0.1, 100.0);
        let mut state = RenderPassState::new();
        state.set_camera_and_viewport(
            "/cam".parse().unwrap(),
            Camera::new(view, projection),
            Viewport::from_size(64, 32),
        );
        state.prepare().unwrap();
        assert!(state.is_prepared());

        let ndc = state.world_to_ndc().transform_point(&Point3::origin());
        let back = state.ndc_to_world().transform_point(&ndc);
        assert_relative_eq!(back.coords, Vec3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_singular_camera_is_reported() {
        let mut state = RenderPassState::new();
        state.set_camera_and_viewport(
            "/cam".parse().unwrap(),
            Camera::new(Mat4::identity(), Mat4::zeros()),
            Viewport::from_size(8, 8),
        );
        assert!(matches!(state.prepare(), Err(RenderError::SingularCamera(_))));
    }
}
