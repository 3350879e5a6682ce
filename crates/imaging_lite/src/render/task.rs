//! Tasks and the render task
//!
//! A render task drives one backend render pass. It is `Empty` until a
//! non-empty drawable collection arrives and `Active` while a pass exists;
//! an empty collection tears the pass down again.
//!
//! Dirty bits are edge-triggered: every bit handed to `sync` is cleared when
//! it returns, so state is only re-read after someone marks it dirty again.

use crate::core::{tokens, ScenePath};
use crate::render::api::{AovBinding, RenderPass, RenderPassState, RenderTaskParams, RprimCollection, Viewport};
use crate::render::change_tracker::DirtyBits;
use crate::render::index::RenderIndex;
use crate::render::scene_delegate::SceneDelegate;
use crate::render::{RenderError, RenderResult};
use std::any::Any;

/// A schedulable unit run by the execution engine
pub trait Task {
    /// Path of the task in the scene index
    fn id(&self) -> &ScenePath;

    /// Pull dirty state from the task's scene delegate; clears `dirty_bits`
    fn sync(
        &mut self,
        delegate: &dyn SceneDelegate,
        index: &RenderIndex,
        dirty_bits: &mut DirtyBits,
    ) -> RenderResult<()>;

    /// Resolve resources after the scene index has synced
    fn prepare(&mut self, index: &RenderIndex) -> RenderResult<()>;

    /// Do the work
    fn execute(&mut self, index: &RenderIndex) -> RenderResult<()>;

    /// Render tags the task draws
    fn render_tags(&self) -> &[String] {
        &[]
    }

    /// Whether further execution would no longer change the result
    fn is_converged(&self) -> bool {
        true
    }

    /// Downcast for inspection
    fn as_any(&self) -> &dyn Any;
}

/// Task driving a backend render pass over a drawable collection
pub struct RenderTask {
    id: ScenePath,
    pass: Option<Box<dyn RenderPass>>,
    pass_state: Option<RenderPassState>,
    aov_bindings: Vec<AovBinding>,
    viewport: Viewport,
    camera_id: Option<ScenePath>,
    render_tags: Vec<String>,
}

impl RenderTask {
    /// Create an empty task
    pub fn new(id: ScenePath) -> Self {
        Self {
            id,
            pass: None,
            pass_state: None,
            aov_bindings: Vec::new(),
            viewport: Viewport::default(),
            camera_id: None,
            render_tags: Vec::new(),
        }
    }

    /// Whether a render pass exists
    pub fn has_pass(&self) -> bool {
        self.pass.is_some()
    }

    /// Cached output bindings
    pub fn aov_bindings(&self) -> &[AovBinding] {
        &self.aov_bindings
    }

    /// Cached camera reference
    pub fn camera_id(&self) -> Option<&ScenePath> {
        self.camera_id.as_ref()
    }

    /// Cached viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Pass state, once prepared
    pub fn pass_state(&self) -> Option<&RenderPassState> {
        self.pass_state.as_ref()
    }

    fn sync_collection(&mut self, delegate: &dyn SceneDelegate, index: &RenderIndex) -> RenderResult<()> {
        let collection: RprimCollection = delegate
            .get(&self.id, tokens::COLLECTION)?
            .extract(&self.id, tokens::COLLECTION)?;

        if collection.is_empty() {
            if self.pass.take().is_some() {
                log::debug!("Render task {} collection emptied; dropping pass", self.id);
            }
        } else if let Some(pass) = self.pass.as_mut() {
            pass.set_collection(collection);
        } else {
            log::debug!("Render task {} creating pass for '{}'", self.id, collection.name);
            self.pass = Some(index.render_delegate().create_render_pass(&collection));
        }
        Ok(())
    }

    fn sync_params(&mut self, delegate: &dyn SceneDelegate) -> RenderResult<()> {
        let params: RenderTaskParams = delegate
            .get(&self.id, tokens::PARAMS)?
            .extract(&self.id, tokens::PARAMS)?;
        self.aov_bindings = params.aov_bindings;
        self.viewport = params.viewport;
        self.camera_id = params.camera;
        Ok(())
    }
}

impl Task for RenderTask {
    fn id(&self) -> &ScenePath {
        &self.id
    }

    fn sync(
        &mut self,
        delegate: &dyn SceneDelegate,
        index: &RenderIndex,
        dirty_bits: &mut DirtyBits,
    ) -> RenderResult<()> {
        if dirty_bits.contains(DirtyBits::COLLECTION) {
            self.sync_collection(delegate, index)?;
        }
        if dirty_bits.contains(DirtyBits::PARAMS) {
            self.sync_params(delegate)?;
        }
        if dirty_bits.contains(DirtyBits::RENDER_TAGS) {
            self.render_tags = delegate.task_render_tags(&self.id)?;
        }
        if let Some(pass) = self.pass.as_mut() {
            pass.sync()?;
        }
        *dirty_bits = DirtyBits::empty();
        Ok(())
    }

    fn prepare(&mut self, index: &RenderIndex) -> RenderResult<()> {
        let state = self
            .pass_state
            .get_or_insert_with(|| index.render_delegate().create_render_pass_state());

        // Buffer handles may have been invalidated since the params were set.
        for binding in &mut self.aov_bindings {
            binding.render_buffer = index.bprim(&binding.render_buffer_id);
            if binding.render_buffer.is_none() {
                log::warn!(
                    "Render task {}: no render buffer at {} for '{}'",
                    self.id,
                    binding.render_buffer_id,
                    binding.aov_name
                );
            }
        }
        state.set_aov_bindings(self.aov_bindings.clone());

        let Some(pass) = self.pass.as_mut() else {
            return Ok(());
        };
        if self.viewport.is_empty() {
            log::error!("Render task {} has a pass but an empty viewport", self.id);
            return Err(RenderError::EmptyViewport(self.id.clone()));
        }

        let camera_id = self.camera_id.as_ref().ok_or_else(|| {
            log::error!("Render task {} has a pass but no camera", self.id);
            RenderError::CameraNotSet(self.id.clone())
        })?;
        let camera = index.camera(camera_id).ok_or_else(|| {
            log::error!("Render task {}: camera {camera_id} is not in the scene index", self.id);
            RenderError::MissingCamera(camera_id.clone())
        })?;
        state.set_camera_and_viewport(camera_id.clone(), camera.clone(), self.viewport);
        state.prepare()?;
        pass.prepare(&self.render_tags)
    }

    fn execute(&mut self, index: &RenderIndex) -> RenderResult<()> {
        let (Some(pass), Some(state)) = (self.pass.as_mut(), self.pass_state.as_mut()) else {
            return Ok(());
        };
        state.bind();
        let result = pass.execute(state, index, &self.render_tags);
        state.unbind();
        result
    }

    fn render_tags(&self) -> &[String] {
        &self.render_tags
    }

    fn is_converged(&self) -> bool {
        self.pass.as_ref().map_or(true, |pass| pass.is_converged())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Vec4};
    use crate::render::api::{Format, RenderBuffer, RenderBufferDescriptor, RendererPlugin};
    use crate::render::backends::software::SoftwarePlugin;
    use crate::render::camera::WindowPolicy;
    use crate::render::execution::RenderEngine;
    use crate::render::index::SprimType;
    use crate::render::task_data::TaskDataDelegate;
    use std::sync::Arc;

    struct Fixture {
        index: RenderIndex,
        task_data: TaskDataDelegate,
        task: ScenePath,
        camera: ScenePath,
    }

    fn path(s: &str) -> ScenePath {
        s.parse().unwrap()
    }

    fn fixture() -> Fixture {
        let delegate_id = path("/taskDataDelegate");
        let task = path("/taskDataDelegate/renderTask");
        let camera = path("/taskDataDelegate/freeCamera");
        let mut index = RenderIndex::new(SoftwarePlugin::preview().create_render_delegate().unwrap());
        let mut task_data = TaskDataDelegate::new(delegate_id.clone());

        index.insert_task(&delegate_id, task.clone(), Box::new(RenderTask::new(task.clone())));
        index.insert_sprim(SprimType::Camera, &delegate_id, camera.clone());
        task_data.set_parameter(&camera, tokens::WORLD_TO_VIEW_MATRIX, Mat4::identity());
        task_data.set_parameter(&camera, tokens::PROJECTION_MATRIX, Mat4::identity());
        task_data.set_parameter(&camera, tokens::WINDOW_POLICY, WindowPolicy::Fit);
        task_data.set_parameter(&camera, tokens::CLIP_PLANES, Vec::<Vec4>::new());

        Fixture { index, task_data, task, camera }
    }

    fn params(fixture: &Fixture, size: u32) -> RenderTaskParams {
        RenderTaskParams {
            aov_bindings: Vec::new(),
            camera: Some(fixture.camera.clone()),
            viewport: Viewport::from_size(size, size),
        }
    }

    fn push(fixture: &mut Fixture, collection: RprimCollection, params: RenderTaskParams) {
        let task = fixture.task.clone();
        fixture.task_data.set_parameter(&task, tokens::PARAMS, params);
        fixture.task_data.set_parameter(&task, tokens::COLLECTION, collection);
        fixture.task_data.set_parameter(&task, tokens::RENDER_TAGS, vec![tokens::GEOMETRY.to_string()]);
        fixture.index.change_tracker_mut().mark_task_dirty(&task, DirtyBits::ALL_TASK);
    }

    fn run(fixture: &mut Fixture) -> RenderResult<()> {
        let delegates: [&dyn SceneDelegate; 1] = [&fixture.task_data];
        RenderEngine::new().execute(&mut fixture.index, &delegates, std::slice::from_ref(&fixture.task))
    }

    fn render_task(fixture: &Fixture) -> &RenderTask {
        fixture
            .index
            .task(&fixture.task)
            .and_then(|task| task.as_any().downcast_ref::<RenderTask>())
            .unwrap()
    }

    fn color_binding(fixture: &Fixture, buffer: &ScenePath) -> AovBinding {
        let aov = fixture.index.render_delegate().default_aov_descriptor(tokens::AOV_COLOR);
        AovBinding {
            aov_name: tokens::AOV_COLOR.to_string(),
            render_buffer_id: buffer.clone(),
            render_buffer: None,
            clear_value: aov.clear_value,
            aov_settings: aov.aov_settings,
        }
    }

    #[test]
    fn test_collection_drives_pass_lifetime() {
        let mut fixture = fixture();
        let size = params(&fixture, 2);

        push(&mut fixture, RprimCollection::default(), size.clone());
        run(&mut fixture).unwrap();
        assert!(!render_task(&fixture).has_pass());
        assert!(render_task(&fixture).is_converged());

        push(&mut fixture, RprimCollection::geometry(), size.clone());
        run(&mut fixture).unwrap();
        assert!(render_task(&fixture).has_pass());
        assert_eq!(render_task(&fixture).render_tags(), [tokens::GEOMETRY.to_string()]);

        push(&mut fixture, RprimCollection::default(), size);
        run(&mut fixture).unwrap();
        assert!(!render_task(&fixture).has_pass());
        assert!(render_task(&fixture).is_converged());
    }

    #[test]
    fn test_sync_clears_dirty_bits() {
        let mut fixture = fixture();
        let size = params(&fixture, 2);
        push(&mut fixture, RprimCollection::geometry(), size);
        run(&mut fixture).unwrap();
        assert!(fixture.index.change_tracker().task_dirty_bits(&fixture.task).is_empty());

        // Nothing is re-read until someone marks the task dirty again
        let task = fixture.task.clone();
        fixture.task_data.remove_parameters(&task);
        run(&mut fixture).unwrap();
        assert!(render_task(&fixture).has_pass());

        fixture.index.change_tracker_mut().mark_task_dirty(&task, DirtyBits::PARAMS);
        assert!(run(&mut fixture).is_err());
    }

    #[test]
    fn test_failed_sync_keeps_dirty_bits() {
        let mut fixture = fixture();
        let task = fixture.task.clone();
        fixture.task_data.set_parameter(&task, tokens::COLLECTION, RprimCollection::geometry());
        fixture.index.change_tracker_mut().mark_task_dirty(&task, DirtyBits::ALL_TASK);

        let result = run(&mut fixture);
        assert!(matches!(result, Err(RenderError::Parameter(_))));
        assert_eq!(fixture.index.change_tracker().task_dirty_bits(&task), DirtyBits::ALL_TASK);
    }

    #[test]
    fn test_pass_without_viewport_fails() {
        let mut fixture = fixture();
        let mut no_viewport = params(&fixture, 2);
        no_viewport.viewport = Viewport::default();
        push(&mut fixture, RprimCollection::geometry(), no_viewport);

        let result = run(&mut fixture);
        assert!(matches!(result, Err(RenderError::EmptyViewport(ref id)) if *id == fixture.task));
    }

    #[test]
    fn test_pass_without_camera_fails() {
        let mut fixture = fixture();
        let mut no_camera = params(&fixture, 2);
        no_camera.camera = None;
        push(&mut fixture, RprimCollection::geometry(), no_camera);
        assert!(matches!(run(&mut fixture), Err(RenderError::CameraNotSet(_))));
    }

    #[test]
    fn test_buffer_handles_follow_reinsertion() {
        let mut fixture = fixture();
        let delegate_id = path("/taskDataDelegate");
        let buffer = path("/taskDataDelegate/aov_color");
        let descriptor = RenderBufferDescriptor {
            dimensions: [2, 2, 1],
            format: Format::Float32Vec4,
            multi_sampled: false,
        };
        fixture.index.insert_bprim(&delegate_id, buffer.clone()).unwrap();
        fixture.task_data.set_parameter(&buffer, tokens::RENDER_BUFFER_DESCRIPTOR, descriptor);

        let mut bound = params(&fixture, 2);
        bound.aov_bindings.push(color_binding(&fixture, &buffer));
        push(&mut fixture, RprimCollection::geometry(), bound);
        run(&mut fixture).unwrap();
        let first = fixture.index.bprim(&buffer).unwrap();
        let resolved = render_task(&fixture).aov_bindings()[0].render_buffer.clone().unwrap();
        assert!(Arc::ptr_eq(&first, &resolved));

        fixture.index.remove_bprim(&buffer);
        run(&mut fixture).unwrap();
        assert!(render_task(&fixture).aov_bindings()[0].render_buffer.is_none());

        fixture.index.insert_bprim(&delegate_id, buffer.clone()).unwrap();
        run(&mut fixture).unwrap();
        let second = fixture.index.bprim(&buffer).unwrap();
        let resolved = render_task(&fixture).aov_bindings()[0].render_buffer.clone().unwrap();
        assert!(Arc::ptr_eq(&second, &resolved));
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.format(), Format::Float32Vec4);
    }
}
