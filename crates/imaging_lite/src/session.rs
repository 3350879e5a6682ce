//! Render session
//!
//! Everything that belongs to one active backend: the acquired plugin, the
//! scene index (which owns the render delegate), the scene populator, the
//! task data provider and the render task parameters. A session is built in
//! one step once every fallible piece exists, and torn down in one step.
//!
//! Fields drop in declaration order, which is the required teardown order:
//! task data → populator → scene index and delegate → plugin handle.

use crate::core::{tokens, PathError, ScenePath};
use crate::engine::{EngineError, EngineResult};
use crate::foundation::math::{Mat4, Vec4};
use crate::foundation::time::TimeCode;
use crate::render::api::{AovBinding, RenderBufferDescriptor, RenderDelegate, RenderTaskParams, RprimCollection, Viewport};
use crate::render::camera::WindowPolicy;
use crate::render::change_tracker::DirtyBits;
use crate::render::execution::RenderEngine;
use crate::render::index::{RenderIndex, SprimType};
use crate::render::plugin_registry::PluginHandle;
use crate::render::scene_delegate::SceneDelegate;
use crate::render::task::RenderTask;
use crate::render::task_data::TaskDataDelegate;
use crate::render::value::Value;
use crate::render::RenderResult;
use crate::scene::{ScenePopulator, Stage};
use std::sync::Arc;

/// Fixed scene index paths of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    /// Delegate id of the scene populator
    pub scene_delegate: ScenePath,
    /// Delegate id of the task data provider
    pub task_data: ScenePath,
    /// The single render task
    pub render_task: ScenePath,
    /// The free camera sprim
    pub free_camera: ScenePath,
}

impl SessionPaths {
    /// Paths rooted at the well-known delegate names
    pub fn new() -> Result<Self, PathError> {
        let root = ScenePath::absolute_root();
        let task_data = root.append_child(tokens::TASK_DATA_DELEGATE)?;
        Ok(Self {
            scene_delegate: root.append_child(tokens::SCENE_DELEGATE)?,
            render_task: task_data.append_child(tokens::RENDER_TASK)?,
            free_camera: task_data.append_child(tokens::FREE_CAMERA)?,
            task_data,
        })
    }

    /// Render buffer path of an output channel
    pub fn aov_buffer(&self, aov_name: &str) -> Result<ScenePath, PathError> {
        self.task_data.append_child(&format!("{}{aov_name}", tokens::AOV_PREFIX))
    }
}

/// Per-backend state owned by the engine
pub struct RenderSession {
    task_data: TaskDataDelegate,
    populator: ScenePopulator,
    index: RenderIndex,
    plugin: PluginHandle,
    params: RenderTaskParams,
    paths: SessionPaths,
}

impl RenderSession {
    /// Assemble a session around an acquired plugin and its delegate
    pub fn new(plugin: PluginHandle, delegate: Box<dyn RenderDelegate>, paths: SessionPaths) -> Self {
        log::debug!("Creating render session for '{}'", plugin.id());
        Self {
            task_data: TaskDataDelegate::new(paths.task_data.clone()),
            populator: ScenePopulator::new(paths.scene_delegate.clone()),
            index: RenderIndex::new(delegate),
            plugin,
            params: RenderTaskParams::default(),
            paths,
        }
    }

    /// Id of the backend plugin
    pub fn plugin_id(&self) -> &str {
        self.plugin.id()
    }

    /// Fixed paths
    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Scene index
    pub fn index(&self) -> &RenderIndex {
        &self.index
    }

    /// Render delegate
    pub fn delegate(&self) -> &dyn RenderDelegate {
        self.index.render_delegate()
    }

    /// Render delegate, mutably
    pub fn delegate_mut(&mut self) -> &mut dyn RenderDelegate {
        self.index.render_delegate_mut()
    }

    /// Scene populator
    pub fn populator(&self) -> &ScenePopulator {
        &self.populator
    }

    /// Task data provider
    pub fn task_data(&self) -> &TaskDataDelegate {
        &self.task_data
    }

    /// Render task parameters pushed on every render
    pub fn params(&self) -> &RenderTaskParams {
        &self.params
    }

    // === Scene ===

    /// Populate the index from `stage` once
    pub fn populate(&mut self, stage: &Arc<Stage>, root: &ScenePath) -> RenderResult<bool> {
        self.populator.populate(&mut self.index, stage, root)
    }

    /// Move the scene to `time`
    pub fn set_time(&mut self, time: TimeCode) -> bool {
        self.populator.set_time(self.index.change_tracker_mut(), time)
    }

    /// Transform applied above the populated scene
    pub fn root_transform(&self) -> Mat4 {
        self.populator.root_transform()
    }

    /// Replace the transform applied above the populated scene
    pub fn set_root_transform(&mut self, transform: Mat4) {
        self.populator.set_root_transform(self.index.change_tracker_mut(), transform);
    }

    /// Visibility applied above the populated scene
    pub fn root_visibility(&self) -> bool {
        self.populator.root_visibility()
    }

    /// Replace the visibility applied above the populated scene
    pub fn set_root_visibility(&mut self, visible: bool) {
        self.populator.set_root_visibility(self.index.change_tracker_mut(), visible);
    }

    // === Camera and viewport ===

    /// Insert the free camera, or refresh its matrices
    ///
    /// Dirty bits are only raised for matrices that actually changed, so a
    /// host re-sending the same camera every frame does not restart
    /// progressive accumulation.
    pub fn set_free_camera(&mut self, view: Mat4, projection: Mat4) {
        let id = self.paths.free_camera.clone();
        if self.index.insert_sprim(SprimType::Camera, &self.paths.task_data, id.clone()) {
            log::debug!("Inserted free camera {id}");
            self.task_data.set_parameter(&id, tokens::WINDOW_POLICY, WindowPolicy::Fit);
            self.task_data.set_parameter(&id, tokens::WORLD_TO_VIEW_MATRIX, view);
            self.task_data.set_parameter(&id, tokens::PROJECTION_MATRIX, projection);
            self.task_data.set_parameter(&id, tokens::CLIP_PLANES, Vec::<Vec4>::new());
        } else {
            let mut bits = DirtyBits::empty();
            if self.stored_matrix(&id, tokens::WORLD_TO_VIEW_MATRIX) != Some(view) {
                self.task_data.set_parameter(&id, tokens::WORLD_TO_VIEW_MATRIX, view);
                bits |= DirtyBits::VIEW_MATRIX;
            }
            if self.stored_matrix(&id, tokens::PROJECTION_MATRIX) != Some(projection) {
                self.task_data.set_parameter(&id, tokens::PROJECTION_MATRIX, projection);
                bits |= DirtyBits::PROJ_MATRIX;
            }
            if !bits.is_empty() {
                self.index.change_tracker_mut().mark_sprim_dirty(&id, bits);
            }
        }
        self.params.camera = Some(id);
    }

    fn stored_matrix(&self, id: &ScenePath, key: &str) -> Option<Mat4> {
        if !self.task_data.has_parameter(id, key) {
            return None;
        }
        self.task_data.parameter(id, key).ok()
    }

    /// Render through `camera` instead of the free camera
    pub fn set_camera(&mut self, camera: ScenePath) {
        self.params.camera = Some(camera);
    }

    /// Store the viewport, re-describing bound buffers when its pixel size
    /// changes
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let resized = viewport.pixel_size() != self.params.viewport.pixel_size();
        self.params.viewport = viewport;
        if !resized {
            return;
        }
        let (width, height) = viewport.pixel_size();
        for binding in &self.params.aov_bindings {
            let id = &binding.render_buffer_id;
            let Ok(mut descriptor) = self.task_data.parameter::<RenderBufferDescriptor>(id, tokens::RENDER_BUFFER_DESCRIPTOR)
            else {
                continue;
            };
            descriptor.dimensions = [width, height, 1];
            self.task_data.set_parameter(id, tokens::RENDER_BUFFER_DESCRIPTOR, descriptor);
            self.index.change_tracker_mut().mark_bprim_dirty(id, DirtyBits::DESCRIPTION);
        }
    }

    // === Outputs ===

    /// Register a render buffer for `aov_name` and append its binding
    pub fn add_aov(&mut self, aov_name: &str) -> EngineResult<()> {
        if !self.index.is_bprim_type_supported() {
            log::error!("Backend '{}' does not support render buffers", self.plugin.id());
            return Err(EngineError::RenderBuffersUnsupported(self.plugin.id().to_string()));
        }
        let aov = self.index.render_delegate().default_aov_descriptor(aov_name);
        if !aov.format.is_valid() {
            log::error!("Could not set \"{aov_name}\" AOV: unsupported by render delegate");
            return Err(EngineError::UnsupportedAov(aov_name.to_string()));
        }
        let id = self.paths.aov_buffer(aov_name)?;
        self.index.insert_bprim(&self.paths.task_data, id.clone())?;

        let (width, height) = self.params.viewport.pixel_size();
        let descriptor = RenderBufferDescriptor {
            dimensions: [width, height, 1],
            format: aov.format,
            multi_sampled: aov.multi_sampled,
        };
        self.task_data.set_parameter(&id, tokens::RENDER_BUFFER_DESCRIPTOR, descriptor);
        self.index.change_tracker_mut().mark_bprim_dirty(&id, DirtyBits::DESCRIPTION);

        self.params.aov_bindings.push(AovBinding {
            aov_name: aov_name.to_string(),
            render_buffer_id: id,
            render_buffer: None,
            clear_value: aov.clear_value,
            aov_settings: aov.aov_settings,
        });
        Ok(())
    }

    /// Remove every bound render buffer and empty the binding list
    pub fn clear_aovs(&mut self) {
        for binding in self.params.aov_bindings.drain(..) {
            self.index.remove_bprim(&binding.render_buffer_id);
            self.task_data.remove_parameters(&binding.render_buffer_id);
        }
    }

    /// Binding of an output channel, if enabled
    pub fn aov_binding(&self, aov_name: &str) -> Option<&AovBinding> {
        self.params.aov_bindings.iter().find(|binding| binding.aov_name == aov_name)
    }

    // === Rendering ===

    /// Make sure the render task exists and push its inputs, marking each
    /// dirty
    pub fn push_render_task(&mut self, collection: RprimCollection, render_tags: Vec<String>) {
        let id = self.paths.render_task.clone();
        if !self.index.has_task(&id) {
            self.index
                .insert_task(&self.paths.task_data, id.clone(), Box::new(RenderTask::new(id.clone())));
        }
        self.task_data.set_parameter(&id, tokens::PARAMS, self.params.clone());
        self.task_data.set_parameter(&id, tokens::COLLECTION, collection);
        self.task_data.set_parameter(&id, tokens::RENDER_TAGS, render_tags);
        self.index
            .change_tracker_mut()
            .mark_task_dirty(&id, DirtyBits::PARAMS | DirtyBits::COLLECTION | DirtyBits::RENDER_TAGS);
    }

    /// Run the render task once
    pub fn execute_render_task(&mut self) -> RenderResult<()> {
        let delegates: [&dyn SceneDelegate; 2] = [&self.task_data, &self.populator];
        RenderEngine::new().execute(&mut self.index, &delegates, std::slice::from_ref(&self.paths.render_task))
    }

    /// Convergence of the render task; `None` before the first render
    pub fn is_converged(&self) -> Option<bool> {
        self.index.task(&self.paths.render_task).map(|task| task.is_converged())
    }

    /// Set a delegate setting
    pub fn set_render_setting(&mut self, key: &str, value: Value) {
        self.index.render_delegate_mut().set_render_setting(key, value);
    }

    /// Number of free cameras in the index
    pub fn free_camera_count(&self) -> usize {
        self.index
            .sprim_paths(SprimType::Camera)
            .filter(|path| path.has_prefix(&self.paths.task_data))
            .count()
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        log::debug!("Tearing down render session for '{}'", self.plugin.id());
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("plugin", &self.plugin.id())
            .field("index", &self.index)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
