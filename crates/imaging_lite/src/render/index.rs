//! Scene index
//!
//! Backend-agnostic registry of the cameras, lights, render buffers,
//! drawables and tasks of one render session, each addressed by path. The
//! index owns the render delegate and the change tracker; `sync_all` pulls
//! dirty prim state from the owning scene delegates.

use crate::core::{tokens, ScenePath};
use crate::foundation::collections::PathMap;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::api::{RenderBuffer, RenderDelegate};
use crate::render::camera::{Camera, WindowPolicy};
use crate::render::change_tracker::{ChangeTracker, DirtyBits};
use crate::render::light::Light;
use crate::render::rprim::Rprim;
use crate::render::scene_delegate::SceneDelegate;
use crate::render::task::Task;
use crate::render::{RenderError, RenderResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Kind of state prim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprimType {
    /// Camera
    Camera,
    /// Distant light
    Light,
}

/// State prim data
#[derive(Debug, Clone, PartialEq)]
pub enum Sprim {
    /// Camera
    Camera(Camera),
    /// Light
    Light(Light),
}

impl Sprim {
    const fn sprim_type(&self) -> SprimType {
        match self {
            Self::Camera(_) => SprimType::Camera,
            Self::Light(_) => SprimType::Light,
        }
    }
}

struct SprimEntry {
    delegate_id: ScenePath,
    sprim: Sprim,
}

struct BprimEntry {
    delegate_id: ScenePath,
    buffer: Arc<dyn RenderBuffer>,
}

struct TaskEntry {
    delegate_id: ScenePath,
    task: Option<Box<dyn Task>>,
}

/// Path-addressed registry of everything a render session draws with
pub struct RenderIndex {
    delegate: Box<dyn RenderDelegate>,
    tracker: ChangeTracker,
    sprims: BTreeMap<ScenePath, SprimEntry>,
    bprims: BTreeMap<ScenePath, BprimEntry>,
    rprims: PathMap<Rprim>,
    tasks: BTreeMap<ScenePath, TaskEntry>,
}

impl RenderIndex {
    /// Create an empty index owning `delegate`
    pub fn new(delegate: Box<dyn RenderDelegate>) -> Self {
        Self {
            delegate,
            tracker: ChangeTracker::new(),
            sprims: BTreeMap::new(),
            bprims: BTreeMap::new(),
            rprims: PathMap::new(),
            tasks: BTreeMap::new(),
        }
    }

    /// The owned render delegate
    pub fn render_delegate(&self) -> &dyn RenderDelegate {
        self.delegate.as_ref()
    }

    /// The owned render delegate, mutably
    pub fn render_delegate_mut(&mut self) -> &mut dyn RenderDelegate {
        self.delegate.as_mut()
    }

    /// Change tracker
    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Change tracker, mutably
    pub fn change_tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    // === State prims ===

    /// Insert a camera or light; a no-op returning `false` if the path is taken
    pub fn insert_sprim(&mut self, kind: SprimType, delegate_id: &ScenePath, path: ScenePath) -> bool {
        if self.sprims.contains_key(&path) {
            return false;
        }
        let (sprim, initial) = match kind {
            SprimType::Camera => (Sprim::Camera(Camera::default()), DirtyBits::ALL_CAMERA),
            SprimType::Light => (Sprim::Light(Light::default()), DirtyBits::ALL_LIGHT),
        };
        log::debug!("Inserting {kind:?} sprim {path}");
        self.tracker.sprim_inserted(path.clone(), initial);
        self.sprims.insert(path, SprimEntry { delegate_id: delegate_id.clone(), sprim });
        true
    }

    /// Remove a camera or light
    pub fn remove_sprim(&mut self, path: &ScenePath) -> bool {
        self.tracker.sprim_removed(path);
        self.sprims.remove(path).is_some()
    }

    /// Camera or light at `path`
    pub fn sprim(&self, path: &ScenePath) -> Option<&Sprim> {
        self.sprims.get(path).map(|entry| &entry.sprim)
    }

    /// Camera at `path`
    pub fn camera(&self, path: &ScenePath) -> Option<&Camera> {
        match self.sprim(path)? {
            Sprim::Camera(camera) => Some(camera),
            Sprim::Light(_) => None,
        }
    }

    /// Every light in path order
    pub fn lights(&self) -> impl Iterator<Item = (&ScenePath, &Light)> {
        self.sprims.iter().filter_map(|(path, entry)| match &entry.sprim {
            Sprim::Light(light) => Some((path, light)),
            Sprim::Camera(_) => None,
        })
    }

    /// Number of sprims of a kind
    pub fn sprim_count(&self, kind: SprimType) -> usize {
        self.sprims.values().filter(|entry| entry.sprim.sprim_type() == kind).count()
    }

    /// Paths of every sprim of a kind, in path order
    pub fn sprim_paths(&self, kind: SprimType) -> impl Iterator<Item = &ScenePath> {
        self.sprims
            .iter()
            .filter(move |(_, entry)| entry.sprim.sprim_type() == kind)
            .map(|(path, _)| path)
    }

    // === Buffer prims ===

    /// Whether the delegate can create render buffers
    pub fn is_bprim_type_supported(&self) -> bool {
        self.delegate.supports_render_buffers()
    }

    /// Insert a render buffer created by the delegate; inserting an existing
    /// path is a no-op returning `false`
    pub fn insert_bprim(&mut self, delegate_id: &ScenePath, path: ScenePath) -> RenderResult<bool> {
        if self.bprims.contains_key(&path) {
            return Ok(false);
        }
        let buffer = self
            .delegate
            .create_render_buffer(&path)
            .ok_or_else(|| RenderError::UnsupportedPrimType {
                path: path.clone(),
                type_name: "renderBuffer".to_string(),
            })?;
        log::debug!("Inserting render buffer {path}");
        self.tracker.bprim_inserted(path.clone());
        self.bprims.insert(path, BprimEntry { delegate_id: delegate_id.clone(), buffer });
        Ok(true)
    }

    /// Remove a render buffer
    pub fn remove_bprim(&mut self, path: &ScenePath) -> bool {
        self.tracker.bprim_removed(path);
        let removed = self.bprims.remove(path).is_some();
        if removed {
            log::debug!("Removed render buffer {path}");
        }
        removed
    }

    /// Render buffer at `path`
    pub fn bprim(&self, path: &ScenePath) -> Option<Arc<dyn RenderBuffer>> {
        self.bprims.get(path).map(|entry| Arc::clone(&entry.buffer))
    }

    /// Number of render buffers
    pub fn bprim_count(&self) -> usize {
        self.bprims.len()
    }

    // === Drawables ===

    /// Insert a drawable; a no-op returning `false` if the path is taken
    pub fn insert_rprim(&mut self, delegate_id: &ScenePath, path: ScenePath) -> bool {
        if self.rprims.contains(&path) {
            return false;
        }
        self.tracker.rprim_inserted(path.clone());
        self.rprims.insert(path, Rprim::new(delegate_id.clone()));
        true
    }

    /// Remove a drawable
    pub fn remove_rprim(&mut self, path: &ScenePath) -> bool {
        self.tracker.rprim_removed(path);
        self.rprims.remove(path).is_some()
    }

    /// Drawable at `path`
    pub fn rprim(&self, path: &ScenePath) -> Option<&Rprim> {
        self.rprims.get(path)
    }

    /// Every drawable in path order
    pub fn rprims(&self) -> impl Iterator<Item = (&ScenePath, &Rprim)> {
        self.rprims.iter()
    }

    /// Drawables at or below `root`
    pub fn rprims_under<'a>(&'a self, root: &'a ScenePath) -> impl Iterator<Item = (&'a ScenePath, &'a Rprim)> + 'a {
        self.rprims.iter().filter(move |(path, _)| path.has_prefix(root))
    }

    /// Number of drawables
    pub fn rprim_count(&self) -> usize {
        self.rprims.len()
    }

    // === Tasks ===

    /// Insert a task; a no-op returning `false` if the path is taken
    pub fn insert_task(&mut self, delegate_id: &ScenePath, path: ScenePath, task: Box<dyn Task>) -> bool {
        if self.tasks.contains_key(&path) {
            return false;
        }
        log::debug!("Inserting task {path}");
        self.tracker.task_inserted(path.clone());
        self.tasks.insert(path, TaskEntry { delegate_id: delegate_id.clone(), task: Some(task) });
        true
    }

    /// Whether a task exists at `path`
    pub fn has_task(&self, path: &ScenePath) -> bool {
        self.tasks.contains_key(path)
    }

    /// Task at `path`; `None` while it is checked out for execution
    pub fn task(&self, path: &ScenePath) -> Option<&dyn Task> {
        self.tasks.get(path).and_then(|entry| entry.task.as_deref())
    }

    /// Task at `path`, mutably
    pub fn task_mut(&mut self, path: &ScenePath) -> Option<&mut (dyn Task + 'static)> {
        self.tasks.get_mut(path).and_then(|entry| entry.task.as_deref_mut())
    }

    /// Remove a task
    pub fn remove_task(&mut self, path: &ScenePath) -> bool {
        self.tracker.task_removed(path);
        self.tasks.remove(path).is_some()
    }

    /// Check a task out for execution, along with its scene delegate id
    pub fn take_task(&mut self, path: &ScenePath) -> RenderResult<(ScenePath, Box<dyn Task>)> {
        let entry = self.tasks.get_mut(path).ok_or_else(|| RenderError::MissingPrim {
            kind: "task",
            path: path.clone(),
        })?;
        let task = entry.task.take().ok_or_else(|| RenderError::MissingPrim {
            kind: "task",
            path: path.clone(),
        })?;
        Ok((entry.delegate_id.clone(), task))
    }

    /// Return a task checked out with `take_task`
    pub fn return_task(&mut self, path: &ScenePath, task: Box<dyn Task>) {
        if let Some(entry) = self.tasks.get_mut(path) {
            entry.task = Some(task);
        } else {
            log::warn!("Dropping task {path} returned after removal");
        }
    }

    // === Sync ===

    /// Pull every dirty buffer, camera, light and drawable from its scene
    /// delegate and clear the synced bits
    pub fn sync_all(&mut self, delegates: &[&dyn SceneDelegate]) -> RenderResult<()> {
        self.sync_bprims(delegates)?;
        self.sync_sprims(delegates)?;
        self.sync_rprims(delegates)
    }

    fn sync_bprims(&mut self, delegates: &[&dyn SceneDelegate]) -> RenderResult<()> {
        for path in self.tracker.dirty_bprims() {
            let Some(entry) = self.bprims.get(&path) else {
                continue;
            };
            let delegate = find_delegate(delegates, &entry.delegate_id)?;
            let descriptor = delegate.render_buffer_descriptor(&path)?;
            log::debug!(
                "Allocating render buffer {path}: {}x{} {:?}",
                descriptor.dimensions[0],
                descriptor.dimensions[1],
                descriptor.format
            );
            entry.buffer.allocate(&descriptor)?;
            self.tracker.mark_bprim_clean(&path);
        }
        Ok(())
    }

    fn sync_sprims(&mut self, delegates: &[&dyn SceneDelegate]) -> RenderResult<()> {
        for path in self.tracker.dirty_sprims() {
            let bits = self.tracker.sprim_dirty_bits(&path);
            let Some(entry) = self.sprims.get_mut(&path) else {
                continue;
            };
            let delegate = find_delegate(delegates, &entry.delegate_id)?;
            match &mut entry.sprim {
                Sprim::Camera(camera) => sync_camera(delegate, &path, bits, camera)?,
                Sprim::Light(light) => sync_light(delegate, &path, bits, light)?,
            }
            self.tracker.mark_sprim_clean(&path);
        }
        Ok(())
    }

    fn sync_rprims(&mut self, delegates: &[&dyn SceneDelegate]) -> RenderResult<()> {
        for path in self.tracker.dirty_rprims() {
            let bits = self.tracker.rprim_dirty_bits(&path);
            let Some(rprim) = self.rprims.get_mut(&path) else {
                continue;
            };
            let delegate = find_delegate(delegates, &rprim.delegate_id)?;
            if bits.contains(DirtyBits::GEOMETRY) {
                rprim.geometry = Some(delegate.geometry(&path)?);
            }
            if bits.contains(DirtyBits::TRANSFORM) {
                rprim.set_transform(delegate.transform(&path)?);
            }
            if bits.contains(DirtyBits::VISIBILITY) {
                rprim.visible = delegate.visible(&path)?;
            }
            if bits.contains(DirtyBits::RENDER_TAG) {
                rprim.render_tag = delegate.render_tag(&path)?;
            }
            if bits.contains(DirtyBits::PRIMVAR) {
                rprim.display_color = delegate.display_color(&path)?;
            }
            self.tracker.mark_rprim_clean(&path);
        }
        Ok(())
    }
}

fn find_delegate<'a>(
    delegates: &[&'a dyn SceneDelegate],
    delegate_id: &ScenePath,
) -> RenderResult<&'a dyn SceneDelegate> {
    delegates
        .iter()
        .copied()
        .find(|delegate| delegate.delegate_id() == delegate_id)
        .ok_or_else(|| RenderError::MissingSceneDelegate(delegate_id.clone()))
}

fn sync_camera(
    delegate: &dyn SceneDelegate,
    path: &ScenePath,
    bits: DirtyBits,
    camera: &mut Camera,
) -> RenderResult<()> {
    if bits.contains(DirtyBits::VIEW_MATRIX) {
        camera.world_to_view = delegate
            .camera_param(path, tokens::WORLD_TO_VIEW_MATRIX)?
            .extract::<Mat4>(path, tokens::WORLD_TO_VIEW_MATRIX)?;
    }
    if bits.contains(DirtyBits::PROJ_MATRIX) {
        camera.projection = delegate
            .camera_param(path, tokens::PROJECTION_MATRIX)?
            .extract::<Mat4>(path, tokens::PROJECTION_MATRIX)?;
    }
    if bits.contains(DirtyBits::WINDOW_POLICY) {
        camera.window_policy = delegate
            .camera_param(path, tokens::WINDOW_POLICY)?
            .extract::<WindowPolicy>(path, tokens::WINDOW_POLICY)?;
    }
    if bits.contains(DirtyBits::CLIP_PLANES) {
        camera.clip_planes = delegate
            .camera_param(path, tokens::CLIP_PLANES)?
            .extract::<Vec<Vec4>>(path, tokens::CLIP_PLANES)?;
    }
    Ok(())
}

fn sync_light(
    delegate: &dyn SceneDelegate,
    path: &ScenePath,
    bits: DirtyBits,
    light: &mut Light,
) -> RenderResult<()> {
    if bits.contains(DirtyBits::TRANSFORM) {
        light.transform = delegate.transform(path)?;
    }
    if bits.contains(DirtyBits::VISIBILITY) {
        light.visible = delegate.visible(path)?;
    }
    if bits.contains(DirtyBits::LIGHT_PARAMS) {
        let intensity = delegate.light_param(path, tokens::INTENSITY)?;
        if !intensity.is_empty() {
            light.intensity = match intensity.as_f64() {
                Some(value) => value,
                None => intensity.extract::<f64>(path, tokens::INTENSITY)?,
            };
        }
        let color = delegate.light_param(path, tokens::LIGHT_COLOR)?;
        if !color.is_empty() {
            let color = color.extract::<Vec4>(path, tokens::LIGHT_COLOR)?;
            light.color = Vec3::new(color.x, color.y, color.z);
        }
    }
    Ok(())
}

impl fmt::Debug for RenderIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderIndex")
            .field("sprims", &self.sprims.len())
            .field("bprims", &self.bprims.len())
            .field("rprims", &self.rprims.len())
            .field("tasks", &self.tasks.len())
            .field("scene_version", &self.tracker.scene_version())
            .finish_non_exhaustive()
    }
}

impl Drop for RenderIndex {
    fn drop(&mut self) {
        log::debug!(
            "Destroying scene index ({} drawables, {} buffers, {} tasks)",
            self.rprims.len(),
            self.bprims.len(),
            self.tasks.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{Format, RenderBufferDescriptor, RendererPlugin};
    use crate::render::backends::software::SoftwarePlugin;
    use crate::render::task::RenderTask;
    use crate::render::task_data::TaskDataDelegate;

    fn path(s: &str) -> ScenePath {
        s.parse().unwrap()
    }

    fn index() -> RenderIndex {
        RenderIndex::new(SoftwarePlugin::preview().create_render_delegate().unwrap())
    }

    fn free_camera(task_data: &mut TaskDataDelegate, id: &ScenePath, view: Mat4) {
        task_data.set_parameter(id, tokens::WORLD_TO_VIEW_MATRIX, view);
        task_data.set_parameter(id, tokens::PROJECTION_MATRIX, Mat4::identity());
        task_data.set_parameter(id, tokens::WINDOW_POLICY, WindowPolicy::Fit);
        task_data.set_parameter(id, tokens::CLIP_PLANES, Vec::<Vec4>::new());
    }

    #[test]
    fn test_sync_pulls_dirty_cameras_once() {
        let delegate_id = path("/taskDataDelegate");
        let camera = path("/taskDataDelegate/freeCamera");
        let mut index = index();
        let mut task_data = TaskDataDelegate::new(delegate_id.clone());
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0));
        free_camera(&mut task_data, &camera, view);

        assert!(index.insert_sprim(SprimType::Camera, &delegate_id, camera.clone()));
        assert!(!index.insert_sprim(SprimType::Camera, &delegate_id, camera.clone()));
        index.sync_all(&[&task_data]).unwrap();
        assert_eq!(index.camera(&camera).unwrap().world_to_view, view);
        assert!(index.change_tracker().sprim_dirty_bits(&camera).is_empty());

        // Clean prims are not read again
        task_data.remove_parameters(&camera);
        index.sync_all(&[&task_data]).unwrap();
        assert_eq!(index.camera(&camera).unwrap().world_to_view, view);
    }

    #[test]
    fn test_sync_needs_the_owning_delegate() {
        let mut index = index();
        let camera = path("/elsewhere/camera");
        index.insert_sprim(SprimType::Camera, &path("/elsewhere"), camera.clone());
        let task_data = TaskDataDelegate::new(path("/taskDataDelegate"));

        let result = index.sync_all(&[&task_data]);
        assert!(matches!(result, Err(RenderError::MissingSceneDelegate(ref id)) if id.as_str() == "/elsewhere"));
        assert_eq!(index.change_tracker().sprim_dirty_bits(&camera), DirtyBits::ALL_CAMERA);
    }

    #[test]
    fn test_reinserted_buffer_is_reallocated() {
        let delegate_id = path("/taskDataDelegate");
        let buffer = path("/taskDataDelegate/aov_depth");
        let mut index = index();
        let mut task_data = TaskDataDelegate::new(delegate_id.clone());
        let descriptor = RenderBufferDescriptor {
            dimensions: [3, 2, 1],
            format: Format::Float32,
            multi_sampled: false,
        };
        task_data.set_parameter(&buffer, tokens::RENDER_BUFFER_DESCRIPTOR, descriptor);

        assert!(index.insert_bprim(&delegate_id, buffer.clone()).unwrap());
        assert!(!index.insert_bprim(&delegate_id, buffer.clone()).unwrap());
        assert_eq!(index.bprim(&buffer).unwrap().format(), Format::Invalid);
        index.sync_all(&[&task_data]).unwrap();
        assert_eq!(index.bprim(&buffer).unwrap().byte_size(), 3 * 2 * 4);

        assert!(index.remove_bprim(&buffer));
        assert!(index.bprim(&buffer).is_none());
        index.insert_bprim(&delegate_id, buffer.clone()).unwrap();
        assert_eq!(index.change_tracker().bprim_dirty_bits(&buffer), DirtyBits::DESCRIPTION);
        index.sync_all(&[&task_data]).unwrap();
        assert_eq!(index.bprim(&buffer).unwrap().format(), Format::Float32);
        assert_eq!(index.bprim_count(), 1);
    }

    #[test]
    fn test_task_checkout() {
        let delegate_id = path("/taskDataDelegate");
        let id = path("/taskDataDelegate/renderTask");
        let mut index = index();
        assert!(index.insert_task(&delegate_id, id.clone(), Box::new(RenderTask::new(id.clone()))));

        let (owner, task) = index.take_task(&id).unwrap();
        assert_eq!(owner, delegate_id);
        assert!(index.has_task(&id));
        assert!(index.task(&id).is_none());
        assert!(matches!(index.take_task(&id), Err(RenderError::MissingPrim { kind: "task", .. })));

        index.return_task(&id, task);
        assert_eq!(index.task(&id).unwrap().id(), &id);
        assert!(index.remove_task(&id));
        assert!(!index.has_task(&id));
    }
}
