//! Scene populator
//!
//! Walks a stage subtree once, inserting a drawable for every gprim and a
//! camera or light for every camera and light prim, then answers the scene
//! index's sync queries from the stage. Index paths are stage paths
//! re-rooted under the populator's delegate id.

use crate::core::{tokens, ScenePath};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::foundation::time::TimeCode;
use crate::render::camera::WindowPolicy;
use crate::render::change_tracker::{ChangeTracker, DirtyBits};
use crate::render::index::{RenderIndex, SprimType};
use crate::render::rprim::Geometry;
use crate::render::scene_delegate::SceneDelegate;
use crate::render::value::Value;
use crate::render::{ParameterError, RenderError, RenderResult};
use crate::scene::stage::{Prim, PrimKind, Stage};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PopulatedKind {
    Rprim,
    Camera,
    Light,
}

#[derive(Debug, Clone)]
struct PopulatedPrim {
    index_path: ScenePath,
    stage_path: ScenePath,
    kind: PopulatedKind,
}

/// Scene delegate feeding a stage into the scene index
#[derive(Debug)]
pub struct ScenePopulator {
    delegate_id: ScenePath,
    stage: Option<Arc<Stage>>,
    root: Option<ScenePath>,
    time: TimeCode,
    root_transform: Mat4,
    root_visible: bool,
    populated: Vec<PopulatedPrim>,
}

impl ScenePopulator {
    /// Create an unpopulated scene delegate rooted at `delegate_id`
    pub fn new(delegate_id: ScenePath) -> Self {
        Self {
            delegate_id,
            stage: None,
            root: None,
            time: TimeCode::Default,
            root_transform: Mat4::identity(),
            root_visible: true,
            populated: Vec::new(),
        }
    }

    /// Insert every prim at or below `root` into `index`
    ///
    /// Population happens once per populator. Later calls return `Ok(false)`
    /// and change nothing, even for a different stage or root.
    pub fn populate(&mut self, index: &mut RenderIndex, stage: &Arc<Stage>, root: &ScenePath) -> RenderResult<bool> {
        if let (Some(populated_stage), Some(populated_root)) = (&self.stage, &self.root) {
            if !Arc::ptr_eq(populated_stage, stage) || populated_root != root {
                log::warn!(
                    "Scene already populated from {populated_root}; ignoring request to populate {root}"
                );
            }
            return Ok(false);
        }
        if !stage.contains(root) {
            log::error!("Cannot populate missing stage prim {root}");
            return Err(RenderError::MissingPrim { kind: "stage prim", path: root.clone() });
        }

        for (stage_path, prim) in stage.traverse(root) {
            let kind = match prim.kind {
                PrimKind::Sphere { .. } | PrimKind::Cube { .. } => PopulatedKind::Rprim,
                PrimKind::Camera(_) => PopulatedKind::Camera,
                PrimKind::DistantLight { .. } => PopulatedKind::Light,
                PrimKind::Xform => continue,
            };
            let index_path = self.index_path(stage_path);
            let inserted = match kind {
                PopulatedKind::Rprim => index.insert_rprim(&self.delegate_id, index_path.clone()),
                PopulatedKind::Camera => index.insert_sprim(SprimType::Camera, &self.delegate_id, index_path.clone()),
                PopulatedKind::Light => index.insert_sprim(SprimType::Light, &self.delegate_id, index_path.clone()),
            };
            if inserted {
                self.populated.push(PopulatedPrim {
                    index_path,
                    stage_path: stage_path.clone(),
                    kind,
                });
            }
        }
        log::info!("Populated {} prims from {root}", self.populated.len());
        self.stage = Some(Arc::clone(stage));
        self.root = Some(root.clone());
        Ok(true)
    }

    /// Whether `populate` has run
    pub fn is_populated(&self) -> bool {
        self.stage.is_some()
    }

    /// Number of prims inserted into the scene index
    pub fn populated_count(&self) -> usize {
        self.populated.len()
    }

    /// Scene index path of a stage path
    pub fn index_path(&self, stage_path: &ScenePath) -> ScenePath {
        self.delegate_id.append_path(stage_path)
    }

    /// Stage path of a scene index path owned by this populator
    pub fn stage_path(&self, index_path: &ScenePath) -> Option<ScenePath> {
        index_path.strip_prefix(&self.delegate_id)
    }

    /// Current evaluation time
    pub fn time(&self) -> TimeCode {
        self.time
    }

    /// Change the evaluation time, dirtying prims with animated transforms
    ///
    /// Returns whether the time changed.
    pub fn set_time(&mut self, tracker: &mut ChangeTracker, time: TimeCode) -> bool {
        if self.time == time {
            return false;
        }
        self.time = time;
        let Some(stage) = &self.stage else {
            return true;
        };
        for prim in &self.populated {
            if stage.is_time_varying(&prim.stage_path) {
                mark_transform_dirty(tracker, prim);
            }
        }
        true
    }

    /// Transform applied above every populated prim
    pub fn root_transform(&self) -> Mat4 {
        self.root_transform
    }

    /// Set the transform applied above every populated prim
    pub fn set_root_transform(&mut self, tracker: &mut ChangeTracker, transform: Mat4) {
        if self.root_transform == transform {
            return;
        }
        self.root_transform = transform;
        for prim in &self.populated {
            mark_transform_dirty(tracker, prim);
        }
    }

    /// Visibility applied above every populated prim
    pub fn root_visibility(&self) -> bool {
        self.root_visible
    }

    /// Set the visibility applied above every populated prim
    pub fn set_root_visibility(&mut self, tracker: &mut ChangeTracker, visible: bool) {
        if self.root_visible == visible {
            return;
        }
        self.root_visible = visible;
        for prim in &self.populated {
            match prim.kind {
                PopulatedKind::Rprim => tracker.mark_rprim_dirty(&prim.index_path, DirtyBits::VISIBILITY),
                PopulatedKind::Light => tracker.mark_sprim_dirty(&prim.index_path, DirtyBits::VISIBILITY),
                PopulatedKind::Camera => {}
            }
        }
    }

    fn lookup(&self, id: &ScenePath) -> RenderResult<(&Stage, ScenePath, &Prim)> {
        let missing = || RenderError::MissingPrim { kind: "stage prim", path: id.clone() };
        let stage = self.stage.as_deref().ok_or_else(missing)?;
        let stage_path = self.stage_path(id).ok_or_else(missing)?;
        let prim = stage.prim(&stage_path).ok_or_else(missing)?;
        Ok((stage, stage_path, prim))
    }
}

fn mark_transform_dirty(tracker: &mut ChangeTracker, prim: &PopulatedPrim) {
    match prim.kind {
        PopulatedKind::Rprim => tracker.mark_rprim_dirty(&prim.index_path, DirtyBits::TRANSFORM),
        PopulatedKind::Camera => tracker.mark_sprim_dirty(&prim.index_path, DirtyBits::VIEW_MATRIX),
        PopulatedKind::Light => tracker.mark_sprim_dirty(&prim.index_path, DirtyBits::TRANSFORM),
    }
}

impl SceneDelegate for ScenePopulator {
    fn delegate_id(&self) -> &ScenePath {
        &self.delegate_id
    }

    fn get(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        let (stage, stage_path, prim) = self.lookup(id)?;
        match key {
            "visibility" => Ok(Value::Bool(self.root_visible && stage.is_visible(&stage_path))),
            "purpose" => Ok(Value::String(prim.purpose.render_tag().to_string())),
            "displayColor" => {
                let c = prim.display_color;
                Ok(Value::Vec4(Vec4::new(c.x, c.y, c.z, 1.0)))
            }
            _ => Err(ParameterError::Missing { path: id.clone(), key: key.to_string() }.into()),
        }
    }

    fn transform(&self, id: &ScenePath) -> RenderResult<Mat4> {
        let (stage, stage_path, _) = self.lookup(id)?;
        Ok(self.root_transform * stage.world_transform(&stage_path, self.time))
    }

    fn visible(&self, id: &ScenePath) -> RenderResult<bool> {
        let (stage, stage_path, _) = self.lookup(id)?;
        Ok(self.root_visible && stage.is_visible(&stage_path))
    }

    fn camera_param(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        let (_, _, prim) = self.lookup(id)?;
        let PrimKind::Camera(lens) = &prim.kind else {
            return Err(RenderError::UnsupportedPrimType {
                path: id.clone(),
                type_name: prim.kind.type_name().to_string(),
            });
        };
        match key {
            tokens::WORLD_TO_VIEW_MATRIX => {
                let view = self
                    .transform(id)?
                    .try_inverse()
                    .ok_or_else(|| RenderError::SingularCamera(id.clone()))?;
                Ok(Value::Matrix(view))
            }
            tokens::PROJECTION_MATRIX => Ok(Value::Matrix(lens.projection())),
            tokens::WINDOW_POLICY => Ok(Value::WindowPolicy(WindowPolicy::Fit)),
            tokens::CLIP_PLANES => Ok(Value::ClipPlanes(Vec::new())),
            _ => Ok(Value::Empty),
        }
    }

    fn light_param(&self, id: &ScenePath, key: &str) -> RenderResult<Value> {
        let (_, _, prim) = self.lookup(id)?;
        let PrimKind::DistantLight { intensity, color } = prim.kind else {
            return Ok(Value::Empty);
        };
        match key {
            tokens::INTENSITY => Ok(Value::Float(intensity)),
            tokens::LIGHT_COLOR => Ok(Value::Vec4(Vec4::new(color.x, color.y, color.z, 1.0))),
            _ => Ok(Value::Empty),
        }
    }

    fn render_tag(&self, id: &ScenePath) -> RenderResult<String> {
        let (_, _, prim) = self.lookup(id)?;
        Ok(prim.purpose.render_tag().to_string())
    }

    fn geometry(&self, id: &ScenePath) -> RenderResult<Geometry> {
        let (_, _, prim) = self.lookup(id)?;
        match prim.kind {
            PrimKind::Sphere { radius } => Ok(Geometry::Sphere { radius }),
            PrimKind::Cube { size } => Ok(Geometry::Cube { size }),
            _ => Err(RenderError::UnsupportedPrimType {
                path: id.clone(),
                type_name: prim.kind.type_name().to_string(),
            }),
        }
    }

    fn display_color(&self, id: &ScenePath) -> RenderResult<Vec3> {
        let (_, _, prim) = self.lookup(id)?;
        Ok(prim.display_color)
    }
}
