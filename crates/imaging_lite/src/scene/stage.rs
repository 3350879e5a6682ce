//! In-memory stage description
//!
//! A stage is a tree of prims addressed by absolute path. Transforms are
//! local to the parent and may carry time samples; visibility is inherited,
//! so an invisible prim hides its whole subtree.

use crate::core::{tokens, ScenePath};
use crate::foundation::math::{utils, Mat4, Vec3};
use crate::foundation::time::TimeCode;
use crate::render::camera::CameraLens;
use crate::scene::Aabb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stage up axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    /// +Y is up
    #[default]
    Y,
    /// +Z is up
    Z,
}

/// Prim purpose, mapped onto render tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Purpose {
    /// Always drawn
    #[default]
    Default,
    /// Final-quality geometry
    Render,
    /// Lightweight stand-in geometry
    Proxy,
    /// Helper geometry
    Guide,
}

impl Purpose {
    /// Render tag drawables with this purpose carry
    pub const fn render_tag(self) -> &'static str {
        match self {
            Self::Default => tokens::GEOMETRY,
            Self::Render => tokens::RENDER,
            Self::Proxy => tokens::PROXY,
            Self::Guide => tokens::GUIDE,
        }
    }
}

/// Prim type and type-specific attributes
#[derive(Debug, Clone, PartialEq)]
pub enum PrimKind {
    /// Transform-only grouping prim
    Xform,
    /// Sphere around the local origin
    Sphere {
        /// Radius
        radius: f64,
    },
    /// Cube around the local origin
    Cube {
        /// Edge length
        size: f64,
    },
    /// Camera looking down local -Z
    Camera(CameraLens),
    /// Light shining down local -Z
    DistantLight {
        /// Intensity multiplier
        intensity: f64,
        /// Linear color
        color: Vec3,
    },
}

impl PrimKind {
    /// Type name
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Xform => "Xform",
            Self::Sphere { .. } => "Sphere",
            Self::Cube { .. } => "Cube",
            Self::Camera(_) => "Camera",
            Self::DistantLight { .. } => "DistantLight",
        }
    }

    /// Whether the prim is a drawable surface
    pub const fn is_gprim(&self) -> bool {
        matches!(self, Self::Sphere { .. } | Self::Cube { .. })
    }
}

/// A node of the stage
#[derive(Debug, Clone, PartialEq)]
pub struct Prim {
    /// Type and type-specific attributes
    pub kind: PrimKind,
    /// Local transform at the default time
    pub transform: Mat4,
    /// Time-sampled local transforms sorted by frame
    pub time_samples: Vec<(f64, Mat4)>,
    /// Visibility
    pub visible: bool,
    /// Purpose
    pub purpose: Purpose,
    /// Linear display color of gprims
    pub display_color: Vec3,
}

impl Prim {
    /// Prim of the given kind with identity transform
    pub fn new(kind: PrimKind) -> Self {
        Self {
            kind,
            transform: Mat4::identity(),
            time_samples: Vec::new(),
            visible: true,
            purpose: Purpose::Default,
            display_color: Vec3::repeat(0.5),
        }
    }

    /// Grouping prim
    pub fn xform() -> Self {
        Self::new(PrimKind::Xform)
    }

    /// Sphere
    pub fn sphere(radius: f64) -> Self {
        Self::new(PrimKind::Sphere { radius })
    }

    /// Cube
    pub fn cube(size: f64) -> Self {
        Self::new(PrimKind::Cube { size })
    }

    /// Camera
    pub fn camera(lens: CameraLens) -> Self {
        Self::new(PrimKind::Camera(lens))
    }

    /// Distant light
    pub fn distant_light(intensity: f64, color: Vec3) -> Self {
        Self::new(PrimKind::DistantLight { intensity, color })
    }

    /// Set the default local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Set the default local transform to a translation
    #[must_use]
    pub fn with_translation(self, translation: Vec3) -> Self {
        self.with_transform(Mat4::new_translation(&translation))
    }

    /// Add a time-sampled local transform
    #[must_use]
    pub fn with_time_sample(mut self, frame: f64, transform: Mat4) -> Self {
        let position = self.time_samples.partition_point(|(f, _)| *f < frame);
        if self.time_samples.get(position).is_some_and(|(f, _)| *f == frame) {
            self.time_samples[position].1 = transform;
        } else {
            self.time_samples.insert(position, (frame, transform));
        }
        self
    }

    /// Set visibility
    #[must_use]
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set purpose
    #[must_use]
    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Set display color
    #[must_use]
    pub fn with_display_color(mut self, color: Vec3) -> Self {
        self.display_color = color;
        self
    }

    /// Whether the local transform is animated
    pub fn is_time_varying(&self) -> bool {
        self.time_samples.len() > 1
    }

    /// Local transform evaluated at `time`
    ///
    /// The default time and prims without samples use the default
    /// transform; frames outside the sampled range hold the nearest sample.
    pub fn local_transform(&self, time: TimeCode) -> Mat4 {
        let Some(frame) = time.frame() else {
            return self.transform;
        };
        let (Some(first), Some(last)) = (self.time_samples.first(), self.time_samples.last()) else {
            return self.transform;
        };
        if frame <= first.0 {
            return first.1;
        }
        if frame >= last.0 {
            return last.1;
        }
        let upper = self.time_samples.partition_point(|(f, _)| *f <= frame);
        let (f0, m0) = &self.time_samples[upper - 1];
        let (f1, m1) = &self.time_samples[upper];
        utils::lerp_matrix(m0, m1, (frame - f0) / (f1 - f0))
    }
}

/// Tree of prims
#[derive(Debug, Clone, Default)]
pub struct Stage {
    prims: BTreeMap<ScenePath, Prim>,
    up_axis: UpAxis,
}

impl Stage {
    /// Create an empty Y-up stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the up axis
    #[must_use]
    pub fn with_up_axis(mut self, up_axis: UpAxis) -> Self {
        self.up_axis = up_axis;
        self
    }

    /// Stage up axis
    pub fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    /// Define a prim, creating missing ancestors as grouping prims
    ///
    /// Redefining a path replaces its prim; the absolute root cannot be
    /// defined.
    pub fn define(&mut self, path: ScenePath, prim: Prim) {
        if path.is_absolute_root() {
            log::warn!("Ignoring prim definition at the absolute root");
            return;
        }
        let mut ancestor = path.parent();
        while let Some(parent) = ancestor {
            if parent.is_absolute_root() || self.prims.contains_key(&parent) {
                break;
            }
            ancestor = parent.parent();
            self.prims.insert(parent, Prim::xform());
        }
        self.prims.insert(path, prim);
    }

    /// Prim at `path`
    pub fn prim(&self, path: &ScenePath) -> Option<&Prim> {
        self.prims.get(path)
    }

    /// Prim at `path`, mutably
    pub fn prim_mut(&mut self, path: &ScenePath) -> Option<&mut Prim> {
        self.prims.get_mut(path)
    }

    /// Whether `path` names the absolute root or a defined prim
    pub fn contains(&self, path: &ScenePath) -> bool {
        path.is_absolute_root() || self.prims.contains_key(path)
    }

    /// Number of prims
    pub fn prim_count(&self) -> usize {
        self.prims.len()
    }

    /// Prims at or below `root`, parents before children
    pub fn traverse<'a>(&'a self, root: &'a ScenePath) -> impl Iterator<Item = (&'a ScenePath, &'a Prim)> + 'a {
        self.prims
            .range(root.clone()..)
            .take_while(move |(path, _)| path.as_str().starts_with(root.as_str()))
            .filter(move |(path, _)| path.has_prefix(root))
    }

    /// Local to world transform at `time`
    pub fn world_transform(&self, path: &ScenePath, time: TimeCode) -> Mat4 {
        path.ancestors_inclusive()
            .iter()
            .filter_map(|ancestor| self.prims.get(ancestor))
            .fold(Mat4::identity(), |world, prim| world * prim.local_transform(time))
    }

    /// Whether the prim and all of its ancestors are visible
    pub fn is_visible(&self, path: &ScenePath) -> bool {
        path.ancestors_inclusive()
            .iter()
            .filter_map(|ancestor| self.prims.get(ancestor))
            .all(|prim| prim.visible)
    }

    /// Whether the prim's world transform changes over time
    pub fn is_time_varying(&self, path: &ScenePath) -> bool {
        path.ancestors_inclusive()
            .iter()
            .filter_map(|ancestor| self.prims.get(ancestor))
            .any(Prim::is_time_varying)
    }

    /// World bounds of the visible gprims under `root` whose purpose is
    /// included
    pub fn compute_world_bound(&self, root: &ScenePath, time: TimeCode, purposes: &[Purpose]) -> Aabb {
        self.traverse(root)
            .filter(|(path, prim)| purposes.contains(&prim.purpose) && self.is_visible(path))
            .filter_map(|(path, prim)| {
                let local = match prim.kind {
                    PrimKind::Sphere { radius } => Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(radius)),
                    PrimKind::Cube { size } => Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(size / 2.0)),
                    _ => return None,
                };
                Some(local.transformed(&self.world_transform(path, time)))
            })
            .fold(Aabb::empty(), |bounds, prim_bounds| bounds.union(&prim_bounds))
    }
}
