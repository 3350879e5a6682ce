//! Drawable prims held by the scene index

use crate::core::{tokens, ScenePath};
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::Aabb;

/// Implicit surface of a drawable
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Sphere centered at the local origin
    Sphere {
        /// Radius
        radius: f64,
    },
    /// Axis-aligned cube centered at the local origin
    Cube {
        /// Edge length
        size: f64,
    },
}

impl Geometry {
    /// Prim type name
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Sphere { .. } => "Sphere",
            Self::Cube { .. } => "Cube",
        }
    }

    /// Bounds in local space
    pub fn local_bounds(&self) -> Aabb {
        let half = match *self {
            Self::Sphere { radius } => radius,
            Self::Cube { size } => size / 2.0,
        };
        Aabb::new(Vec3::repeat(-half), Vec3::repeat(half))
    }
}

/// Drawable state synced from its scene delegate
#[derive(Debug, Clone)]
pub struct Rprim {
    /// Scene delegate owning the prim
    pub delegate_id: ScenePath,
    /// Surface; `None` until first synced
    pub geometry: Option<Geometry>,
    /// Local to world
    pub transform: Mat4,
    /// World to local
    pub inverse_transform: Mat4,
    /// Visibility
    pub visible: bool,
    /// Render tag used for task filtering
    pub render_tag: String,
    /// Linear display color
    pub display_color: Vec3,
}

impl Rprim {
    /// Unsynced drawable owned by `delegate_id`
    pub fn new(delegate_id: ScenePath) -> Self {
        Self {
            delegate_id,
            geometry: None,
            transform: Mat4::identity(),
            inverse_transform: Mat4::identity(),
            visible: true,
            render_tag: tokens::GEOMETRY.to_string(),
            display_color: Vec3::repeat(0.5),
        }
    }

    /// Set the transform, keeping the cached inverse in step
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.inverse_transform = transform.try_inverse().unwrap_or_else(|| {
            log::warn!("Non-invertible drawable transform; using identity inverse");
            Mat4::identity()
        });
    }

    /// World space bounds, `None` until synced
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.geometry.map(|geometry| geometry.local_bounds().transformed(&self.transform))
    }

    /// Whether the drawable participates for the given render tags
    ///
    /// An empty tag list selects every drawable.
    pub fn matches_render_tags(&self, render_tags: &[String]) -> bool {
        render_tags.is_empty() || render_tags.iter().any(|tag| *tag == self.render_tag)
    }
}
