//! Light prims held by the scene index

use crate::foundation::math::{Mat4, Vec3};

/// Light state synced from its scene delegate
///
/// Only distant lights exist; they shine down their local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Local to world
    pub transform: Mat4,
    /// Intensity multiplier
    pub intensity: f64,
    /// Linear color
    pub color: Vec3,
    /// Whether the light contributes
    pub visible: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            transform: Mat4::identity(),
            intensity: 1.0,
            color: Vec3::repeat(1.0),
            visible: true,
        }
    }
}

impl Light {
    /// World space direction the light travels in
    pub fn direction(&self) -> Vec3 {
        let dir = self.transform.transform_vector(&Vec3::new(0.0, 0.0, -1.0));
        if dir.norm_squared() > 0.0 {
            dir.normalize()
        } else {
            Vec3::new(0.0, 0.0, -1.0)
        }
    }

    /// Radiance arriving from the light
    pub fn radiance(&self) -> Vec3 {
        if self.visible {
            self.color * self.intensity
        } else {
            Vec3::zeros()
        }
    }
}
