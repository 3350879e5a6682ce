//! Math utilities and types
//!
//! Provides the double-precision math types used for scene transforms,
//! camera matrices and bounding volumes.
//!
//! Matrices follow the nalgebra column-vector convention: a point is
//! transformed as `m * p`. Cameras look down their local -Z axis and
//! projections map view-space depth to the OpenGL-style [-1, 1] NDC range.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
};

/// 2D vector type
pub type Vec2 = Vector2<f64>;

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 4D vector type
pub type Vec4 = Vector4<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f64>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f64>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f64 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// Component-wise linear interpolation between two matrices
    ///
    /// Adequate for translation/scale animation; rotations are not
    /// re-orthonormalized.
    pub fn lerp_matrix(a: &Mat4, b: &Mat4, t: f64) -> Mat4 {
        a + (b - a) * t
    }

    /// Encode a linear color component with the sRGB transfer curve
    pub fn linear_to_srgb(value: f32) -> f32 {
        let value = value.clamp(0.0, 1.0);
        if value <= 0.003_130_8 {
            value * 12.92
        } else {
            1.055 * value.powf(1.0 / 2.4) - 0.055
        }
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix
    ///
    /// `fov_y` is the full vertical field of view in radians.
    fn perspective(fov_y: f64, aspect: f64, near: f64, far: f64) -> Mat4;

    /// Create a look-at view (world-to-view) matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Translation component of an affine matrix
    fn translation_part(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = (2.0 * far * near) / (near - far);
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * Mat4::new_translation(&(-eye))
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_at_maps_target_onto_negative_z() {
        let view = Mat4::look_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let p = view.transform_point(&Point3::origin());
        assert_relative_eq!(p.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_ndc_bounds() {
        let proj = Mat4::perspective(utils::deg_to_rad(60.0), 1.0, 1.0, 10.0);
        let near = proj.transform_point(&Point3::new(0.0, 0.0, -1.0));
        let far = proj.transform_point(&Point3::new(0.0, 0.0, -10.0));
        assert_relative_eq!(near.z, -1.0, epsilon = 1e-12);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lerp_matrix_halfway() {
        let a = Mat4::new_translation(&Vec3::new(0.0, 0.0, 0.0));
        let b = Mat4::new_translation(&Vec3::new(2.0, 4.0, 6.0));
        let m = utils::lerp_matrix(&a, &b, 0.5);
        assert_relative_eq!(m.translation_part(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_linear_to_srgb_curve() {
        assert_relative_eq!(utils::linear_to_srgb(0.0), 0.0);
        assert_relative_eq!(utils::linear_to_srgb(1.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(utils::linear_to_srgb(0.002), 0.002 * 12.92, epsilon = 1e-7);
        assert_relative_eq!(utils::linear_to_srgb(0.5), 0.735_357, epsilon = 1e-5);
        assert_relative_eq!(utils::linear_to_srgb(2.0), 1.0, epsilon = 1e-6);
    }
}
