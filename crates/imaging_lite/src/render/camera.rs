//! Camera data and framing utilities
//!
//! Cameras look down their local -Z axis. The world-to-view matrix maps
//! world points into camera space and the projection maps camera space into
//! OpenGL-style clip space.

use crate::foundation::math::{utils, Mat4, Vec3, Vec4};
use crate::scene::{Aabb, UpAxis};
use serde::{Deserialize, Serialize};

/// How a camera's projection is adapted when the viewport aspect ratio
/// differs from the camera's own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowPolicy {
    /// Keep the vertical extent, adjust the horizontal one
    MatchVertically,
    /// Keep the horizontal extent, adjust the vertical one
    MatchHorizontally,
    /// Grow the frustum so the whole camera view stays visible
    #[default]
    Fit,
    /// Shrink the frustum so the viewport is completely covered
    Crop,
    /// Use the projection unchanged
    DontConform,
}

impl WindowPolicy {
    /// Adapt `projection` to a viewport with aspect ratio `window_aspect`
    pub fn conform_projection(self, projection: &Mat4, window_aspect: f64) -> Mat4 {
        let sx = projection[(0, 0)];
        let sy = projection[(1, 1)];
        if sx == 0.0 || sy == 0.0 || window_aspect <= 0.0 {
            return *projection;
        }
        let camera_aspect = sy / sx;

        let match_vertically = match self {
            Self::DontConform => return *projection,
            Self::MatchVertically => true,
            Self::MatchHorizontally => false,
            Self::Fit => window_aspect > camera_aspect,
            Self::Crop => window_aspect <= camera_aspect,
        };

        let mut result = *projection;
        if match_vertically {
            let scale = camera_aspect / window_aspect;
            for col in 0..4 {
                result[(0, col)] *= scale;
            }
        } else {
            let scale = window_aspect / camera_aspect;
            for col in 0..4 {
                result[(1, col)] *= scale;
            }
        }
        result
    }
}

/// Physical lens description in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraLens {
    /// Focal length
    pub focal_length: f64,
    /// Horizontal film aperture
    pub horizontal_aperture: f64,
    /// Vertical film aperture
    pub vertical_aperture: f64,
    /// Near clipping distance in scene units
    pub near: f64,
    /// Far clipping distance in scene units
    pub far: f64,
}

impl Default for CameraLens {
    /// 50mm lens on a 35mm academy filmback
    fn default() -> Self {
        Self {
            focal_length: 50.0,
            horizontal_aperture: 20.955,
            vertical_aperture: 15.2908,
            near: 1.0,
            far: 1_000_000.0,
        }
    }
}

impl CameraLens {
    /// Full horizontal field of view in radians
    pub fn horizontal_fov(&self) -> f64 {
        2.0 * (self.horizontal_aperture / (2.0 * self.focal_length)).atan()
    }

    /// Full vertical field of view in radians
    pub fn vertical_fov(&self) -> f64 {
        2.0 * (self.vertical_aperture / (2.0 * self.focal_length)).atan()
    }

    /// Perspective projection of the lens
    pub fn projection(&self) -> Mat4 {
        let (near, far) = (self.near, self.far);
        let mut result = Mat4::zeros();
        result[(0, 0)] = 2.0 * self.focal_length / self.horizontal_aperture;
        result[(1, 1)] = 2.0 * self.focal_length / self.vertical_aperture;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = (2.0 * far * near) / (near - far);
        result[(3, 2)] = -1.0;
        result
    }
}

/// Camera state as seen by a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World to camera space
    pub world_to_view: Mat4,
    /// Camera to clip space
    pub projection: Mat4,
    /// Viewport conform policy
    pub window_policy: WindowPolicy,
    /// Additional clipping planes in camera space
    pub clip_planes: Vec<Vec4>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Mat4::identity(), CameraLens::default().projection())
    }
}

impl Camera {
    /// Camera from explicit matrices using the `Fit` policy and no clip planes
    pub fn new(world_to_view: Mat4, projection: Mat4) -> Self {
        Self {
            world_to_view,
            projection,
            window_policy: WindowPolicy::Fit,
            clip_planes: Vec::new(),
        }
    }

    /// Camera placed by a camera-to-world transform looking through a lens
    pub fn from_transform(view_to_world: &Mat4, lens: &CameraLens) -> Option<Self> {
        let world_to_view = view_to_world.try_inverse()?;
        Some(Self::new(world_to_view, lens.projection()))
    }

    /// Camera to world transform
    pub fn view_to_world(&self) -> Option<Mat4> {
        self.world_to_view.try_inverse()
    }

    /// World space position of the camera
    pub fn position(&self) -> Option<Vec3> {
        self.view_to_world().map(|m| Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]))
    }

    /// Projection adapted to a viewport aspect ratio
    pub fn conformed_projection(&self, window_aspect: f64) -> Mat4 {
        self.window_policy.conform_projection(&self.projection, window_aspect)
    }
}

/// Compute a camera that frames the front face of `bounds`
///
/// Starts from a default 50mm lens, places the camera on the bounds'
/// centroid and backs it up along +Z until the bounds' cross-section in the
/// focal plane fits the horizontal field of view. Returns `None` for empty
/// bounds.
pub fn compute_camera_to_frame_bounds(bounds: &Aabb, up_axis: UpAxis) -> Option<Camera> {
    if bounds.is_empty() {
        return None;
    }
    let lens = CameraLens::default();
    let center = bounds.center();
    let dim = bounds.size();

    let (corner_x, corner_y, depth) = match up_axis {
        UpAxis::Y => (dim.x / 2.0, dim.y / 2.0, dim.z),
        UpAxis::Z => (dim.x / 2.0, dim.z / 2.0, dim.y),
    };
    let plane_radius = corner_x.hypot(corner_y);

    let half_fov = lens.horizontal_fov() / 2.0;
    let distance = plane_radius / half_fov.tan() + depth / 2.0;

    let eye = center + Vec3::new(0.0, 0.0, distance);
    let view_to_world = Mat4::new_translation(&eye);
    log::debug!(
        "Framing bounds centered at ({:.3}, {:.3}, {:.3}) from distance {:.3} (fov {:.1} deg)",
        center.x,
        center.y,
        center.z,
        distance,
        utils::rad_to_deg(lens.horizontal_fov())
    );
    Camera::from_transform(&view_to_world, &lens)
}
