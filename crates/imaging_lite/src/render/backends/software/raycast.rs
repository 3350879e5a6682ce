//! Ray generation, intersection and shading for the software backend

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::render::light::Light;
use crate::render::rprim::{Geometry, Rprim};

/// World space ray
#[derive(Debug, Clone, Copy)]
pub(super) struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Ray through a normalized device coordinate
    pub fn through_ndc(ndc_to_world: &Mat4, x: f64, y: f64) -> Option<Self> {
        let near = unproject(ndc_to_world, x, y, -1.0)?;
        let far = unproject(ndc_to_world, x, y, 1.0)?;
        let direction = far - near;
        if direction.norm_squared() == 0.0 {
            return None;
        }
        Some(Self { origin: near, direction: direction.normalize() })
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

fn unproject(ndc_to_world: &Mat4, x: f64, y: f64, z: f64) -> Option<Vec3> {
    let p = ndc_to_world * Vec4::new(x, y, z, 1.0);
    if p.w.abs() < f64::EPSILON {
        return None;
    }
    Some(p.xyz() / p.w)
}

/// Closest surface hit
#[derive(Debug, Clone, Copy)]
pub(super) struct Hit {
    pub position: Vec3,
    pub normal: Vec3,
    pub prim_id: i32,
    pub color: Vec3,
}

/// Drawable prepared for intersection
#[derive(Debug, Clone)]
pub(super) struct Target {
    pub prim_id: i32,
    pub geometry: Geometry,
    pub inverse_transform: Mat4,
    pub color: Vec3,
}

impl Target {
    pub fn new(prim_id: i32, rprim: &Rprim) -> Option<Self> {
        Some(Self {
            prim_id,
            geometry: rprim.geometry?,
            inverse_transform: rprim.inverse_transform,
            color: rprim.display_color,
        })
    }

    /// Intersect in local space; `t` stays in world ray units since the
    /// local direction is not renormalized
    fn intersect(&self, ray: &Ray) -> Option<(f64, Vec3)> {
        let origin = self.inverse_transform.transform_point(&Point3::from(ray.origin)).coords;
        let direction = self.inverse_transform.transform_vector(&ray.direction);
        let (t, local_normal) = match self.geometry {
            Geometry::Sphere { radius } => intersect_sphere(origin, direction, radius)?,
            Geometry::Cube { size } => intersect_cube(origin, direction, size / 2.0)?,
        };
        let normal = self.inverse_transform.transpose().transform_vector(&local_normal);
        Some((t, normal.try_normalize(f64::EPSILON)?))
    }
}

fn intersect_sphere(origin: Vec3, direction: Vec3, radius: f64) -> Option<(f64, Vec3)> {
    let a = direction.dot(&direction);
    let b = 2.0 * origin.dot(&direction);
    let c = origin.dot(&origin) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);
    let t = if near > 0.0 { near } else if far > 0.0 { far } else { return None };
    Some((t, origin + direction * t))
}

fn intersect_cube(origin: Vec3, direction: Vec3, half: f64) -> Option<(f64, Vec3)> {
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut enter_axis = 0;
    for axis in 0..3 {
        if direction[axis].abs() < f64::EPSILON {
            if origin[axis].abs() > half {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction[axis];
        let t0 = (-half - origin[axis]) * inv;
        let t1 = (half - origin[axis]) * inv;
        let (t_near, t_far) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
        if t_near > t_enter {
            t_enter = t_near;
            enter_axis = axis;
        }
        t_exit = t_exit.min(t_far);
    }
    if t_enter > t_exit || t_exit <= 0.0 {
        return None;
    }
    let (t, axis) = if t_enter > 0.0 {
        (t_enter, enter_axis)
    } else {
        // Origin inside the cube: report the exit face
        let p = origin + direction * t_exit;
        let axis = (0..3)
            .max_by(|a, b| p[*a].abs().total_cmp(&p[*b].abs()))
            .unwrap_or(0);
        (t_exit, axis)
    };
    let p = origin + direction * t;
    let mut normal = Vec3::zeros();
    normal[axis] = p[axis].signum();
    Some((t, normal))
}

/// Closest hit of `ray` against `targets` in front of the ray origin
pub(super) fn trace(ray: &Ray, targets: &[Target]) -> Option<Hit> {
    targets
        .iter()
        .filter_map(|target| target.intersect(ray).map(|(t, normal)| (target, t, normal)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(target, t, normal)| Hit {
            position: ray.at(t),
            normal,
            prim_id: target.prim_id,
            color: target.color,
        })
}

/// Lighting inputs of one execution
#[derive(Debug, Clone)]
pub(super) struct Shading {
    pub lights: Vec<Light>,
    pub lighting_enabled: bool,
    pub ambient: f64,
}

impl Shading {
    /// Lambert shading; without lights the camera acts as a headlight
    pub fn shade(&self, ray: &Ray, hit: &Hit) -> Vec3 {
        let normal = if hit.normal.dot(&ray.direction) > 0.0 { -hit.normal } else { hit.normal };
        if !self.lighting_enabled || self.lights.is_empty() {
            let facing = normal.dot(&-ray.direction).max(0.0);
            return hit.color * (0.2 + 0.8 * facing);
        }
        let irradiance = self
            .lights
            .iter()
            .map(|light| light.radiance() * normal.dot(&-light.direction()).max(0.0))
            .fold(Vec3::repeat(self.ambient), |sum, contribution| sum + contribution);
        hit.color.component_mul(&irradiance)
    }
}

/// Subpixel offset of a sample from the R2 low discrepancy sequence
///
/// Sample 0 is the pixel center.
pub(super) fn sample_offset(sample: u32) -> (f64, f64) {
    const G: f64 = 1.324_717_957_244_746;
    let n = f64::from(sample);
    ((0.5 + n / G).fract(), (0.5 + n / (G * G)).fract())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{utils, Mat4Ext};
    use approx::assert_relative_eq;

    fn target(geometry: Geometry, transform: Mat4) -> Target {
        Target {
            prim_id: 0,
            geometry,
            inverse_transform: transform.try_inverse().unwrap(),
            color: Vec3::repeat(1.0),
        }
    }

    fn ray_down_z() -> Ray {
        Ray { origin: Vec3::new(0.0, 0.0, 10.0), direction: Vec3::new(0.0, 0.0, -1.0) }
    }

    #[test]
    fn test_sphere_hit_distance_and_normal() {
        let sphere = target(Geometry::Sphere { radius: 1.0 }, Mat4::identity());
        let hit = trace(&ray_down_z(), &[sphere]).unwrap();
        assert_relative_eq!(hit.position.z, 1.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_scaled_sphere_keeps_world_distance() {
        let sphere = target(Geometry::Sphere { radius: 1.0 }, Mat4::new_scaling(2.0));
        let hit = trace(&ray_down_z(), &[sphere]).unwrap();
        assert_relative_eq!(hit.position.z, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cube_face_normal() {
        let cube = target(Geometry::Cube { size: 2.0 }, Mat4::new_translation(&Vec3::new(0.0, 0.0, -1.0)));
        let hit = trace(&ray_down_z(), &[cube]).unwrap();
        assert_relative_eq!(hit.position.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_closest_target_wins() {
        let mut far = target(Geometry::Sphere { radius: 1.0 }, Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0)));
        far.prim_id = 1;
        let near = target(Geometry::Sphere { radius: 1.0 }, Mat4::identity());
        assert_eq!(trace(&ray_down_z(), &[far, near]).unwrap().prim_id, 0);
    }

    #[test]
    fn test_miss() {
        let sphere = target(Geometry::Sphere { radius: 1.0 }, Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0)));
        assert!(trace(&ray_down_z(), &[sphere]).is_none());
    }

    #[test]
    fn test_center_ray_looks_down_view_axis() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));
        let projection = Mat4::perspective(utils::deg_to_rad(45.0), 1.0, 0.1, 100.0);
        let ndc_to_world = (projection * view).try_inverse().unwrap();
        let ray = Ray::through_ndc(&ndc_to_world, 0.0, 0.0).unwrap();
        assert_relative_eq!(ray.direction, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-9);
        assert_relative_eq!(ray.origin.z, 4.9, epsilon = 1e-9);
    }

    #[test]
    fn test_sample_offsets_stay_in_pixel() {
        assert_eq!(sample_offset(0), (0.5, 0.5));
        for sample in 1..64 {
            let (x, y) = sample_offset(sample);
            assert!((0.0..1.0).contains(&x) && (0.0..1.0).contains(&y));
        }
    }

    #[test]
    fn test_headlight_shading_faces_camera() {
        let shading = Shading { lights: Vec::new(), lighting_enabled: true, ambient: 0.1 };
        let sphere = target(Geometry::Sphere { radius: 1.0 }, Mat4::identity());
        let ray = ray_down_z();
        let hit = trace(&ray, &[sphere]).unwrap();
        assert_relative_eq!(shading.shade(&ray, &hit), Vec3::repeat(1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_light_shading_adds_ambient() {
        let light = Light { intensity: 2.0, ..Light::default() };
        let shading = Shading { lights: vec![light], lighting_enabled: true, ambient: 0.1 };
        let sphere = target(Geometry::Sphere { radius: 1.0 }, Mat4::identity());
        let ray = ray_down_z();
        let hit = trace(&ray, &[sphere]).unwrap();
        assert_relative_eq!(shading.shade(&ray, &hit), Vec3::repeat(2.1), epsilon = 1e-9);
    }
}
