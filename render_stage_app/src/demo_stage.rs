//! Built-in demo scene

use imaging_lite::prelude::*;
use imaging_lite::render::camera::CameraLens;
use std::sync::Arc;

/// A few primitives on a row, a sun and a camera
///
/// The `/World/guides` subtree carries guide purpose and only shows up when
/// guides are enabled.
pub fn build() -> Result<Arc<Stage>, imaging_lite::core::PathError> {
    let mut stage = Stage::new();

    stage.define(
        "/World/props/red_ball".parse()?,
        Prim::sphere(1.0)
            .with_translation(Vec3::new(-2.5, 0.0, 0.0))
            .with_display_color(Vec3::new(0.8, 0.15, 0.1)),
    );
    stage.define(
        "/World/props/crate".parse()?,
        Prim::cube(1.6).with_display_color(Vec3::new(0.75, 0.6, 0.35)),
    );
    stage.define(
        "/World/props/blue_ball".parse()?,
        Prim::sphere(0.75)
            .with_translation(Vec3::new(2.5, -0.25, 0.0))
            .with_display_color(Vec3::new(0.1, 0.3, 0.85)),
    );
    stage.define(
        "/World/guides/marker".parse()?,
        Prim::sphere(0.2)
            .with_translation(Vec3::new(0.0, 2.0, 0.0))
            .with_purpose(Purpose::Guide),
    );

    stage.define(
        "/World/sun".parse()?,
        Prim::distant_light(1.2, Vec3::new(1.0, 0.95, 0.85))
            .with_transform(Mat4::from_euler_angles(-0.8, 0.4, 0.0)),
    );
    stage.define(
        "/World/camera".parse()?,
        Prim::camera(CameraLens::default()).with_translation(Vec3::new(0.0, 1.0, 14.0)),
    );

    Ok(Arc::new(stage))
}
