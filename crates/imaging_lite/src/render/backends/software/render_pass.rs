use crate::core::tokens;
use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::render::api::{RenderBuffer, RenderPass, RenderPassState, RprimCollection};
use crate::render::index::RenderIndex;
use crate::render::RenderResult;
use std::sync::Arc;

use super::delegate::DelegateShared;
use super::raycast::{self, Ray, Shading, Target};
use super::render_buffer::SoftwareRenderBuffer;

/// Everything that invalidates accumulated samples when it changes
#[derive(Debug, Clone, PartialEq)]
struct AccumulationKey {
    scene_version: u64,
    sprim_version: u64,
    epoch: u64,
    world_to_ndc: Mat4,
    size: (u32, u32),
    render_tags: Vec<String>,
}

/// Per-pixel outputs of the first, unjittered sample
#[derive(Debug, Clone, Default)]
struct AuxFrame {
    depth: Vec<f32>,
    normal: Vec<Vec3>,
    prim_id: Vec<i32>,
}

/// Progressive ray casting pass
///
/// Each execution traces one jittered sample per pixel and averages it into
/// the color output. Depth, normal and primId come from the first sample,
/// which goes through pixel centers. The image is rendered at the
/// viewport's pixel size and resampled to each bound buffer.
pub struct SoftwareRenderPass {
    collection: RprimCollection,
    shared: Arc<DelegateShared>,
    key: Option<AccumulationKey>,
    size: (u32, u32),
    samples: u32,
    color_sum: Vec<Vec4>,
    aux: AuxFrame,
    converged: bool,
}

impl SoftwareRenderPass {
    pub(super) fn new(collection: RprimCollection, shared: Arc<DelegateShared>) -> Self {
        Self {
            collection,
            shared,
            key: None,
            size: (0, 0),
            samples: 0,
            color_sum: Vec::new(),
            aux: AuxFrame::default(),
            converged: false,
        }
    }

    /// Samples accumulated into the current image
    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    fn reset(&mut self, key: AccumulationKey) {
        log::trace!("Restarting accumulation at {}x{}", key.size.0, key.size.1);
        let pixels = key.size.0 as usize * key.size.1 as usize;
        self.size = key.size;
        self.key = Some(key);
        self.samples = 0;
        self.color_sum = vec![Vec4::zeros(); pixels];
        self.aux = AuxFrame::default();
        self.converged = false;
    }

    fn targets(&self, index: &RenderIndex, render_tags: &[String]) -> Vec<Target> {
        index
            .rprims()
            .enumerate()
            .filter(|(_, (path, rprim))| {
                rprim.visible && self.collection.contains(path) && rprim.matches_render_tags(render_tags)
            })
            .filter_map(|(prim_id, (_, rprim))| Target::new(i32::try_from(prim_id).unwrap_or(i32::MAX), rprim))
            .collect()
    }

    fn trace_sample(&mut self, state: &RenderPassState, index: &RenderIndex, render_tags: &[String]) {
        let targets = self.targets(index, render_tags);
        let shading = Shading {
            lights: index
                .lights()
                .filter(|(_, light)| light.visible)
                .map(|(_, light)| light.clone())
                .collect(),
            lighting_enabled: self.shared.lighting_enabled(),
            ambient: self.shared.ambient(),
        };
        let clip_planes = state.camera().map(|camera| camera.clip_planes.clone()).unwrap_or_default();
        let background = self.shared.clear_color();
        let first_sample = self.samples == 0;
        let (jitter_x, jitter_y) = raycast::sample_offset(self.samples);
        let (width, height) = self.size;

        if first_sample {
            let pixels = width as usize * height as usize;
            self.aux = AuxFrame {
                depth: vec![1.0; pixels],
                normal: vec![Vec3::zeros(); pixels],
                prim_id: vec![-1; pixels],
            };
        }

        for y in 0..height {
            for x in 0..width {
                let pixel = y as usize * width as usize + x as usize;
                let ndc_x = 2.0 * (f64::from(x) + jitter_x) / f64::from(width) - 1.0;
                let ndc_y = 1.0 - 2.0 * (f64::from(y) + jitter_y) / f64::from(height);
                let hit = Ray::through_ndc(state.ndc_to_world(), ndc_x, ndc_y).and_then(|ray| {
                    raycast::trace(&ray, &targets)
                        .filter(|hit| !is_clipped(state, &clip_planes, hit.position))
                        .map(|hit| (ray, hit))
                });

                let Some((ray, hit)) = hit else {
                    self.color_sum[pixel] += background;
                    continue;
                };
                let color = shading.shade(&ray, &hit);
                self.color_sum[pixel] += Vec4::new(color.x, color.y, color.z, 1.0);

                if first_sample {
                    let ndc = state.world_to_ndc().transform_point(&Point3::from(hit.position));
                    self.aux.depth[pixel] = ((ndc.z + 1.0) / 2.0).clamp(0.0, 1.0) as f32;
                    self.aux.normal[pixel] = hit.normal;
                    self.aux.prim_id[pixel] = hit.prim_id;
                }
            }
        }
        self.samples += 1;
    }

    fn source_pixel(&self, aov_name: &str, pixel: usize) -> Option<[f32; 4]> {
        match aov_name {
            tokens::AOV_COLOR => {
                let c = self.color_sum[pixel] / f64::from(self.samples.max(1));
                Some([c.x as f32, c.y as f32, c.z as f32, c.w as f32])
            }
            tokens::AOV_DEPTH => Some([self.aux.depth[pixel], 0.0, 0.0, 0.0]),
            tokens::AOV_NORMAL => {
                let n = self.aux.normal[pixel];
                Some([n.x as f32, n.y as f32, n.z as f32, 0.0])
            }
            tokens::AOV_PRIM_ID => Some([self.aux.prim_id[pixel] as f32, 0.0, 0.0, 0.0]),
            _ => None,
        }
    }

    fn write_outputs(&self, state: &RenderPassState) {
        let (width, height) = self.size;
        for binding in state.aov_bindings() {
            let Some(buffer) = binding.render_buffer.as_ref() else {
                continue;
            };
            let Some(buffer) = buffer.as_any().downcast_ref::<SoftwareRenderBuffer>() else {
                log::warn!("Render buffer {} was not created by this backend", binding.render_buffer_id);
                continue;
            };
            if self.source_pixel(&binding.aov_name, 0).is_none() {
                log::debug!("Output '{}' is not produced by this backend", binding.aov_name);
                continue;
            }
            let (buffer_width, buffer_height) = (buffer.width(), buffer.height());
            let mut pixels = Vec::with_capacity(buffer_width as usize * buffer_height as usize);
            for by in 0..buffer_height {
                let sy = (u64::from(by) * u64::from(height) / u64::from(buffer_height)) as usize;
                for bx in 0..buffer_width {
                    let sx = (u64::from(bx) * u64::from(width) / u64::from(buffer_width)) as usize;
                    pixels.push(
                        self.source_pixel(&binding.aov_name, sy * width as usize + sx)
                            .unwrap_or_default(),
                    );
                }
            }
            buffer.write_pixels(&pixels);
        }
    }
}

/// Points on the negative side of any camera space clip plane are cut away
fn is_clipped(state: &RenderPassState, clip_planes: &[Vec4], position: Vec3) -> bool {
    if clip_planes.is_empty() {
        return false;
    }
    let view = state.world_to_view().transform_point(&Point3::from(position));
    let view = Vec4::new(view.x, view.y, view.z, 1.0);
    clip_planes.iter().any(|plane| plane.dot(&view) < 0.0)
}

impl RenderPass for SoftwareRenderPass {
    fn collection(&self) -> &RprimCollection {
        &self.collection
    }

    fn set_collection(&mut self, collection: RprimCollection) {
        if self.collection != collection {
            self.collection = collection;
            self.key = None;
        }
    }

    fn execute(&mut self, state: &RenderPassState, index: &RenderIndex, render_tags: &[String]) -> RenderResult<()> {
        if !state.is_prepared() {
            log::warn!("Software pass executed without a prepared camera");
            return Ok(());
        }
        let size = state.viewport().pixel_size();
        if size.0 == 0 || size.1 == 0 {
            return Ok(());
        }

        let key = AccumulationKey {
            scene_version: index.change_tracker().scene_version(),
            sprim_version: index.change_tracker().sprim_version(),
            epoch: self.shared.epoch(),
            world_to_ndc: *state.world_to_ndc(),
            size,
            render_tags: render_tags.to_vec(),
        };
        if self.key.as_ref() != Some(&key) {
            self.reset(key);
        }

        let max_samples = self.shared.max_samples();
        if self.shared.is_stopped() {
            self.converged = true;
        } else if self.samples >= max_samples {
            self.converged = true;
        } else if !self.shared.is_paused() {
            self.trace_sample(state, index, render_tags);
            self.converged = self.samples >= max_samples;
        }
        self.shared.report_progress(self.samples, max_samples);

        if self.samples > 0 {
            self.write_outputs(state);
        }
        Ok(())
    }

    fn is_converged(&self) -> bool {
        self.converged || self.shared.is_stopped()
    }
}

impl std::fmt::Debug for SoftwareRenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareRenderPass")
            .field("collection", &self.collection.name)
            .field("samples", &self.samples)
            .field("converged", &self.converged)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScenePath;
    use crate::foundation::math::{utils, Mat4, Mat4Ext};
    use crate::render::api::{AovBinding, Format, RenderBuffer, RenderBufferDescriptor, RenderDelegate, Viewport};
    use crate::render::backends::software::SoftwareDelegate;
    use crate::render::camera::Camera;

    fn path(s: &str) -> ScenePath {
        s.parse().unwrap()
    }

    fn camera() -> Camera {
        Camera::new(
            Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0)),
            Mat4::perspective(utils::deg_to_rad(45.0), 1.0, 0.1, 100.0),
        )
    }

    fn bound_buffer(delegate: &SoftwareDelegate, name: &str, format: Format, size: u32) -> AovBinding {
        let id = path(&format!("/taskDataDelegate/aov_{name}"));
        let buffer = delegate.create_render_buffer(&id).unwrap();
        buffer
            .allocate(&RenderBufferDescriptor { dimensions: [size, size, 1], format, multi_sampled: false })
            .unwrap();
        AovBinding {
            aov_name: name.to_string(),
            render_buffer_id: id,
            render_buffer: Some(buffer),
            ..AovBinding::default()
        }
    }

    fn state(bindings: Vec<AovBinding>, size: u32) -> RenderPassState {
        let mut state = RenderPassState::new();
        state.set_aov_bindings(bindings);
        state.set_camera_and_viewport(path("/cam"), camera(), Viewport::from_size(size, size));
        state.prepare().unwrap();
        state
    }

    fn read_f32(buffer: &dyn RenderBuffer) -> Vec<f32> {
        buffer
            .map()
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn test_empty_scene_renders_clear_color() {
        let mut delegate = SoftwareDelegate::new(true);
        delegate.set_render_setting(tokens::MAX_SAMPLES, 2_i64.into());
        delegate.set_render_setting(tokens::CLEAR_COLOR, [0.25_f32, 0.5, 0.75, 1.0].into());
        let index = RenderIndex::new(Box::new(SoftwareDelegate::new(true)));
        let color = bound_buffer(&delegate, tokens::AOV_COLOR, Format::Float32Vec4, 2);
        let buffer = color.render_buffer.clone().unwrap();
        let state = state(vec![color], 2);

        let mut pass = delegate.create_render_pass(&RprimCollection::geometry());
        pass.execute(&state, &index, &[]).unwrap();
        assert!(!pass.is_converged());
        pass.execute(&state, &index, &[]).unwrap();
        assert!(pass.is_converged());

        let pixels = read_f32(buffer.as_ref());
        assert_eq!(&pixels[..4], &[0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_unprepared_state_draws_nothing() {
        let delegate = SoftwareDelegate::new(true);
        let index = RenderIndex::new(Box::new(SoftwareDelegate::new(true)));
        let mut pass = delegate.create_render_pass(&RprimCollection::geometry());
        pass.execute(&RenderPassState::new(), &index, &[]).unwrap();
        assert!(!pass.is_converged());
    }

    #[test]
    fn test_stop_converges_immediately() {
        let delegate = SoftwareDelegate::new(true);
        let index = RenderIndex::new(Box::new(SoftwareDelegate::new(true)));
        let state = state(Vec::new(), 2);
        let mut pass = delegate.create_render_pass(&RprimCollection::geometry());
        assert!(delegate.stop());
        pass.execute(&state, &index, &[]).unwrap();
        assert!(pass.is_converged());
    }

    #[test]
    fn test_pause_holds_progress() {
        let delegate = SoftwareDelegate::new(true);
        let index = RenderIndex::new(Box::new(SoftwareDelegate::new(true)));
        let state = state(Vec::new(), 2);
        let mut pass = SoftwareRenderPass::new(RprimCollection::geometry(), delegate.shared());
        pass.execute(&state, &index, &[]).unwrap();
        assert_eq!(pass.sample_count(), 1);
        assert!(delegate.pause());
        pass.execute(&state, &index, &[]).unwrap();
        assert_eq!(pass.sample_count(), 1);
        assert!(delegate.resume());
        pass.execute(&state, &index, &[]).unwrap();
        assert_eq!(pass.sample_count(), 2);
    }

    #[test]
    fn test_buffers_are_resampled_from_viewport() {
        let delegate = SoftwareDelegate::new(false);
        let index = RenderIndex::new(Box::new(SoftwareDelegate::new(false)));
        let depth = bound_buffer(&delegate, tokens::AOV_DEPTH, Format::Float32, 4);
        let buffer = depth.render_buffer.clone().unwrap();
        let state = state(vec![depth], 2);
        let mut pass = delegate.create_render_pass(&RprimCollection::geometry());
        pass.execute(&state, &index, &[]).unwrap();
        assert!(pass.is_converged());
        assert_eq!(read_f32(buffer.as_ref()), vec![1.0; 16]);
    }
}
