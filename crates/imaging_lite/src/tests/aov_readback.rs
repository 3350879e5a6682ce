//! Output channel registration and readback

use super::support::*;
use crate::core::tokens;
use crate::engine::EngineError;
use crate::render::api::{Format, Viewport};
use crate::render_once::render_to_buffers;
use crate::render_params::{ColorCorrection, RenderParams};
use approx::assert_relative_eq;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_outputs_cannot_be_read() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR, tokens::AOV_DEPTH]);
        assert_eq!(engine.render_buffer_count(), 2);
        engine.render(&stage, &path("/"), &params_with_samples(1)).unwrap();
        assert_eq!(engine.renderer_aov_format(tokens::AOV_DEPTH).unwrap(), Format::Float32);

        engine.clear_renderer_aovs().unwrap();
        assert!(engine.render_task_params().unwrap().aov_bindings.is_empty());
        assert_eq!(engine.render_buffer_count(), 0);

        let mut destination = vec![0_u8; 4 * 4 * 16];
        let result = engine.get_renderer_aov(tokens::AOV_COLOR, &mut destination);
        assert!(matches!(result, Err(EngineError::AovNotBound(ref name)) if name == tokens::AOV_COLOR));
        assert!(matches!(engine.renderer_aov_format(tokens::AOV_DEPTH), Err(EngineError::AovNotBound(_))));
    }

    #[test]
    fn test_color_readback_copies_exactly_the_image() {
        const SENTINEL: u8 = 0xAB;
        let stage = ball_stage();
        let mut engine = configured_engine(PREVIEW, 100, &[tokens::AOV_COLOR]);
        engine.render(&stage, &path("/"), &RenderParams::default()).unwrap();
        assert!(engine.is_converged().unwrap());

        let image_size = 100 * 100 * 16;
        let mut destination = vec![SENTINEL; image_size + 64];
        let written = engine.get_renderer_aov(tokens::AOV_COLOR, &mut destination).unwrap();
        assert_eq!(written, image_size);
        assert!(destination[image_size..].iter().all(|byte| *byte == SENTINEL));

        // Top-left corner misses the ball and shows the clear color
        let corner = floats(&destination[..16]);
        assert_eq!(corner, vec![0.0, 0.0, 0.0, 1.0]);
        let center = (50 * 100 + 50) * 16;
        let center = floats(&destination[center..center + 16]);
        assert_relative_eq!(center[3], 1.0);
    }

    #[test]
    fn test_small_destination_is_rejected() {
        let stage = ball_stage();
        let mut engine = configured_engine(PREVIEW, 4, &[tokens::AOV_COLOR]);
        engine.render(&stage, &path("/"), &RenderParams::default()).unwrap();

        let mut destination = vec![0_u8; 4 * 4 * 16 - 1];
        let result = engine.get_renderer_aov(tokens::AOV_COLOR, &mut destination);
        assert!(matches!(result, Err(EngineError::DestinationTooSmall { needed: 256, available: 255 })));
    }

    #[test]
    fn test_depth_and_prim_id_separate_hits_from_background() {
        let stage = ball_stage();
        let mut engine = configured_engine(PREVIEW, 9, &[tokens::AOV_DEPTH, tokens::AOV_PRIM_ID]);
        engine.render(&stage, &path("/"), &RenderParams::default()).unwrap();

        let mut depth = vec![0_u8; 9 * 9 * 4];
        let mut ids = vec![0_u8; 9 * 9 * 4];
        assert_eq!(engine.get_renderer_aov(tokens::AOV_DEPTH, &mut depth).unwrap(), 9 * 9 * 4);
        assert_eq!(engine.get_renderer_aov(tokens::AOV_PRIM_ID, &mut ids).unwrap(), 9 * 9 * 4);
        let (depth, ids) = (floats(&depth), ints(&ids));

        let center = 4 * 9 + 4;
        assert!(depth[center] > 0.0 && depth[center] < 1.0);
        assert_eq!(ids[center], 0);
        assert_relative_eq!(depth[0], 1.0);
        assert_eq!(ids[0], -1);
    }

    #[test]
    fn test_resized_viewport_resizes_outputs() {
        let stage = ball_stage();
        let mut engine = configured_engine(PREVIEW, 4, &[tokens::AOV_COLOR]);
        engine.render(&stage, &path("/"), &RenderParams::default()).unwrap();

        engine.set_render_viewport(Viewport::from_size(8, 6)).unwrap();
        engine.render(&stage, &path("/"), &RenderParams::default()).unwrap();
        let mut destination = vec![0_u8; 8 * 8 * 16];
        let written = engine.get_renderer_aov(tokens::AOV_COLOR, &mut destination).unwrap();
        assert_eq!(written, 8 * 6 * 16);
    }

    #[test]
    fn test_backend_without_buffers_rejects_outputs() {
        let stage = ball_stage();
        let mut engine = configured_engine(BUFFERLESS, 4, &[]);
        let result = engine.set_renderer_aov(tokens::AOV_COLOR);
        assert!(matches!(result, Err(EngineError::RenderBuffersUnsupported(ref id)) if id == BUFFERLESS));
        assert_eq!(engine.render_buffer_count(), 0);

        // Rendering without outputs is still a valid cycle
        engine.render(&stage, &path("/"), &RenderParams::default()).unwrap();
        assert!(engine.is_converged().unwrap());
        let mut destination = vec![0_u8; 16];
        assert!(matches!(
            engine.get_renderer_aov(tokens::AOV_COLOR, &mut destination),
            Err(EngineError::AovNotBound(_))
        ));
    }

    #[test]
    fn test_render_to_buffers_fills_requested_outputs() {
        let stage = ball_stage();
        let (view_matrix, proj_matrix) = front_camera();
        let params = RenderParams {
            plugin_id: PREVIEW.to_string(),
            render_resolution: (4, 4),
            view_matrix,
            proj_matrix,
            color_correction_mode: ColorCorrection::SRgb,
            aovs: vec![tokens::AOV_COLOR.to_string(), tokens::AOV_DEPTH.to_string(), "albedo".to_string()],
            ..RenderParams::default()
        };

        let mut color = vec![0_u8; 4 * 4 * 16];
        let mut depth = vec![0_u8; 4 * 4 * 4];
        let mut albedo = vec![0_u8; 4 * 4 * 16];
        let mut outputs = [Some(color.as_mut_slice()), Some(depth.as_mut_slice()), Some(albedo.as_mut_slice())];
        let summary = render_to_buffers(registry(), &stage, &path("/"), &params, &mut outputs, 8).unwrap();

        assert_eq!(summary.cycles, 1);
        assert!(summary.converged);
        assert_eq!(summary.bytes_written, vec![4 * 4 * 16, 4 * 4 * 4, 0]);
        assert!(albedo.iter().all(|byte| *byte == 0));
        // Background stays black through the sRGB curve, alpha stays linear
        assert_eq!(floats(&color[..16]), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_render_to_buffers_skips_missing_destinations() {
        let params = RenderParams {
            plugin_id: PREVIEW.to_string(),
            render_resolution: (2, 2),
            aovs: vec![tokens::AOV_COLOR.to_string(), tokens::AOV_DEPTH.to_string()],
            ..RenderParams::default()
        };
        let mut depth = vec![0_u8; 2 * 2 * 4];
        let mut outputs = [None, Some(depth.as_mut_slice())];
        let summary = render_to_buffers(registry(), &empty_stage(), &path("/"), &params, &mut outputs, 4).unwrap();
        assert_eq!(summary.bytes_written, vec![0, 2 * 2 * 4]);
        assert!(floats(&depth).iter().all(|value| (*value - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_unknown_backend_fails_one_shot_render() {
        let params = RenderParams { plugin_id: "Missing".to_string(), ..RenderParams::default() };
        let result = render_to_buffers(registry(), &empty_stage(), &path("/"), &params, &mut [], 1);
        assert!(matches!(result, Err(EngineError::UnknownBackend(_))));
    }
}
