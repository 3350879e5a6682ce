//! Progressive convergence as seen through the facade
//!
//! One `render` call runs one cycle and the host polls `is_converged`. The
//! progressive software backend adds one sample per cycle until the sample
//! budget from the render parameters is reached.

use super::support::*;
use crate::core::tokens;
use crate::engine::Engine;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::Viewport;
use crate::render::backends::software::SAMPLES;
use crate::render::value::Value;
use crate::scene::Stage;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    fn render_cycles(engine: &mut Engine, stage: &Arc<Stage>, samples: u32, cycles: u32) {
        let params = params_with_samples(samples);
        for _ in 0..cycles {
            engine.render(stage, &path("/"), &params).unwrap();
        }
    }

    #[test]
    fn test_single_sample_converges_within_a_few_polls() {
        const MAX_POLLS: u32 = 8;
        let stage = empty_stage();
        let mut engine = Engine::new(registry());
        engine.select_backend(PROGRESSIVE).unwrap();
        engine.set_render_viewport(Viewport::from_size(4, 4)).unwrap();
        engine.set_camera_state(Mat4::identity(), Mat4::identity()).unwrap();
        engine.set_renderer_aov(tokens::AOV_COLOR).unwrap();

        let params = params_with_samples(1);
        let mut polls = 0;
        loop {
            engine.render(&stage, &path("/"), &params).unwrap();
            polls += 1;
            if engine.is_converged().unwrap() || polls == MAX_POLLS {
                break;
            }
        }
        assert!(engine.is_converged().unwrap());
        assert!(polls < MAX_POLLS);
    }

    #[test]
    fn test_progressive_render_stops_at_sample_budget() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR]);

        for cycle in 1..=3 {
            render_cycles(&mut engine, &stage, 4, 1);
            assert!(!engine.is_converged().unwrap());
            assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(cycle)));
        }
        render_cycles(&mut engine, &stage, 4, 1);
        assert!(engine.is_converged().unwrap());
        assert_eq!(stat(&engine, tokens::PERCENT_DONE), Some(Value::Float(100.0)));

        // Further cycles add nothing
        render_cycles(&mut engine, &stage, 4, 2);
        assert!(engine.is_converged().unwrap());
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(4)));
    }

    #[test]
    fn test_percent_done_tracks_samples() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[]);
        render_cycles(&mut engine, &stage, 4, 2);
        assert_eq!(stat(&engine, tokens::PERCENT_DONE), Some(Value::Float(50.0)));
        assert_eq!(stat(&engine, tokens::MAX_SAMPLES), Some(Value::Int(4)));
    }

    #[test]
    fn test_preview_converges_after_one_cycle() {
        let stage = ball_stage();
        let mut engine = configured_engine(PREVIEW, 4, &[tokens::AOV_COLOR]);
        render_cycles(&mut engine, &stage, 64, 1);
        assert!(engine.is_converged().unwrap());
    }

    #[test]
    fn test_stop_reports_converged_and_restart_resumes() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR]);
        render_cycles(&mut engine, &stage, 64, 1);
        assert!(!engine.is_converged().unwrap());

        assert!(engine.stop_renderer());
        assert!(engine.is_converged().unwrap());
        render_cycles(&mut engine, &stage, 64, 1);
        assert!(engine.is_converged().unwrap());

        assert!(engine.restart_renderer());
        render_cycles(&mut engine, &stage, 64, 1);
        assert!(!engine.is_converged().unwrap());
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(1)));
    }

    #[test]
    fn test_pause_holds_progress() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR]);
        render_cycles(&mut engine, &stage, 8, 2);

        assert!(engine.pause_renderer());
        render_cycles(&mut engine, &stage, 8, 3);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(2)));
        assert!(!engine.is_converged().unwrap());

        assert!(engine.resume_renderer());
        render_cycles(&mut engine, &stage, 8, 1);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(3)));
    }

    #[test]
    fn test_camera_change_restarts_accumulation() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR]);
        render_cycles(&mut engine, &stage, 8, 3);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(3)));

        // Re-sending the same camera keeps accumulating
        let (view, projection) = front_camera();
        engine.set_camera_state(view, projection).unwrap();
        render_cycles(&mut engine, &stage, 8, 1);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(4)));

        let moved = view * Mat4::new_translation(&Vec3::new(0.5, 0.0, 0.0));
        engine.set_camera_state(moved, projection).unwrap();
        render_cycles(&mut engine, &stage, 8, 1);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(1)));
    }

    #[test]
    fn test_root_transform_change_restarts_accumulation() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR]);
        render_cycles(&mut engine, &stage, 8, 2);

        engine
            .set_root_transform(Mat4::new_translation(&Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();
        render_cycles(&mut engine, &stage, 8, 1);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(1)));
    }

    #[test]
    fn test_sample_budget_change_restarts_accumulation() {
        let stage = ball_stage();
        let mut engine = configured_engine(PROGRESSIVE, 4, &[tokens::AOV_COLOR]);
        render_cycles(&mut engine, &stage, 8, 2);
        render_cycles(&mut engine, &stage, 16, 1);
        assert_eq!(stat(&engine, SAMPLES), Some(Value::Int(1)));
        assert_eq!(engine.renderer_setting(tokens::MAX_SAMPLES).unwrap(), Some(Value::Int(16)));
    }
}
