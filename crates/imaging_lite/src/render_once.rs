//! One-shot rendering into caller-owned memory

use crate::core::{tokens, ScenePath};
use crate::engine::{Engine, EngineResult};
use crate::foundation::math::utils::linear_to_srgb;
use crate::render::api::{Format, Viewport};
use crate::render::plugin_registry::PluginRegistry;
use crate::render_params::{ColorCorrection, RenderParams};
use crate::scene::Stage;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of [`render_to_buffers`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    /// Render cycles run
    pub cycles: u32,
    /// Whether the image converged within the cycle budget
    pub converged: bool,
    /// Bytes written to each destination, zero for skipped ones
    pub bytes_written: Vec<usize>,
}

/// Render `root` with a fresh engine and copy the requested outputs
///
/// `outputs[i]` receives `params.aovs[i]`; `None` entries are skipped.
/// Channels the backend rejects are skipped with a warning. The render runs
/// until convergence or `max_cycles` cycles, whichever comes first.
pub fn render_to_buffers(
    registry: Arc<PluginRegistry>,
    stage: &Arc<Stage>,
    root: &ScenePath,
    params: &RenderParams,
    outputs: &mut [Option<&mut [u8]>],
    max_cycles: u32,
) -> EngineResult<RenderSummary> {
    let mut engine = Engine::new(registry);
    engine.select_backend(&params.plugin_id)?;

    let (width, height) = params.render_resolution;
    engine.set_render_viewport(Viewport::from_size(width, height))?;
    engine.set_camera_state(params.view_matrix, params.proj_matrix)?;

    let mut enabled = BTreeSet::new();
    for aov in &params.aovs {
        match engine.set_renderer_aov(aov) {
            Ok(()) => {
                enabled.insert(aov.as_str());
            }
            Err(err) => log::warn!("Skipping output '{aov}': {err}"),
        }
    }

    log::info!("Rendering {root} at {width}x{height}...");
    let mut cycles = 0;
    let mut converged = false;
    while cycles < max_cycles {
        engine.render(stage, root, params)?;
        cycles += 1;
        if engine.is_converged()? {
            converged = true;
            break;
        }
    }
    if converged {
        log::info!("Rendering finished after {cycles} cycles");
    } else {
        log::warn!("Rendering stopped unconverged after {cycles} cycles");
    }

    let mut bytes_written = vec![0; outputs.len()];
    for (i, output) in outputs.iter_mut().enumerate() {
        let Some(destination) = output.as_deref_mut() else {
            continue;
        };
        let Some(aov) = params.aovs.get(i) else {
            log::warn!("Destination {i} has no matching output channel");
            continue;
        };
        if !enabled.contains(aov.as_str()) {
            continue;
        }
        let written = engine.get_renderer_aov(aov, destination)?;
        if aov == tokens::AOV_COLOR && params.color_correction_mode == ColorCorrection::SRgb {
            apply_srgb(&mut destination[..written], engine.renderer_aov_format(aov)?);
        }
        bytes_written[i] = written;
    }
    Ok(RenderSummary { cycles, converged, bytes_written })
}

/// Convert the color components of float pixels to sRGB in place; alpha
/// stays linear
fn apply_srgb(bytes: &mut [u8], format: Format) {
    let color_components = match format {
        Format::Float32Vec3 | Format::Float32Vec4 => 3,
        _ => {
            log::warn!("No sRGB conversion for {format:?} color output");
            return;
        }
    };
    let pixel_size = format.bytes_per_pixel();
    for pixel in bytes.chunks_exact_mut(pixel_size) {
        for component in pixel.chunks_exact_mut(4).take(color_components) {
            let mut raw = [0; 4];
            raw.copy_from_slice(component);
            let value = linear_to_srgb(f32::from_ne_bytes(raw));
            component.copy_from_slice(&value.to_ne_bytes());
        }
    }
}
