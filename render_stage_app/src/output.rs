//! Writing output channels to PNG files

use imaging_lite::foundation::math::utils::linear_to_srgb;
use imaging_lite::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while saving output channels
#[derive(Error, Debug)]
pub enum OutputError {
    /// Reading the channel back from the engine failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Encoding or writing the image failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Creating the output directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No image conversion for this pixel format
    #[error("Output '{aov}' has format {format:?}, which cannot be saved")]
    UnsupportedFormat {
        /// Output channel
        aov: String,
        /// Pixel format
        format: Format,
    },

    /// The pixel data does not match the image size
    #[error("Output '{0}' does not match the image size")]
    SizeMismatch(String),
}

/// Read `aov` back from `engine` and save it as `<dir>/<aov>.png`
pub fn save_aov(
    engine: &Engine,
    aov: &str,
    (width, height): (u32, u32),
    color_correction: ColorCorrection,
    dir: &Path,
) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{aov}.png"));
    let pixels = width as usize * height as usize;

    let format = engine.renderer_aov_format(aov)?;
    match format {
        Format::Float32Vec4 | Format::Float32Vec3 => {
            let components = format.component_count();
            let mut values = vec![0.0_f32; pixels * components];
            engine.get_renderer_aov(aov, bytemuck::cast_slice_mut(&mut values))?;
            let bytes = if aov == tokens::AOV_COLOR {
                color_to_rgba(&values, components, color_correction)
            } else {
                vectors_to_rgba(&values, components)
            };
            save_rgba(aov, width, height, bytes, &path)?;
        }
        Format::Float32 => {
            let mut values = vec![0.0_f32; pixels];
            engine.get_renderer_aov(aov, bytemuck::cast_slice_mut(&mut values))?;
            let bytes = values.iter().map(|v| unorm(1.0 - v)).collect();
            let image = image::GrayImage::from_raw(width, height, bytes)
                .ok_or_else(|| OutputError::SizeMismatch(aov.to_string()))?;
            image.save(&path)?;
        }
        Format::Int32 => {
            let mut ids = vec![0_i32; pixels];
            engine.get_renderer_aov(aov, bytemuck::cast_slice_mut(&mut ids))?;
            let bytes = ids.iter().flat_map(|id| id_color(*id)).collect();
            save_rgba(aov, width, height, bytes, &path)?;
        }
        _ => {
            return Err(OutputError::UnsupportedFormat { aov: aov.to_string(), format });
        }
    }

    log::info!("Wrote {}", path.display());
    Ok(path)
}

fn save_rgba(aov: &str, width: u32, height: u32, bytes: Vec<u8>, path: &Path) -> Result<(), OutputError> {
    let image = image::RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| OutputError::SizeMismatch(aov.to_string()))?;
    image.save(path)?;
    Ok(())
}

fn unorm(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn color_to_rgba(values: &[f32], components: usize, color_correction: ColorCorrection) -> Vec<u8> {
    values
        .chunks_exact(components)
        .flat_map(|pixel| {
            let encode = |v: f32| match color_correction {
                ColorCorrection::SRgb => unorm(linear_to_srgb(v)),
                ColorCorrection::Disabled => unorm(v),
            };
            let alpha = pixel.get(3).copied().unwrap_or(1.0);
            [encode(pixel[0]), encode(pixel[1]), encode(pixel[2]), unorm(alpha)]
        })
        .collect()
}

/// Unit vectors mapped from [-1, 1] to [0, 255]
fn vectors_to_rgba(values: &[f32], components: usize) -> Vec<u8> {
    values
        .chunks_exact(components)
        .flat_map(|v| {
            let encode = |c: f32| unorm(c.mul_add(0.5, 0.5));
            [encode(v[0]), encode(v[1]), encode(v[2]), 255]
        })
        .collect()
}

/// Stable false color per prim id; background is transparent black
fn id_color(id: i32) -> [u8; 4] {
    if id < 0 {
        return [0, 0, 0, 0];
    }
    let hash = (id as u32).wrapping_add(1).wrapping_mul(2_654_435_761);
    let [r, g, b, _] = hash.to_le_bytes();
    [r, g, b, 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion_applies_srgb_to_rgb_only() {
        let bytes = color_to_rgba(&[0.5, 0.0, 1.0, 0.5], 4, ColorCorrection::SRgb);
        assert_eq!(bytes, vec![188, 0, 255, 128]);
        let bytes = color_to_rgba(&[0.5, 0.0, 1.0], 3, ColorCorrection::Disabled);
        assert_eq!(bytes, vec![128, 0, 255, 255]);
    }

    #[test]
    fn test_normals_map_to_mid_gray_at_zero() {
        assert_eq!(vectors_to_rgba(&[0.0, 1.0, -1.0], 3), vec![128, 255, 0, 255]);
    }

    #[test]
    fn test_background_id_is_transparent() {
        assert_eq!(id_color(-1), [0, 0, 0, 0]);
        assert_eq!(id_color(3)[3], 255);
        assert_ne!(id_color(0), id_color(1));
    }
}
