//! Pixel formats and buffer descriptors

use crate::render::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pixel format of a render buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    /// Unsupported or unknown format
    #[default]
    Invalid,
    /// One normalized byte
    UNorm8,
    /// Four normalized bytes (RGBA8)
    UNorm8Vec4,
    /// One 32-bit float
    Float32,
    /// Two 32-bit floats
    Float32Vec2,
    /// Three 32-bit floats
    Float32Vec3,
    /// Four 32-bit floats
    Float32Vec4,
    /// One 32-bit signed integer
    Int32,
}

impl Format {
    /// Number of components per pixel
    pub const fn component_count(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::UNorm8 | Self::Float32 | Self::Int32 => 1,
            Self::Float32Vec2 => 2,
            Self::Float32Vec3 => 3,
            Self::UNorm8Vec4 | Self::Float32Vec4 => 4,
        }
    }

    /// Size of a single pixel in bytes
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::UNorm8 => 1,
            Self::UNorm8Vec4 | Self::Float32 | Self::Int32 => 4,
            Self::Float32Vec2 => 8,
            Self::Float32Vec3 => 12,
            Self::Float32Vec4 => 16,
        }
    }

    /// Whether this is a usable format
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Backend default description of an output channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AovDescriptor {
    /// Pixel format; `Format::Invalid` when the channel is unsupported
    pub format: Format,
    /// Whether the buffer is multi-sampled
    pub multi_sampled: bool,
    /// Value the buffer is cleared to
    pub clear_value: Value,
    /// Backend-specific settings
    pub aov_settings: BTreeMap<String, Value>,
}

impl AovDescriptor {
    /// Descriptor for an unsupported channel
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Allocation request for a render buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderBufferDescriptor {
    /// Width, height, depth
    pub dimensions: [u32; 3],
    /// Pixel format
    pub format: Format,
    /// Whether the buffer is multi-sampled
    pub multi_sampled: bool,
}

impl RenderBufferDescriptor {
    /// Size of the described buffer in bytes
    pub const fn byte_size(&self) -> usize {
        self.dimensions[0] as usize
            * self.dimensions[1] as usize
            * self.dimensions[2] as usize
            * self.format.bytes_per_pixel()
    }
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge
    pub x: f64,
    /// Bottom edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Viewport {
    /// Create a viewport
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport anchored at the origin
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, f64::from(width), f64::from(height))
    }

    /// Width over height, 1.0 for degenerate viewports
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Integer pixel dimensions
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width.max(0.0).round() as u32, self.height.max(0.0).round() as u32)
    }

    /// Whether the viewport covers no pixels
    pub fn is_empty(&self) -> bool {
        let (width, height) = self.pixel_size();
        width == 0 || height == 0
    }
}
