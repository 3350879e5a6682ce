use crate::core::ScenePath;
use crate::render::api::{Format, MappedBuffer, RenderBuffer, RenderBufferDescriptor};
use crate::render::{RenderError, RenderResult};
use std::any::Any;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Storage {
    width: u32,
    height: u32,
    format: Format,
    multi_sampled: bool,
    data: Vec<u8>,
}

struct StorageGuard<'a>(MutexGuard<'a, Storage>);

impl Deref for StorageGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0.data
    }
}

/// Host memory render buffer
///
/// Pixels are stored row by row starting at the top of the image, each
/// pixel packed according to the buffer's format.
#[derive(Debug)]
pub struct SoftwareRenderBuffer {
    id: ScenePath,
    storage: Mutex<Storage>,
}

impl SoftwareRenderBuffer {
    /// Create an unallocated buffer
    pub fn new(id: ScenePath) -> Self {
        Self {
            id,
            storage: Mutex::new(Storage::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite every pixel from RGBA samples laid out like the buffer
    ///
    /// Components beyond the format's count are dropped; integer formats
    /// take the first component.
    pub fn write_pixels(&self, pixels: &[[f32; 4]]) {
        let mut storage = self.lock();
        let expected = storage.width as usize * storage.height as usize;
        if pixels.len() != expected {
            log::warn!(
                "Render buffer {}: got {} pixels for a {}x{} buffer",
                self.id,
                pixels.len(),
                storage.width,
                storage.height
            );
            return;
        }
        let format = storage.format;
        if !format.is_valid() {
            return;
        }
        let bytes_per_pixel = format.bytes_per_pixel();
        for (dst, pixel) in storage.data.chunks_exact_mut(bytes_per_pixel).zip(pixels) {
            encode_pixel(format, pixel, dst);
        }
    }
}

fn encode_pixel(format: Format, pixel: &[f32; 4], dst: &mut [u8]) {
    match format {
        Format::Invalid => {}
        Format::UNorm8 | Format::UNorm8Vec4 => {
            for (byte, value) in dst.iter_mut().zip(pixel) {
                *byte = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
        Format::Int32 => dst.copy_from_slice(bytemuck::bytes_of(&(pixel[0].round() as i32))),
        Format::Float32 | Format::Float32Vec2 | Format::Float32Vec3 | Format::Float32Vec4 => {
            let components = format.component_count();
            dst.copy_from_slice(bytemuck::cast_slice(&pixel[..components]));
        }
    }
}

impl RenderBuffer for SoftwareRenderBuffer {
    fn id(&self) -> &ScenePath {
        &self.id
    }

    fn allocate(&self, descriptor: &RenderBufferDescriptor) -> RenderResult<()> {
        if !descriptor.format.is_valid() {
            return Err(RenderError::BufferAllocationFailed {
                path: self.id.clone(),
                reason: "invalid pixel format".to_string(),
            });
        }
        if descriptor.dimensions[2] > 1 {
            return Err(RenderError::BufferAllocationFailed {
                path: self.id.clone(),
                reason: format!("volume buffers are not supported (depth {})", descriptor.dimensions[2]),
            });
        }
        let mut storage = self.lock();
        *storage = Storage {
            width: descriptor.dimensions[0],
            height: descriptor.dimensions[1],
            format: descriptor.format,
            multi_sampled: descriptor.multi_sampled,
            data: vec![0; descriptor.byte_size()],
        };
        Ok(())
    }

    fn width(&self) -> u32 {
        self.lock().width
    }

    fn height(&self) -> u32 {
        self.lock().height
    }

    fn format(&self) -> Format {
        self.lock().format
    }

    fn is_multi_sampled(&self) -> bool {
        self.lock().multi_sampled
    }

    fn map(&self) -> MappedBuffer<'_> {
        MappedBuffer::new(StorageGuard(self.lock()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
