//! Render buffer interface

use crate::core::ScenePath;
use crate::render::api::{Format, RenderBufferDescriptor};
use crate::render::RenderResult;
use std::fmt;
use std::ops::Deref;

/// Exclusive read view of a render buffer's pixel memory
///
/// The buffer stays mapped for as long as this value lives; dropping it
/// unmaps. While mapped no other caller can map or write the same buffer.
pub struct MappedBuffer<'a> {
    guard: Box<dyn Deref<Target = [u8]> + 'a>,
}

impl<'a> MappedBuffer<'a> {
    /// Wrap a backend guard
    pub fn new(guard: impl Deref<Target = [u8]> + 'a) -> Self {
        Self { guard: Box::new(guard) }
    }
}

impl Deref for MappedBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &**self.guard
    }
}

impl fmt::Debug for MappedBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedBuffer").field("len", &self.len()).finish()
    }
}

/// Backend-owned pixel storage for one output channel
pub trait RenderBuffer: Send + Sync + fmt::Debug {
    /// Path of the buffer in the scene index
    fn id(&self) -> &ScenePath;

    /// (Re)allocate storage for the descriptor, clearing its contents
    fn allocate(&self, descriptor: &RenderBufferDescriptor) -> RenderResult<()>;

    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Pixel format
    fn format(&self) -> Format;

    /// Whether the storage is multi-sampled
    fn is_multi_sampled(&self) -> bool {
        false
    }

    /// Map the pixel memory for reading
    fn map(&self) -> MappedBuffer<'_>;

    /// Size of the mapped data in bytes
    fn byte_size(&self) -> usize {
        self.width() as usize * self.height() as usize * self.format().bytes_per_pixel()
    }

    /// Downcast to concrete buffer type for backend-side writes
    fn as_any(&self) -> &dyn std::any::Any;
}
