/// ConstantBuffer trait and constant buffer descriptor

use std::sync::Arc;
use bitflags::bitflags;
use crate::error::Result;
use crate::rhi_bail;

/// How the CPU writes the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstantBufferUsage {
    /// Mapped with write-discard every time it is written
    #[default]
    Dynamic,
    /// Written through a staging copy uploaded when the write ends
    Static,
}

bitflags! {
    /// Creation flags for constant buffers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConstantBufferFlags: u8 {
        /// Never stream this buffer through a ring allocator
        const DENY_STREAMING = 0x01;
    }
}

impl ConstantBufferFlags {
    pub const NONE: Self = Self::empty();
}

/// Descriptor for creating a constant buffer
#[derive(Debug, Clone)]
pub struct ConstantBufferDesc {
    /// Name shown in device debug tools
    pub debug_name: String,
    /// Size in bytes (a multiple of 16)
    pub size: u64,
    /// Buffer usage
    pub usage: ConstantBufferUsage,
    /// Creation flags
    pub flags: ConstantBufferFlags,
}

/// Constant buffer resource trait
///
/// Implemented by device-specific buffer types. The buffer is released when
/// the last `Arc` is dropped.
///
/// Writes follow a begin/end protocol: `begin_write` exposes `size()` bytes of
/// writable memory that stay valid until the matching `end_write`.
pub trait ConstantBuffer: Send + Sync {
    /// Name given at creation
    fn debug_name(&self) -> &str;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage given at creation
    fn usage(&self) -> ConstantBufferUsage;

    /// Map the buffer for writing
    ///
    /// Returns None if the device could not map it. The pointer is aligned
    /// for `f32` and valid for `size()` bytes of initialized (but otherwise
    /// unspecified) memory until `end_write`.
    fn begin_write(&self) -> Option<*mut u8>;

    /// Finish the write started by `begin_write`
    fn end_write(&self);
}

/// Whether two handles refer to the same buffer object
pub fn same_buffer(a: &Arc<dyn ConstantBuffer>, b: &Arc<dyn ConstantBuffer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Overwrite the start of a buffer with `src`
///
/// Copies `min(size, src.len())` bytes inside a single begin/end write.
pub fn update_buffer(buffer: &dyn ConstantBuffer, src: &[u8]) -> Result<()> {
    let Some(dst) = buffer.begin_write() else {
        rhi_bail!("cbcache::ConstantBuffer",
            "Failed to map constant buffer '{}' for update", buffer.debug_name());
    };
    let len = (buffer.size() as usize).min(src.len());
    // SAFETY: begin_write returned a region of size() bytes, valid until end_write.
    unsafe {
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst, len);
    }
    buffer.end_write();
    Ok(())
}
