/// Device traits consumed and fed by the constant buffer cache

use std::sync::Arc;
use crate::device::{ConstantBuffer, ConstantBufferDesc, ShaderSlot, ShaderStage};
use crate::error::Result;

/// Buffer allocator and capability source
///
/// The cache only ever asks the device to create buffers and to report its
/// register limits; all GPU memory management stays on the device side.
pub trait ConstantBufferDevice: Send + Sync {
    /// Create a constant buffer
    ///
    /// # Arguments
    ///
    /// * `desc` - Constant buffer descriptor
    ///
    /// # Returns
    ///
    /// A shared pointer to the created buffer, or `Error::OutOfMemory` /
    /// `Error::BackendError` on failure
    fn create_constant_buffer(&mut self, desc: ConstantBufferDesc) -> Result<Arc<dyn ConstantBuffer>>;

    /// Maximum number of constant registers a buffer may hold in `stage`
    fn constant_register_count_max(&self, stage: ShaderStage) -> u32;
}

/// Draw-pipeline state that accepts constant buffer bindings
pub trait BindingTarget {
    /// Bind `buffer` (or nothing) to `slot` of `stage`
    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        buffer: Option<&Arc<dyn ConstantBuffer>>,
        slot: ShaderSlot,
    );
}
