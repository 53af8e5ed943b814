/// Size-keyed pool of constant buffers, one map per (stage, slot)
///
/// A buffer created for N registers in a cell is reused for every later
/// request of exactly N registers in that cell. Buffers are never resized or
/// evicted; `release_all` drops every pool handle at once.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::cache::CacheConfig;
use crate::device::{
    ConstantBuffer, ConstantBufferDesc, ConstantBufferDevice, ConstantBufferUsage, Register, SlotKey,
};
use crate::error::Result;
use crate::utils::SlotGrid;
use crate::{rhi_debug, rhi_fail};

const SOURCE: &str = "cbcache::BufferPool";

pub struct BufferPool {
    /// Sparse per cell: only sizes actually requested get an entry
    buffers: SlotGrid<FxHashMap<u32, Arc<dyn ConstantBuffer>>>,
    pooled_bytes: u64,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            buffers: SlotGrid::new(),
            pooled_bytes: 0,
        }
    }

    /// Pooled buffer of exactly `register_count` registers, if one was created
    pub fn get(&self, key: SlotKey, register_count: u32) -> Option<&Arc<dyn ConstantBuffer>> {
        self.buffers[key].get(&register_count)
    }

    /// Pooled buffer of `register_count` registers, created on first request
    ///
    /// On failure nothing is stored, so a later request retries the creation.
    pub fn get_or_create(
        &mut self,
        device: &mut dyn ConstantBufferDevice,
        key: SlotKey,
        register_count: u32,
        config: &CacheConfig,
    ) -> Result<Arc<dyn ConstantBuffer>> {
        if let Some(buffer) = self.buffers[key].get(&register_count) {
            return Ok(buffer.clone());
        }

        let size = Register::bytes_for(register_count);
        let buffer = device
            .create_constant_buffer(ConstantBufferDesc {
                debug_name: config.buffer_name(key, register_count),
                size,
                usage: ConstantBufferUsage::Dynamic,
                flags: config.buffer_flags,
            })
            .map_err(|e| rhi_fail!(SOURCE, AllocationFailed,
                "Failed to create constant buffer for {} ({} registers, {} bytes): {}",
                key, register_count, size, e))?;

        rhi_debug!(SOURCE, "Pooled '{}' ({} bytes)", buffer.debug_name(), size);

        self.buffers[key].insert(register_count, buffer.clone());
        self.pooled_bytes += size;
        Ok(buffer)
    }

    /// Number of pooled buffers across all cells
    pub fn len(&self) -> usize {
        self.buffers.iter().map(|(_, sizes)| sizes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct sizes pooled for one cell
    pub fn slot_len(&self, key: SlotKey) -> usize {
        self.buffers[key].len()
    }

    /// Total size of pooled buffers in bytes
    pub fn pooled_bytes(&self) -> u64 {
        self.pooled_bytes
    }

    /// Drop every pooled handle; returns how many were held
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for (_, sizes) in self.buffers.iter_mut() {
            released += sizes.len();
            sizes.clear();
        }
        self.pooled_bytes = 0;
        released
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "buffer_pool_tests.rs"]
mod tests;
