/// Per-stage, per-slot constant buffer cache
///
/// Writes go into buffers pooled by exact register count. Every written
/// (stage, slot) is remembered in a dirty list, and `commit_all` ends the
/// pending writes and issues one bind per dirty slot. Nothing is bound
/// before `commit_all`.
///
/// The cache is owned by the device context that creates it and is not
/// shared between threads; use one cache per recording context.

use std::sync::{Arc, Mutex};
use crate::cache::{BufferPool, CacheConfig, CacheEntry};
use crate::device::{
    copy_registers, BindingTarget, ConstantBuffer, ConstantBufferDevice, Register,
    ShaderSlot, ShaderStage, SlotKey, MAX_REGISTER_COUNT,
};
use crate::error::Result;
use crate::utils::SlotGrid;
use crate::{rhi_debug, rhi_err, rhi_fail, rhi_info, rhi_trace, rhi_warn};

const SOURCE: &str = "cbcache::ConstantBufferCache";

/// Counters collected by a cache since it was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Buffers created through the pool
    pub buffers_created: u64,
    /// Buffers currently held by the pool
    pub pooled_buffers: usize,
    /// Bytes currently held by the pool
    pub pooled_bytes: u64,
    /// Successful begin_write calls
    pub maps: u64,
    /// Bind commands issued by `commit_all`
    pub binds: u64,
    /// Writes ended by `commit_all`
    pub commits: u64,
    pub allocation_failures: u64,
    pub bounds_violations: u64,
}

pub struct ConstantBufferCache {
    device: Arc<Mutex<dyn ConstantBufferDevice>>,
    config: CacheConfig,
    /// Largest register count accepted per stage
    register_limits: [u32; ShaderStage::COUNT],
    entries: SlotGrid<CacheEntry>,
    pool: BufferPool,
    /// Slots to bind at the next commit, in first-write order
    dirty: Vec<SlotKey>,
    stats: CacheStats,
}

impl ConstantBufferCache {
    /// Create a cache with the default configuration
    pub fn new(device: Arc<Mutex<dyn ConstantBufferDevice>>) -> Result<Self> {
        Self::with_config(device, CacheConfig::default())
    }

    /// Create a cache, querying the register limit of every stage from `device`
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if the device reports no constant
    /// registers for a stage.
    pub fn with_config(device: Arc<Mutex<dyn ConstantBufferDevice>>, config: CacheConfig) -> Result<Self> {
        let mut register_limits = [0; ShaderStage::COUNT];
        {
            let device = device.lock()
                .map_err(|_| rhi_err!(SOURCE, "Device lock poisoned"))?;
            for stage in ShaderStage::ALL {
                let reported = device.constant_register_count_max(stage);
                if reported == 0 {
                    return Err(rhi_fail!(SOURCE, InitializationFailed,
                        "Device reports no constant registers for the {} stage", stage));
                }
                register_limits[stage.index()] = reported.min(MAX_REGISTER_COUNT);
            }
        }

        rhi_info!(SOURCE, "'{}' created (register limits {:?})", config.label, register_limits);

        Ok(Self {
            device,
            config,
            register_limits,
            entries: SlotGrid::new(),
            pool: BufferPool::new(),
            dirty: Vec::new(),
            stats: CacheStats::default(),
        })
    }

    /// Map (stage, slot) for writing `register_count_max` registers
    ///
    /// The pooled buffer of exactly that size is created on first use and
    /// the slot is queued for the next `commit_all`. Mapping a slot that is
    /// already mapped at the same size returns the same region. Mapping it at
    /// a different size ends the previous write first.
    ///
    /// In external mode the injected buffer is mapped instead and the slot is
    /// not queued.
    ///
    /// # Returns
    ///
    /// The mapped registers, or `Ok(None)` for a zero-register request.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` if the size exceeds the stage limit
    /// - `Error::AllocationFailed` if the buffer cannot be created; the slot
    ///   and the dirty list are left untouched
    /// - `Error::OutOfBounds` if an injected buffer is too small
    pub fn map_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: ShaderSlot,
        register_count_max: u32,
    ) -> Result<Option<&mut [Register]>> {
        let key = SlotKey::new(stage, slot);
        if register_count_max == 0 {
            rhi_warn!(SOURCE, "Zero-register map of {} ignored", key);
            return Ok(None);
        }
        self.check_register_count(key, register_count_max)?;

        let entry = &self.entries[key];
        let resize = entry.register_count_max() != register_count_max;
        let needs_map = !entry.is_mapped() || resize;

        // Resolve the pool buffer before touching the entry
        let pooled = if needs_map && !entry.is_external() {
            Some(self.pooled_buffer(key, register_count_max)?)
        } else {
            None
        };

        let entry = &mut self.entries[key];
        if resize {
            entry.try_commit();
        }

        if needs_map {
            let previous = match &pooled {
                Some(buffer) => entry.bound_buffer.replace(buffer.clone()),
                None => None,
            };
            if let Err(e) = entry.begin_write(register_count_max) {
                if pooled.is_some() {
                    entry.bound_buffer = previous;
                }
                return Err(e);
            }
            entry.register_count_max = register_count_max as u16;
            self.stats.maps += 1;

            if pooled.is_some() && !entry.dirty {
                entry.dirty = true;
                self.dirty.push(key);
            }

            if self.config.trace_writes {
                rhi_trace!(SOURCE, "Mapped {} ({} registers)", key, register_count_max);
            }
        }

        Ok(entry.mapped_registers())
    }

    /// Copy `data` into (stage, slot) at `register_offset`
    ///
    /// The slot is mapped at `register_count_max` registers. A write that
    /// does not fit (`register_offset + data.len() > register_count_max`)
    /// is rejected with `Error::OutOfBounds` before anything is mapped or
    /// written.
    pub fn write_constants(
        &mut self,
        stage: ShaderStage,
        slot: ShaderSlot,
        data: &[Register],
        register_offset: u32,
        register_count_max: u32,
    ) -> Result<()> {
        let end = register_offset as u64 + data.len() as u64;
        if end > register_count_max as u64 {
            self.stats.bounds_violations += 1;
            return Err(rhi_fail!(SOURCE, OutOfBounds,
                "Write of {} registers at offset {} overflows {} ({} registers)",
                data.len(), register_offset, SlotKey::new(stage, slot), register_count_max));
        }

        let trace = self.config.trace_writes;
        let Some(registers) = self.map_constant_buffer(stage, slot, register_count_max)? else {
            // Only an empty write at offset 0 reaches here
            return Ok(());
        };

        let start = register_offset as usize;
        copy_registers(&mut registers[start..start + data.len()], data);

        if trace {
            rhi_trace!(SOURCE, "Wrote {} registers at offset {} into {}",
                data.len(), register_offset, SlotKey::new(stage, slot));
        }
        Ok(())
    }

    /// Pooled buffer of exactly `register_count` registers for (stage, slot)
    ///
    /// Pure lookup: no creation, no mapping, no dirty tracking.
    pub fn get_buffer(
        &self,
        stage: ShaderStage,
        slot: ShaderSlot,
        register_count: u32,
    ) -> Option<&Arc<dyn ConstantBuffer>> {
        self.pool.get(SlotKey::new(stage, slot), register_count)
    }

    /// Current binding state of (stage, slot)
    pub fn entry(&self, stage: ShaderStage, slot: ShaderSlot) -> &CacheEntry {
        &self.entries[SlotKey::new(stage, slot)]
    }

    /// End every pending write of the dirty slots and bind them
    ///
    /// Slots are bound in the order they were first written, each exactly
    /// once, with the buffer they hold at commit time. The dirty list is
    /// empty afterwards.
    ///
    /// # Returns
    ///
    /// The number of bind commands issued.
    pub fn commit_all(&mut self, target: &mut dyn BindingTarget) -> u32 {
        let mut binds = 0;
        for key in self.dirty.drain(..) {
            let entry = &mut self.entries[key];
            if entry.try_commit() {
                self.stats.commits += 1;
            }
            entry.dirty = false;
            target.bind_constant_buffer(key.stage, entry.bound_buffer.as_ref(), key.slot);
            binds += 1;
        }
        self.stats.binds += binds as u64;

        if binds > 0 && self.config.trace_writes {
            rhi_trace!(SOURCE, "Committed {} constant buffer bindings", binds);
        }
        binds
    }

    /// Replace the pooled buffer of (stage, slot) with `buffer`
    ///
    /// A pending pool write on the slot is ended first. The injected buffer
    /// is what later maps and commits of the slot use until
    /// `end_external_constant_buffer`. The slot is not queued for binding.
    ///
    /// # Errors
    ///
    /// `Error::ProtocolViolation` if the slot is already in external mode or
    /// `register_count_max` is outside the stage limit; the slot is left
    /// unchanged.
    pub fn begin_external_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: ShaderSlot,
        buffer: Arc<dyn ConstantBuffer>,
        register_count_max: u32,
    ) -> Result<()> {
        let key = SlotKey::new(stage, slot);
        if self.entries[key].is_external() {
            return Err(rhi_fail!(SOURCE, ProtocolViolation,
                "{} is already using external buffer '{}'", key,
                self.entries[key].bound_buffer().map(|b| b.debug_name()).unwrap_or("<none>")));
        }
        if register_count_max == 0 {
            return Err(rhi_fail!(SOURCE, ProtocolViolation,
                "External buffer '{}' for {} declares zero registers", buffer.debug_name(), key));
        }
        self.check_register_count(key, register_count_max)?;

        rhi_debug!(SOURCE, "{} switched to external buffer '{}'", key, buffer.debug_name());

        let entry = &mut self.entries[key];
        entry.try_commit();
        entry.external_active = true;
        entry.bound_buffer = Some(buffer);
        entry.register_count_max = register_count_max as u16;
        Ok(())
    }

    /// Leave external mode on (stage, slot)
    ///
    /// Ends a pending write on the external buffer, then detaches the slot
    /// from every buffer. Does nothing (besides a warning) if the slot is not
    /// in external mode.
    pub fn end_external_constant_buffer(&mut self, stage: ShaderStage, slot: ShaderSlot) {
        let key = SlotKey::new(stage, slot);
        let entry = &mut self.entries[key];
        if !entry.is_external() {
            rhi_warn!(SOURCE, "{} is not using an external buffer", key);
            return;
        }

        entry.try_commit();
        entry.external_active = false;
        entry.bound_buffer = None;
        entry.register_count_max = 0;
        // Dirty-list membership is kept so the queued bind still happens

        rhi_debug!(SOURCE, "{} left external mode", key);
    }

    /// Release every pooled buffer and return every slot to its empty state
    ///
    /// Pending writes are ended first and the dirty list is cleared. Counters
    /// in `stats` are kept.
    pub fn reset(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.clear();
        }
        self.dirty.clear();
        let released = self.pool.release_all();

        if released > 0 {
            rhi_info!(SOURCE, "'{}' reset, released {} buffers", self.config.label, released);
        }
    }

    /// Counters and current pool occupancy
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            pooled_buffers: self.pool.len(),
            pooled_bytes: self.pool.pooled_bytes(),
            ..self.stats
        }
    }

    /// Largest register count accepted for `stage`
    pub fn register_count_limit(&self, stage: ShaderStage) -> u32 {
        self.register_limits[stage.index()]
    }

    /// Slots queued for the next commit, in bind order
    pub fn dirty_slots(&self) -> &[SlotKey] {
        &self.dirty
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<Mutex<dyn ConstantBufferDevice>> {
        &self.device
    }

    fn check_register_count(&self, key: SlotKey, register_count: u32) -> Result<()> {
        let limit = self.register_limits[key.stage.index()];
        if register_count > limit {
            return Err(rhi_fail!(SOURCE, ProtocolViolation,
                "{} registers requested for {}, the {} stage allows {}",
                register_count, key, key.stage, limit));
        }
        Ok(())
    }

    fn pooled_buffer(&mut self, key: SlotKey, register_count: u32) -> Result<Arc<dyn ConstantBuffer>> {
        if let Some(buffer) = self.pool.get(key, register_count) {
            return Ok(buffer.clone());
        }

        let mut device = self.device.lock()
            .map_err(|_| rhi_err!(SOURCE, "Device lock poisoned"))?;
        match self.pool.get_or_create(&mut *device, key, register_count, &self.config) {
            Ok(buffer) => {
                self.stats.buffers_created += 1;
                Ok(buffer)
            }
            Err(e) => {
                self.stats.allocation_failures += 1;
                Err(e)
            }
        }
    }
}

impl Drop for ConstantBufferCache {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
#[path = "constant_buffer_cache_tests.rs"]
mod tests;
