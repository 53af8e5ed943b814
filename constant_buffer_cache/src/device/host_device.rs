/// Host-memory device for headless runs and tests (no GPU required)
///
/// `HostDevice` implements both device traits on plain CPU memory:
/// - buffers are boxed register arrays, tracked in a live-buffer registry
///   until their last handle is dropped
/// - Dynamic buffers are written in place, Static buffers through a staging
///   copy published on `end_write`
/// - every bind is recorded and the current binding per (stage, slot) kept

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};
use slotmap::{new_key_type, SlotMap};
use crate::device::{
    BindingTarget, ConstantBuffer, ConstantBufferDesc, ConstantBufferDevice,
    ConstantBufferFlags, ConstantBufferUsage, Register, ShaderSlot, ShaderStage, SlotKey,
    REGISTER_SIZE,
};
use crate::error::{Error, Result};
use crate::utils::SlotGrid;
use crate::{rhi_debug, rhi_err, rhi_error, rhi_fail};

/// Register limit reported for every stage unless overridden
pub const DEFAULT_REGISTER_COUNT_MAX: u32 = 512;

new_key_type! {
    /// Registry key of a live host buffer
    pub struct HostBufferKey;
}

struct BufferRecord {
    size: u64,
    buffer: Weak<HostConstantBuffer>,
}

type Registry = Arc<Mutex<SlotMap<HostBufferKey, BufferRecord>>>;

// ============================================================================
// HostConstantBuffer
// ============================================================================

/// Constant buffer backed by host memory
pub struct HostConstantBuffer {
    key: HostBufferKey,
    registry: Registry,
    debug_name: String,
    usage: ConstantBufferUsage,
    flags: ConstantBufferFlags,
    /// Published contents (what a draw would read)
    storage: Mutex<Box<[Register]>>,
    /// Write copy for Static buffers, present only while mapped
    staging: Mutex<Option<Box<[Register]>>>,
    mapped: AtomicBool,
    completed_writes: AtomicU32,
}

impl HostConstantBuffer {
    /// Registry key
    pub fn key(&self) -> HostBufferKey {
        self.key
    }

    /// Creation flags
    pub fn flags(&self) -> ConstantBufferFlags {
        self.flags
    }

    /// Number of registers the buffer holds
    pub fn register_count(&self) -> u32 {
        self.storage.lock().map(|s| s.len() as u32).unwrap_or(0)
    }

    /// Whether a write is in progress
    pub fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    /// Number of begin/end write pairs completed so far
    pub fn completed_writes(&self) -> u32 {
        self.completed_writes.load(Ordering::Acquire)
    }

    /// Snapshot of the published contents
    ///
    /// Must not be called while the buffer is mapped.
    pub fn contents(&self) -> Result<Vec<Register>> {
        if self.is_mapped() {
            return Err(rhi_fail!("cbcache::HostDevice", ProtocolViolation,
                "Reading constant buffer '{}' while it is mapped", self.debug_name));
        }
        let storage = self.storage.lock()
            .map_err(|_| rhi_err!("cbcache::HostDevice", "Buffer storage lock poisoned"))?;
        Ok(storage.to_vec())
    }

    /// The boxed slices never move while mapped, so the pointer outlives the guards
    fn map_memory(&self) -> Option<*mut u8> {
        match self.usage {
            ConstantBufferUsage::Dynamic => {
                let mut storage = self.storage.lock().ok()?;
                Some(storage.as_mut_ptr() as *mut u8)
            }
            ConstantBufferUsage::Static => {
                let storage = self.storage.lock().ok()?;
                let mut staging = self.staging.lock().ok()?;
                let copy = staging.insert(storage.clone());
                Some(copy.as_mut_ptr() as *mut u8)
            }
        }
    }
}

impl ConstantBuffer for HostConstantBuffer {
    fn debug_name(&self) -> &str {
        &self.debug_name
    }

    fn size(&self) -> u64 {
        self.register_count() as u64 * REGISTER_SIZE
    }

    fn usage(&self) -> ConstantBufferUsage {
        self.usage
    }

    fn begin_write(&self) -> Option<*mut u8> {
        if self.mapped.swap(true, Ordering::AcqRel) {
            rhi_error!("cbcache::HostDevice",
                "Constant buffer '{}' is already mapped", self.debug_name);
            debug_assert!(false, "double map of constant buffer '{}'", self.debug_name);
            return None;
        }

        let ptr = self.map_memory();
        if ptr.is_none() {
            self.mapped.store(false, Ordering::Release);
        }
        ptr
    }

    fn end_write(&self) {
        if !self.mapped.swap(false, Ordering::AcqRel) {
            rhi_error!("cbcache::HostDevice",
                "Constant buffer '{}' is not mapped", self.debug_name);
            debug_assert!(false, "unmatched end_write on constant buffer '{}'", self.debug_name);
            return;
        }

        if self.usage == ConstantBufferUsage::Static {
            let staged = self.staging.lock().ok().and_then(|mut s| s.take());
            if let (Some(staged), Ok(mut storage)) = (staged, self.storage.lock()) {
                *storage = staged;
            }
        }
        self.completed_writes.fetch_add(1, Ordering::AcqRel);
    }
}

impl Drop for HostConstantBuffer {
    fn drop(&mut self) {
        // Don't panic if the lock is poisoned, the memory goes away regardless
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(self.key);
        }
    }
}

impl fmt::Debug for HostConstantBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConstantBuffer")
            .field("debug_name", &self.debug_name)
            .field("usage", &self.usage)
            .field("registers", &self.register_count())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

// ============================================================================
// BindCommand
// ============================================================================

/// One recorded `bind_constant_buffer` call
#[derive(Clone)]
pub struct BindCommand {
    pub stage: ShaderStage,
    pub slot: ShaderSlot,
    pub buffer: Option<Arc<dyn ConstantBuffer>>,
}

impl fmt::Debug for BindCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCommand")
            .field("stage", &self.stage)
            .field("slot", &self.slot)
            .field("buffer", &self.buffer.as_ref().map(|b| b.debug_name().to_string()))
            .finish()
    }
}

// ============================================================================
// HostDevice
// ============================================================================

/// CPU-memory implementation of `ConstantBufferDevice` and `BindingTarget`
pub struct HostDevice {
    registry: Registry,
    buffers_created: u64,
    memory_budget: Option<u64>,
    register_limits: [u32; ShaderStage::COUNT],
    bindings: SlotGrid<Option<Arc<dyn ConstantBuffer>>>,
    bind_commands: Vec<BindCommand>,
}

impl HostDevice {
    /// Create a device with no memory budget and 512 registers per stage
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(SlotMap::with_key())),
            buffers_created: 0,
            memory_budget: None,
            register_limits: [DEFAULT_REGISTER_COUNT_MAX; ShaderStage::COUNT],
            bindings: SlotGrid::new(),
            bind_commands: Vec::new(),
        }
    }

    /// Fail buffer creation with `Error::OutOfMemory` once live bytes would exceed `bytes`
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Override the register limit reported for `stage`
    pub fn with_register_count_max(mut self, stage: ShaderStage, count: u32) -> Self {
        self.register_limits[stage.index()] = count;
        self
    }

    /// Change the memory budget of an existing device
    pub fn set_memory_budget(&mut self, bytes: Option<u64>) {
        self.memory_budget = bytes;
    }

    /// Buffers created since the device was constructed
    pub fn buffers_created(&self) -> u64 {
        self.buffers_created
    }

    /// Buffers that still have at least one handle alive
    pub fn live_buffer_count(&self) -> usize {
        self.registry.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Total size of live buffers in bytes
    pub fn live_bytes(&self) -> u64 {
        self.registry.lock()
            .map(|r| r.values().map(|record| record.size).sum())
            .unwrap_or(0)
    }

    /// Resolve a buffer handle created by this device
    pub fn host_buffer(&self, buffer: &Arc<dyn ConstantBuffer>) -> Option<Arc<HostConstantBuffer>> {
        let registry = self.registry.lock().ok()?;
        registry.values()
            .find(|record| std::ptr::addr_eq(record.buffer.as_ptr(), Arc::as_ptr(buffer)))
            .and_then(|record| record.buffer.upgrade())
    }

    /// Published contents of a buffer created by this device
    pub fn buffer_contents(&self, buffer: &Arc<dyn ConstantBuffer>) -> Result<Vec<Register>> {
        self.host_buffer(buffer)
            .ok_or_else(|| Error::InvalidResource(format!(
                "Constant buffer '{}' was not created by this device", buffer.debug_name())))?
            .contents()
    }

    /// Buffer currently bound to (stage, slot)
    pub fn bound_buffer(&self, stage: ShaderStage, slot: ShaderSlot) -> Option<&Arc<dyn ConstantBuffer>> {
        self.bindings[SlotKey::new(stage, slot)].as_ref()
    }

    /// Every bind recorded since the last `clear_bind_commands`
    pub fn bind_commands(&self) -> &[BindCommand] {
        &self.bind_commands
    }

    pub fn clear_bind_commands(&mut self) {
        self.bind_commands.clear();
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantBufferDevice for HostDevice {
    fn create_constant_buffer(&mut self, desc: ConstantBufferDesc) -> Result<Arc<dyn ConstantBuffer>> {
        if desc.size == 0 || desc.size % REGISTER_SIZE != 0 {
            return Err(Error::InvalidResource(format!(
                "Constant buffer '{}' size {} is not a positive multiple of {}",
                desc.debug_name, desc.size, REGISTER_SIZE)));
        }

        let mut registry = self.registry.lock()
            .map_err(|_| rhi_err!("cbcache::HostDevice", "Buffer registry lock poisoned"))?;

        if let Some(budget) = self.memory_budget {
            let live: u64 = registry.values().map(|record| record.size).sum();
            if live + desc.size > budget {
                return Err(Error::OutOfMemory);
            }
        }

        let registers = (desc.size / REGISTER_SIZE) as usize;
        let registry_handle = self.registry.clone();
        let buffer = Arc::new_cyclic(|weak| {
            let key = registry.insert(BufferRecord {
                size: desc.size,
                buffer: weak.clone(),
            });
            HostConstantBuffer {
                key,
                registry: registry_handle,
                debug_name: desc.debug_name,
                usage: desc.usage,
                flags: desc.flags,
                storage: Mutex::new(vec![Register::ZERO; registers].into_boxed_slice()),
                staging: Mutex::new(None),
                mapped: AtomicBool::new(false),
                completed_writes: AtomicU32::new(0),
            }
        });
        drop(registry);

        self.buffers_created += 1;
        rhi_debug!("cbcache::HostDevice",
            "Created constant buffer '{}' ({} bytes, {:?})",
            buffer.debug_name, desc.size, buffer.usage);

        Ok(buffer)
    }

    fn constant_register_count_max(&self, stage: ShaderStage) -> u32 {
        self.register_limits[stage.index()]
    }
}

impl BindingTarget for HostDevice {
    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        buffer: Option<&Arc<dyn ConstantBuffer>>,
        slot: ShaderSlot,
    ) {
        self.bindings[SlotKey::new(stage, slot)] = buffer.cloned();
        self.bind_commands.push(BindCommand {
            stage,
            slot,
            buffer: buffer.cloned(),
        });
    }
}

#[cfg(test)]
#[path = "host_device_tests.rs"]
mod tests;
