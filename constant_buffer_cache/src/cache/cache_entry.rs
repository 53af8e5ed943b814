/// Live binding state of one (stage, slot) cell

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use crate::device::{ConstantBuffer, Register, REGISTER_SIZE};
use crate::error::Result;
use crate::{rhi_err, rhi_fail};

const SOURCE: &str = "cbcache::ConstantBufferCache";

/// Writable window onto the bound buffer between begin_write and end_write
#[derive(Clone, Copy)]
pub(crate) struct MappedRegion {
    ptr: NonNull<Register>,
    len: usize,
}

// SAFETY: the region points into memory owned by the entry's bound buffer,
// which is `Send + Sync`; the entry is the only holder of the pointer.
unsafe impl Send for MappedRegion {}

/// Binding state of a slot table cell
///
/// Invariants:
/// - a mapped region exists only between a successful begin_write and the
///   matching end_write (`try_commit`)
/// - the bound buffer never changes while a region is mapped
#[derive(Default)]
pub struct CacheEntry {
    pub(crate) register_count_max: u16,
    pub(crate) external_active: bool,
    pub(crate) mapped: Option<MappedRegion>,
    pub(crate) bound_buffer: Option<Arc<dyn ConstantBuffer>>,
    pub(crate) dirty: bool,
}

impl CacheEntry {
    /// Capacity, in registers, of the current (or last) write
    pub fn register_count_max(&self) -> u32 {
        self.register_count_max as u32
    }

    /// Whether an externally owned buffer replaces the pooled one
    pub fn is_external(&self) -> bool {
        self.external_active
    }

    /// Whether a write is in progress
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Whether the cell is waiting in the dirty list for the next commit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Buffer that the next commit binds to this cell
    pub fn bound_buffer(&self) -> Option<&Arc<dyn ConstantBuffer>> {
        self.bound_buffer.as_ref()
    }

    /// Finish the in-progress write, if any
    ///
    /// Returns true if a write was ended.
    pub(crate) fn try_commit(&mut self) -> bool {
        if self.mapped.take().is_none() {
            return false;
        }
        match &self.bound_buffer {
            Some(buffer) => buffer.end_write(),
            None => debug_assert!(false, "mapped entry without a bound buffer"),
        }
        true
    }

    /// Map the bound buffer for `register_count` registers
    pub(crate) fn begin_write(&mut self, register_count: u32) -> Result<()> {
        debug_assert!(self.mapped.is_none(), "entry already mapped");

        let Some(buffer) = self.bound_buffer.as_ref() else {
            return Err(rhi_fail!(SOURCE, ProtocolViolation,
                "Cannot map a slot with no bound constant buffer"));
        };

        let capacity = buffer.size() / REGISTER_SIZE;
        if register_count as u64 > capacity {
            return Err(rhi_fail!(SOURCE, OutOfBounds,
                "Constant buffer '{}' holds {} registers, {} requested",
                buffer.debug_name(), capacity, register_count));
        }

        let Some(raw) = buffer.begin_write() else {
            return Err(rhi_err!(SOURCE,
                "Failed to map constant buffer '{}'", buffer.debug_name()));
        };

        let aligned = (raw as usize) % std::mem::align_of::<Register>() == 0;
        match NonNull::new(raw as *mut Register) {
            Some(ptr) if aligned => {
                self.mapped = Some(MappedRegion { ptr, len: register_count as usize });
                Ok(())
            }
            _ => {
                buffer.end_write();
                Err(rhi_err!(SOURCE,
                    "Constant buffer '{}' mapped to an invalid address {:p}", buffer.debug_name(), raw))
            }
        }
    }

    /// The in-progress write as a register slice
    pub(crate) fn mapped_registers(&mut self) -> Option<&mut [Register]> {
        let region = self.mapped?;
        // SAFETY: the region was returned by begin_write on the bound buffer,
        // which this entry keeps alive, and stays valid until try_commit. Its
        // length was checked against the buffer size. The &mut self borrow
        // makes the slice unique.
        Some(unsafe { std::slice::from_raw_parts_mut(region.ptr.as_ptr(), region.len) })
    }

    /// End any write and return to the empty state
    pub(crate) fn clear(&mut self) {
        self.try_commit();
        self.register_count_max = 0;
        self.external_active = false;
        self.bound_buffer = None;
        self.dirty = false;
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("register_count_max", &self.register_count_max)
            .field("external_active", &self.external_active)
            .field("mapped", &self.is_mapped())
            .field("bound_buffer", &self.bound_buffer.as_ref().map(|b| b.debug_name().to_string()))
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
#[path = "cache_entry_tests.rs"]
mod tests;
