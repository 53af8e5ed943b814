/// Constant buffer cache configuration

use crate::device::{ConstantBufferFlags, SlotKey};

/// Cache configuration
///
/// Register limits are not part of the configuration: they are queried from
/// the device when the cache is created.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix of the debug name given to every pooled buffer
    pub label: String,
    /// Flags passed to every pooled buffer creation
    pub buffer_flags: ConstantBufferFlags,
    /// Emit a TRACE log for every map and register write
    pub trace_writes: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            label: "ConstantBufferCache".to_string(),
            buffer_flags: ConstantBufferFlags::NONE,
            trace_writes: false,
        }
    }
}

impl CacheConfig {
    /// Debug name of the pooled buffer for `key` holding `register_count` registers
    pub fn buffer_name(&self, key: SlotKey, register_count: u32) -> String {
        format!("{}[{}:{}]", self.label, key, register_count)
    }
}
