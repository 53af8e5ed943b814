/*!
# Constant Buffer Cache

Per-frame GPU constant buffer cache for a shader-stage / slot binding model.

Writes land in buffers pooled by exact register count, dirty slots are
tracked between commits, and a single commit pass ends the writes and issues
one bind per written slot. An external buffer can temporarily replace the
pooled one on any slot.

## Architecture

- **ConstantBufferDevice**: allocator and capability trait the cache creates buffers through
- **ConstantBuffer**: mappable buffer resource trait
- **BindingTarget**: draw-pipeline state that receives the binds
- **ConstantBufferCache**: slot table, buffer pool and dirty list
- **HostDevice**: CPU-memory device for headless runs and tests

Device backends provide concrete types that implement these traits.
*/

// Internal modules
mod error;
mod diagnostics;
pub mod log;
pub mod utils;
pub mod device;
pub mod cache;

// Main cbcache namespace module
pub mod cbcache {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger registry
    pub use crate::diagnostics::Diagnostics;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device sub-module: stages, slots, registers, device traits
    pub mod device {
        pub use crate::device::*;
    }

    // Cache sub-module
    pub mod cache {
        pub use crate::cache::*;
    }
}

// Re-export math library at crate root
pub use glam;
