/// Device module - stage/slot/register types and the device-side traits

// Module declarations
pub mod shader_stage;
pub mod register;
pub mod constant_buffer;
pub mod device;

// Host-memory device (headless runs and tests)
pub mod host_device;

// Re-exports
pub use shader_stage::*;
pub use register::*;
pub use constant_buffer::*;
pub use device::*;
pub use host_device::{HostDevice, HostConstantBuffer, HostBufferKey, BindCommand, DEFAULT_REGISTER_COUNT_MAX};
