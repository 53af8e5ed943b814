/// Cache module - slot table, buffer pool and commit protocol

// Module declarations
pub mod cache_config;
pub mod cache_entry;
pub mod buffer_pool;
pub mod constant_buffer_cache;

// Re-exports
pub use cache_config::CacheConfig;
pub use cache_entry::CacheEntry;
pub use buffer_pool::BufferPool;
pub use constant_buffer_cache::{ConstantBufferCache, CacheStats};
