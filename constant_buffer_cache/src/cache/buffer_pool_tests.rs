use super::*;
use crate::device::{same_buffer, ConstantBufferFlags, HostDevice, ShaderSlot, ShaderStage};
use crate::error::Error;

fn pixel_draw() -> SlotKey {
    SlotKey::new(ShaderStage::Pixel, ShaderSlot::PerDraw)
}

// ============================================================================
// get_or_create
// ============================================================================

#[test]
fn test_get_or_create_creates_dynamic_buffer() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    let buffer = pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();

    assert_eq!(buffer.size(), 64);
    assert_eq!(buffer.usage(), ConstantBufferUsage::Dynamic);
    assert_eq!(buffer.debug_name(), "ConstantBufferCache[Pixel/PER_BATCH:4]");
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.pooled_bytes(), 64);
    assert_eq!(device.buffers_created(), 1);
}

#[test]
fn test_same_size_reuses_buffer() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    let a = pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();
    let b = pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();

    assert!(same_buffer(&a, &b));
    assert_eq!(device.buffers_created(), 1);
    assert_eq!(pool.slot_len(pixel_draw()), 1);
}

#[test]
fn test_distinct_sizes_are_kept_side_by_side() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    let small = pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();
    let large = pool.get_or_create(&mut device, pixel_draw(), 8, &config).unwrap();

    assert!(!same_buffer(&small, &large));
    assert!(same_buffer(pool.get(pixel_draw(), 4).unwrap(), &small));
    assert!(same_buffer(pool.get(pixel_draw(), 8).unwrap(), &large));
    assert_eq!(pool.slot_len(pixel_draw()), 2);
    assert_eq!(pool.pooled_bytes(), 64 + 128);
}

#[test]
fn test_cells_do_not_share_buffers() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();
    let vertex_draw = SlotKey::new(ShaderStage::Vertex, ShaderSlot::PerDraw);

    let a = pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();
    let b = pool.get_or_create(&mut device, vertex_draw, 4, &config).unwrap();

    assert!(!same_buffer(&a, &b));
    assert_eq!(pool.len(), 2);
}

#[test]
fn test_config_flags_and_label_are_applied() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig {
        label: "Frame".to_string(),
        buffer_flags: ConstantBufferFlags::DENY_STREAMING,
        ..Default::default()
    };

    let buffer = pool.get_or_create(&mut device, pixel_draw(), 2, &config).unwrap();

    assert_eq!(buffer.debug_name(), "Frame[Pixel/PER_BATCH:2]");
    let host = device.host_buffer(&buffer).unwrap();
    assert_eq!(host.flags(), ConstantBufferFlags::DENY_STREAMING);
}

// ============================================================================
// Failure
// ============================================================================

#[test]
fn test_creation_failure_stores_nothing() {
    let mut device = HostDevice::new().with_memory_budget(32);
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    let result = pool.get_or_create(&mut device, pixel_draw(), 4, &config);

    match result {
        Err(Error::AllocationFailed(message)) => {
            assert!(message.contains("Pixel/PER_BATCH"));
            assert!(message.contains("4 registers"));
            assert!(message.contains("64 bytes"));
        }
        other => panic!("expected AllocationFailed, got {:?}", other.map(|b| b.size())),
    }
    assert!(pool.get(pixel_draw(), 4).is_none());
    assert!(pool.is_empty());
    assert_eq!(pool.pooled_bytes(), 0);
}

#[test]
fn test_creation_is_retried_after_failure() {
    let mut device = HostDevice::new().with_memory_budget(32);
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    assert!(pool.get_or_create(&mut device, pixel_draw(), 4, &config).is_err());

    device.set_memory_budget(None);
    assert!(pool.get_or_create(&mut device, pixel_draw(), 4, &config).is_ok());
    assert_eq!(pool.len(), 1);
}

// ============================================================================
// release_all
// ============================================================================

#[test]
fn test_release_all_drops_every_buffer() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();
    pool.get_or_create(&mut device, pixel_draw(), 8, &config).unwrap();
    pool.get_or_create(&mut device, SlotKey::new(ShaderStage::Compute, ShaderSlot::PerFrame), 1, &config).unwrap();
    assert_eq!(device.live_buffer_count(), 3);

    assert_eq!(pool.release_all(), 3);

    assert!(pool.is_empty());
    assert_eq!(pool.pooled_bytes(), 0);
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn test_release_all_keeps_outside_handles_alive() {
    let mut device = HostDevice::new();
    let mut pool = BufferPool::new();
    let config = CacheConfig::default();

    let held = pool.get_or_create(&mut device, pixel_draw(), 4, &config).unwrap();
    pool.release_all();

    assert_eq!(device.live_buffer_count(), 1);
    drop(held);
    assert_eq!(device.live_buffer_count(), 0);
}
