//! Unit tests for fence.rs

use crate::backend::mock::{MockConfig, MockGpu};
use crate::backend::{GpuDevice, GpuQueue};
use crate::error::Error;
use crate::fence::FenceSynchronizer;
use crate::types::FeatureLevel;

fn setup(gpu_lag: bool) -> (MockGpu, Box<dyn GpuDevice>, Box<dyn GpuQueue>, FenceSynchronizer) {
    let gpu = MockGpu::new(MockConfig { gpu_lag, ..MockConfig::default() });
    let mut factory = gpu.factory();
    let adapters = factory
        .enumerate_adapters(crate::types::GpuPreference::HighPerformance)
        .unwrap();
    let mut device = factory.create_device(&adapters[0], FeatureLevel::MINIMUM).unwrap();
    let queue = device.create_command_queue().unwrap();
    let fence = FenceSynchronizer::new(device.create_fence(0).unwrap(), 0);
    (gpu, device, queue, fence)
}

#[test]
fn test_signal_increments_monotonically() {
    let (_gpu, _device, mut queue, mut fence) = setup(true);

    assert_eq!(fence.current_value(), 0);
    assert_eq!(fence.signal(queue.as_mut()).unwrap(), 1);
    assert_eq!(fence.signal(queue.as_mut()).unwrap(), 2);
    assert_eq!(fence.current_value(), 2);
}

#[test]
fn test_lagging_gpu_is_not_idle_until_waited() {
    let (_gpu, _device, mut queue, mut fence) = setup(true);

    let value = fence.signal(queue.as_mut()).unwrap();
    assert!(!fence.is_idle().unwrap());

    fence.wait_until_complete(value).unwrap();
    assert!(fence.is_idle().unwrap());
    assert_eq!(fence.completed_value().unwrap(), value);
}

#[test]
fn test_wait_is_noop_when_already_complete() {
    let (gpu, _device, mut queue, mut fence) = setup(false);

    let value = fence.signal(queue.as_mut()).unwrap();
    gpu.clear_journal();

    fence.wait_until_complete(value).unwrap();
    assert_eq!(gpu.count("fence.wait"), 0);
}

#[test]
fn test_wait_for_older_value_after_completion() {
    let (gpu, _device, mut queue, mut fence) = setup(true);

    let first = fence.signal(queue.as_mut()).unwrap();
    let second = fence.signal(queue.as_mut()).unwrap();
    fence.wait_until_complete(second).unwrap();
    gpu.clear_journal();

    fence.wait_until_complete(first).unwrap();
    assert_eq!(gpu.count("fence.wait"), 0);
}

#[test]
fn test_wait_for_unsignaled_value_fails() {
    let (_gpu, _device, _queue, fence) = setup(true);

    match fence.wait_until_complete(5) {
        Err(Error::CommandSubmission(_)) => {}
        other => panic!("expected CommandSubmission, got {:?}", other),
    }
}

#[test]
fn test_flush_signals_then_waits() {
    let (gpu, _device, mut queue, mut fence) = setup(true);

    let value = fence.flush(queue.as_mut()).unwrap();
    assert_eq!(value, 1);
    let sync: Vec<String> = gpu
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("queue.signal") || e.starts_with("fence.wait"))
        .collect();
    assert_eq!(sync, vec!["queue.signal(1)", "fence.wait(1)"]);
    assert!(fence.is_idle().unwrap());
}
