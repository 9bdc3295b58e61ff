//! Unit tests for command.rs

use crate::adapter::Instance;
use crate::backend::mock::{MockConfig, MockGpu};
use crate::command::CommandContext;
use crate::device::Device;
use crate::error::Error;

fn device(gpu: &MockGpu) -> Device {
    let mut instance = Instance::initialize(gpu.factory(), true).unwrap();
    let adapter = instance.adapter(0).unwrap().clone();
    Device::initialize(&mut instance, &adapter).unwrap()
}

#[test]
fn test_new_context_is_closed() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);

    let commands = CommandContext::new(&mut device).unwrap();
    assert!(!commands.is_recording());
    assert!(gpu.position("device.create_allocator").unwrap() < gpu.position("device.create_command_list").unwrap());
}

#[test]
fn test_reset_with_and_without_reclaim() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);
    let mut commands = CommandContext::new(&mut device).unwrap();

    commands.reset(false).unwrap();
    assert_eq!(gpu.count("allocator.reset"), 0);
    commands.close().unwrap();

    commands.reset(true).unwrap();
    assert_eq!(gpu.count("allocator.reset"), 1);
    assert!(commands.is_recording());
}

#[test]
fn test_reset_while_recording_fails() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);
    let mut commands = CommandContext::new(&mut device).unwrap();

    commands.reset(false).unwrap();
    assert!(matches!(commands.reset(false), Err(Error::CommandSubmission(_))));
}

#[test]
fn test_close_and_execute_marks_queue_busy() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);
    let mut commands = CommandContext::new(&mut device).unwrap();

    commands.reset(true).unwrap();
    commands.close_and_execute(&mut device).unwrap();

    assert_eq!(gpu.count("list.close"), 1);
    assert_eq!(gpu.count("queue.execute(1)"), 1);
    assert!(!device.is_idle().unwrap());
    device.flush_queue().unwrap();
    assert!(device.is_idle().unwrap());
}

#[test]
fn test_close_of_closed_list_fails() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);
    let mut commands = CommandContext::new(&mut device).unwrap();

    assert!(matches!(commands.close(), Err(Error::CommandSubmission(_))));
}

#[test]
fn test_abandon_closes_open_list_without_executing() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);
    let mut commands = CommandContext::new(&mut device).unwrap();

    commands.reset(true).unwrap();
    commands.abandon().unwrap();
    assert!(!commands.is_recording());
    assert_eq!(gpu.count("queue.execute"), 0);

    // Closed already: nothing to do
    commands.abandon().unwrap();
    assert_eq!(gpu.count("list.close"), 1);
    commands.reset(true).unwrap();
}

#[test]
fn test_reset_error_names_the_failure_once() {
    let gpu = MockGpu::new(MockConfig::default());
    let mut device = device(&gpu);
    let mut commands = CommandContext::new(&mut device).unwrap();

    commands.reset(false).unwrap();
    let message = commands.reset(false).unwrap_err().to_string();
    assert_eq!(message.matches("Command submission failed").count(), 1);
    assert!(message.contains("Failed to reset command list: reset of an open command list"));
}
