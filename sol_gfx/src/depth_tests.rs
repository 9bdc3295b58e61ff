//! Unit tests for depth.rs

use crate::adapter::Instance;
use crate::backend::mock::{MockConfig, MockGpu};
use crate::command::CommandContext;
use crate::depth::{
    query_msaa_quality, sample_desc_for, DepthSurface, DEPTH_CLEAR_VALUE, STENCIL_CLEAR_VALUE,
};
use crate::device::Device;
use crate::error::Error;
use crate::types::{Format, SampleDesc};

fn device(config: MockConfig) -> (MockGpu, Instance, Device) {
    let gpu = MockGpu::new(config);
    let mut instance = Instance::initialize(gpu.factory(), true).unwrap();
    let adapter = instance.adapter(0).unwrap().clone();
    let device = Device::initialize(&mut instance, &adapter).unwrap();
    (gpu, instance, device)
}

#[test]
fn test_clear_values() {
    assert_eq!(DEPTH_CLEAR_VALUE, 1.0);
    assert_eq!(STENCIL_CLEAR_VALUE, 0);
}

#[test]
fn test_sample_desc_for_msaa() {
    assert_eq!(sample_desc_for(true, 4), SampleDesc { count: 4, quality: 3 });
    assert_eq!(sample_desc_for(true, 1), SampleDesc { count: 4, quality: 0 });
    assert_eq!(sample_desc_for(false, 4), SampleDesc::SINGLE);
}

#[test]
fn test_query_zero_quality_levels_fails() {
    let (_gpu, _instance, device) = device(MockConfig { msaa_quality_levels: 0, ..MockConfig::default() });

    assert_eq!(
        query_msaa_quality(&device, Format::R8G8B8A8_UNORM, 4),
        Err(Error::UnsupportedSampleQuality { sample_count: 4 })
    );
}

#[test]
fn test_create_typeless_resource_with_typed_view() {
    let (gpu, _instance, mut device) = device(MockConfig::default());

    let depth = DepthSurface::create(&mut device, 800, 600, Format::D24_UNORM_S8_UINT, SampleDesc::SINGLE).unwrap();

    assert_eq!(depth.resource().format(), Format::R24G8_TYPELESS);
    assert_eq!(depth.format(), Format::D24_UNORM_S8_UINT);
    assert_eq!((depth.width(), depth.height()), (800, 600));
    assert_eq!(depth.heap().capacity(), 1);
    assert_eq!(gpu.count("device.create_dsv"), 1);
    // Single-sampled buffers skip the quality query
    assert_eq!(gpu.count("device.msaa_quality"), 0);
}

#[test]
fn test_create_multisampled() {
    let (_gpu, _instance, mut device) = device(MockConfig::default());

    let depth = DepthSurface::create(
        &mut device,
        800,
        600,
        Format::D24_UNORM_S8_UINT,
        SampleDesc { count: 4, quality: 3 },
    )
    .unwrap();
    assert_eq!(depth.resource().sample(), SampleDesc { count: 4, quality: 3 });
}

#[test]
fn test_create_refuses_unsupported_msaa() {
    let (gpu, _instance, mut device) = device(MockConfig::default());
    gpu.set_msaa_quality_levels(0);

    let result = DepthSurface::create(
        &mut device,
        800,
        600,
        Format::D24_UNORM_S8_UINT,
        SampleDesc { count: 4, quality: 0 },
    );
    assert!(matches!(result, Err(Error::UnsupportedSampleQuality { sample_count: 4 })));
    assert_eq!(gpu.count("device.create_depth"), 0);
}

#[test]
fn test_create_refuses_out_of_range_quality() {
    let (_gpu, _instance, mut device) = device(MockConfig { msaa_quality_levels: 2, ..MockConfig::default() });

    let result = DepthSurface::create(
        &mut device,
        800,
        600,
        Format::D24_UNORM_S8_UINT,
        SampleDesc { count: 4, quality: 2 },
    );
    assert!(matches!(result, Err(Error::UnsupportedSampleQuality { .. })));
}

#[test]
fn test_initial_transition_common_to_depth_write() {
    let (gpu, _instance, mut device) = device(MockConfig::default());
    let depth = DepthSurface::create(&mut device, 64, 64, Format::D24_UNORM_S8_UINT, SampleDesc::SINGLE).unwrap();
    let mut commands = CommandContext::new(&mut device).unwrap();

    commands.reset(true).unwrap();
    depth.record_initial_transition(commands.list_mut()).unwrap();

    let expected = format!("list.barrier({}: Common -> DepthWrite)", depth.resource().id());
    assert_eq!(gpu.count(&expected), 1);
}

#[test]
fn test_transition_on_closed_list_fails() {
    let (_gpu, _instance, mut device) = device(MockConfig::default());
    let depth = DepthSurface::create(&mut device, 64, 64, Format::D24_UNORM_S8_UINT, SampleDesc::SINGLE).unwrap();
    let mut commands = CommandContext::new(&mut device).unwrap();

    assert!(!commands.is_recording());
    assert!(matches!(
        depth.record_initial_transition(commands.list_mut()),
        Err(Error::CommandSubmission(_))
    ));
}
