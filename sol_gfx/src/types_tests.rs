//! Unit tests for types.rs

use crate::types::*;

#[test]
fn test_viewport_for_client() {
    let viewport = Viewport::for_client(1920, 1080);
    assert_eq!(
        viewport,
        Viewport {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width: 1920.0,
            height: 1080.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    );
}

#[test]
fn test_scissor_for_client() {
    let scissor = ScissorRect::for_client(800, 600);
    assert_eq!(scissor, ScissorRect { left: 0, top: 0, right: 800, bottom: 600 });
}

#[test]
fn test_scissor_saturates_huge_sizes() {
    let scissor = ScissorRect::for_client(u32::MAX, 1);
    assert_eq!(scissor.right, i32::MAX);
}

#[test]
fn test_view_handle_offset() {
    let start = ViewHandle(1000);
    assert_eq!(start.offset(0, 32), ViewHandle(1000));
    assert_eq!(start.offset(2, 32), ViewHandle(1064));
}

#[test]
fn test_descriptor_sizes_for_kind() {
    let sizes = DescriptorSizes { render_target: 32, depth_stencil: 16, shader_resource: 64 };
    assert_eq!(sizes.for_kind(ViewKind::RenderTarget), 32);
    assert_eq!(sizes.for_kind(ViewKind::DepthStencil), 16);
    assert_eq!(sizes.for_kind(ViewKind::ShaderResource), 64);
}

#[test]
fn test_depth_format_typeless() {
    assert_eq!(Format::D24_UNORM_S8_UINT.typeless(), Format::R24G8_TYPELESS);
    assert_eq!(Format::R8G8B8A8_UNORM.typeless(), Format::R8G8B8A8_UNORM);
    assert!(Format::R24G8_TYPELESS.is_depth_stencil());
    assert!(!Format::B8G8R8A8_UNORM.is_depth_stencil());
}

#[test]
fn test_feature_level_ordering_and_display() {
    assert!(FeatureLevel::new(1, 3) > FeatureLevel::new(1, 2));
    assert!(FeatureLevel::new(2, 0) > FeatureLevel::new(1, 9));
    assert_eq!(FeatureLevel::MINIMUM.to_string(), "1.3");
}

#[test]
fn test_gpu_preference_from_flag() {
    assert_eq!(GpuPreference::from_high_performance(true), GpuPreference::HighPerformance);
    assert_eq!(GpuPreference::from_high_performance(false), GpuPreference::MinimumPower);
}

#[test]
fn test_sample_desc_default_is_single() {
    assert_eq!(SampleDesc::default(), SampleDesc { count: 1, quality: 0 });
}
