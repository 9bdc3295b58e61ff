//! Plain data types shared by the core and the backends

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

// ===== FORMATS =====

/// Pixel formats used by the presentation and depth surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
    /// Typeless storage of a 24/8 depth-stencil resource
    R24G8_TYPELESS,
}

impl Format {
    /// Whether the format carries depth (and stencil) data
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Format::D24_UNORM_S8_UINT | Format::D32_FLOAT_S8_UINT | Format::R24G8_TYPELESS
        )
    }

    /// Typeless storage format for a depth/stencil view format
    ///
    /// The depth buffer is allocated typeless so it can later be viewed either
    /// as depth or as a shader resource.
    pub fn typeless(self) -> Format {
        match self {
            Format::D24_UNORM_S8_UINT => Format::R24G8_TYPELESS,
            other => other,
        }
    }
}

/// Samples per pixel and quality level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleDesc {
    pub count: u32,
    pub quality: u32,
}

impl SampleDesc {
    /// One sample, quality 0
    pub const SINGLE: SampleDesc = SampleDesc { count: 1, quality: 0 };
}

impl Default for SampleDesc {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Usage state of a GPU resource, changed with barriers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Freshly created, contents undefined
    Common,
    RenderTarget,
    DepthWrite,
    Present,
}

// ===== VIEWPORT / SCISSOR =====

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full client area with the [0, 1] depth range
    pub fn for_client(width: u32, height: u32) -> Self {
        Self {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle (right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    /// Full client area
    pub fn for_client(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: i32::try_from(width).unwrap_or(i32::MAX),
            bottom: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }
}

// ===== VIEWS =====

/// Kind of view stored in a view heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    RenderTarget,
    DepthStencil,
    ShaderResource,
}

/// CPU-side handle of one view slot
///
/// Handles of a heap are laid out as `start + slot * increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewHandle(pub usize);

impl ViewHandle {
    /// Handle `slot` slots after this one
    pub fn offset(self, slot: u32, increment: u32) -> ViewHandle {
        ViewHandle(self.0 + slot as usize * increment as usize)
    }
}

/// Per-kind view slot sizes, fixed for a device's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSizes {
    pub render_target: u32,
    pub depth_stencil: u32,
    pub shader_resource: u32,
}

impl DescriptorSizes {
    pub fn for_kind(&self, kind: ViewKind) -> u32 {
        match kind {
            ViewKind::RenderTarget => self.render_target,
            ViewKind::DepthStencil => self.depth_stencil,
            ViewKind::ShaderResource => self.shader_resource,
        }
    }
}

// ===== ADAPTERS =====

/// Adapter ranking requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuPreference {
    HighPerformance,
    MinimumPower,
}

impl GpuPreference {
    pub fn from_high_performance(prefer_high_performance: bool) -> Self {
        if prefer_high_performance {
            GpuPreference::HighPerformance
        } else {
            GpuPreference::MinimumPower
        }
    }
}

/// Platform API level a device is created at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureLevel {
    pub major: u32,
    pub minor: u32,
}

impl FeatureLevel {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Minimum level a device must support
    pub const MINIMUM: FeatureLevel = FeatureLevel::new(1, 3);
}

impl std::fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Capabilities reported by a created device (diagnostics only)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureSupport {
    /// Every supported level, highest first
    pub feature_levels: Vec<FeatureLevel>,
    pub ray_tracing: bool,
}

/// One enumerated GPU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    /// Position in the platform's ranked enumeration
    pub ordinal: u32,
    pub name: String,
    pub is_software: bool,
    pub vendor_id: u32,
    pub device_id: u32,
    pub dedicated_video_memory: u64,
}

/// Display mode of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_numerator: u32,
    pub refresh_denominator: u32,
}

/// Display attached to an adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDesc {
    pub name: String,
    pub modes: Vec<DisplayMode>,
}

// ===== SURFACES =====

bitflags::bitflags! {
    /// Flags passed to every present call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PresentFlags: u32 {
        const ALLOW_TEARING = 1 << 0;
    }
}

/// Native window a swap chain presents to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTarget {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

/// Swap chain creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub buffer_count: u32,
    pub vsync: bool,
    pub allow_tearing: bool,
}

/// Depth/stencil buffer creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilDesc {
    pub width: u32,
    pub height: u32,
    /// Storage format of the resource (typeless)
    pub format: Format,
    pub sample: SampleDesc,
    pub clear_depth: f32,
    pub clear_stencil: u8,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
