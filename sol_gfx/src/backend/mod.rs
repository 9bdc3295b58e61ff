//! Platform abstraction
//!
//! The core never talks to a graphics API directly. Everything it needs from
//! the platform goes through these object-safe traits, implemented once per
//! backend (`sol_gfx_vulkan`) and once by the in-crate mock used in unit tests.
//!
//! Objects passed back into a backend (a device into `create_swapchain`, a
//! fence into `signal`, ...) are always objects that same backend created, so
//! implementations recover their concrete types through `as_any`.

use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{
    Adapter, DepthStencilDesc, FeatureLevel, FeatureSupport, Format, GpuPreference,
    OutputDesc, PresentFlags, ResourceState, SampleDesc, ScissorRect, SurfaceTarget, SwapchainDesc,
    ViewHandle, ViewKind, Viewport,
};

#[cfg(test)]
pub mod mock;

/// Platform entry point: adapter enumeration and swap chain creation
pub trait GpuFactory: Send {
    /// Short backend name for logs ("vulkan", "mock")
    fn backend_name(&self) -> &str;

    /// Every adapter, software ones included, ranked by `preference`
    fn enumerate_adapters(&mut self, preference: GpuPreference) -> Result<Vec<Adapter>>;

    /// Outputs of an adapter with their display modes for `format`
    fn adapter_outputs(&self, adapter: &Adapter, format: Format) -> Result<Vec<OutputDesc>>;

    /// Create a logical device supporting at least `minimum_level`
    fn create_device(
        &mut self,
        adapter: &Adapter,
        minimum_level: FeatureLevel,
    ) -> Result<Box<dyn GpuDevice>>;

    /// Create a swap chain presenting through `queue` to `target`
    fn create_swapchain(
        &mut self,
        device: &dyn GpuDevice,
        queue: &dyn GpuQueue,
        target: SurfaceTarget,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn GpuSwapchain>>;
}

/// Logical device
pub trait GpuDevice: Send {
    fn as_any(&self) -> &dyn Any;

    fn create_command_queue(&mut self) -> Result<Box<dyn GpuQueue>>;

    fn create_fence(&mut self, initial_value: u64) -> Result<Box<dyn GpuFence>>;

    /// Size of one view slot of `kind`
    fn descriptor_increment(&self, kind: ViewKind) -> u32;

    fn feature_support(&self) -> FeatureSupport;

    /// Number of quality levels for `sample_count` samples of `format`
    ///
    /// Zero means the sample count is not supported.
    fn multisample_quality_levels(&self, format: Format, sample_count: u32) -> Result<u32>;

    fn create_depth_stencil_buffer(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<Arc<dyn GpuResource>>;

    fn create_view_heap(&mut self, kind: ViewKind, capacity: u32) -> Result<Box<dyn GpuViewHeap>>;

    fn create_render_target_view(
        &mut self,
        resource: &dyn GpuResource,
        heap: &dyn GpuViewHeap,
        slot: u32,
    ) -> Result<ViewHandle>;

    /// Depth-stencil view of a (typeless) resource, typed as `format`
    fn create_depth_stencil_view(
        &mut self,
        resource: &dyn GpuResource,
        format: Format,
        heap: &dyn GpuViewHeap,
        slot: u32,
    ) -> Result<ViewHandle>;

    fn create_command_allocator(&mut self) -> Result<Box<dyn GpuCommandAllocator>>;

    /// New command list recording from `allocator`, returned closed
    fn create_command_list(
        &mut self,
        allocator: &dyn GpuCommandAllocator,
    ) -> Result<Box<dyn GpuCommandList>>;
}

/// Single ordered submission channel
pub trait GpuQueue: Send {
    fn as_any(&self) -> &dyn Any;

    /// Submit closed command lists, executed in order
    fn execute(&mut self, lists: &[&dyn GpuCommandList]) -> Result<()>;

    /// Have the GPU set `fence` to `value` once all prior work is done
    fn signal(&mut self, fence: &dyn GpuFence, value: u64) -> Result<()>;
}

/// 64-bit GPU timeline
pub trait GpuFence: Send {
    fn as_any(&self) -> &dyn Any;

    /// Last value the GPU has reached
    fn completed_value(&self) -> Result<u64>;

    /// Block the calling thread until the GPU reaches `value` (no timeout)
    fn wait(&self, value: u64) -> Result<()>;
}

/// GPU image (back buffer or depth buffer)
pub trait GpuResource: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Identity, unique for the lifetime of the backend object that owns the memory
    fn id(&self) -> u64;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> Format;

    fn sample(&self) -> SampleDesc;
}

/// Contiguous range of view slots of one kind
///
/// Dropping the heap releases every view created in it.
pub trait GpuViewHeap: Send {
    fn as_any(&self) -> &dyn Any;

    fn kind(&self) -> ViewKind;

    fn capacity(&self) -> u32;

    /// Handle of slot 0
    fn start(&self) -> ViewHandle;
}

/// Backing memory for recorded commands
pub trait GpuCommandAllocator: Send {
    fn as_any(&self) -> &dyn Any;

    /// Reclaim the memory of every list recorded from this allocator
    ///
    /// Only valid once the GPU has finished executing those lists.
    fn reset(&mut self) -> Result<()>;
}

/// Recorded sequence of GPU commands
pub trait GpuCommandList: Send {
    fn as_any(&self) -> &dyn Any;

    /// Start recording into `allocator`, discarding previous contents
    fn reset(&mut self, allocator: &dyn GpuCommandAllocator) -> Result<()>;

    /// Finish recording
    fn close(&mut self) -> Result<()>;

    fn is_recording(&self) -> bool;

    fn resource_barrier(
        &mut self,
        resource: &dyn GpuResource,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()>;

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()>;

    fn set_scissor(&mut self, rect: &ScissorRect) -> Result<()>;

    fn clear_render_target(&mut self, view: ViewHandle, color: [f32; 4]) -> Result<()>;

    fn clear_depth_stencil(&mut self, view: ViewHandle, depth: f32, stencil: u8) -> Result<()>;
}

/// Ring of presentable images tied to a window
pub trait GpuSwapchain: Send {
    fn as_any(&self) -> &dyn Any;

    fn buffer_count(&self) -> u32;

    /// Whether presents may request tearing
    fn allows_tearing(&self) -> bool;

    /// New reference to back buffer `index`
    fn get_buffer(&self, index: u32) -> Result<Arc<dyn GpuResource>>;

    /// Reallocate the backing store
    ///
    /// Fails while any reference returned by `get_buffer` is still alive.
    fn resize_buffers(
        &mut self,
        buffer_count: u32,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<()>;

    /// Index of the buffer the next frame renders into
    ///
    /// `None` when the surface no longer matches the window. Nothing is
    /// acquired then; frames are skipped until the next resize rebuilds the
    /// buffers.
    fn current_back_buffer_index(&mut self) -> Result<Option<u32>>;

    /// Queue the current back buffer for display
    fn present(
        &mut self,
        queue: &mut dyn GpuQueue,
        sync_interval: u32,
        flags: PresentFlags,
    ) -> Result<()>;
}
