//! Mock backend for unit tests (no GPU required)
//!
//! Every call is recorded as a short string into a shared journal so tests can
//! assert on ordering. The GPU timeline can be made to lag behind the CPU, in
//! which case a signal only completes once it is waited on.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use raw_window_handle::{RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle};

use crate::backend::{
    GpuCommandAllocator, GpuCommandList, GpuDevice, GpuFactory, GpuFence, GpuQueue,
    GpuResource, GpuSwapchain, GpuViewHeap,
};
use crate::error::{Error, Result};
use crate::types::{
    Adapter, DepthStencilDesc, DisplayMode, FeatureLevel, FeatureSupport, Format,
    GpuPreference, OutputDesc, PresentFlags, ResourceState, SampleDesc, ScissorRect,
    SurfaceTarget, SwapchainDesc, ViewHandle, ViewKind, Viewport,
};

/// Surface target for tests; the mock never dereferences it
pub fn test_target() -> SurfaceTarget {
    SurfaceTarget {
        display: RawDisplayHandle::Web(WebDisplayHandle::new()),
        window: RawWindowHandle::Web(WebWindowHandle::new(1)),
    }
}

pub const MOCK_RTV_INCREMENT: u32 = 32;
pub const MOCK_DSV_INCREMENT: u32 = 8;
pub const MOCK_SRV_INCREMENT: u32 = 64;

// ============================================================================
// Configuration knobs
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockAdapter {
    pub name: String,
    pub is_software: bool,
}

impl MockAdapter {
    pub fn hardware(name: &str) -> Self {
        Self { name: name.to_string(), is_software: false }
    }

    pub fn software(name: &str) -> Self {
        Self { name: name.to_string(), is_software: true }
    }
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Adapters in high-performance order
    pub adapters: Vec<MockAdapter>,
    pub fail_enumeration: bool,
    /// Adapter names on which device creation fails
    pub failing_devices: Vec<String>,
    pub msaa_quality_levels: u32,
    pub tearing_supported: bool,
    pub fail_resize: bool,
    /// Back buffer acquisition fails outright
    pub fail_acquire: bool,
    /// Back buffer acquisition reports a surface that no longer fits the window
    pub acquire_out_of_date: bool,
    /// Signals complete only when waited on
    pub gpu_lag: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            adapters: vec![
                MockAdapter::hardware("Mock Discrete GPU"),
                MockAdapter::hardware("Mock Integrated GPU"),
                MockAdapter::software("Mock Software Rasterizer"),
            ],
            fail_enumeration: false,
            failing_devices: Vec::new(),
            msaa_quality_levels: 4,
            tearing_supported: true,
            fail_resize: false,
            fail_acquire: false,
            acquire_out_of_date: false,
            gpu_lag: true,
        }
    }
}

// ============================================================================
// Shared mock GPU
// ============================================================================

#[derive(Debug, Default)]
struct FenceState {
    completed: u64,
    pending: Vec<u64>,
}

struct MockState {
    config: MockConfig,
    next_id: u64,
    next_heap_base: usize,
    fences: Vec<Arc<Mutex<FenceState>>>,
}

/// Handle shared by every mock object of one test
#[derive(Clone)]
pub struct MockGpu {
    pub journal: Arc<Mutex<Vec<String>>>,
    state: Arc<Mutex<MockState>>,
    live_back_buffers: Arc<AtomicUsize>,
}

impl MockGpu {
    pub fn new(config: MockConfig) -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(MockState {
                config,
                next_id: 1,
                next_heap_base: 0x1000,
                fences: Vec::new(),
            })),
            live_back_buffers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn factory(&self) -> Box<dyn GpuFactory> {
        Box::new(MockFactory { gpu: self.clone() })
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Number of journal entries starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    /// Position of the first entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.journal.lock().unwrap().iter().position(|e| e.starts_with(prefix))
    }

    /// Position of the last entry starting with `prefix`
    pub fn last_position(&self, prefix: &str) -> Option<usize> {
        self.journal.lock().unwrap().iter().rposition(|e| e.starts_with(prefix))
    }

    pub fn live_back_buffers(&self) -> usize {
        self.live_back_buffers.load(Ordering::SeqCst)
    }

    pub fn set_fail_resize(&self, fail: bool) {
        self.state.lock().unwrap().config.fail_resize = fail;
    }

    pub fn set_fail_acquire(&self, fail: bool) {
        self.state.lock().unwrap().config.fail_acquire = fail;
    }

    pub fn set_acquire_out_of_date(&self, out_of_date: bool) {
        self.state.lock().unwrap().config.acquire_out_of_date = out_of_date;
    }

    pub fn set_msaa_quality_levels(&self, levels: u32) {
        self.state.lock().unwrap().config.msaa_quality_levels = levels;
    }

    /// Let the GPU catch up with every pending signal
    pub fn complete_pending_work(&self) {
        let state = self.state.lock().unwrap();
        for fence in &state.fences {
            let mut fence = fence.lock().unwrap();
            if let Some(&max) = fence.pending.iter().max() {
                fence.completed = fence.completed.max(max);
            }
            fence.pending.clear();
        }
    }

    fn config(&self) -> MockConfig {
        self.state.lock().unwrap().config.clone()
    }

    fn next_id(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        id
    }
}

// ============================================================================
// Mock Factory
// ============================================================================

pub struct MockFactory {
    gpu: MockGpu,
}

impl GpuFactory for MockFactory {
    fn backend_name(&self) -> &str {
        "mock"
    }

    fn enumerate_adapters(&mut self, preference: GpuPreference) -> Result<Vec<Adapter>> {
        self.gpu.record(format!("factory.enumerate({:?})", preference));
        let config = self.gpu.config();
        if config.fail_enumeration {
            return Err(Error::FactoryCreation("mock factory unavailable".to_string()));
        }

        let mut ranked = config.adapters.clone();
        if preference == GpuPreference::MinimumPower {
            ranked.reverse();
        }
        Ok(ranked
            .iter()
            .enumerate()
            .map(|(ordinal, a)| Adapter {
                ordinal: ordinal as u32,
                name: a.name.clone(),
                is_software: a.is_software,
                vendor_id: if a.is_software { 0x1414 } else { 0x10DE },
                device_id: ordinal as u32 + 1,
                dedicated_video_memory: if a.is_software { 0 } else { 8 << 30 },
            })
            .collect())
    }

    fn adapter_outputs(&self, adapter: &Adapter, _format: Format) -> Result<Vec<OutputDesc>> {
        if adapter.is_software {
            return Ok(Vec::new());
        }
        Ok(vec![OutputDesc {
            name: format!("{} Display 0", adapter.name),
            modes: vec![
                DisplayMode { width: 1280, height: 720, refresh_numerator: 60, refresh_denominator: 1 },
                DisplayMode { width: 1920, height: 1080, refresh_numerator: 60000, refresh_denominator: 1001 },
            ],
        }])
    }

    fn create_device(
        &mut self,
        adapter: &Adapter,
        minimum_level: FeatureLevel,
    ) -> Result<Box<dyn GpuDevice>> {
        self.gpu.record(format!("factory.create_device({})", adapter.name));
        let config = self.gpu.config();
        if config.failing_devices.iter().any(|n| n == &adapter.name) {
            return Err(Error::DeviceCreation(format!(
                "mock adapter '{}' does not support level {}",
                adapter.name, minimum_level
            )));
        }
        Ok(Box::new(MockDevice { gpu: self.gpu.clone(), adapter_name: adapter.name.clone() }))
    }

    fn create_swapchain(
        &mut self,
        _device: &dyn GpuDevice,
        _queue: &dyn GpuQueue,
        _target: SurfaceTarget,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn GpuSwapchain>> {
        let config = self.gpu.config();
        let allow_tearing = desc.allow_tearing && config.tearing_supported;
        self.gpu.record(format!(
            "factory.create_swapchain(count={}, {}x{}, tearing={})",
            desc.buffer_count, desc.width, desc.height, allow_tearing
        ));
        let buffer_ids = (0..desc.buffer_count).map(|_| self.gpu.next_id()).collect();
        Ok(Box::new(MockSwapchain {
            gpu: self.gpu.clone(),
            buffer_ids,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            current: 0,
            allow_tearing,
        }))
    }
}

// ============================================================================
// Mock Device
// ============================================================================

pub struct MockDevice {
    gpu: MockGpu,
    pub adapter_name: String,
}

impl GpuDevice for MockDevice {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn create_command_queue(&mut self) -> Result<Box<dyn GpuQueue>> {
        self.gpu.record("device.create_queue");
        Ok(Box::new(MockQueue { gpu: self.gpu.clone() }))
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<Box<dyn GpuFence>> {
        self.gpu.record(format!("device.create_fence({})", initial_value));
        let state = Arc::new(Mutex::new(FenceState { completed: initial_value, pending: Vec::new() }));
        self.gpu.state.lock().unwrap().fences.push(state.clone());
        Ok(Box::new(MockFence { gpu: self.gpu.clone(), state }))
    }

    fn descriptor_increment(&self, kind: ViewKind) -> u32 {
        self.gpu.record(format!("device.descriptor_increment({:?})", kind));
        match kind {
            ViewKind::RenderTarget => MOCK_RTV_INCREMENT,
            ViewKind::DepthStencil => MOCK_DSV_INCREMENT,
            ViewKind::ShaderResource => MOCK_SRV_INCREMENT,
        }
    }

    fn feature_support(&self) -> FeatureSupport {
        FeatureSupport {
            feature_levels: vec![
                FeatureLevel::new(1, 3),
                FeatureLevel::new(1, 2),
                FeatureLevel::new(1, 1),
                FeatureLevel::new(1, 0),
            ],
            ray_tracing: false,
        }
    }

    fn multisample_quality_levels(&self, _format: Format, sample_count: u32) -> Result<u32> {
        self.gpu.record(format!("device.msaa_quality({})", sample_count));
        if sample_count == 1 {
            return Ok(1);
        }
        Ok(self.gpu.config().msaa_quality_levels)
    }

    fn create_depth_stencil_buffer(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<Arc<dyn GpuResource>> {
        let id = self.gpu.next_id();
        self.gpu.record(format!(
            "device.create_depth(id={}, {}x{}, {:?}, samples={}/{})",
            id, desc.width, desc.height, desc.format, desc.sample.count, desc.sample.quality
        ));
        Ok(Arc::new(MockResource {
            gpu: self.gpu.clone(),
            id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            sample: desc.sample,
            live: None,
        }))
    }

    fn create_view_heap(&mut self, kind: ViewKind, capacity: u32) -> Result<Box<dyn GpuViewHeap>> {
        let start = {
            let mut state = self.gpu.state.lock().unwrap();
            let base = state.next_heap_base;
            state.next_heap_base += 0x1000;
            ViewHandle(base)
        };
        self.gpu.record(format!("device.create_heap({:?}, {})", kind, capacity));
        Ok(Box::new(MockViewHeap { gpu: self.gpu.clone(), kind, capacity, start }))
    }

    fn create_render_target_view(
        &mut self,
        resource: &dyn GpuResource,
        heap: &dyn GpuViewHeap,
        slot: u32,
    ) -> Result<ViewHandle> {
        if heap.kind() != ViewKind::RenderTarget || slot >= heap.capacity() {
            return Err(Error::SurfaceRebuild(format!(
                "render target view slot {} invalid for {:?} heap of {}",
                slot,
                heap.kind(),
                heap.capacity()
            )));
        }
        self.gpu.record(format!("device.create_rtv(res={}, slot={})", resource.id(), slot));
        Ok(heap.start().offset(slot, MOCK_RTV_INCREMENT))
    }

    fn create_depth_stencil_view(
        &mut self,
        resource: &dyn GpuResource,
        format: Format,
        heap: &dyn GpuViewHeap,
        slot: u32,
    ) -> Result<ViewHandle> {
        if heap.kind() != ViewKind::DepthStencil || slot >= heap.capacity() {
            return Err(Error::SurfaceRebuild(format!(
                "depth stencil view slot {} invalid for {:?} heap of {}",
                slot,
                heap.kind(),
                heap.capacity()
            )));
        }
        if !format.is_depth_stencil() {
            return Err(Error::SurfaceRebuild(format!("{:?} is not a depth format", format)));
        }
        self.gpu.record(format!("device.create_dsv(res={}, {:?})", resource.id(), format));
        Ok(heap.start().offset(slot, MOCK_DSV_INCREMENT))
    }

    fn create_command_allocator(&mut self) -> Result<Box<dyn GpuCommandAllocator>> {
        self.gpu.record("device.create_allocator");
        Ok(Box::new(MockCommandAllocator { gpu: self.gpu.clone() }))
    }

    fn create_command_list(
        &mut self,
        _allocator: &dyn GpuCommandAllocator,
    ) -> Result<Box<dyn GpuCommandList>> {
        self.gpu.record("device.create_command_list");
        Ok(Box::new(MockCommandList { gpu: self.gpu.clone(), recording: false }))
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.gpu.record("device.release");
    }
}

// ============================================================================
// Mock Queue / Fence
// ============================================================================

pub struct MockQueue {
    gpu: MockGpu,
}

impl GpuQueue for MockQueue {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn execute(&mut self, lists: &[&dyn GpuCommandList]) -> Result<()> {
        if lists.iter().any(|l| l.is_recording()) {
            return Err(Error::CommandSubmission("executing an open command list".to_string()));
        }
        self.gpu.record(format!("queue.execute({})", lists.len()));
        Ok(())
    }

    fn signal(&mut self, fence: &dyn GpuFence, value: u64) -> Result<()> {
        let fence = fence
            .as_any()
            .downcast_ref::<MockFence>()
            .ok_or_else(|| Error::CommandSubmission("foreign fence".to_string()))?;
        self.gpu.record(format!("queue.signal({})", value));
        let lag = self.gpu.config().gpu_lag;
        let mut state = fence.state.lock().unwrap();
        if lag {
            state.pending.push(value);
        } else {
            state.completed = state.completed.max(value);
        }
        Ok(())
    }
}

impl Drop for MockQueue {
    fn drop(&mut self) {
        self.gpu.record("queue.release");
    }
}

pub struct MockFence {
    gpu: MockGpu,
    state: Arc<Mutex<FenceState>>,
}

impl GpuFence for MockFence {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn completed_value(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().completed)
    }

    fn wait(&self, value: u64) -> Result<()> {
        self.gpu.record(format!("fence.wait({})", value));
        let mut state = self.state.lock().unwrap();
        if state.completed >= value {
            return Ok(());
        }
        // GPU completes in submission order
        match state.pending.iter().copied().filter(|&v| v >= value).min() {
            Some(reached) => {
                state.completed = reached;
                state.pending.retain(|&v| v > reached);
                Ok(())
            }
            None => Err(Error::CommandSubmission(format!(
                "waiting for fence value {} that was never signaled",
                value
            ))),
        }
    }
}

impl Drop for MockFence {
    fn drop(&mut self) {
        self.gpu.record("fence.release");
    }
}

// ============================================================================
// Mock Resource / View Heap
// ============================================================================

pub struct MockResource {
    gpu: MockGpu,
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub sample: SampleDesc,
    live: Option<Arc<AtomicUsize>>,
}

impl GpuResource for MockResource {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> Format {
        self.format
    }

    fn sample(&self) -> SampleDesc {
        self.sample
    }
}

impl Drop for MockResource {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.fetch_sub(1, Ordering::SeqCst);
        }
        self.gpu.record(format!("resource.release({})", self.id));
    }
}

pub struct MockViewHeap {
    gpu: MockGpu,
    kind: ViewKind,
    capacity: u32,
    start: ViewHandle,
}

impl GpuViewHeap for MockViewHeap {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> ViewKind {
        self.kind
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn start(&self) -> ViewHandle {
        self.start
    }
}

impl Drop for MockViewHeap {
    fn drop(&mut self) {
        self.gpu.record(format!("heap.release({:?})", self.kind));
    }
}

// ============================================================================
// Mock Command Allocator / List
// ============================================================================

pub struct MockCommandAllocator {
    gpu: MockGpu,
}

impl GpuCommandAllocator for MockCommandAllocator {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn reset(&mut self) -> Result<()> {
        self.gpu.record("allocator.reset");
        Ok(())
    }
}

impl Drop for MockCommandAllocator {
    fn drop(&mut self) {
        self.gpu.record("allocator.release");
    }
}

pub struct MockCommandList {
    gpu: MockGpu,
    recording: bool,
}

impl MockCommandList {
    fn require_recording(&self, command: &str) -> Result<()> {
        if self.recording {
            Ok(())
        } else {
            Err(Error::CommandSubmission(format!("{} on a closed command list", command)))
        }
    }
}

impl GpuCommandList for MockCommandList {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn reset(&mut self, _allocator: &dyn GpuCommandAllocator) -> Result<()> {
        if self.recording {
            return Err(Error::CommandSubmission("reset of an open command list".to_string()));
        }
        self.recording = true;
        self.gpu.record("list.reset");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.require_recording("close")?;
        self.recording = false;
        self.gpu.record("list.close");
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn resource_barrier(
        &mut self,
        resource: &dyn GpuResource,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()> {
        self.require_recording("resource_barrier")?;
        self.gpu.record(format!("list.barrier({}: {:?} -> {:?})", resource.id(), before, after));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;
        self.gpu.record(format!("list.viewport({}x{})", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, rect: &ScissorRect) -> Result<()> {
        self.require_recording("set_scissor")?;
        self.gpu.record(format!("list.scissor({}x{})", rect.right, rect.bottom));
        Ok(())
    }

    fn clear_render_target(&mut self, view: ViewHandle, _color: [f32; 4]) -> Result<()> {
        self.require_recording("clear_render_target")?;
        self.gpu.record(format!("list.clear_rtv({:#x})", view.0));
        Ok(())
    }

    fn clear_depth_stencil(&mut self, view: ViewHandle, depth: f32, stencil: u8) -> Result<()> {
        self.require_recording("clear_depth_stencil")?;
        self.gpu.record(format!("list.clear_dsv({:#x}, {}, {})", view.0, depth, stencil));
        Ok(())
    }
}

impl Drop for MockCommandList {
    fn drop(&mut self) {
        self.gpu.record("list.release");
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    gpu: MockGpu,
    buffer_ids: Vec<u64>,
    width: u32,
    height: u32,
    format: Format,
    current: u32,
    allow_tearing: bool,
}

impl GpuSwapchain for MockSwapchain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn buffer_count(&self) -> u32 {
        self.buffer_ids.len() as u32
    }

    fn allows_tearing(&self) -> bool {
        self.allow_tearing
    }

    fn get_buffer(&self, index: u32) -> Result<Arc<dyn GpuResource>> {
        let id = *self.buffer_ids.get(index as usize).ok_or_else(|| {
            Error::SurfaceRebuild(format!("back buffer {} out of range", index))
        })?;
        self.gpu.live_back_buffers.fetch_add(1, Ordering::SeqCst);
        self.gpu.record(format!("swapchain.get_buffer({})", index));
        Ok(Arc::new(MockResource {
            gpu: self.gpu.clone(),
            id,
            width: self.width,
            height: self.height,
            format: self.format,
            sample: SampleDesc::SINGLE,
            live: Some(self.gpu.live_back_buffers.clone()),
        }))
    }

    fn resize_buffers(
        &mut self,
        buffer_count: u32,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<()> {
        let outstanding = self.gpu.live_back_buffers();
        if outstanding > 0 {
            return Err(Error::SurfaceRebuild(format!(
                "{} back buffer references still alive",
                outstanding
            )));
        }
        if self.gpu.config().fail_resize {
            return Err(Error::SurfaceRebuild("mock resize failure".to_string()));
        }
        self.gpu.record(format!("swapchain.resize_buffers({}, {}x{})", buffer_count, width, height));
        self.buffer_ids = (0..buffer_count).map(|_| self.gpu.next_id()).collect();
        self.width = width;
        self.height = height;
        self.format = format;
        self.current = 0;
        Ok(())
    }

    fn current_back_buffer_index(&mut self) -> Result<Option<u32>> {
        let config = self.gpu.config();
        if config.fail_acquire {
            return Err(Error::SurfaceRebuild("swapchain lost".to_string()));
        }
        if config.acquire_out_of_date {
            self.gpu.record("swapchain.acquire(out of date)");
            return Ok(None);
        }
        Ok(Some(self.current))
    }

    fn present(
        &mut self,
        _queue: &mut dyn GpuQueue,
        sync_interval: u32,
        flags: PresentFlags,
    ) -> Result<()> {
        if flags.contains(PresentFlags::ALLOW_TEARING) && (!self.allow_tearing || sync_interval != 0) {
            return Err(Error::CommandSubmission(
                "tearing requested on a swap chain that does not allow it".to_string(),
            ));
        }
        self.gpu.record(format!(
            "swapchain.present(sync={}, tearing={})",
            sync_interval,
            flags.contains(PresentFlags::ALLOW_TEARING)
        ));
        self.current = (self.current + 1) % self.buffer_count().max(1);
        Ok(())
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        self.gpu.record("swapchain.release");
    }
}
