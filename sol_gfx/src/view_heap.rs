//! View heaps
//!
//! A heap is a contiguous run of view slots of one kind. Slot handles are
//! computed as `start + slot * increment` with the increment the device cached
//! at creation.

use crate::backend::{GpuResource, GpuViewHeap};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::types::{Format, ViewHandle, ViewKind};

/// Owned view heap with checked slot arithmetic
pub struct ViewHeap {
    raw: Box<dyn GpuViewHeap>,
    increment: u32,
}

impl ViewHeap {
    /// Create a heap of exactly `capacity` slots
    pub fn new(device: &mut Device, kind: ViewKind, capacity: u32) -> Result<Self> {
        let increment = device.descriptor_sizes().for_kind(kind);
        let raw = device.raw_mut()?.create_view_heap(kind, capacity).map_err(|e| {
            Error::SurfaceRebuild(format!("Failed to create {:?} view heap: {}", kind, e.detail()))
        })?;
        Ok(Self { raw, increment })
    }

    pub fn kind(&self) -> ViewKind {
        self.raw.kind()
    }

    pub fn capacity(&self) -> u32 {
        self.raw.capacity()
    }

    /// Handle of `slot`
    pub fn handle(&self, slot: u32) -> Result<ViewHandle> {
        if slot >= self.capacity() {
            return Err(Error::SurfaceRebuild(format!(
                "View slot {} out of range for a {:?} heap of {}",
                slot,
                self.kind(),
                self.capacity()
            )));
        }
        Ok(self.raw.start().offset(slot, self.increment))
    }

    /// Create a render-target view of `resource` in `slot`
    pub fn create_render_target_view(
        &self,
        device: &mut Device,
        resource: &dyn GpuResource,
        slot: u32,
    ) -> Result<ViewHandle> {
        let expected = self.handle(slot)?;
        let handle = device
            .raw_mut()?
            .create_render_target_view(resource, self.raw.as_ref(), slot)
            .map_err(|e| Error::SurfaceRebuild(format!("Failed to create render target view {}: {}", slot, e.detail())))?;
        Self::check_handle(expected, handle)
    }

    /// Create a depth-stencil view of `resource` typed as `format` in `slot`
    pub fn create_depth_stencil_view(
        &self,
        device: &mut Device,
        resource: &dyn GpuResource,
        format: Format,
        slot: u32,
    ) -> Result<ViewHandle> {
        let expected = self.handle(slot)?;
        let handle = device
            .raw_mut()?
            .create_depth_stencil_view(resource, format, self.raw.as_ref(), slot)
            .map_err(|e| Error::SurfaceRebuild(format!("Failed to create depth stencil view: {}", e.detail())))?;
        Self::check_handle(expected, handle)
    }

    fn check_handle(expected: ViewHandle, actual: ViewHandle) -> Result<ViewHandle> {
        if expected != actual {
            return Err(Error::SurfaceRebuild(format!(
                "Backend placed view at {:#x}, expected {:#x}",
                actual.0, expected.0
            )));
        }
        Ok(actual)
    }
}

#[cfg(test)]
#[path = "view_heap_tests.rs"]
mod tests;
