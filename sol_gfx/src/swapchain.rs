//! Presentation surface (swap chain)
//!
//! A fixed ring of N back buffers plus a render-target view heap of exactly N
//! slots. Buffers and views are always torn down and rebuilt together.

use std::sync::Arc;

use crate::adapter::Instance;
use crate::backend::{GpuResource, GpuSwapchain};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::types::{Format, PresentFlags, SurfaceTarget, SwapchainDesc, ViewHandle, ViewKind};
use crate::view_heap::ViewHeap;
use crate::{gfx_debug, gfx_err, gfx_info, gfx_trace};

const SOURCE: &str = "solgfx::Swapchain";

/// Back buffer count for a vsync setting
///
/// Three buffers absorb one extra frame of latency when presents wait for
/// vertical blank.
pub fn buffer_count_for(vsync: bool) -> u32 {
    if vsync {
        3
    } else {
        2
    }
}

/// Back buffers and their views, valid only as a whole
struct BufferRing {
    buffers: Vec<Arc<dyn GpuResource>>,
    views: Vec<ViewHandle>,
    heap: ViewHeap,
}

/// N-buffered presentation surface tied to a native window
pub struct PresentationSurface {
    raw: Option<Box<dyn GpuSwapchain>>,
    ring: Option<BufferRing>,
    buffer_count: u32,
    width: u32,
    height: u32,
    format: Format,
    vsync: bool,
    allow_tearing: bool,
    current_back_buffer: u32,
}

impl PresentationSurface {
    /// Create the swap chain and acquire its buffers and views
    pub fn create(
        instance: &mut Instance,
        device: &mut Device,
        target: SurfaceTarget,
        width: u32,
        height: u32,
        format: Format,
        vsync: bool,
    ) -> Result<Self> {
        let buffer_count = buffer_count_for(vsync);
        let desc = SwapchainDesc {
            width,
            height,
            format,
            buffer_count,
            vsync,
            allow_tearing: !vsync,
        };

        let raw = instance
            .create_swapchain(device.raw()?, device.queue()?, target, &desc)
            .map_err(|e| Error::SurfaceRebuild(format!("Failed to create swap chain: {}", e.detail())))?;

        if raw.buffer_count() != buffer_count {
            return Err(gfx_err!(
                SOURCE,
                Error::SurfaceRebuild(format!(
                    "Swap chain created with {} buffers, {} requested",
                    raw.buffer_count(),
                    buffer_count
                ))
            ));
        }

        // Tearing only when vsync is off and the platform reports support
        let allow_tearing = !vsync && raw.allows_tearing();

        let mut surface = Self {
            raw: Some(raw),
            ring: None,
            buffer_count,
            width,
            height,
            format,
            vsync,
            allow_tearing,
            current_back_buffer: 0,
        };
        surface.acquire_buffers(device)?;

        gfx_info!(
            SOURCE,
            "Swap chain created: {}x{} {:?}, {} buffers, vsync={}, tearing={}",
            width,
            height,
            format,
            buffer_count,
            vsync,
            allow_tearing
        );
        Ok(surface)
    }

    /// Destroy and rebuild every buffer and view at a new size
    ///
    /// The caller must have flushed the queue. Any failure leaves the surface
    /// without buffers, which cannot be presented.
    pub fn resize(&mut self, device: &mut Device, width: u32, height: u32) -> Result<()> {
        if !device.is_idle()? {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("swap chain resize requires a flushed command queue".to_string())
            ));
        }

        self.release_buffers();

        let (buffer_count, format) = (self.buffer_count, self.format);
        self.raw_mut()?
            .resize_buffers(buffer_count, width, height, format)
            .map_err(|e| e.context("Failed to resize swap chain buffers"))?;

        self.width = width;
        self.height = height;
        self.current_back_buffer = 0;

        self.acquire_buffers(device)?;
        gfx_debug!(SOURCE, "Swap chain resized to {}x{}", width, height);
        Ok(())
    }

    /// Present the current back buffer and advance the cursor
    pub fn present(&mut self, device: &mut Device) -> Result<()> {
        if self.ring.is_none() {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("present without back buffers".to_string())
            ));
        }
        let sync_interval = self.sync_interval();
        let flags = self.present_flags();
        let raw = self
            .raw
            .as_mut()
            .ok_or_else(|| Error::InvalidState("swap chain already destroyed".to_string()))?;

        device
            .submit_with_queue(|queue| raw.present(queue, sync_interval, flags))
            .map_err(|e| e.context("Present failed"))?;

        let presented = self.current_back_buffer;
        self.current_back_buffer = (self.current_back_buffer + 1) % self.buffer_count;
        gfx_trace!(SOURCE, "Presented buffer {}, next {}", presented, self.current_back_buffer);
        Ok(())
    }

    /// Align the cursor with the buffer the platform hands out next
    ///
    /// `None` when the surface no longer matches the window and the frame
    /// has to be skipped until the next resize.
    pub fn sync_cursor(&mut self) -> Result<Option<u32>> {
        let buffer_count = self.buffer_count;
        let acquired = self
            .raw_mut()?
            .current_back_buffer_index()
            .map_err(|e| e.context("Failed to acquire back buffer"))?;
        let Some(index) = acquired else {
            gfx_debug!(SOURCE, "Swap chain out of date, waiting for a resize");
            return Ok(None);
        };
        if index >= buffer_count {
            return Err(gfx_err!(
                SOURCE,
                Error::CommandSubmission(format!(
                    "Platform returned back buffer {} of {}",
                    index, buffer_count
                ))
            ));
        }
        if index != self.current_back_buffer {
            gfx_trace!(SOURCE, "Back buffer cursor {} resynced to {}", self.current_back_buffer, index);
            self.current_back_buffer = index;
        }
        Ok(Some(index))
    }

    pub fn current_back_buffer_index(&self) -> u32 {
        self.current_back_buffer
    }

    pub fn current_back_buffer(&self) -> Result<&Arc<dyn GpuResource>> {
        let ring = self.ring()?;
        ring.buffers
            .get(self.current_back_buffer as usize)
            .ok_or_else(|| Error::InvalidState("back buffer cursor out of range".to_string()))
    }

    pub fn current_back_buffer_view(&self) -> Result<ViewHandle> {
        let ring = self.ring()?;
        ring.views
            .get(self.current_back_buffer as usize)
            .copied()
            .ok_or_else(|| Error::InvalidState("back buffer cursor out of range".to_string()))
    }

    /// Identity of every back buffer, in ring order
    pub fn buffer_ids(&self) -> Vec<u64> {
        self.ring
            .as_ref()
            .map(|ring| ring.buffers.iter().map(|b| b.id()).collect())
            .unwrap_or_default()
    }

    /// Back buffer resources currently held
    pub fn live_buffer_count(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.buffers.len())
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn allow_tearing(&self) -> bool {
        self.allow_tearing
    }

    pub fn sync_interval(&self) -> u32 {
        if self.vsync {
            1
        } else {
            0
        }
    }

    pub fn present_flags(&self) -> PresentFlags {
        if self.allow_tearing {
            PresentFlags::ALLOW_TEARING
        } else {
            PresentFlags::empty()
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.raw.is_none()
    }

    /// Release views, buffers and the swap chain (idempotent)
    pub fn destroy(&mut self) {
        self.release_buffers();
        if self.raw.take().is_some() {
            gfx_debug!(SOURCE, "Swap chain destroyed");
        }
    }

    fn acquire_buffers(&mut self, device: &mut Device) -> Result<()> {
        let heap = ViewHeap::new(device, ViewKind::RenderTarget, self.buffer_count)?;
        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| Error::InvalidState("swap chain already destroyed".to_string()))?;

        let mut buffers = Vec::with_capacity(self.buffer_count as usize);
        let mut views = Vec::with_capacity(self.buffer_count as usize);
        for index in 0..self.buffer_count {
            let buffer = raw
                .get_buffer(index)
                .map_err(|e| Error::SurfaceRebuild(format!("Failed to get back buffer {}: {}", index, e.detail())))?;
            let view = heap.create_render_target_view(device, buffer.as_ref(), index)?;
            buffers.push(buffer);
            views.push(view);
        }

        self.ring = Some(BufferRing { buffers, views, heap });
        Ok(())
    }

    fn release_buffers(&mut self) {
        if let Some(ring) = self.ring.take() {
            let BufferRing { buffers, views, heap } = ring;
            drop(views);
            drop(heap);
            drop(buffers);
        }
    }

    fn ring(&self) -> Result<&BufferRing> {
        self.ring
            .as_ref()
            .ok_or_else(|| Error::InvalidState("swap chain has no back buffers".to_string()))
    }

    fn raw_mut(&mut self) -> Result<&mut Box<dyn GpuSwapchain>> {
        self.raw
            .as_mut()
            .ok_or_else(|| Error::InvalidState("swap chain already destroyed".to_string()))
    }
}

impl Drop for PresentationSurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
