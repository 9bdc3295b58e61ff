//! Depth/stencil surface
//!
//! One depth buffer sized to the client area plus one depth-stencil view,
//! recreated alongside the swap chain on every resize.

use std::sync::Arc;

use crate::backend::{GpuCommandList, GpuResource};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::types::{DepthStencilDesc, Format, ResourceState, SampleDesc, ViewHandle, ViewKind};
use crate::view_heap::ViewHeap;
use crate::{gfx_debug, gfx_err};

const SOURCE: &str = "solgfx::Depth";

/// Depth value the buffer is cleared to
pub const DEPTH_CLEAR_VALUE: f32 = 1.0;

/// Stencil value the buffer is cleared to
pub const STENCIL_CLEAR_VALUE: u8 = 0;

/// Sample count used when multisampling is enabled
pub const MSAA_SAMPLE_COUNT: u32 = 4;

/// Number of quality levels for `sample_count` samples of `format`
///
/// # Errors
///
/// [`Error::UnsupportedSampleQuality`] when the device reports zero levels.
/// There is no silent fallback to fewer samples.
pub fn query_msaa_quality(device: &Device, format: Format, sample_count: u32) -> Result<u32> {
    let levels = device
        .raw()?
        .multisample_quality_levels(format, sample_count)
        .map_err(|e| {
            Error::CommandSubmission(format!(
                "Failed to query {}x quality levels for {:?}: {}",
                sample_count,
                format,
                e.detail()
            ))
        })?;
    if levels == 0 {
        return Err(gfx_err!(SOURCE, Error::UnsupportedSampleQuality { sample_count }));
    }
    gfx_debug!(SOURCE, "{:?} supports {} quality levels at {}x", format, levels, sample_count);
    Ok(levels)
}

/// Sample description for the depth buffer
///
/// 4 samples at the highest reported quality when multisampling is on,
/// a single sample otherwise.
pub fn sample_desc_for(msaa_4x: bool, quality_levels: u32) -> SampleDesc {
    if msaa_4x && quality_levels > 0 {
        SampleDesc { count: MSAA_SAMPLE_COUNT, quality: quality_levels - 1 }
    } else {
        SampleDesc::SINGLE
    }
}

/// Depth buffer plus its view
pub struct DepthSurface {
    // Field order is drop order: view heap before the resource
    heap: ViewHeap,
    view: ViewHandle,
    resource: Arc<dyn GpuResource>,
    format: Format,
    sample: SampleDesc,
}

impl DepthSurface {
    /// Allocate a typeless depth buffer and its `format` view
    ///
    /// A multisampled `sample` is checked against the device first.
    pub fn create(
        device: &mut Device,
        width: u32,
        height: u32,
        format: Format,
        sample: SampleDesc,
    ) -> Result<Self> {
        if sample.count > 1 {
            let levels = query_msaa_quality(device, format, sample.count)?;
            if sample.quality >= levels {
                return Err(gfx_err!(SOURCE, Error::UnsupportedSampleQuality { sample_count: sample.count }));
            }
        }

        let desc = DepthStencilDesc {
            width,
            height,
            format: format.typeless(),
            sample,
            clear_depth: DEPTH_CLEAR_VALUE,
            clear_stencil: STENCIL_CLEAR_VALUE,
        };
        let resource = device
            .raw_mut()?
            .create_depth_stencil_buffer(&desc)
            .map_err(|e| Error::SurfaceRebuild(format!("Failed to create depth buffer: {}", e.detail())))?;

        let heap = ViewHeap::new(device, ViewKind::DepthStencil, 1)?;
        let view = heap.create_depth_stencil_view(device, resource.as_ref(), format, 0)?;

        gfx_debug!(
            SOURCE,
            "Depth buffer {}x{} {:?}, {} sample(s) quality {}",
            width,
            height,
            format,
            sample.count,
            sample.quality
        );
        Ok(Self { heap, view, resource, format, sample })
    }

    /// Record the transition from the creation state to depth-write
    ///
    /// Must be executed before the buffer is first rendered to.
    pub fn record_initial_transition(&self, list: &mut dyn GpuCommandList) -> Result<()> {
        list.resource_barrier(self.resource.as_ref(), ResourceState::Common, ResourceState::DepthWrite)
            .map_err(|e| Error::CommandSubmission(format!("Failed to record depth transition: {}", e.detail())))
    }

    pub fn view(&self) -> ViewHandle {
        self.view
    }

    pub fn resource(&self) -> &Arc<dyn GpuResource> {
        &self.resource
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn sample(&self) -> SampleDesc {
        self.sample
    }

    pub fn width(&self) -> u32 {
        self.resource.width()
    }

    pub fn height(&self) -> u32 {
        self.resource.height()
    }

    pub fn heap(&self) -> &ViewHeap {
        &self.heap
    }
}

#[cfg(test)]
#[path = "depth_tests.rs"]
mod tests;
