//! Logical device, its single command queue and its fence

use crate::adapter::Instance;
use crate::backend::{GpuCommandList, GpuDevice, GpuQueue};
use crate::error::{Error, Result};
use crate::fence::FenceSynchronizer;
use crate::types::{Adapter, DescriptorSizes, FeatureLevel, FeatureSupport, ViewKind};
use crate::{gfx_debug, gfx_err, gfx_info, gfx_trace, gfx_warn};

const SOURCE: &str = "solgfx::Device";

/// Objects that live exactly as long as the device
struct DeviceObjects {
    fence: FenceSynchronizer,
    queue: Box<dyn GpuQueue>,
    raw: Box<dyn GpuDevice>,
}

/// Logical GPU context bound to one adapter
///
/// Owns one command queue (one hardware timeline) and one fence. Destroyed
/// before the [`Instance`] it was created from.
pub struct Device {
    adapter: Adapter,
    descriptor_sizes: DescriptorSizes,
    feature_support: FeatureSupport,
    /// Work was submitted since the last completed flush
    queue_dirty: bool,
    objects: Option<DeviceObjects>,
}

impl Device {
    /// Create a device on `adapter` at [`FeatureLevel::MINIMUM`]
    ///
    /// When that fails, retries once on the instance's reference (software)
    /// adapter if one was observed during enumeration.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceCreation`] when neither attempt succeeds,
    /// [`Error::CommandSubmission`] when the queue or fence cannot be created.
    pub fn initialize(instance: &mut Instance, adapter: &Adapter) -> Result<Self> {
        let (adapter, mut raw) = match instance.create_device(adapter, FeatureLevel::MINIMUM) {
            Ok(raw) => (adapter.clone(), raw),
            Err(primary) => {
                gfx_warn!(
                    SOURCE,
                    "Device creation failed on '{}' ({}), trying the reference adapter",
                    adapter.name,
                    primary.detail()
                );
                let reference = instance.reference_adapter().cloned().ok_or_else(|| {
                    gfx_err!(SOURCE, Error::DeviceCreation(format!(
                        "'{}': {} (no reference adapter available)",
                        adapter.name,
                        primary.detail()
                    )))
                })?;
                let raw = instance
                    .create_device(&reference, FeatureLevel::MINIMUM)
                    .map_err(|fallback| {
                        gfx_err!(SOURCE, Error::DeviceCreation(format!(
                            "'{}': {}; reference adapter '{}': {}",
                            adapter.name,
                            primary.detail(),
                            reference.name,
                            fallback.detail()
                        )))
                    })?;
                (reference, raw)
            }
        };

        // Fixed for the device's lifetime
        let descriptor_sizes = DescriptorSizes {
            render_target: raw.descriptor_increment(ViewKind::RenderTarget),
            depth_stencil: raw.descriptor_increment(ViewKind::DepthStencil),
            shader_resource: raw.descriptor_increment(ViewKind::ShaderResource),
        };
        let feature_support = raw.feature_support();

        let queue = raw
            .create_command_queue()
            .map_err(|e| Error::CommandSubmission(format!("Failed to create command queue: {}", e.detail())))?;
        let fence = raw
            .create_fence(0)
            .map_err(|e| Error::CommandSubmission(format!("Failed to create fence: {}", e.detail())))?;

        gfx_info!(SOURCE, "Device created on '{}'", adapter.name);
        gfx_debug!(
            SOURCE,
            "Descriptor sizes: rtv={} dsv={} srv={}",
            descriptor_sizes.render_target,
            descriptor_sizes.depth_stencil,
            descriptor_sizes.shader_resource
        );

        Ok(Self {
            adapter,
            descriptor_sizes,
            feature_support,
            queue_dirty: false,
            objects: Some(DeviceObjects {
                fence: FenceSynchronizer::new(fence, 0),
                queue,
                raw,
            }),
        })
    }

    /// Adapter the device actually runs on (the reference adapter after a fallback)
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn descriptor_sizes(&self) -> DescriptorSizes {
        self.descriptor_sizes
    }

    pub fn feature_support(&self) -> &FeatureSupport {
        &self.feature_support
    }

    pub fn is_destroyed(&self) -> bool {
        self.objects.is_none()
    }

    pub fn raw(&self) -> Result<&dyn GpuDevice> {
        Ok(self.objects()?.raw.as_ref())
    }

    pub fn raw_mut(&mut self) -> Result<&mut dyn GpuDevice> {
        Ok(self.objects_mut()?.raw.as_mut())
    }

    pub fn queue(&self) -> Result<&dyn GpuQueue> {
        Ok(self.objects()?.queue.as_ref())
    }

    pub fn fence(&self) -> Result<&FenceSynchronizer> {
        Ok(&self.objects()?.fence)
    }

    /// Submit closed command lists to the queue
    pub fn execute_command_lists(&mut self, lists: &[&dyn GpuCommandList]) -> Result<()> {
        let objects = self.objects_mut()?;
        objects
            .queue
            .execute(lists)
            .map_err(|e| Error::CommandSubmission(format!("Failed to execute command lists: {}", e.detail())))?;
        self.queue_dirty = true;
        Ok(())
    }

    /// Run `f` against the queue and count it as a submission (present)
    pub(crate) fn submit_with_queue<T>(
        &mut self,
        f: impl FnOnce(&mut dyn GpuQueue) -> Result<T>,
    ) -> Result<T> {
        let objects = self.objects_mut()?;
        let out = f(objects.queue.as_mut())?;
        self.queue_dirty = true;
        Ok(out)
    }

    /// Signal the fence at the next value
    pub fn signal(&mut self) -> Result<u64> {
        let objects = self.objects_mut()?;
        objects.fence.signal(objects.queue.as_mut())
    }

    /// Block until the GPU has completed `value`
    pub fn wait_until_complete(&self, value: u64) -> Result<()> {
        self.objects()?.fence.wait_until_complete(value)
    }

    /// Drain all submitted GPU work
    ///
    /// A no-op returning the current fence value when nothing was submitted
    /// since the last completed signal.
    pub fn flush_queue(&mut self) -> Result<u64> {
        let dirty = self.queue_dirty;
        let objects = self.objects_mut()?;
        if !dirty && objects.fence.is_idle()? {
            gfx_trace!(SOURCE, "Flush skipped, queue already idle");
            return Ok(objects.fence.current_value());
        }
        let value = objects.fence.flush(objects.queue.as_mut())?;
        self.queue_dirty = false;
        Ok(value)
    }

    /// No submitted work is pending on the GPU
    pub fn is_idle(&self) -> Result<bool> {
        Ok(!self.queue_dirty && self.objects()?.fence.is_idle()?)
    }

    /// Release fence, queue and device handle (idempotent)
    pub fn destroy(&mut self) {
        if let Some(objects) = self.objects.take() {
            let DeviceObjects { fence, queue, raw } = objects;
            drop(fence);
            drop(queue);
            drop(raw);
            gfx_debug!(SOURCE, "Device on '{}' destroyed", self.adapter.name);
        }
    }

    fn objects(&self) -> Result<&DeviceObjects> {
        self.objects
            .as_ref()
            .ok_or_else(|| Error::InvalidState("device already destroyed".to_string()))
    }

    fn objects_mut(&mut self) -> Result<&mut DeviceObjects> {
        self.objects
            .as_mut()
            .ok_or_else(|| Error::InvalidState("device already destroyed".to_string()))
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
