//! Adapter enumeration
//!
//! The [`Instance`] owns the platform factory and the list of usable
//! (hardware) adapters for its whole lifetime.

use crate::backend::{GpuDevice, GpuFactory, GpuQueue, GpuSwapchain};
use crate::error::{Error, Result};
use crate::types::{Adapter, FeatureLevel, Format, GpuPreference, OutputDesc, SurfaceTarget, SwapchainDesc};
use crate::{gfx_bail, gfx_debug, gfx_info, gfx_warn};

const SOURCE: &str = "solgfx::Instance";

/// Result of filtering a raw enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSelection {
    /// Hardware adapters in ranked order
    pub hardware: Vec<Adapter>,
    /// First software adapter seen, kept as the device-creation fallback
    pub software: Option<Adapter>,
}

/// Split a ranked enumeration into hardware adapters and the software fallback
///
/// Fails with [`Error::NoHardwareAdapter`] when nothing but software
/// adapters (or nothing at all) was enumerated.
pub fn filter_adapters(enumerated: Vec<Adapter>) -> Result<AdapterSelection> {
    let mut hardware = Vec::with_capacity(enumerated.len());
    let mut software = None;

    for adapter in enumerated {
        if adapter.is_software {
            gfx_debug!(SOURCE, "Skipping software adapter '{}'", adapter.name);
            if software.is_none() {
                software = Some(adapter);
            }
        } else {
            hardware.push(adapter);
        }
    }

    if hardware.is_empty() {
        if software.is_some() {
            gfx_warn!(SOURCE, "Only software adapters are present, refusing to run on them");
        }
        return Err(Error::NoHardwareAdapter);
    }

    Ok(AdapterSelection { hardware, software })
}

/// Process-wide graphics factory plus its adapter list
///
/// Created once at startup and destroyed once at shutdown, after the device.
pub struct Instance {
    factory: Option<Box<dyn GpuFactory>>,
    adapters: Vec<Adapter>,
    reference_adapter: Option<Adapter>,
}

impl Instance {
    /// Take ownership of a backend factory and enumerate its adapters
    ///
    /// # Errors
    ///
    /// [`Error::FactoryCreation`] if enumeration is unavailable,
    /// [`Error::NoHardwareAdapter`] if only software adapters exist.
    pub fn initialize(factory: Box<dyn GpuFactory>, prefer_high_performance: bool) -> Result<Self> {
        let mut instance = Self {
            factory: Some(factory),
            adapters: Vec::new(),
            reference_adapter: None,
        };
        instance.enumerate_adapters(prefer_high_performance)?;
        Ok(instance)
    }

    /// Re-enumerate adapters, ranked high-performance first when requested
    pub fn enumerate_adapters(&mut self, prefer_high_performance: bool) -> Result<&[Adapter]> {
        let preference = GpuPreference::from_high_performance(prefer_high_performance);
        let factory = self.factory_mut()?;
        let backend = factory.backend_name().to_string();

        let enumerated = factory.enumerate_adapters(preference).map_err(|e| match e {
            Error::FactoryCreation(_) => e,
            other => Error::FactoryCreation(other.detail()),
        })?;

        let selection = match filter_adapters(enumerated) {
            Ok(selection) => selection,
            Err(e) => gfx_bail!(SOURCE, e),
        };

        for adapter in &selection.hardware {
            gfx_info!(
                SOURCE,
                "[{}] Adapter {}: {} (vendor {:#06x}, device {:#06x}, {} MiB)",
                backend,
                adapter.ordinal,
                adapter.name,
                adapter.vendor_id,
                adapter.device_id,
                adapter.dedicated_video_memory >> 20
            );
        }

        self.adapters = selection.hardware;
        self.reference_adapter = selection.software;
        Ok(&self.adapters)
    }

    /// Hardware adapters in ranked order (never empty after initialize)
    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    pub fn adapter(&self, index: usize) -> Option<&Adapter> {
        self.adapters.get(index)
    }

    /// Software adapter observed during enumeration
    ///
    /// Only used as the fallback when device creation fails on the chosen adapter.
    pub fn reference_adapter(&self) -> Option<&Adapter> {
        self.reference_adapter.as_ref()
    }

    /// Outputs of an adapter with their display modes for `format`
    pub fn adapter_outputs(&self, adapter: &Adapter, format: Format) -> Result<Vec<OutputDesc>> {
        self.factory()?.adapter_outputs(adapter, format)
    }

    pub fn is_destroyed(&self) -> bool {
        self.factory.is_none()
    }

    /// Release the factory and adapter list (idempotent)
    pub fn destroy(&mut self) {
        if self.factory.take().is_some() {
            self.adapters.clear();
            self.reference_adapter = None;
            gfx_debug!(SOURCE, "Instance destroyed");
        }
    }

    pub(crate) fn create_device(
        &mut self,
        adapter: &Adapter,
        minimum_level: FeatureLevel,
    ) -> Result<Box<dyn GpuDevice>> {
        self.factory_mut()?.create_device(adapter, minimum_level)
    }

    pub(crate) fn create_swapchain(
        &mut self,
        device: &dyn GpuDevice,
        queue: &dyn GpuQueue,
        target: SurfaceTarget,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn GpuSwapchain>> {
        self.factory_mut()?.create_swapchain(device, queue, target, desc)
    }

    fn factory(&self) -> Result<&dyn GpuFactory> {
        self.factory
            .as_deref()
            .ok_or_else(|| Error::InvalidState("instance already destroyed".to_string()))
    }

    fn factory_mut(&mut self) -> Result<&mut Box<dyn GpuFactory>> {
        self.factory
            .as_mut()
            .ok_or_else(|| Error::InvalidState("instance already destroyed".to_string()))
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
