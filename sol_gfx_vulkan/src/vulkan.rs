/// VulkanFactory - Vulkan implementation of GpuFactory
///
/// Owns the Vulkan instance, ranks physical devices and creates logical
/// devices and swap chains.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::RawDisplayHandle;
use sol_gfx::solgfx::backend::{GpuDevice, GpuFactory, GpuQueue, GpuSwapchain};
use sol_gfx::solgfx::{
    Adapter, Error, FeatureLevel, FeatureSupport, Format, GfxConfig, GpuPreference, OutputDesc,
    Result, SurfaceTarget, SwapchainDesc,
};
use sol_gfx::{gfx_debug, gfx_error, gfx_info, gfx_trace, gfx_warn};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_context::{DeviceContext, VulkanInstance};
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_format::{
    api_version_to_level, device_type_rank, level_to_api_version, supported_feature_levels,
};
use crate::vulkan_swapchain::VulkanSwapchain;

const SOURCE: &str = "solgfx::vulkan";

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan platform factory
pub struct VulkanFactory {
    instance: Arc<VulkanInstance>,
    /// Physical devices in the order of the last enumeration
    ranked: Vec<vk::PhysicalDevice>,
}

impl VulkanFactory {
    /// Create the Vulkan instance for windows of `display`
    ///
    /// Validation is only enabled when both `config.enable_validation` is set
    /// and the crate is built with the `vulkan-validation` feature.
    pub fn new(display: RawDisplayHandle, config: &GfxConfig) -> Result<Self> {
        let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
        if config.enable_validation && !validation {
            gfx_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
        }

        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                gfx_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::FactoryCreation(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let validation = validation && Self::has_validation_layer(&entry);

            let app_name = CString::new(config.app_name.as_str()).unwrap_or_default();
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"SolGfx")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(level_to_api_version(FeatureLevel::MINIMUM));

            let mut extension_names = ash_window::enumerate_required_extensions(display)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to get required extensions: {}", e);
                    Error::FactoryCreation(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                gfx_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::FactoryCreation(format!("Failed to create instance: {:?}", e))
            })?;

            let (debug_utils_loader, debug_messenger) = if validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config();

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                            | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        crate::debug::cleanup_debug_config();
                        instance.destroy_instance(None);
                        gfx_error!(SOURCE, "Failed to create debug messenger: {:?}", e);
                        return Err(Error::FactoryCreation(format!(
                            "Failed to create debug messenger: {:?}",
                            e
                        )));
                    }
                }
            } else {
                (None, None)
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            gfx_info!(SOURCE, "Vulkan instance created (validation={})", validation);

            Ok(Self {
                instance: Arc::new(VulkanInstance {
                    entry,
                    instance,
                    surface_loader,
                    debug_utils_loader,
                    debug_messenger,
                }),
                ranked: Vec::new(),
            })
        }
    }

    fn has_validation_layer(entry: &ash::Entry) -> bool {
        let layers = match unsafe { entry.enumerate_instance_layer_properties() } {
            Ok(layers) => layers,
            Err(e) => {
                gfx_warn!(SOURCE, "Failed to enumerate instance layers: {:?}", e);
                return false;
            }
        };
        let found = layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().map(|name| name == VALIDATION_LAYER).unwrap_or(false));
        if !found {
            gfx_warn!(SOURCE, "{:?} not installed, continuing without validation", VALIDATION_LAYER);
        }
        found
    }

    fn describe(&self, ordinal: u32, physical_device: vk::PhysicalDevice) -> Adapter {
        let instance = &self.instance.instance;
        let (props, memory) = unsafe {
            (
                instance.get_physical_device_properties(physical_device),
                instance.get_physical_device_memory_properties(physical_device),
            )
        };

        let name = props
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown device".to_string());

        let heap_count = (memory.memory_heap_count as usize).min(memory.memory_heaps.len());
        let dedicated_video_memory = memory.memory_heaps[..heap_count]
            .iter()
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum();

        Adapter {
            ordinal,
            name,
            is_software: props.device_type == vk::PhysicalDeviceType::CPU,
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            dedicated_video_memory,
        }
    }

    fn physical_device(&self, adapter: &Adapter) -> Result<vk::PhysicalDevice> {
        self.ranked.get(adapter.ordinal as usize).copied().ok_or_else(|| {
            gfx_error!(SOURCE, "Adapter '{}' was not enumerated by this factory", adapter.name);
            Error::DeviceCreation(format!("Unknown adapter ordinal {}", adapter.ordinal))
        })
    }
}

impl GpuFactory for VulkanFactory {
    fn backend_name(&self) -> &str {
        "vulkan"
    }

    fn enumerate_adapters(&mut self, preference: GpuPreference) -> Result<Vec<Adapter>> {
        let instance = &self.instance.instance;
        let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
            gfx_error!(SOURCE, "Failed to enumerate physical devices: {:?}", e);
            Error::FactoryCreation(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        // Stable sort: the driver's order breaks ties
        let mut ranked: Vec<(u32, vk::PhysicalDevice)> = devices
            .into_iter()
            .map(|device| {
                let props = unsafe { instance.get_physical_device_properties(device) };
                (device_type_rank(props.device_type, preference), device)
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        self.ranked = ranked.into_iter().map(|(_, device)| device).collect();

        let adapters: Vec<Adapter> = self
            .ranked
            .iter()
            .enumerate()
            .map(|(ordinal, &device)| self.describe(ordinal as u32, device))
            .collect();
        for adapter in &adapters {
            gfx_debug!(
                SOURCE,
                "Physical device #{}: '{}' (vendor {:#06x}, software={})",
                adapter.ordinal,
                adapter.name,
                adapter.vendor_id,
                adapter.is_software
            );
        }
        Ok(adapters)
    }

    fn adapter_outputs(&self, adapter: &Adapter, _format: Format) -> Result<Vec<OutputDesc>> {
        // Outputs need VK_KHR_display, which desktop compositors do not expose
        gfx_trace!(SOURCE, "Output enumeration unavailable for '{}'", adapter.name);
        Ok(Vec::new())
    }

    fn create_device(
        &mut self,
        adapter: &Adapter,
        minimum_level: FeatureLevel,
    ) -> Result<Box<dyn GpuDevice>> {
        let physical_device = self.physical_device(adapter)?;
        let instance = &self.instance.instance;

        unsafe {
            let props = instance.get_physical_device_properties(physical_device);
            let level = api_version_to_level(props.api_version);
            if level < minimum_level {
                gfx_error!(SOURCE, "'{}' supports Vulkan {} only, {} required", adapter.name, level, minimum_level);
                return Err(Error::DeviceCreation(format!(
                    "'{}' supports Vulkan {}, {} required",
                    adapter.name, level, minimum_level
                )));
            }

            // One queue does graphics and presentation
            let queue_family = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|index| index as u32)
                .ok_or_else(|| {
                    gfx_error!(SOURCE, "No graphics queue family on '{}'", adapter.name);
                    Error::DeviceCreation("No graphics queue family found".to_string())
                })?;

            let extensions = instance
                .enumerate_device_extension_properties(physical_device)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to enumerate device extensions: {:?}", e);
                    Error::DeviceCreation(format!("Failed to enumerate device extensions: {:?}", e))
                })?;
            let has_extension = |wanted: &CStr| {
                extensions
                    .iter()
                    .any(|ext| ext.extension_name_as_c_str().map(|name| name == wanted).unwrap_or(false))
            };
            if !has_extension(ash::khr::swapchain::NAME) {
                gfx_error!(SOURCE, "'{}' cannot present (no VK_KHR_swapchain)", adapter.name);
                return Err(Error::DeviceCreation("VK_KHR_swapchain not supported".to_string()));
            }
            let ray_tracing = has_extension(ash::khr::ray_tracing_pipeline::NAME);

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            // Both are core and mandatory in 1.3
            let mut features12 = vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut features12)
                .push_next(&mut features13);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    gfx_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Error::DeviceCreation(format!("Failed to create device: {:?}", e))
                })?;

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    gfx_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
                    return Err(Error::DeviceCreation(format!("Failed to create allocator: {:?}", e)));
                }
            };

            let support = FeatureSupport {
                feature_levels: supported_feature_levels(props.api_version),
                ray_tracing,
            };

            let context = Arc::new(DeviceContext::new(
                Arc::clone(&self.instance),
                physical_device,
                device,
                queue_family,
                allocator,
            ));

            gfx_info!(SOURCE, "Logical device created on '{}' (queue family {})", adapter.name, queue_family);
            Ok(Box::new(VulkanDevice::new(context, props.limits, support)))
        }
    }

    fn create_swapchain(
        &mut self,
        device: &dyn GpuDevice,
        _queue: &dyn GpuQueue,
        target: SurfaceTarget,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn GpuSwapchain>> {
        let device = device.as_any().downcast_ref::<VulkanDevice>().ok_or_else(|| {
            gfx_error!(SOURCE, "Swap chain requested for a device of another backend");
            Error::SurfaceRebuild("device was not created by the Vulkan backend".to_string())
        })?;
        let swapchain = VulkanSwapchain::new(Arc::clone(device.context()), target, desc)?;
        Ok(Box::new(swapchain))
    }
}
