/*!
# SolGfx

GPU device and frame-presentation layer.

This crate owns the platform-agnostic part: adapter selection, the device with
its single command queue, the fence synchronizer, the swap chain and the
depth/stencil surface, all driven by the frame/resize controller. Backends
(Vulkan in `sol_gfx_vulkan`) implement the object-safe traits of
[`solgfx::backend`].

## Architecture

- **Instance**: owns the backend factory and the ranked hardware adapters
- **Device**: device handle, one direct queue and its fence
- **FenceSynchronizer**: monotonic CPU/GPU fence values
- **PresentationSurface**: N-buffered swap chain and its render-target views
- **DepthSurface**: client-sized depth/stencil buffer, optionally 4x multisampled
- **FrameController**: lifecycle, resize and per-frame sequencing
*/

// Internal modules
mod error;
mod gfx;
pub mod log;
pub mod adapter;
pub mod app;
pub mod backend;
pub mod command;
pub mod config;
pub mod controller;
pub mod depth;
pub mod device;
pub mod diagnostics;
pub mod fence;
pub mod swapchain;
pub mod timer;
pub mod types;
pub mod view_heap;

// Main solgfx namespace module
pub mod solgfx {
    // Error types
    pub use crate::error::{Error, FailureStage, Result};

    // Logging facade
    pub use crate::gfx::Gfx;

    pub use crate::adapter::{filter_adapters, AdapterSelection, Instance};
    pub use crate::app::{FrameContext, FrameHandler, PointerButton, PointerButtons};
    pub use crate::command::CommandContext;
    pub use crate::config::GfxConfig;
    pub use crate::controller::{ControllerState, FrameController};
    pub use crate::depth::DepthSurface;
    pub use crate::device::Device;
    pub use crate::fence::FenceSynchronizer;
    pub use crate::swapchain::PresentationSurface;
    pub use crate::timer::{FrameStats, GameTimer};
    pub use crate::types::*;

    // Logging sub-module
    pub mod log {
        pub use crate::log::{install_log_bridge, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Traits implemented by backends
    pub mod backend {
        pub use crate::backend::*;
    }
}
