//! Frame/resize controller
//!
//! Owns every GPU object of the application and drives the
//! `Uninitialized -> Ready -> Resizing -> Ready -> ... -> Destroyed` state
//! machine. The controller is an ordinary value passed explicitly to whatever
//! needs it; there is no global accessor.

use crate::adapter::Instance;
use crate::app::{FrameContext, FrameHandler};
use crate::command::CommandContext;
use crate::config::GfxConfig;
use crate::depth::{query_msaa_quality, sample_desc_for, DepthSurface, MSAA_SAMPLE_COUNT};
use crate::device::Device;
use crate::diagnostics;
use crate::error::{Error, Result};
use crate::swapchain::PresentationSurface;
use crate::timer::GameTimer;
use crate::types::{ResourceState, SampleDesc, ScissorRect, SurfaceTarget, ViewHandle, Viewport};
use crate::{gfx_debug, gfx_err, gfx_error, gfx_info, gfx_warn};

const SOURCE: &str = "solgfx::Controller";

/// Lifecycle state of a [`FrameController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Uninitialized,
    Ready,
    /// Rebuilding surfaces. Remains set if a rebuild failed.
    Resizing,
    Destroyed,
}

/// Orchestrates device, command objects, swap chain and depth buffer
pub struct FrameController {
    config: GfxConfig,
    state: ControllerState,
    // Declared in reverse creation order so the fields drop correctly
    depth: Option<DepthSurface>,
    surface: Option<PresentationSurface>,
    commands: Option<CommandContext>,
    device: Option<Device>,
    instance: Option<Instance>,
    msaa_4x: bool,
    msaa_quality_levels: u32,
    client_width: u32,
    client_height: u32,
    minimized: bool,
    frame_in_progress: bool,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl FrameController {
    pub fn new(config: GfxConfig) -> Self {
        let (width, height) = (config.initial_width, config.initial_height);
        Self {
            msaa_4x: config.msaa_4x,
            config,
            state: ControllerState::Uninitialized,
            depth: None,
            surface: None,
            commands: None,
            device: None,
            instance: None,
            msaa_quality_levels: 0,
            client_width: width,
            client_height: height,
            minimized: false,
            frame_in_progress: false,
            viewport: Viewport::for_client(width, height),
            scissor: ScissorRect::for_client(width, height),
        }
    }

    /// `Uninitialized -> Ready`
    ///
    /// Creates the device on adapter `adapter_index`, the command objects
    /// (closed), the swap chain and the depth buffer, records and executes the
    /// initial depth transition, then flushes the queue.
    pub fn initialize(
        &mut self,
        mut instance: Instance,
        adapter_index: usize,
        target: SurfaceTarget,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if self.state != ControllerState::Uninitialized {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState(format!("initialize called in state {:?}", self.state))
            ));
        }
        if width == 0 || height == 0 {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState(format!("initial client area {}x{} is empty", width, height))
            ));
        }

        let adapter = instance.adapter(adapter_index).cloned().ok_or_else(|| {
            gfx_err!(SOURCE, Error::InvalidState(format!(
                "adapter index {} out of range ({} adapters)",
                adapter_index,
                instance.adapters().len()
            )))
        })?;

        if self.config.log_adapter_outputs {
            diagnostics::log_adapter_outputs(&instance, self.config.back_buffer_format);
        }

        let mut device = Device::initialize(&mut instance, &adapter)?;
        if self.config.log_device_support {
            diagnostics::log_device_support(&device);
        }

        let msaa_quality_levels = if self.msaa_4x {
            query_msaa_quality(&device, self.config.back_buffer_format, MSAA_SAMPLE_COUNT)?
        } else {
            0
        };

        let mut commands = CommandContext::new(&mut device)?;
        let surface = PresentationSurface::create(
            &mut instance,
            &mut device,
            target,
            width,
            height,
            self.config.back_buffer_format,
            self.config.vsync,
        )?;
        let depth = DepthSurface::create(
            &mut device,
            width,
            height,
            self.config.depth_stencil_format,
            sample_desc_for(self.msaa_4x, msaa_quality_levels),
        )?;

        commands.reset(true)?;
        depth.record_initial_transition(commands.list_mut())?;
        commands.close_and_execute(&mut device)?;
        device.flush_queue()?;

        self.msaa_quality_levels = msaa_quality_levels;
        self.client_width = width;
        self.client_height = height;
        self.viewport = Viewport::for_client(width, height);
        self.scissor = ScissorRect::for_client(width, height);
        self.instance = Some(instance);
        self.device = Some(device);
        self.commands = Some(commands);
        self.surface = Some(surface);
        self.depth = Some(depth);
        self.state = ControllerState::Ready;

        gfx_info!(SOURCE, "Ready at {}x{} (msaa 4x: {})", width, height, self.msaa_4x);
        Ok(())
    }

    /// Window client area changed
    ///
    /// A zero dimension marks the controller minimised without rebuilding;
    /// any non-zero size runs the full rebuild sequence.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<()> {
        match self.state {
            ControllerState::Uninitialized => {
                self.client_width = width;
                self.client_height = height;
                return Ok(());
            }
            ControllerState::Ready if self.frame_in_progress => {
                return Err(gfx_err!(
                    SOURCE,
                    Error::InvalidState("resize requested while a frame is being recorded".to_string())
                ));
            }
            ControllerState::Ready => {}
            state => {
                return Err(gfx_err!(
                    SOURCE,
                    Error::InvalidState(format!("resize requested in state {:?}", state))
                ));
            }
        }

        if width == 0 || height == 0 {
            if !self.minimized {
                gfx_debug!(SOURCE, "Minimised, rendering suspended");
            }
            self.minimized = true;
            return Ok(());
        }

        self.minimized = false;
        self.client_width = width;
        self.client_height = height;
        self.resize_buffers()
    }

    /// Enable or disable 4x multisampling
    ///
    /// Returns `false` without touching any resource when `enabled` equals
    /// the current setting; otherwise rebuilds like a window resize.
    pub fn set_4x_msaa(&mut self, enabled: bool) -> Result<bool> {
        if enabled == self.msaa_4x {
            return Ok(false);
        }
        match self.state {
            ControllerState::Uninitialized => {
                self.msaa_4x = enabled;
                return Ok(true);
            }
            ControllerState::Ready => {}
            state => {
                return Err(gfx_err!(
                    SOURCE,
                    Error::InvalidState(format!("multisample toggle in state {:?}", state))
                ));
            }
        }

        if self.frame_in_progress {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("multisample toggle while a frame is being recorded".to_string())
            ));
        }
        if enabled {
            let device = self.device.as_ref().ok_or_else(|| missing("device"))?;
            self.msaa_quality_levels =
                query_msaa_quality(device, self.config.back_buffer_format, MSAA_SAMPLE_COUNT)?;
        }
        self.msaa_4x = enabled;
        gfx_info!(SOURCE, "4x MSAA {}", if enabled { "enabled" } else { "disabled" });

        if !self.minimized {
            self.resize_buffers()?;
        }
        Ok(true)
    }

    /// `Ready -> Resizing -> Ready`: rebuild swap chain and depth buffer
    ///
    /// Flushes first, never rebuilding while GPU work may still reference
    /// the old buffers. On failure the controller stays in `Resizing`.
    pub fn resize_buffers(&mut self) -> Result<()> {
        if self.state != ControllerState::Ready {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState(format!("rebuild requested in state {:?}", self.state))
            ));
        }
        if self.frame_in_progress {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("rebuild requested while a frame is being recorded".to_string())
            ));
        }
        self.state = ControllerState::Resizing;

        let (width, height) = (self.client_width, self.client_height);
        let sample = self.depth_sample_desc();
        let depth_format = self.config.depth_stencil_format;

        let (Some(device), Some(commands), Some(surface)) =
            (self.device.as_mut(), self.commands.as_mut(), self.surface.as_mut())
        else {
            return Err(missing("device objects"));
        };

        device.flush_queue()?;
        commands.abandon()?;
        commands.reset(true)?;

        self.depth = None;
        surface.resize(device, width, height)?;
        let depth = DepthSurface::create(device, width, height, depth_format, sample)?;

        depth.record_initial_transition(commands.list_mut())?;
        commands.close_and_execute(device)?;
        device.flush_queue()?;

        self.depth = Some(depth);
        self.viewport = Viewport::for_client(width, height);
        self.scissor = ScissorRect::for_client(width, height);
        self.state = ControllerState::Ready;

        gfx_debug!(SOURCE, "Rebuilt surfaces at {}x{}", width, height);
        Ok(())
    }

    /// Open the command list for a new frame
    ///
    /// Resynchronises the back buffer cursor with the platform, moves the
    /// back buffer to the render-target state and sets viewport and scissor.
    /// Returns `None` without touching the command list when the platform
    /// reports the surface out of date; frames are skipped until the resize
    /// that follows rebuilds it. If recording fails the list is closed again.
    pub fn begin_frame(&mut self) -> Result<Option<FrameContext<'_>>> {
        self.require_ready("begin_frame")?;
        if self.minimized {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("begin_frame while minimised".to_string())
            ));
        }
        if self.frame_in_progress {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("begin_frame while a frame is being recorded".to_string())
            ));
        }

        let (Some(commands), Some(surface), Some(depth)) =
            (self.commands.as_mut(), self.surface.as_mut(), self.depth.as_ref())
        else {
            return Err(missing("frame objects"));
        };

        let Some(index) = surface.sync_cursor()? else {
            return Ok(None);
        };

        // Every frame ends with a flush, so the allocator is free to reuse
        commands.reset(true)?;
        let back_buffer_view = match open_frame(commands, surface, &self.viewport, &self.scissor) {
            Ok(view) => view,
            Err(e) => return Err(close_abandoned(commands, e)),
        };

        self.frame_in_progress = true;
        Ok(Some(FrameContext::new(
            commands.list_mut(),
            index,
            back_buffer_view,
            depth.view(),
            self.viewport,
            self.scissor,
        )))
    }

    /// Close, execute and present the frame opened by [`begin_frame`](Self::begin_frame)
    ///
    /// Advances the back buffer cursor and drains the queue. On failure the
    /// frame is dropped and the list closed, so a resize can follow.
    pub fn end_frame(&mut self) -> Result<()> {
        if !self.frame_in_progress {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState("end_frame without begin_frame".to_string())
            ));
        }
        match self.submit_frame() {
            Ok(()) => {
                self.frame_in_progress = false;
                Ok(())
            }
            Err(e) => Err(self.abandon_frame(e)),
        }
    }

    fn submit_frame(&mut self) -> Result<()> {
        let (Some(device), Some(commands), Some(surface)) =
            (self.device.as_mut(), self.commands.as_mut(), self.surface.as_mut())
        else {
            return Err(missing("frame objects"));
        };

        commands.list_mut().resource_barrier(
            surface.current_back_buffer()?.as_ref(),
            ResourceState::RenderTarget,
            ResourceState::Present,
        )?;

        commands.close_and_execute(device)?;
        surface.present(device)?;
        device.flush_queue()?;
        Ok(())
    }

    /// Forget the frame being recorded and close its list
    fn abandon_frame(&mut self, err: Error) -> Error {
        self.frame_in_progress = false;
        match self.commands.as_mut() {
            Some(commands) => close_abandoned(commands, err),
            None => err,
        }
    }

    /// Update, then record, submit and present one frame
    ///
    /// Returns `false` when the frame was skipped because the window is
    /// minimised or the surface is waiting for a resize.
    pub fn run_frame(&mut self, handler: &mut dyn FrameHandler, timer: &GameTimer) -> Result<bool> {
        self.require_ready("run_frame")?;
        if self.minimized {
            return Ok(false);
        }

        handler.on_update(timer);
        let drawn = match self.begin_frame()? {
            Some(mut frame) => handler.on_draw(&mut frame),
            None => return Ok(false),
        };
        if let Err(e) = drawn {
            return Err(self.abandon_frame(e));
        }
        self.end_frame()?;
        Ok(true)
    }

    /// `-> Destroyed`: drain the queue, then release everything in reverse
    /// creation order (idempotent)
    ///
    /// Objects are released even when the final flush fails; the flush error
    /// is returned.
    pub fn destroy(&mut self) -> Result<()> {
        if self.state == ControllerState::Destroyed {
            return Ok(());
        }

        let flushed = match self.device.as_mut() {
            Some(device) if !device.is_destroyed() => device.flush_queue().map(|_| ()),
            _ => Ok(()),
        };

        self.depth = None;
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
        }
        self.commands = None;
        if let Some(mut device) = self.device.take() {
            device.destroy();
        }
        if let Some(mut instance) = self.instance.take() {
            instance.destroy();
        }

        self.frame_in_progress = false;
        self.state = ControllerState::Destroyed;
        gfx_info!(SOURCE, "Destroyed");
        flushed
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn client_size(&self) -> (u32, u32) {
        (self.client_width, self.client_height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.client_width as f32 / self.client_height.max(1) as f32
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }

    pub fn msaa_4x(&self) -> bool {
        self.msaa_4x
    }

    pub fn msaa_quality_levels(&self) -> u32 {
        self.msaa_quality_levels
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    pub fn commands(&self) -> Option<&CommandContext> {
        self.commands.as_ref()
    }

    pub fn surface(&self) -> Option<&PresentationSurface> {
        self.surface.as_ref()
    }

    pub fn depth(&self) -> Option<&DepthSurface> {
        self.depth.as_ref()
    }

    /// Render-target view of the current back buffer
    pub fn current_back_buffer_view(&self) -> Result<ViewHandle> {
        self.surface.as_ref().ok_or_else(|| missing("swap chain"))?.current_back_buffer_view()
    }

    pub fn depth_stencil_view(&self) -> Result<ViewHandle> {
        Ok(self.depth.as_ref().ok_or_else(|| missing("depth buffer"))?.view())
    }

    fn depth_sample_desc(&self) -> SampleDesc {
        sample_desc_for(self.msaa_4x, self.msaa_quality_levels)
    }

    fn require_ready(&self, operation: &str) -> Result<()> {
        if self.state != ControllerState::Ready {
            return Err(gfx_err!(
                SOURCE,
                Error::InvalidState(format!("{} called in state {:?}", operation, self.state))
            ));
        }
        Ok(())
    }
}

/// Barrier, viewport and scissor at the start of a frame
fn open_frame(
    commands: &mut CommandContext,
    surface: &PresentationSurface,
    viewport: &Viewport,
    scissor: &ScissorRect,
) -> Result<ViewHandle> {
    let list = commands.list_mut();
    list.resource_barrier(
        surface.current_back_buffer()?.as_ref(),
        ResourceState::Present,
        ResourceState::RenderTarget,
    )?;
    list.set_viewport(viewport)?;
    list.set_scissor(scissor)?;
    surface.current_back_buffer_view()
}

/// The recording error is returned; a failure to close is only logged
fn close_abandoned(commands: &mut CommandContext, err: Error) -> Error {
    if let Err(close_err) = commands.abandon() {
        gfx_warn!(SOURCE, "Could not close abandoned command list: {}", close_err.detail());
    }
    err
}

fn missing(what: &str) -> Error {
    Error::InvalidState(format!("{} not created", what))
}

impl Drop for FrameController {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            gfx_error!(SOURCE, "Shutdown flush failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
