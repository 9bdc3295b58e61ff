//! Per-frame capability interface implemented by the renderer above the core

use crate::backend::GpuCommandList;
use crate::depth::{DEPTH_CLEAR_VALUE, STENCIL_CLEAR_VALUE};
use crate::error::Result;
use crate::timer::GameTimer;
use crate::types::{ScissorRect, ViewHandle, Viewport};

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

bitflags::bitflags! {
    /// Buttons held during a pointer move
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
        const BACK = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

impl From<PointerButton> for PointerButtons {
    fn from(button: PointerButton) -> Self {
        match button {
            PointerButton::Left => PointerButtons::LEFT,
            PointerButton::Right => PointerButtons::RIGHT,
            PointerButton::Middle => PointerButtons::MIDDLE,
            PointerButton::Back => PointerButtons::BACK,
            PointerButton::Forward => PointerButtons::FORWARD,
            PointerButton::Other(_) => PointerButtons::empty(),
        }
    }
}

impl From<winit::event::MouseButton> for PointerButton {
    fn from(button: winit::event::MouseButton) -> Self {
        use winit::event::MouseButton;
        match button {
            MouseButton::Left => PointerButton::Left,
            MouseButton::Right => PointerButton::Right,
            MouseButton::Middle => PointerButton::Middle,
            MouseButton::Back => PointerButton::Back,
            MouseButton::Forward => PointerButton::Forward,
            MouseButton::Other(code) => PointerButton::Other(code),
        }
    }
}

/// Everything a renderer needs to record one frame
///
/// The command list is open, the back buffer is in the render-target state
/// and viewport/scissor are already set.
pub struct FrameContext<'a> {
    list: &'a mut dyn GpuCommandList,
    back_buffer_index: u32,
    back_buffer_view: ViewHandle,
    depth_stencil_view: ViewHandle,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl<'a> FrameContext<'a> {
    pub(crate) fn new(
        list: &'a mut dyn GpuCommandList,
        back_buffer_index: u32,
        back_buffer_view: ViewHandle,
        depth_stencil_view: ViewHandle,
        viewport: Viewport,
        scissor: ScissorRect,
    ) -> Self {
        Self {
            list,
            back_buffer_index,
            back_buffer_view,
            depth_stencil_view,
            viewport,
            scissor,
        }
    }

    pub fn command_list(&mut self) -> &mut dyn GpuCommandList {
        &mut *self.list
    }

    pub fn back_buffer_index(&self) -> u32 {
        self.back_buffer_index
    }

    pub fn back_buffer_view(&self) -> ViewHandle {
        self.back_buffer_view
    }

    pub fn depth_stencil_view(&self) -> ViewHandle {
        self.depth_stencil_view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }

    /// Clear the current back buffer to `color`
    pub fn clear_back_buffer(&mut self, color: [f32; 4]) -> Result<()> {
        self.list.clear_render_target(self.back_buffer_view, color)
    }

    /// Clear depth to 1.0 and stencil to 0
    pub fn clear_depth_stencil(&mut self) -> Result<()> {
        self.list
            .clear_depth_stencil(self.depth_stencil_view, DEPTH_CLEAR_VALUE, STENCIL_CLEAR_VALUE)
    }
}

/// Application-level per-frame behavior
///
/// Invoked once per frame by
/// [`FrameController::run_frame`](crate::controller::FrameController::run_frame)
/// after the views are ready.
pub trait FrameHandler {
    /// Advance simulation state
    fn on_update(&mut self, timer: &GameTimer);

    /// Record this frame's commands
    fn on_draw(&mut self, frame: &mut FrameContext<'_>) -> Result<()>;

    fn on_pointer_down(&mut self, _button: PointerButton, _x: f64, _y: f64) {}

    fn on_pointer_up(&mut self, _button: PointerButton, _x: f64, _y: f64) {}

    fn on_pointer_move(&mut self, _buttons: PointerButtons, _x: f64, _y: f64) {}
}
