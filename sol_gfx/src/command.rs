//! Command allocator + command list pair

use crate::backend::{GpuCommandAllocator, GpuCommandList};
use crate::device::Device;
use crate::error::Result;

/// The single command list of the application and its allocator
///
/// Created closed, since the first use is always a reset.
pub struct CommandContext {
    list: Box<dyn GpuCommandList>,
    allocator: Box<dyn GpuCommandAllocator>,
}

impl CommandContext {
    pub fn new(device: &mut Device) -> Result<Self> {
        let raw = device.raw_mut()?;
        let allocator = raw
            .create_command_allocator()
            .map_err(|e| e.context("Failed to create command allocator"))?;
        let mut list = raw
            .create_command_list(allocator.as_ref())
            .map_err(|e| e.context("Failed to create command list"))?;
        if list.is_recording() {
            list.close().map_err(|e| e.context("Failed to close new command list"))?;
        }
        Ok(Self { list, allocator })
    }

    /// Start recording
    ///
    /// With `reclaim_memory` the allocator is reset first, which is only valid
    /// once the GPU has finished every list recorded from it.
    pub fn reset(&mut self, reclaim_memory: bool) -> Result<()> {
        if reclaim_memory {
            self.allocator.reset().map_err(|e| e.context("Failed to reset command allocator"))?;
        }
        self.list
            .reset(self.allocator.as_ref())
            .map_err(|e| e.context("Failed to reset command list"))
    }

    pub fn close(&mut self) -> Result<()> {
        self.list.close().map_err(|e| e.context("Failed to close command list"))
    }

    /// Close a list left open by a failed recording, discarding its commands
    pub fn abandon(&mut self) -> Result<()> {
        if self.list.is_recording() {
            self.close()?;
        }
        Ok(())
    }

    /// Close the list and submit it
    pub fn close_and_execute(&mut self, device: &mut Device) -> Result<()> {
        self.close()?;
        device.execute_command_lists(&[self.list.as_ref()])
    }

    pub fn is_recording(&self) -> bool {
        self.list.is_recording()
    }

    pub fn list(&self) -> &dyn GpuCommandList {
        self.list.as_ref()
    }

    pub fn list_mut(&mut self) -> &mut dyn GpuCommandList {
        self.list.as_mut()
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
