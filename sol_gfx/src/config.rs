//! Startup configuration
//!
//! Read once at startup. Only the multisample setting may change afterwards,
//! through [`crate::controller::FrameController::set_4x_msaa`].

use crate::log::LogSeverity;
use crate::types::Format;

/// Configuration for the device and presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct GfxConfig {
    /// Application name (window title and backend application info)
    pub app_name: String,

    /// Enable the platform debug/validation layer
    pub enable_validation: bool,

    /// Synchronize presents to the display refresh
    pub vsync: bool,

    /// 4x multisampling for the depth/stencil surface
    pub msaa_4x: bool,

    /// Rank adapters high-performance first
    pub prefer_high_performance: bool,

    /// Swap chain back buffer format
    pub back_buffer_format: Format,

    /// Depth/stencil view format
    pub depth_stencil_format: Format,

    /// Initial client width
    pub initial_width: u32,

    /// Initial client height
    pub initial_height: u32,

    /// Log every output and display mode of each adapter
    pub log_adapter_outputs: bool,

    /// Log supported feature levels after device creation
    pub log_device_support: bool,

    /// Minimum severity forwarded to the logger
    pub min_log_severity: LogSeverity,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            app_name: "SolGfx".to_string(),
            enable_validation: cfg!(debug_assertions),
            vsync: true,
            msaa_4x: false,
            prefer_high_performance: true,
            back_buffer_format: Format::R8G8B8A8_UNORM,
            depth_stencil_format: Format::D24_UNORM_S8_UINT,
            initial_width: 800,
            initial_height: 600,
            log_adapter_outputs: false,
            log_device_support: true,
            min_log_severity: if cfg!(debug_assertions) {
                LogSeverity::Debug
            } else {
                LogSeverity::Info
            },
        }
    }
}

impl GfxConfig {
    /// Defaults overlaid with `SOLGFX_VSYNC`, `SOLGFX_MSAA`,
    /// `SOLGFX_VALIDATION` and `SOLGFX_LOG`
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Unparsable values are ignored with a warning and the previous value kept.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SOLGFX_VSYNC") {
            override_flag(&mut self.vsync, "SOLGFX_VSYNC", &value);
        }
        if let Some(value) = lookup("SOLGFX_MSAA") {
            override_flag(&mut self.msaa_4x, "SOLGFX_MSAA", &value);
        }
        if let Some(value) = lookup("SOLGFX_VALIDATION") {
            override_flag(&mut self.enable_validation, "SOLGFX_VALIDATION", &value);
        }
        if let Some(value) = lookup("SOLGFX_LOG") {
            match LogSeverity::parse(&value) {
                Some(severity) => self.min_log_severity = severity,
                None => crate::gfx_warn!(
                    "solgfx::Config",
                    "Ignoring SOLGFX_LOG='{}' (expected trace|debug|info|warn|error)",
                    value
                ),
            }
        }
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn override_flag(slot: &mut bool, key: &str, value: &str) {
    match parse_flag(value) {
        Some(flag) => *slot = flag,
        None => crate::gfx_warn!(
            "solgfx::Config",
            "Ignoring {}='{}' (expected a boolean)",
            key,
            value
        ),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
