//! Informational adapter/device reports
//!
//! Nothing here affects behavior; failures to query are logged and ignored.

use crate::adapter::Instance;
use crate::device::Device;
use crate::types::{FeatureSupport, Format};
use crate::{gfx_info, gfx_warn};

const SOURCE: &str = "solgfx::Diagnostics";

/// Log every output of every adapter with its display modes for `format`
pub fn log_adapter_outputs(instance: &Instance, format: Format) {
    for adapter in instance.adapters() {
        let outputs = match instance.adapter_outputs(adapter, format) {
            Ok(outputs) => outputs,
            Err(e) => {
                gfx_warn!(SOURCE, "Could not list outputs of '{}': {}", adapter.name, e);
                continue;
            }
        };
        if outputs.is_empty() {
            gfx_info!(SOURCE, "Adapter '{}' has no outputs", adapter.name);
        }
        for output in outputs {
            gfx_info!(SOURCE, "Adapter '{}' output '{}'", adapter.name, output.name);
            for mode in &output.modes {
                gfx_info!(
                    SOURCE,
                    "  {}x{} @ {}/{} Hz",
                    mode.width,
                    mode.height,
                    mode.refresh_numerator,
                    mode.refresh_denominator
                );
            }
        }
    }
}

/// Human-readable lines describing what a device supports
pub fn device_support_lines(support: &FeatureSupport) -> Vec<String> {
    let mut lines: Vec<String> = support
        .feature_levels
        .iter()
        .map(|level| format!("Supports API level {}", level))
        .collect();
    if support.ray_tracing {
        lines.push("Supports hardware ray tracing".to_string());
    }
    lines
}

/// Log supported feature levels (highest first) and ray tracing support
pub fn log_device_support(device: &Device) {
    for line in device_support_lines(device.feature_support()) {
        gfx_info!(SOURCE, "{}", line);
    }
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod tests;
