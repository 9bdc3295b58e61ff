//! Unit tests for error.rs
//!
//! Tests the error taxonomy, stage mapping and exit codes.

use crate::error::{Error, FailureStage, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_factory_creation_display() {
    let err = Error::FactoryCreation("vkCreateInstance returned ERROR_INCOMPATIBLE_DRIVER".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Factory creation failed"));
    assert!(display.contains("ERROR_INCOMPATIBLE_DRIVER"));
}

#[test]
fn test_no_hardware_adapter_display() {
    let display = format!("{}", Error::NoHardwareAdapter);
    assert!(display.contains("No hardware adapter"));
}

#[test]
fn test_unsupported_sample_quality_display() {
    let err = Error::UnsupportedSampleQuality { sample_count: 4 };
    assert!(format!("{}", err).contains("4x multisampling"));
}

#[test]
fn test_surface_rebuild_display() {
    let err = Error::SurfaceRebuild("resize_buffers failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Surface rebuild failed"));
    assert!(display.contains("resize_buffers failed"));
}

// ============================================================================
// STAGE MAPPING
// ============================================================================

#[test]
fn test_adapter_errors_report_adapter_query_stage() {
    assert_eq!(Error::NoHardwareAdapter.stage(), FailureStage::AdapterQuery);
    assert_eq!(Error::FactoryCreation(String::new()).stage(), FailureStage::AdapterQuery);
}

#[test]
fn test_capability_errors_are_distinct_from_missing_hardware() {
    let missing = Error::NoHardwareAdapter;
    let driver = Error::DeviceCreation("feature level 1.3 unavailable".to_string());
    let msaa = Error::UnsupportedSampleQuality { sample_count: 4 };

    assert_ne!(missing.stage(), driver.stage());
    assert_ne!(missing.stage(), msaa.stage());
    assert_eq!(msaa.stage(), FailureStage::SurfaceRebuild);
}

#[test]
fn test_exit_codes_are_unique_per_stage() {
    let errors = [
        Error::NoHardwareAdapter,
        Error::DeviceCreation(String::new()),
        Error::SurfaceRebuild(String::new()),
        Error::CommandSubmission(String::new()),
        Error::InvalidState(String::new()),
    ];
    let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());
    assert!(codes.iter().all(|&c| c != 0));
}

#[test]
fn test_stage_display() {
    assert_eq!(FailureStage::SurfaceRebuild.to_string(), "surface rebuild");
    assert_eq!(FailureStage::AdapterQuery.to_string(), "adapter query");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::NoHardwareAdapter;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::CommandSubmission("queue submit".to_string());
    assert_eq!(err.clone(), err);
}

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::UnsupportedSampleQuality { sample_count: 4 })
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert_eq!(outer(), Err(Error::UnsupportedSampleQuality { sample_count: 4 }));
}

// ============================================================================
// LAYERED CONTEXT
// ============================================================================

#[test]
fn test_detail_strips_stage_prefix() {
    let err = Error::CommandSubmission("reset of an open command list".to_string());
    assert_eq!(err.detail(), "reset of an open command list");
    assert_eq!(
        Error::UnsupportedSampleQuality { sample_count: 4 }.detail(),
        Error::UnsupportedSampleQuality { sample_count: 4 }.to_string()
    );
}

#[test]
fn test_context_keeps_variant() {
    let err = Error::SurfaceRebuild("swapchain out of date".to_string())
        .context("Failed to acquire back buffer");
    assert_eq!(
        err,
        Error::SurfaceRebuild("Failed to acquire back buffer: swapchain out of date".to_string())
    );
    assert_eq!(err.stage(), FailureStage::SurfaceRebuild);
}

#[test]
fn test_context_prefix_appears_once() {
    let err = Error::CommandSubmission("queue lost".to_string())
        .context("Failed to reset command list")
        .context("Rebuild");
    let display = err.to_string();
    assert_eq!(display.matches("Command submission failed").count(), 1);
    assert!(display.ends_with("Rebuild: Failed to reset command list: queue lost"));
}

#[test]
fn test_context_leaves_fieldless_variants() {
    assert_eq!(Error::NoHardwareAdapter.context("enumerate"), Error::NoHardwareAdapter);
}
