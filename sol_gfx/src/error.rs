//! Error types for SolGfx
//!
//! Every error in this crate is fatal at the point it is raised: each one
//! describes either a mismatch between the requested configuration and what the
//! GPU/driver can do, or an object graph that can no longer be used safely.
//! Callers are expected to report the failing stage and terminate.

use std::fmt;

/// Result type for SolGfx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the device/presentation lifecycle an error belongs to
///
/// Lets the operator tell a missing-hardware problem apart from a
/// driver/capability problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// Graphics factory creation or adapter enumeration
    AdapterQuery,
    /// Logical device creation
    DeviceCreation,
    /// Swap chain, depth buffer or view (re)creation
    SurfaceRebuild,
    /// Queue, allocator, command list, fence or present failures
    CommandSubmission,
    /// An operation was called in a controller state that forbids it
    Lifecycle,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::AdapterQuery => "adapter query",
            FailureStage::DeviceCreation => "device creation",
            FailureStage::SurfaceRebuild => "surface rebuild",
            FailureStage::CommandSubmission => "command submission",
            FailureStage::Lifecycle => "lifecycle",
        };
        f.write_str(name)
    }
}

/// SolGfx errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The platform graphics factory / enumeration interface could not be created
    FactoryCreation(String),

    /// Only software adapters are present (or no adapter at all)
    NoHardwareAdapter,

    /// Logical device creation failed on the chosen adapter and on the fallback
    DeviceCreation(String),

    /// Swap chain, depth buffer or view (re)creation failed
    SurfaceRebuild(String),

    /// The device reports zero quality levels for the requested sample count
    UnsupportedSampleQuality {
        /// Requested samples per pixel
        sample_count: u32,
    },

    /// Queue, allocator, command list, fence or present failure
    CommandSubmission(String),

    /// Operation called in a state that does not allow it
    InvalidState(String),
}

impl Error {
    /// Lifecycle stage this error belongs to
    pub fn stage(&self) -> FailureStage {
        match self {
            Error::FactoryCreation(_) | Error::NoHardwareAdapter => FailureStage::AdapterQuery,
            Error::DeviceCreation(_) => FailureStage::DeviceCreation,
            Error::SurfaceRebuild(_) | Error::UnsupportedSampleQuality { .. } => {
                FailureStage::SurfaceRebuild
            }
            Error::CommandSubmission(_) => FailureStage::CommandSubmission,
            Error::InvalidState(_) => FailureStage::Lifecycle,
        }
    }

    /// Process exit code used when this error terminates the application
    ///
    /// Each stage gets its own code so scripts can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            FailureStage::AdapterQuery => 2,
            FailureStage::DeviceCreation => 3,
            FailureStage::SurfaceRebuild => 4,
            FailureStage::CommandSubmission => 5,
            FailureStage::Lifecycle => 6,
        }
    }

    /// Message without the stage prefix added by `Display`
    pub fn detail(&self) -> String {
        match self {
            Error::FactoryCreation(msg)
            | Error::DeviceCreation(msg)
            | Error::SurfaceRebuild(msg)
            | Error::CommandSubmission(msg)
            | Error::InvalidState(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Same variant with `what` prepended to the detail
    ///
    /// Used when passing an error up a layer: the stage it was raised in is
    /// kept and nothing is logged again.
    pub fn context(self, what: impl fmt::Display) -> Error {
        match self {
            Error::FactoryCreation(msg) => Error::FactoryCreation(format!("{}: {}", what, msg)),
            Error::DeviceCreation(msg) => Error::DeviceCreation(format!("{}: {}", what, msg)),
            Error::SurfaceRebuild(msg) => Error::SurfaceRebuild(format!("{}: {}", what, msg)),
            Error::CommandSubmission(msg) => Error::CommandSubmission(format!("{}: {}", what, msg)),
            Error::InvalidState(msg) => Error::InvalidState(format!("{}: {}", what, msg)),
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FactoryCreation(msg) => write!(f, "Factory creation failed: {}", msg),
            Error::NoHardwareAdapter => {
                write!(f, "No hardware adapter available (only software adapters were found)")
            }
            Error::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            Error::SurfaceRebuild(msg) => write!(f, "Surface rebuild failed: {}", msg),
            Error::UnsupportedSampleQuality { sample_count } => write!(
                f,
                "Unsupported sample quality: device reports no quality levels for {}x multisampling",
                sample_count
            ),
            Error::CommandSubmission(msg) => write!(f, "Command submission failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
