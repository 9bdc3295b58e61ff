/// Vulkan debug messenger
///
/// Validation layer messages are routed into the SolGfx logger and counted so
/// a summary can be printed at shutdown.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use sol_gfx::solgfx::log::LogSeverity;
use sol_gfx::solgfx::Gfx;
use std::borrow::Cow;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "solgfx::vulkan::validation";

/// Set while an instance with a messenger is alive
static CALLBACKS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Global validation statistics (thread-safe atomic counters)
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences of each distinct message
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Validation message counts by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn increment(&self, severity: LogSeverity) {
        let counter = match severity {
            LogSeverity::Error => &self.errors,
            LogSeverity::Warn => &self.warnings,
            LogSeverity::Info | LogSeverity::Debug => &self.info,
            LogSeverity::Trace => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Count one more occurrence of `message`, returning the new count
fn track_message(message: &str) -> u32 {
    let mut guard = match MESSAGE_TRACKER.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let count = guard
        .get_or_insert_with(FxHashMap::default)
        .entry(message.to_string())
        .or_insert(0);
    *count += 1;
    *count
}

/// Reset statistics and start forwarding messages
pub(crate) fn init_debug_config() {
    VALIDATION_STATS.reset();
    if let Ok(mut guard) = MESSAGE_TRACKER.lock() {
        *guard = Some(FxHashMap::default());
    }
    CALLBACKS_ENABLED.store(true, Ordering::Release);
}

/// Stop forwarding messages (called before the messenger is destroyed)
pub(crate) fn cleanup_debug_config() {
    CALLBACKS_ENABLED.store(false, Ordering::Release);
}

/// Logger severity of a validation message
pub(crate) fn severity_of(message_severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Debug
    } else {
        LogSeverity::Trace
    }
}

fn type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print validation statistics report
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "✓ No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }

    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(guard) = MESSAGE_TRACKER.lock() {
        let repeated = guard
            .as_ref()
            .map(|messages| messages.values().filter(|&&count| count > 1).count())
            .unwrap_or(0);
        if repeated > 0 {
            println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), repeated);
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

/// Vulkan debug messenger callback
///
/// # Safety
///
/// Called by the validation layers with a valid callback data pointer.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if !CALLBACKS_ENABLED.load(Ordering::Acquire) || p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = &*p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        Cow::Borrowed("Unknown")
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };
    let message = if callback_data.p_message.is_null() {
        Cow::Borrowed("No message")
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    let severity = severity_of(message_severity);
    VALIDATION_STATS.increment(severity);

    let occurrences = track_message(&message);
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };

    Gfx::log(
        severity,
        SOURCE,
        format!("[{}]{} {}: {}", type_name(message_type), repeat, message_id_name, message),
    );

    vk::FALSE
}
