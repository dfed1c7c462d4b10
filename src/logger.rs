//! Logging utilities with colored module prefixes.
//!
//! Provides the `log!` macro for user-facing messages and the `vlog!` macro
//! for per-file progress output that is only shown with `--verbose`.
//!
//! # Example
//!
//! ```ignore
//! log!("build"; "generated {} pages", count);
//! vlog!("content"; "{}", page.source_path);
//! ```

use colored::{ColoredString, Colorize};
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

/// Whether verbose (per-file) logging is enabled.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable verbose logging. Set once from the CLI flag at startup.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

/// Check whether verbose logging is enabled.
pub fn verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message only when verbose mode is enabled.
#[macro_export]
macro_rules! vlog {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Write a single log line: `[module] message`.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module {
        "serve" => prefix.bright_blue().bold(),
        "watch" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}
