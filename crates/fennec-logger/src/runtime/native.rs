//! Native stack capture, rendered as `    at method (path:line:col)` lines
//!
//! Frames from the standard library, the unwinder and this crate itself are
//! dropped so that the first rendered call site is the caller of the logger.

use once_cell::sync::Lazy;
use regex::Regex;
use std::backtrace::{Backtrace, BacktraceStatus};

static LOCATION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+at\s+(.+):(\d+):(\d+)\s*$").unwrap());
static SYMBOL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:\d+:\s+)?(.+?)\s*$").unwrap());

const INTERNAL_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "anyhow::",
    "<std::",
    "<core::",
    "<alloc::",
    "<anyhow::",
    "__rust",
    "rust_begin_unwind",
];

fn own_prefixes() -> [String; 2] {
    let krate = env!("CARGO_CRATE_NAME");
    [format!("{}::", krate), format!("<{}::", krate)]
}

/// Stack of the current call site with an `Error` header line
pub fn capture_stack() -> Option<String> {
    capture_stack_with_header("Error")
}

/// Stack of the current call site, or `None` when the platform has no
/// unwind information
pub fn capture_stack_with_header(header: &str) -> Option<String> {
    let backtrace = Backtrace::force_capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return None;
    }
    Some(render_backtrace(&backtrace.to_string(), header))
}

/// Convert `std::backtrace` text into a header line followed by one
/// `    at` line per located frame
pub fn render_backtrace(text: &str, header: &str) -> String {
    let own = own_prefixes();
    let mut frames: Vec<(String, String)> = Vec::new();
    let mut symbol: Option<String> = None;

    for line in text.lines() {
        if let Some(caps) = LOCATION_LINE.captures(line) {
            if let Some(method) = symbol.take() {
                frames.push((method, format!("{}:{}:{}", &caps[1], &caps[2], &caps[3])));
            }
            continue;
        }
        if line.trim_start().starts_with("at ") {
            continue;
        }
        if let Some(caps) = SYMBOL_LINE.captures(line) {
            symbol = Some(caps[1].to_string());
        }
    }

    let mut rendered = header.to_string();
    frames
        .into_iter()
        .filter(|(method, _)| !INTERNAL_PREFIXES.iter().any(|p| method.starts_with(p)))
        .skip_while(|(method, _)| own.iter().any(|p| method.starts_with(p.as_str())))
        .for_each(|(method, location)| {
            rendered.push_str(&format!("\n    at {} ({})", method, location));
        });
    rendered
}
