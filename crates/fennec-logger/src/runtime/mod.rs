//! Host runtime strategies: environment descriptor and stack-frame extraction
//!
//! The logger never probes its environment. An embedding application picks a
//! [`Runtime`] once at startup and hands it to every logger it builds.

mod browser;
pub mod native;
mod process;

pub use browser::{parse_browser_line, BrowserRuntime};
pub use process::{parse_v8_line, ProcessRuntime};

use crate::template::PlaceholderValues;
use crate::value::{Object, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Produces the stack text of the current call site
pub type StackSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Runtime-specific capabilities consumed by the logger
pub trait Runtime: Send + Sync {
    /// Identity of the host, copied into every record's meta
    fn environment(&self) -> &Environment;

    /// Stack text of the current call site, if the host can capture one
    fn current_stack(&self) -> Option<String>;

    /// Parse the frame at `depth` out of `stack`; all fields are `None` when absent
    fn stack_frame(&self, stack: &str, depth: usize) -> StackFrame;

    /// Parse every frame of an error's stack, in the order given
    fn error_trace(&self, stack: &str) -> Vec<StackFrame>;

    /// Whether ANSI styles render on this host
    fn supports_styling(&self) -> bool {
        true
    }

    fn caller_frame(&self, depth: usize) -> StackFrame {
        self.current_stack()
            .map(|stack| self.stack_frame(&stack, depth))
            .unwrap_or_default()
    }
}

/// Parsed source location of one stack line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name_with_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path_with_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl StackFrame {
    /// True when the line could not be parsed
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    fn fields(&self) -> [(&'static str, &Option<String>); 8] {
        [
            ("fullFilePath", &self.full_file_path),
            ("fileName", &self.file_name),
            ("fileNameWithLine", &self.file_name_with_line),
            ("fileColumn", &self.file_column),
            ("fileLine", &self.file_line),
            ("filePath", &self.file_path),
            ("filePathWithLine", &self.file_path_with_line),
            ("method", &self.method),
        ]
    }

    /// Set fields keyed by their camelCase placeholder names
    pub fn placeholders(&self) -> PlaceholderValues {
        self.fields()
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
            .collect()
    }

    /// Object holding only the fields that were parsed
    pub fn to_value(&self) -> Value {
        let object: Object = self
            .fields()
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .collect();
        Value::object(object)
    }
}

/// Host identity, built once at startup and shared by every logger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub runtime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl Environment {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            platform: None,
            hostname: None,
            browser: None,
        }
    }

    /// Describe the current process
    pub fn detect() -> Self {
        let hostname = hostname::get()
            .ok()
            .map(|name| name.to_string_lossy().into_owned());

        Self {
            runtime: "Rust".to_string(),
            platform: Some(format!(
                "{}-{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            )),
            hostname,
            browser: None,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = Some(browser.into());
        self
    }
}

/// POSIX path normalization: collapses `//`, `.` and `..` segments
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().map_or(false, |last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join("/");
    if absolute {
        normalized.insert(0, '/');
    }
    if normalized.is_empty() {
        return ".".to_string();
    }
    if trailing && normalized != "/" {
        normalized.push('/');
    }
    normalized
}
