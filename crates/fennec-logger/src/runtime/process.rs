//! Process runtime: stacks made of V8-style `    at method (path:line:col)` lines

use super::{native, normalize_path, Environment, Runtime, StackFrame, StackSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const CALL_SITE_MARKER: &str = "    at ";

static AT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s+at\s+").unwrap());
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

/// Runtime for a regular process. Stack text comes from the configured
/// source, by default the native backtrace rendered as `at` lines.
pub struct ProcessRuntime {
    environment: Environment,
    cwd: Option<String>,
    stack_source: StackSource,
}

impl ProcessRuntime {
    pub fn new(environment: Environment) -> Self {
        let cwd = std::env::current_dir()
            .ok()
            .map(|dir| dir.to_string_lossy().into_owned());

        Self {
            environment,
            cwd,
            stack_source: Arc::new(native::capture_stack),
        }
    }

    /// Runtime for the current process with native stack capture
    pub fn detect() -> Self {
        Self::new(Environment::detect())
    }

    /// Directory prefix stripped from every parsed path
    pub fn with_cwd(mut self, cwd: Option<String>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_stack_source(
        mut self,
        source: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.stack_source = Arc::new(source);
        self
    }

    fn call_sites(stack: &str) -> impl Iterator<Item = &str> {
        stack.lines().filter(|line| line.contains(CALL_SITE_MARKER))
    }
}

impl Default for ProcessRuntime {
    fn default() -> Self {
        Self::detect()
    }
}

impl Runtime for ProcessRuntime {
    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn current_stack(&self) -> Option<String> {
        (self.stack_source)()
    }

    fn stack_frame(&self, stack: &str, depth: usize) -> StackFrame {
        Self::call_sites(stack)
            .nth(depth)
            .map(|line| parse_v8_line(line, self.cwd.as_deref()))
            .unwrap_or_default()
    }

    fn error_trace(&self, stack: &str) -> Vec<StackFrame> {
        Self::call_sites(stack)
            .map(|line| parse_v8_line(line, self.cwd.as_deref()))
            .collect()
    }
}

/// Parse one `    at ...` line. Lines without a `path:line:col` location
/// (native or anonymous frames) produce an empty frame.
pub fn parse_v8_line(line: &str, cwd: Option<&str>) -> StackFrame {
    if !line.contains(CALL_SITE_MARKER) {
        return StackFrame::default();
    }

    let line = AT_PREFIX.replace_all(line, "");
    let method_and_location: Vec<&str> = line.split(" (").collect();

    let full_file_path = if line.ends_with(')') {
        match PARENTHESIZED.captures(&line) {
            Some(caps) => caps[1].to_string(),
            None => return StackFrame::default(),
        }
    } else {
        line.to_string()
    };
    if !full_file_path.contains(':') {
        return StackFrame::default();
    }

    let mut path = full_file_path.replacen("file://", "", 1);
    if let Some(cwd) = cwd.filter(|cwd| !cwd.is_empty()) {
        path = path.replacen(cwd, "", 1);
    }

    let mut segments: Vec<&str> = path.split(':').collect();
    let file_column = segments.pop().map(str::to_string);
    let file_line = segments.pop().map(str::to_string);
    let file_path = match segments.pop() {
        Some(file_path) if !file_path.is_empty() => file_path.to_string(),
        _ => return StackFrame::default(),
    };

    let line_number = file_line.clone().unwrap_or_default();
    let file_name = file_path.rsplit('/').next().unwrap_or_default().to_string();
    let method = if method_and_location.len() > 1 {
        Some(method_and_location[0].to_string())
    } else {
        None
    };

    StackFrame {
        file_path_with_line: Some(normalize_path(&format!("{}:{}", file_path, line_number))),
        file_name_with_line: Some(format!("{}:{}", file_name, line_number)),
        full_file_path: Some(full_file_path),
        file_name: Some(file_name),
        file_column,
        file_line,
        file_path: Some(file_path),
        method,
    }
}
