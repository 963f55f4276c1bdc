//! Browser / bundler runtime: stacks made of `name@path:line:col` lines

use super::{Environment, Runtime, StackFrame, StackSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const HEADER_MARKER: &str = "Error: ";

static FRAME_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(file|https?|global code|[^@]+)@)?(?:file:)?((?:/[^:/]+){2,})(?::(\d+))?(?::(\d+))?")
        .unwrap()
});
static QUERY_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?.*$").unwrap());

/// Runtime for code running in a browser page. Relative paths are
/// resolved against `origin`.
pub struct BrowserRuntime {
    environment: Environment,
    origin: String,
    ansi_capable: bool,
    stack_source: StackSource,
}

impl BrowserRuntime {
    pub fn new(origin: impl Into<String>, user_agent: Option<String>) -> Self {
        let mut environment = Environment::new("Browser");
        environment.browser = user_agent;

        Self {
            environment,
            origin: origin.into(),
            ansi_capable: true,
            stack_source: Arc::new(|| None),
        }
    }

    /// Consoles that cannot render ANSI codes turn pretty styling off
    pub fn with_ansi_support(mut self, ansi_capable: bool) -> Self {
        self.ansi_capable = ansi_capable;
        self
    }

    pub fn with_stack_source(
        mut self,
        source: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.stack_source = Arc::new(source);
        self
    }

    fn frames(stack: &str) -> impl Iterator<Item = &str> {
        stack.lines().filter(|line| !line.contains(HEADER_MARKER))
    }
}

impl Runtime for BrowserRuntime {
    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn current_stack(&self) -> Option<String> {
        (self.stack_source)()
    }

    fn stack_frame(&self, stack: &str, depth: usize) -> StackFrame {
        Self::frames(stack)
            .nth(depth)
            .map(|line| parse_browser_line(line, &self.origin))
            .unwrap_or_default()
    }

    fn error_trace(&self, stack: &str) -> Vec<StackFrame> {
        Self::frames(stack)
            .map(|line| parse_browser_line(line, &self.origin))
            .collect()
    }

    fn supports_styling(&self) -> bool {
        self.ansi_capable
    }
}

/// Parse one `name@path:line:col` line
pub fn parse_browser_line(line: &str, origin: &str) -> StackFrame {
    let Some(caps) = FRAME_LOCATION.captures(line) else {
        return StackFrame::default();
    };

    let file_path = QUERY_SUFFIX.replace(&caps[2], "").into_owned();
    let file_name = file_path.rsplit('/').next().unwrap_or_default().to_string();
    let file_line = caps.get(3).map(|m| m.as_str().to_string());
    let file_column = caps.get(4).map(|m| m.as_str().to_string());
    let line_number = file_line.clone().unwrap_or_default();
    let method = caps
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|name| !matches!(*name, "" | "file" | "http" | "https" | "global code"))
        .map(str::to_string);

    StackFrame {
        full_file_path: Some(format!("{}{}", origin, file_path)),
        file_name_with_line: Some(format!("{}:{}", file_name, line_number)),
        file_path_with_line: Some(format!("{}:{}", file_path, line_number)),
        file_name: Some(file_name),
        file_line,
        file_column,
        file_path: Some(file_path),
        method,
    }
}
