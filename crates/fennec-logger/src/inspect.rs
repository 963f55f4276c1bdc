//! Display rendering of arbitrary values for pretty output
//!
//! Mirrors the shape of a typical object inspector: nested containers are
//! expanded up to `depth`, deeper ones collapse to `[Object]` / `[Array]`,
//! and a container met again among its own ancestors prints as `[Circular]`.

use crate::styles::{ansi_codes, ansi_wrap};
use crate::value::{ErrorValue, Value};
use chrono::SecondsFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

const MAX_BUFFER_BYTES: usize = 50;

/// Inspector options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectOptions {
    /// Color scalars with ANSI codes
    pub colors: bool,
    /// Keep containers on one line
    pub compact: bool,
    /// Maximum nesting depth to expand; `None` expands everything
    pub depth: Option<usize>,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            colors: true,
            compact: false,
            depth: None,
        }
    }
}

impl InspectOptions {
    /// Single-line, uncolored, unlimited depth
    pub fn plain() -> Self {
        Self {
            colors: false,
            compact: true,
            depth: None,
        }
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Special,
    Number,
    Boolean,
    Null,
    String,
    Date,
}

impl Kind {
    fn style(self) -> &'static str {
        match self {
            Kind::Special => "cyan",
            Kind::Number | Kind::Boolean => "yellow",
            Kind::Null => "bold",
            Kind::String => "green",
            Kind::Date => "magenta",
        }
    }
}

/// Render one value
pub fn inspect(value: &Value, options: &InspectOptions) -> String {
    Inspector {
        options,
        seen: Vec::new(),
    }
    .format_value(value, 0)
}

/// Render several values separated by spaces; top-level strings are printed as-is
pub fn format_with_options(options: &InspectOptions, args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => inspect(other, options),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number formatting used for display and for the string form of numeric leaves
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() && n > 0.0 {
        "Infinity".to_string()
    } else if n.is_infinite() {
        "-Infinity".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

struct Inspector<'a> {
    options: &'a InspectOptions,
    /// Ancestors of the node being rendered
    seen: Vec<usize>,
}

impl Inspector<'_> {
    fn stylize(&self, text: &str, kind: Kind) -> String {
        match ansi_codes(kind.style()) {
            Some(codes) if self.options.colors => ansi_wrap(text, codes),
            _ => text.to_string(),
        }
    }

    fn format_value(&mut self, value: &Value, level: usize) -> String {
        match value {
            Value::Null => self.stylize("null", Kind::Null),
            Value::Bool(b) => self.stylize(&b.to_string(), Kind::Boolean),
            Value::Int(n) => self.stylize(&n.to_string(), Kind::Number),
            Value::Float(n) => self.stylize(&format_number(*n), Kind::Number),
            Value::String(s) => self.stylize(&quote(s), Kind::String),
            Value::Date(date) => {
                self.stylize(&date.to_rfc3339_opts(SecondsFormat::Millis, true), Kind::Date)
            }
            Value::Bytes(bytes) => format_buffer(bytes),
            Value::Function(_) => self.stylize("[Function]", Kind::Special),
            container => self.format_container(container, level),
        }
    }

    fn format_container(&mut self, value: &Value, level: usize) -> String {
        let Some(id) = value.node_id() else {
            return String::new();
        };
        if self.seen.contains(&id) {
            return self.stylize("[Circular]", Kind::Special);
        }
        if let Some(max_depth) = self.options.depth {
            if level > max_depth {
                let label = match value {
                    Value::Array(_) => "[Array]".to_string(),
                    Value::Map(_) => "[Map]".to_string(),
                    Value::Set(_) => "[Set]".to_string(),
                    Value::Object(object) => {
                        let object = object.read_recursive();
                        format!("[{}]", object.class_name().unwrap_or("Object"))
                    }
                    Value::Error(error) => {
                        let error = error.read_recursive();
                        format!("[{}: {}]", error.name, error.message)
                    }
                    _ => String::new(),
                };
                return self.stylize(&label, Kind::Special);
            }
        }

        self.seen.push(id);
        let rendered = match value {
            Value::Array(items) => {
                let items = items.read_recursive().clone();
                let entries = items
                    .iter()
                    .map(|item| self.format_value(item, level + 1))
                    .collect();
                self.braces("", "[", "]", entries, level)
            }
            Value::Set(items) => {
                let items = items.read_recursive().clone();
                let prefix = format!("Set({}) ", items.len());
                let entries = items
                    .iter()
                    .map(|item| self.format_value(item, level + 1))
                    .collect();
                self.braces(&prefix, "{", "}", entries, level)
            }
            Value::Map(entries) => {
                let entries = entries.read_recursive().clone();
                let prefix = format!("Map({}) ", entries.len());
                let rendered = entries
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "{} => {}",
                            self.format_value(k, level + 1),
                            self.format_value(v, level + 1)
                        )
                    })
                    .collect();
                self.braces(&prefix, "{", "}", rendered, level)
            }
            Value::Object(object) => {
                let object = object.read_recursive().clone();
                let prefix = object
                    .class_name()
                    .map(|name| format!("{} ", name))
                    .unwrap_or_default();
                let entries = object
                    .iter()
                    .map(|(key, v)| format!("{}: {}", self.format_key(key), self.format_value(v, level + 1)))
                    .collect();
                self.braces(&prefix, "{", "}", entries, level)
            }
            Value::Error(error) => {
                let error = error.read_recursive().clone();
                self.format_error(&error, level)
            }
            _ => String::new(),
        };
        self.seen.pop();
        rendered
    }

    fn format_error(&mut self, error: &ErrorValue, level: usize) -> String {
        let base = error
            .stack
            .clone()
            .unwrap_or_else(|| format!("[{}: {}]", error.name, error.message));
        if error.properties.is_empty() {
            return base;
        }
        let entries = error
            .properties
            .iter()
            .map(|(key, v)| format!("{}: {}", self.format_key(key), self.format_value(v, level + 1)))
            .collect();
        let prefix = format!("{} ", base);
        self.braces(&prefix, "{", "}", entries, level)
    }

    fn format_key(&self, key: &str) -> String {
        if IDENTIFIER.is_match(key) {
            key.to_string()
        } else {
            self.stylize(&quote(key), Kind::String)
        }
    }

    fn braces(
        &self,
        prefix: &str,
        open: &str,
        close: &str,
        entries: Vec<String>,
        level: usize,
    ) -> String {
        if entries.is_empty() {
            return format!("{}{}{}", prefix, open, close);
        }
        if self.options.compact {
            return format!("{}{} {} {}", prefix, open, entries.join(", "), close);
        }
        let outer = "  ".repeat(level);
        let inner = "  ".repeat(level + 1);
        format!(
            "{}{}\n{}{}\n{}{}",
            prefix,
            open,
            inner,
            entries.join(&format!(",\n{}", inner)),
            outer,
            close
        )
    }
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n");
    format!("'{}'", escaped)
}

fn format_buffer(bytes: &[u8]) -> String {
    let shown: Vec<String> = bytes
        .iter()
        .take(MAX_BUFFER_BYTES)
        .map(|b| format!("{:02x}", b))
        .collect();
    let mut out = format!("<Buffer {}", shown.join(" "));
    if bytes.len() > MAX_BUFFER_BYTES {
        out.push_str(&format!(" ... {} more bytes", bytes.len() - MAX_BUFFER_BYTES));
    }
    out.push('>');
    out
}
