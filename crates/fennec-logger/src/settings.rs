//! Logger settings, per-stage overrides and child-logger inheritance

use crate::formatters::FormattedLogObj;
use crate::inspect::InspectOptions;
use crate::logger::{LogMeta, LogRecord};
use crate::styles::{default_styles, StyleMap};
use crate::value::{Object, Value};
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PRETTY_LOG_TEMPLATE: &str =
    "{{yyyy}}.{{mm}}.{{dd}} {{hh}}:{{MM}}:{{ss}}:{{ms}}\t{{logLevelName}}\t{{filePathWithLine}}{{nameWithDelimiterPrefix}}\t";
pub const DEFAULT_PRETTY_ERROR_TEMPLATE: &str =
    "\n{{errorName}} {{errorMessage}}\nerror stack:\n{{errorStack}}";
pub const DEFAULT_PRETTY_ERROR_STACK_TEMPLATE: &str =
    "  • {{fileName}}\t{{method}}\n\t{{filePathWithLine}}";
pub const DEFAULT_PARENT_NAMES_SEPARATOR: &str = ":";
pub const DEFAULT_LOGGER_NAME_DELIMITER: &str = "\t";
pub const DEFAULT_META_PROPERTY: &str = "_meta";
pub const DEFAULT_MASK_PLACEHOLDER: &str = "[***]";

/// Output mode of the primary transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    /// Templated, optionally colored line
    Pretty,
    /// Cycle-safe JSON record
    Json,
    /// No primary output; attached transports still run
    Hidden,
}

impl std::str::FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogType::Pretty),
            "json" => Ok(LogType::Json),
            "hidden" => Ok(LogType::Hidden),
            other => Err(format!("unknown log type '{}'", other)),
        }
    }
}

/// Time zone used for the date placeholders of the pretty template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeZone {
    #[serde(rename = "UTC")]
    Utc,
    #[serde(rename = "local")]
    Local,
}

impl std::str::FromStr for TimeZone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" => Ok(TimeZone::Utc),
            "local" => Ok(TimeZone::Local),
            other => Err(format!("unknown time zone '{}'", other)),
        }
    }
}

/// Receives every dispatched record, independent of the output mode
pub type TransportFn = Arc<dyn Fn(&LogRecord) -> Result<()> + Send + Sync>;
/// Replaces the masking stage
pub type MaskFn = Arc<dyn Fn(Vec<Value>) -> Vec<Value> + Send + Sync>;
/// Replaces record shaping; receives the masked arguments and the resolved base object
pub type ToLogObjFn = Arc<dyn Fn(&[Value], Option<Object>) -> Object + Send + Sync>;
/// Replaces meta attachment; receives the shaped body, level id and level name
pub type AddMetaFn = Arc<dyn Fn(Object, u8, &str) -> LogRecord + Send + Sync>;
/// Replaces the pretty meta line
pub type FormatMetaFn = Arc<dyn Fn(&LogMeta) -> String + Send + Sync>;
/// Replaces the split of masked arguments into display args and error blocks
pub type FormatLogObjFn = Arc<dyn Fn(&[Value], &Settings) -> FormattedLogObj + Send + Sync>;
/// Replaces the pretty transport: meta markup, display args, error blocks, settings
pub type FormattedTransportFn =
    Arc<dyn Fn(&str, &[Value], &[String], &Settings) -> Result<()> + Send + Sync>;

/// Optional replacements for each pipeline stage
#[derive(Clone, Default)]
pub struct Overwrites {
    pub mask: Option<MaskFn>,
    pub to_log_obj: Option<ToLogObjFn>,
    pub add_meta: Option<AddMetaFn>,
    pub format_meta: Option<FormatMetaFn>,
    pub format_log_obj: Option<FormatLogObjFn>,
    pub transport_formatted: Option<FormattedTransportFn>,
    pub transport_json: Option<TransportFn>,
}

impl fmt::Debug for Overwrites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overwrites")
            .field("mask", &self.mask.is_some())
            .field("to_log_obj", &self.to_log_obj.is_some())
            .field("add_meta", &self.add_meta.is_some())
            .field("format_meta", &self.format_meta.is_some())
            .field("format_log_obj", &self.format_log_obj.is_some())
            .field("transport_formatted", &self.transport_formatted.is_some())
            .field("transport_json", &self.transport_json.is_some())
            .finish()
    }
}

/// Fully resolved settings of one logger instance
#[derive(Clone)]
pub struct Settings {
    pub log_type: LogType,
    pub name: Option<String>,
    pub parent_names: Option<Vec<String>>,
    pub min_level: u8,
    /// Store all arguments as one array under this key
    pub arguments_array_name: Option<String>,
    /// Skip stack capture for the caller frame
    pub hide_log_position_for_production: bool,
    pub pretty_log_template: String,
    pub pretty_error_template: String,
    pub pretty_error_stack_template: String,
    pub pretty_error_parent_names_separator: String,
    pub pretty_error_logger_name_delimiter: String,
    pub style_pretty_logs: bool,
    pub pretty_log_time_zone: TimeZone,
    pub pretty_log_styles: StyleMap,
    pub pretty_inspect_options: InspectOptions,
    pub meta_property: String,
    pub mask_placeholder: String,
    pub mask_values_of_keys: Vec<String>,
    pub mask_values_of_keys_case_insensitive: bool,
    pub mask_values_regex: Vec<Regex>,
    /// Prepended to the arguments of every call
    pub prefix: Vec<Value>,
    pub attached_transports: Vec<TransportFn>,
    pub overwrite: Overwrites,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_type: LogType::Pretty,
            name: None,
            parent_names: None,
            min_level: 0,
            arguments_array_name: None,
            hide_log_position_for_production: false,
            pretty_log_template: DEFAULT_PRETTY_LOG_TEMPLATE.to_string(),
            pretty_error_template: DEFAULT_PRETTY_ERROR_TEMPLATE.to_string(),
            pretty_error_stack_template: DEFAULT_PRETTY_ERROR_STACK_TEMPLATE.to_string(),
            pretty_error_parent_names_separator: DEFAULT_PARENT_NAMES_SEPARATOR.to_string(),
            pretty_error_logger_name_delimiter: DEFAULT_LOGGER_NAME_DELIMITER.to_string(),
            style_pretty_logs: true,
            pretty_log_time_zone: TimeZone::Utc,
            pretty_log_styles: default_styles(),
            pretty_inspect_options: InspectOptions::default(),
            meta_property: DEFAULT_META_PROPERTY.to_string(),
            mask_placeholder: DEFAULT_MASK_PLACEHOLDER.to_string(),
            mask_values_of_keys: vec!["password".to_string()],
            mask_values_of_keys_case_insensitive: false,
            mask_values_regex: Vec::new(),
            prefix: Vec::new(),
            attached_transports: Vec::new(),
            overwrite: Overwrites::default(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("log_type", &self.log_type)
            .field("name", &self.name)
            .field("parent_names", &self.parent_names)
            .field("min_level", &self.min_level)
            .field("arguments_array_name", &self.arguments_array_name)
            .field(
                "hide_log_position_for_production",
                &self.hide_log_position_for_production,
            )
            .field("style_pretty_logs", &self.style_pretty_logs)
            .field("pretty_log_time_zone", &self.pretty_log_time_zone)
            .field("meta_property", &self.meta_property)
            .field("mask_values_of_keys", &self.mask_values_of_keys)
            .field("mask_values_regex", &self.mask_values_regex)
            .field("prefix", &self.prefix)
            .field("attached_transports", &self.attached_transports.len())
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Defaults with every provided parameter layered on top
    pub fn from_param(param: SettingsParam) -> Self {
        let mut settings = Self::default();
        settings.apply(param);
        settings
    }

    /// Settings for a child logger: a copy of these settings with `param` on top,
    /// the parent name chain extended by this logger's name and prefixes concatenated.
    pub fn for_sub_logger(&self, mut param: SettingsParam) -> Self {
        let parent_names = match (&self.parent_names, &self.name) {
            (Some(parents), Some(name)) => {
                let mut chain = parents.clone();
                chain.push(name.clone());
                Some(chain)
            }
            (None, Some(name)) => Some(vec![name.clone()]),
            _ => None,
        };

        let mut prefix = self.prefix.clone();
        prefix.extend(param.prefix.take().unwrap_or_default());

        let mut settings = self.clone();
        settings.apply(param);
        settings.parent_names = parent_names;
        settings.prefix = prefix;
        settings
    }

    fn apply(&mut self, param: SettingsParam) {
        let SettingsParam {
            log_type,
            name,
            parent_names,
            min_level,
            arguments_array_name,
            hide_log_position_for_production,
            pretty_log_template,
            pretty_error_template,
            pretty_error_stack_template,
            pretty_error_parent_names_separator,
            pretty_error_logger_name_delimiter,
            style_pretty_logs,
            pretty_log_time_zone,
            pretty_log_styles,
            pretty_inspect_options,
            meta_property,
            mask_placeholder,
            mask_values_of_keys,
            mask_values_of_keys_case_insensitive,
            mask_values_regex,
            prefix,
            attached_transports,
            overwrite,
        } = param;

        if let Some(v) = log_type {
            self.log_type = v;
        }
        if name.is_some() {
            self.name = name;
        }
        if parent_names.is_some() {
            self.parent_names = parent_names;
        }
        if let Some(v) = min_level {
            self.min_level = v;
        }
        if arguments_array_name.is_some() {
            self.arguments_array_name = arguments_array_name;
        }
        if let Some(v) = hide_log_position_for_production {
            self.hide_log_position_for_production = v;
        }
        if let Some(v) = pretty_log_template {
            self.pretty_log_template = v;
        }
        if let Some(v) = pretty_error_template {
            self.pretty_error_template = v;
        }
        if let Some(v) = pretty_error_stack_template {
            self.pretty_error_stack_template = v;
        }
        if let Some(v) = pretty_error_parent_names_separator {
            self.pretty_error_parent_names_separator = v;
        }
        if let Some(v) = pretty_error_logger_name_delimiter {
            self.pretty_error_logger_name_delimiter = v;
        }
        if let Some(v) = style_pretty_logs {
            self.style_pretty_logs = v;
        }
        if let Some(v) = pretty_log_time_zone {
            self.pretty_log_time_zone = v;
        }
        if let Some(v) = pretty_log_styles {
            self.pretty_log_styles = v;
        }
        if let Some(v) = pretty_inspect_options {
            self.pretty_inspect_options = v;
        }
        if let Some(v) = meta_property {
            self.meta_property = v;
        }
        if let Some(v) = mask_placeholder {
            self.mask_placeholder = v;
        }
        if let Some(v) = mask_values_of_keys {
            self.mask_values_of_keys = v;
        }
        if let Some(v) = mask_values_of_keys_case_insensitive {
            self.mask_values_of_keys_case_insensitive = v;
        }
        if let Some(v) = mask_values_regex {
            self.mask_values_regex = v;
        }
        if let Some(v) = prefix {
            self.prefix = v;
        }
        if let Some(v) = attached_transports {
            self.attached_transports = v;
        }
        if let Some(v) = overwrite {
            self.overwrite = v;
        }
    }
}

/// Caller-supplied settings; every `None` keeps the default (or the parent's value)
#[derive(Clone, Default)]
pub struct SettingsParam {
    pub log_type: Option<LogType>,
    pub name: Option<String>,
    pub parent_names: Option<Vec<String>>,
    pub min_level: Option<u8>,
    pub arguments_array_name: Option<String>,
    pub hide_log_position_for_production: Option<bool>,
    pub pretty_log_template: Option<String>,
    pub pretty_error_template: Option<String>,
    pub pretty_error_stack_template: Option<String>,
    pub pretty_error_parent_names_separator: Option<String>,
    pub pretty_error_logger_name_delimiter: Option<String>,
    pub style_pretty_logs: Option<bool>,
    pub pretty_log_time_zone: Option<TimeZone>,
    pub pretty_log_styles: Option<StyleMap>,
    pub pretty_inspect_options: Option<InspectOptions>,
    pub meta_property: Option<String>,
    pub mask_placeholder: Option<String>,
    pub mask_values_of_keys: Option<Vec<String>>,
    pub mask_values_of_keys_case_insensitive: Option<bool>,
    pub mask_values_regex: Option<Vec<Regex>>,
    pub prefix: Option<Vec<Value>>,
    pub attached_transports: Option<Vec<TransportFn>>,
    pub overwrite: Option<Overwrites>,
}

impl SettingsParam {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, log_type: LogType) -> Self {
        self.log_type = Some(log_type);
        self
    }

    pub fn with_min_level(mut self, min_level: u8) -> Self {
        self.min_level = Some(min_level);
        self
    }

    pub fn with_prefix(mut self, prefix: Vec<Value>) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn with_overwrite(mut self, overwrite: Overwrites) -> Self {
        self.overwrite = Some(overwrite);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log_type, LogType::Pretty);
        assert_eq!(settings.meta_property, "_meta");
        assert_eq!(settings.mask_placeholder, "[***]");
        assert_eq!(settings.mask_values_of_keys, vec!["password".to_string()]);
        assert!(settings.style_pretty_logs);
        assert_eq!(settings.pretty_log_time_zone, TimeZone::Utc);
    }

    #[test]
    fn test_param_overrides_defaults() {
        let settings = Settings::from_param(
            SettingsParam::default()
                .with_name("api")
                .with_type(LogType::Json)
                .with_min_level(3),
        );

        assert_eq!(settings.name.as_deref(), Some("api"));
        assert_eq!(settings.log_type, LogType::Json);
        assert_eq!(settings.min_level, 3);
        assert_eq!(settings.meta_property, "_meta");
    }

    #[test]
    fn test_sub_logger_extends_parent_chain() {
        let root = Settings::from_param(SettingsParam::default().with_name("root"));
        let child = root.for_sub_logger(SettingsParam::default().with_name("child"));
        let grandchild = child.for_sub_logger(SettingsParam::default().with_name("leaf"));

        assert_eq!(child.parent_names, Some(vec!["root".to_string()]));
        assert_eq!(
            grandchild.parent_names,
            Some(vec!["root".to_string(), "child".to_string()])
        );
        assert_eq!(grandchild.name.as_deref(), Some("leaf"));
    }

    #[test]
    fn test_sub_logger_of_unnamed_parent_has_no_chain() {
        let mut root = Settings::default();
        root.parent_names = Some(vec!["orphan".to_string()]);
        let child = root.for_sub_logger(SettingsParam::default());
        assert_eq!(child.parent_names, None);
    }

    #[test]
    fn test_sub_logger_concatenates_prefix() {
        let root = Settings::from_param(SettingsParam::default().with_prefix(vec!["[a]".into()]));
        let child = root.for_sub_logger(SettingsParam::default().with_prefix(vec!["[b]".into()]));

        assert_eq!(child.prefix, vec![Value::from("[a]"), Value::from("[b]")]);
        assert_eq!(root.prefix, vec![Value::from("[a]")]);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("JSON".parse::<LogType>().unwrap(), LogType::Json);
        assert_eq!("Local".parse::<TimeZone>().unwrap(), TimeZone::Local);
        assert!("xml".parse::<LogType>().is_err());
    }
}
