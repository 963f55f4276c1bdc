//! Pretty and JSON renderings of records

use crate::inspect::{self, InspectOptions};
use crate::logger::LogMeta;
use crate::runtime::Runtime;
use crate::settings::{Settings, TimeZone};
use crate::template::{format_template, PlaceholderValues};
use crate::value::{ErrorValue, Value};
use chrono::{DateTime, Datelike, Local, SecondsFormat, Timelike};
use serde_json::{json, Map, Number, Value as JsonValue};
use std::collections::HashSet;

const DEFAULT_DATE_SEQUENCE: &str = "{{yyyy}}.{{mm}}.{{dd}} {{hh}}:{{MM}}:{{ss}}:{{ms}}";
const CIRCULAR: &str = "[Circular]";

/// Masked arguments split into displayable values and rendered error blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedLogObj {
    pub args: Vec<Value>,
    pub errors: Vec<String>,
}

/// Zero-padded `value + add_number`
pub fn format_number_add_zeros(value: u32, digits: usize, add_number: u32) -> String {
    format!("{:0width$}", value + add_number, width = digits)
}

/// Expand the log line template from a record's meta
pub fn pretty_format_meta(settings: &Settings, meta: &LogMeta) -> String {
    let mut template = settings.pretty_log_template.clone();
    let mut values = PlaceholderValues::new();

    let uses_default_date = template.contains(DEFAULT_DATE_SEQUENCE);
    if uses_default_date {
        template = template.replacen(DEFAULT_DATE_SEQUENCE, "{{dateIsoStr}}", 1);
    }

    match settings.pretty_log_time_zone {
        TimeZone::Utc => {
            if !uses_default_date {
                insert_date_parts(&mut values, &meta.date);
            }
            values.insert(
                "rawIsoStr".to_string(),
                meta.date.to_rfc3339_opts(SecondsFormat::Millis, true),
            );
            values.insert("dateIsoStr".to_string(), wall_clock(&meta.date));
        }
        TimeZone::Local => {
            let local = meta.date.with_timezone(&Local);
            if !uses_default_date {
                insert_date_parts(&mut values, &local);
            }
            values.insert(
                "rawIsoStr".to_string(),
                local.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            );
            values.insert("dateIsoStr".to_string(), wall_clock(&local));
        }
    }

    values.insert("logLevelName".to_string(), meta.log_level_name.clone());
    let path = meta.path.clone().unwrap_or_default();
    values.insert(
        "fileNameWithLine".to_string(),
        path.file_name_with_line.unwrap_or_default(),
    );
    values.insert(
        "filePathWithLine".to_string(),
        path.file_path_with_line.unwrap_or_default(),
    );
    values.insert("fullFilePath".to_string(), path.full_file_path.unwrap_or_default());

    let name = composed_name(settings, meta);
    let delimiter = &settings.pretty_error_logger_name_delimiter;
    let (with_prefix, with_suffix) = if name.is_empty() {
        (String::new(), String::new())
    } else {
        (format!("{}{}", delimiter, name), format!("{}{}", name, delimiter))
    };
    values.insert("name".to_string(), name);
    values.insert("nameWithDelimiterPrefix".to_string(), with_prefix);
    values.insert("nameWithDelimiterSuffix".to_string(), with_suffix);

    format_template(settings, &template, &values, false)
}

fn insert_date_parts<Tz: chrono::TimeZone>(values: &mut PlaceholderValues, date: &DateTime<Tz>) {
    let millis = date.timestamp_subsec_millis();
    for (key, value) in [
        ("yyyy", date.year().to_string()),
        ("mm", format_number_add_zeros(date.month0(), 2, 1)),
        ("dd", format_number_add_zeros(date.day(), 2, 0)),
        ("hh", format_number_add_zeros(date.hour(), 2, 0)),
        ("MM", format_number_add_zeros(date.minute(), 2, 0)),
        ("ss", format_number_add_zeros(date.second(), 2, 0)),
        ("ms", format_number_add_zeros(millis, 3, 0)),
    ] {
        values.insert(key.to_string(), value);
    }
}

fn wall_clock<Tz: chrono::TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Parent names and own name joined by the separator; empty for unnamed loggers
fn composed_name(settings: &Settings, meta: &LogMeta) -> String {
    let Some(name) = &meta.name else {
        return String::new();
    };
    let separator = &settings.pretty_error_parent_names_separator;
    match &meta.parent_names {
        Some(parents) => format!("{}{}{}", parents.join(separator), separator, name),
        None => name.clone(),
    }
}

/// Split masked arguments into display values and rendered error blocks
pub fn pretty_format_log_obj(
    masked_args: &[Value],
    settings: &Settings,
    runtime: &dyn Runtime,
) -> FormattedLogObj {
    let mut formatted = FormattedLogObj::default();
    for arg in masked_args {
        match arg.to_error() {
            Some(error) => formatted
                .errors
                .push(pretty_format_error(&error, settings, runtime)),
            None => formatted.args.push(arg.clone()),
        }
    }
    formatted
}

/// Render one error through the error template, one stack template expansion per frame
pub fn pretty_format_error(error: &ErrorValue, settings: &Settings, runtime: &dyn Runtime) -> String {
    let frames = error
        .stack
        .as_deref()
        .map(|stack| runtime.error_trace(stack))
        .unwrap_or_default();
    let error_stack: Vec<String> = frames
        .iter()
        .map(|frame| {
            format_template(
                settings,
                &settings.pretty_error_stack_template,
                &frame.placeholders(),
                true,
            )
        })
        .collect();

    let mut values = PlaceholderValues::new();
    values.insert("errorName".to_string(), format!(" {} ", error.name));
    values.insert("errorMessage".to_string(), error.message.clone());
    values.insert("errorStack".to_string(), error_stack.join("\n"));

    format_template(settings, &settings.pretty_error_template, &values, false)
}

/// Meta markup, inspected arguments and error blocks as one output line
pub fn compose_pretty_line(
    meta_markup: &str,
    args: &[Value],
    errors: &[String],
    settings: &Settings,
) -> String {
    let options = InspectOptions {
        colors: settings.style_pretty_logs,
        ..settings.pretty_inspect_options
    };
    let separator = if !errors.is_empty() && !args.is_empty() {
        "\n"
    } else {
        ""
    };

    format!(
        "{}{}{}{}",
        meta_markup,
        inspect::format_with_options(&options, args),
        separator,
        errors.join("\n")
    )
}

/// JSON form of a value graph. A container met a second time anywhere in the
/// same conversion becomes `"[Circular]"`.
pub fn to_json_value(value: &Value) -> JsonValue {
    JsonConverter::default().convert(value)
}

/// Cycle-safe JSON text of a value graph
pub fn to_json_string(value: &Value) -> crate::Result<String> {
    Ok(serde_json::to_string(&to_json_value(value))?)
}

#[derive(Default)]
struct JsonConverter {
    seen: HashSet<usize>,
}

impl JsonConverter {
    fn convert(&mut self, value: &Value) -> JsonValue {
        if let Some(id) = value.node_id() {
            if !self.seen.insert(id) {
                return JsonValue::String(CIRCULAR.to_string());
            }
        }

        match value {
            Value::Null | Value::Function(_) => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Float(n) => Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Date(date) => JsonValue::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Bytes(bytes) => json!({ "type": "Buffer", "data": bytes.to_vec() }),
            Value::Array(items) | Value::Set(items) => {
                let items = items.read_recursive().clone();
                JsonValue::Array(items.iter().map(|item| self.convert(item)).collect())
            }
            Value::Object(object) => {
                let object = object.read_recursive().clone();
                let entries = object.iter().map(|(key, item)| (key.to_string(), item.clone()));
                JsonValue::Object(self.convert_entries(Map::new(), entries))
            }
            Value::Map(entries) => {
                let entries = entries.read_recursive().clone();
                let entries = entries
                    .into_iter()
                    .map(|(key, item)| (key.to_plain_string(), item));
                JsonValue::Object(self.convert_entries(Map::new(), entries))
            }
            Value::Error(error) => {
                let error = error.read_recursive().clone();
                let mut map = Map::new();
                map.insert("name".to_string(), JsonValue::String(error.name.clone()));
                map.insert("message".to_string(), JsonValue::String(error.message.clone()));
                let entries = error
                    .properties
                    .iter()
                    .map(|(key, item)| (key.to_string(), item.clone()));
                JsonValue::Object(self.convert_entries(map, entries))
            }
        }
    }

    /// Append keyed entries in property order: integer keys ascending, then
    /// the remaining keys in insertion order. Functions are skipped.
    fn convert_entries(
        &mut self,
        mut map: Map<String, JsonValue>,
        entries: impl Iterator<Item = (String, Value)>,
    ) -> Map<String, JsonValue> {
        let (mut indexed, named): (Vec<_>, Vec<_>) = entries
            .filter(|(_, item)| !matches!(item, Value::Function(_)))
            .partition(|(key, _)| array_index(key).is_some());
        indexed.sort_by_key(|(key, _)| array_index(key));

        for (key, item) in indexed.into_iter().chain(named) {
            let converted = self.convert(&item);
            map.insert(key, converted);
        }
        map
    }
}

/// Canonical array index form of a property key (`"0"`, `"17"`, never `"01"`)
fn array_index(key: &str) -> Option<u32> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if !canonical {
        return None;
    }
    key.parse::<u32>().ok().filter(|index| *index != u32::MAX)
}
