//! Record builder and the leveled logger facade
//!
//! One call runs: level filter, prefix and masking, shaping into a keyed
//! record, meta attachment, pretty or JSON rendering, dispatch. Every stage
//! can be replaced through [`Overwrites`](crate::settings::Overwrites).

use crate::formatters::{self, FormattedLogObj};
use crate::level::LogLevel;
use crate::masking;
use crate::runtime::{Environment, ProcessRuntime, Runtime, StackFrame};
use crate::settings::{LogType, Settings, SettingsParam, TransportFn};
use crate::transports;
use crate::value::{Object, Value};
use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, trace};

/// Metadata attached to every dispatched record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMeta {
    #[serde(flatten)]
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_names: Option<Vec<String>>,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub date: DateTime<Utc>,
    pub log_level_id: u8,
    pub log_level_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<StackFrame>,
}

fn serialize_iso_millis<S: Serializer>(
    date: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl LogMeta {
    /// Meta as a keyed value; unset optional fields are left out
    pub fn to_value(&self) -> Value {
        let mut meta = Object::new().with("runtime", self.environment.runtime.as_str());
        for (key, field) in [
            ("platform", &self.environment.platform),
            ("hostname", &self.environment.hostname),
            ("browser", &self.environment.browser),
            ("name", &self.name),
        ] {
            if let Some(field) = field {
                meta.insert(key, field.as_str());
            }
        }
        if let Some(parent_names) = &self.parent_names {
            meta.insert("parentNames", parent_names.clone());
        }
        meta.insert("date", Value::date(self.date));
        meta.insert("logLevelId", self.log_level_id);
        meta.insert("logLevelName", self.log_level_name.as_str());
        if let Some(path) = &self.path {
            meta.insert("path", path.to_value());
        }
        Value::object(meta)
    }
}

/// Shaped call arguments plus their meta under `meta_property`
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub body: Object,
    pub meta_property: String,
    pub meta: LogMeta,
}

impl LogRecord {
    pub fn new(body: Object, meta_property: impl Into<String>, meta: LogMeta) -> Self {
        Self {
            body,
            meta_property: meta_property.into(),
            meta,
        }
    }

    /// Property of the full record, meta included
    pub fn get(&self, key: &str) -> Option<Value> {
        if key == self.meta_property {
            return Some(self.meta.to_value());
        }
        self.body.get(key).cloned()
    }

    /// Body with the meta attached; the meta key always holds the meta
    pub fn to_value(&self) -> Value {
        let mut record = self.body.clone();
        record.insert(self.meta_property.clone(), self.meta.to_value());
        Value::object(record)
    }

    /// Cycle-safe JSON text of the full record
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&formatters::to_json_value(
            &self.to_value(),
        ))?)
    }
}

impl PartialEq for LogRecord {
    fn eq(&self, other: &Self) -> bool {
        self.meta_property == other.meta_property
            && self.meta == other.meta
            && self.body == other.body
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        formatters::to_json_value(&self.to_value()).serialize(serializer)
    }
}

/// Record builder shared by every logger kind
#[derive(Clone)]
pub struct BaseLogger {
    settings: Settings,
    log_obj: Option<Object>,
    runtime: Arc<dyn Runtime>,
    stack_depth_level: usize,
}

impl BaseLogger {
    /// Logger for the current process with native stack capture
    pub fn new(settings: SettingsParam, log_obj: Option<Object>) -> Self {
        Self::with_runtime(settings, log_obj, Arc::new(ProcessRuntime::detect()))
    }

    pub fn with_runtime(
        settings: SettingsParam,
        log_obj: Option<Object>,
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        Self::from_settings(Settings::from_param(settings), log_obj, runtime, 0)
    }

    fn from_settings(
        mut settings: Settings,
        log_obj: Option<Object>,
        runtime: Arc<dyn Runtime>,
        stack_depth_level: usize,
    ) -> Self {
        if !runtime.supports_styling() {
            settings.style_pretty_logs = false;
        }

        Self {
            settings,
            log_obj,
            runtime,
            stack_depth_level,
        }
    }

    /// Index of the caller among the call sites of a captured stack
    pub fn with_stack_depth(mut self, stack_depth_level: usize) -> Self {
        self.stack_depth_level = stack_depth_level;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    pub fn log_obj(&self) -> Option<&Object> {
        self.log_obj.as_ref()
    }

    /// Build and dispatch one record. Returns `Ok(None)` when the level is
    /// below the threshold; transport failures propagate unchanged.
    pub fn log(
        &self,
        log_level_id: u8,
        log_level_name: &str,
        args: Vec<Value>,
    ) -> Result<Option<LogRecord>> {
        let settings = &self.settings;
        if log_level_id < settings.min_level {
            trace!(
                logger.event = "record_filtered",
                log_level_id,
                min_level = settings.min_level,
                "Record below minimum level"
            );
            return Ok(None);
        }

        let mut log_args = settings.prefix.clone();
        log_args.extend(args);

        let masked_args = match &settings.overwrite.mask {
            Some(mask) => mask(log_args),
            None if !settings.mask_values_of_keys.is_empty() => {
                masking::mask_with_settings(&log_args, settings)
            }
            None => log_args,
        };

        let base_obj = self
            .log_obj
            .as_ref()
            .and_then(|obj| masking::clone_and_execute_functions(&Value::object(obj.clone())).to_object());

        let log_obj = match &settings.overwrite.to_log_obj {
            Some(to_log_obj) => to_log_obj(&masked_args, base_obj),
            None => self.to_log_obj(&masked_args, base_obj),
        };

        let record = match &settings.overwrite.add_meta {
            Some(add_meta) => add_meta(log_obj, log_level_id, log_level_name),
            None => self.add_meta(log_obj, log_level_id, log_level_name),
        };

        let mut meta_markup = settings
            .overwrite
            .format_meta
            .as_ref()
            .map(|format_meta| format_meta(&record.meta));
        let mut formatted = settings
            .overwrite
            .format_log_obj
            .as_ref()
            .map(|format_log_obj| format_log_obj(&masked_args, settings));

        if settings.log_type == LogType::Pretty {
            meta_markup =
                meta_markup.or_else(|| Some(formatters::pretty_format_meta(settings, &record.meta)));
            formatted = formatted.or_else(|| {
                Some(formatters::pretty_format_log_obj(
                    &masked_args,
                    settings,
                    self.runtime.as_ref(),
                ))
            });
        }

        match (meta_markup, formatted) {
            (Some(markup), Some(FormattedLogObj { args, errors })) => {
                match &settings.overwrite.transport_formatted {
                    Some(transport) => transport(&markup, &args, &errors, settings)?,
                    None => transports::console_formatted(&markup, &args, &errors, settings)?,
                }
            }
            _ => match &settings.overwrite.transport_json {
                Some(transport) => transport(&record)?,
                None if settings.log_type != LogType::Hidden => transports::console_json(&record)?,
                None => {}
            },
        }

        for transport in &settings.attached_transports {
            transport(&record)?;
        }

        Ok(Some(record))
    }

    /// Append a transport that receives every dispatched record
    pub fn attach_transport(&mut self, transport: TransportFn) {
        self.settings.attached_transports.push(transport);
        debug!(
            logger.event = "transport_attached",
            attached = self.settings.attached_transports.len(),
            "Attached transport"
        );
    }

    /// Child logger of the kind produced by `build`. The child gets a copy of
    /// these settings with `settings` layered on top, and keeps this logger's
    /// base object unless `log_obj` replaces it.
    pub fn sub_logger_with<L>(
        &self,
        settings: Option<SettingsParam>,
        log_obj: Option<Object>,
        build: impl FnOnce(BaseLogger) -> L,
    ) -> L {
        let child_settings = self.settings.for_sub_logger(settings.unwrap_or_default());
        debug!(
            logger.event = "sub_logger_created",
            parent = self.settings.name.as_deref().unwrap_or(""),
            name = child_settings.name.as_deref().unwrap_or(""),
            "Created sub-logger"
        );

        let base = Self::from_settings(
            child_settings,
            log_obj.or_else(|| self.log_obj.clone()),
            Arc::clone(&self.runtime),
            self.stack_depth_level,
        );
        build(base)
    }

    pub fn sub_logger(&self, settings: Option<SettingsParam>, log_obj: Option<Object>) -> BaseLogger {
        self.sub_logger_with(settings, log_obj, |base| base)
    }

    /// Default shaping. A single map argument is merged with the display form
    /// of its keys and a single set is stored under `"0"`; object spread would
    /// leave both empty.
    fn to_log_obj(&self, args: &[Value], base_obj: Option<Object>) -> Object {
        let args: Vec<Value> = args
            .iter()
            .map(|arg| match arg {
                Value::Error(_) => self.to_error_object(arg),
                other => other.clone(),
            })
            .collect();
        let base_obj = base_obj.unwrap_or_default();

        if let Some(key) = &self.settings.arguments_array_name {
            let mut log_obj = base_obj;
            log_obj.insert(key.clone(), Value::array(args));
            return log_obj;
        }

        let single = match args.as_slice() {
            [single] if !matches!(single, Value::Array(_) | Value::Bytes(_) | Value::Date(_)) => {
                Some(single.clone())
            }
            _ => None,
        };

        match single {
            Some(single) => {
                let mut log_obj = match &single {
                    Value::Object(object) => {
                        let mut merged = Object::new();
                        merged.extend_from(&object.read_recursive());
                        merged
                    }
                    Value::Map(entries) => entries
                        .read_recursive()
                        .iter()
                        .map(|(key, value)| (key.to_plain_string(), value.clone()))
                        .collect(),
                    other => Object::new().with("0", other.clone()),
                };
                log_obj.extend_from(&base_obj);
                log_obj
            }
            None => {
                let mut log_obj = base_obj;
                for (index, arg) in args.into_iter().enumerate() {
                    log_obj.insert(index.to_string(), arg);
                }
                log_obj
            }
        }
    }

    fn to_error_object(&self, error: &Value) -> Value {
        let Some(snapshot) = error.to_error() else {
            return error.clone();
        };
        let stack: Vec<Value> = snapshot
            .stack
            .as_deref()
            .map(|stack| self.runtime.error_trace(stack))
            .unwrap_or_default()
            .iter()
            .map(StackFrame::to_value)
            .collect();

        Value::object(
            Object::new()
                .with("nativeError", error.clone())
                .with("name", snapshot.name)
                .with("message", snapshot.message)
                .with("stack", Value::array(stack)),
        )
    }

    fn add_meta(&self, body: Object, log_level_id: u8, log_level_name: &str) -> LogRecord {
        let path = if self.settings.hide_log_position_for_production {
            None
        } else {
            Some(self.runtime.caller_frame(self.stack_depth_level))
        };

        let meta = LogMeta {
            environment: self.runtime.environment().clone(),
            name: self.settings.name.clone(),
            parent_names: self.settings.parent_names.clone(),
            date: Utc::now(),
            log_level_id,
            log_level_name: log_level_name.to_string(),
            path,
        };
        LogRecord::new(body, self.settings.meta_property.clone(), meta)
    }
}

/// Leveled logger: one method per default level
#[derive(Clone)]
pub struct Logger {
    base: BaseLogger,
}

impl Logger {
    pub fn new(settings: SettingsParam) -> Self {
        Self::from_base(BaseLogger::new(settings, None))
    }

    /// Logger whose records all carry the properties of `log_obj`
    pub fn with_log_obj(settings: SettingsParam, log_obj: Object) -> Self {
        Self::from_base(BaseLogger::new(settings, Some(log_obj)))
    }

    pub fn with_runtime(
        settings: SettingsParam,
        log_obj: Option<Object>,
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        Self::from_base(BaseLogger::with_runtime(settings, log_obj, runtime))
    }

    pub fn from_base(base: BaseLogger) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseLogger {
        &self.base
    }

    pub fn settings(&self) -> &Settings {
        self.base.settings()
    }

    /// Log with an arbitrary level id and name
    pub fn log(
        &self,
        log_level_id: u8,
        log_level_name: &str,
        args: Vec<Value>,
    ) -> Result<Option<LogRecord>> {
        self.base.log(log_level_id, log_level_name, args)
    }

    fn log_at(&self, level: LogLevel, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.base.log(level.id(), level.name(), args)
    }

    pub fn silly(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Silly, args)
    }

    pub fn trace(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Trace, args)
    }

    pub fn debug(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Debug, args)
    }

    pub fn info(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Info, args)
    }

    pub fn warn(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Warn, args)
    }

    pub fn error(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Error, args)
    }

    pub fn fatal(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Fatal, args)
    }

    pub fn success(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Success, args)
    }

    pub fn notice(&self, args: Vec<Value>) -> Result<Option<LogRecord>> {
        self.log_at(LogLevel::Notice, args)
    }

    pub fn attach_transport(&mut self, transport: TransportFn) {
        self.base.attach_transport(transport);
    }

    pub fn sub_logger(&self, settings: Option<SettingsParam>, log_obj: Option<Object>) -> Logger {
        self.base.sub_logger_with(settings, log_obj, Logger::from_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::settings::Overwrites;
    use crate::transports::MemoryTransport;
    use crate::value::ErrorValue;
    use parking_lot::Mutex;

    const STACK: &str = "Error\n    at caller (/srv/app/src/main.rs:12:5)\n    at outer (/srv/app/src/lib.rs:40:1)";

    fn runtime() -> Arc<dyn Runtime> {
        Arc::new(
            ProcessRuntime::new(Environment::new("Rust").with_hostname("test-host"))
                .with_cwd(Some("/srv/app".to_string()))
                .with_stack_source(|| Some(STACK.to_string())),
        )
    }

    fn hidden(param: SettingsParam) -> SettingsParam {
        SettingsParam {
            log_type: Some(LogType::Hidden),
            ..param
        }
    }

    fn base(param: SettingsParam) -> BaseLogger {
        BaseLogger::with_runtime(hidden(param), None, runtime())
    }

    #[test]
    fn test_below_threshold_is_filtered() {
        let memory = MemoryTransport::new();
        let mut logger = base(SettingsParam::default().with_min_level(3));
        logger.attach_transport(memory.transport());

        assert!(logger.log(2, "DEBUG", args!["skip"]).unwrap().is_none());
        assert!(memory.is_empty());

        assert!(logger.log(3, "INFO", args!["keep"]).unwrap().is_some());
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_single_object_is_merged() {
        let record = base(SettingsParam::default())
            .log(3, "INFO", args![Object::new().with("user", "ada").with("id", 7)])
            .unwrap()
            .unwrap();

        assert_eq!(record.body.get("user"), Some(&Value::from("ada")));
        assert_eq!(record.body.get("id"), Some(&Value::from(7)));
        assert!(!record.body.contains_key("0"));
    }

    #[test]
    fn test_single_scalar_goes_under_zero() {
        let record = base(SettingsParam::default())
            .log(3, "INFO", args!["hello"])
            .unwrap()
            .unwrap();
        assert_eq!(record.body.get("0"), Some(&Value::from("hello")));
        assert_eq!(record.body.len(), 1);
    }

    #[test]
    fn test_single_array_date_and_bytes_are_positional() {
        let logger = base(SettingsParam::default());
        for arg in [
            Value::from(vec![1, 2]),
            Value::date(Utc::now()),
            Value::bytes(vec![1u8, 2]),
        ] {
            let record = logger.log(3, "INFO", vec![arg.clone()]).unwrap().unwrap();
            assert_eq!(record.body.get("0"), Some(&arg));
        }
    }

    #[test]
    fn test_multiple_args_are_positional() {
        let record = base(SettingsParam::default())
            .log(3, "INFO", args!["a", 1, true])
            .unwrap()
            .unwrap();

        let keys: Vec<&str> = record.body.keys().collect();
        assert_eq!(keys, vec!["0", "1", "2"]);
        assert_eq!(record.body.get("2"), Some(&Value::from(true)));
    }

    #[test]
    fn test_single_map_is_merged_with_display_keys() {
        let map = Value::map(vec![(Value::from(1), Value::from("one"))]);
        let record = base(SettingsParam::default())
            .log(3, "INFO", vec![map])
            .unwrap()
            .unwrap();
        assert_eq!(record.body.get("1"), Some(&Value::from("one")));
    }

    #[test]
    fn test_single_set_goes_under_zero() {
        let set = Value::set(vec![Value::from(1), Value::from(2)]);
        let record = base(SettingsParam::default())
            .log(3, "INFO", vec![set.clone()])
            .unwrap()
            .unwrap();
        assert_eq!(record.body.len(), 1);
        assert_eq!(record.body.get("0"), Some(&set));
    }

    #[test]
    fn test_arguments_array_name() {
        let record = base(SettingsParam {
            arguments_array_name: Some("argumentsArray".to_string()),
            ..Default::default()
        })
        .log(3, "INFO", args!["a", 2])
        .unwrap()
        .unwrap();

        assert_eq!(
            record.body.get("argumentsArray"),
            Some(&Value::from(args!["a", 2]))
        );
        assert_eq!(record.body.len(), 1);
    }

    #[test]
    fn test_error_argument_is_converted() {
        let error = ErrorValue::new("TypeError", "bad input")
            .with_stack("TypeError: bad input\n    at parse (/srv/app/src/parse.rs:9:3)\n    at native");
        let record = base(SettingsParam::default())
            .log(5, "ERROR", args![error])
            .unwrap()
            .unwrap();

        assert_eq!(record.body.get("name"), Some(&Value::from("TypeError")));
        assert_eq!(record.body.get("message"), Some(&Value::from("bad input")));
        assert!(record.body.get("nativeError").unwrap().is_error());

        let stack = record.body.get("stack").unwrap().items().unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[0].get("fileName"), Some(Value::from("parse.rs")));
        assert_eq!(stack[1].len(), Some(0));
    }

    #[test]
    fn test_meta_is_attached() {
        let record = base(SettingsParam::default().with_name("api"))
            .log(4, "WARN", args!["careful"])
            .unwrap()
            .unwrap();

        let meta = record.get("_meta").unwrap();
        assert_eq!(meta.get("logLevelId"), Some(Value::from(4)));
        assert_eq!(meta.get("logLevelName"), Some(Value::from("WARN")));
        assert_eq!(meta.get("name"), Some(Value::from("api")));
        assert_eq!(meta.get("hostname"), Some(Value::from("test-host")));
        assert!(matches!(meta.get("date"), Some(Value::Date(_))));

        let path = record.meta.path.as_ref().unwrap();
        assert_eq!(path.file_path_with_line.as_deref(), Some("/src/main.rs:12"));
    }

    #[test]
    fn test_meta_key_is_configurable_and_overrides_body() {
        let record = base(SettingsParam {
            meta_property: Some("meta".to_string()),
            ..Default::default()
        })
        .log(3, "INFO", args![Object::new().with("meta", "user value")])
        .unwrap()
        .unwrap();

        let value = record.to_value();
        assert_eq!(value.get("meta").unwrap().get("logLevelName"), Some(Value::from("INFO")));
        assert!(record.get("_meta").is_none());
    }

    #[test]
    fn test_stack_depth_selects_frame() {
        let logger = base(SettingsParam::default()).with_stack_depth(1);
        let record = logger.log(3, "INFO", args!["x"]).unwrap().unwrap();
        assert_eq!(
            record.meta.path.unwrap().file_name.as_deref(),
            Some("lib.rs")
        );
    }

    #[test]
    fn test_hidden_position_skips_capture() {
        let record = base(SettingsParam {
            hide_log_position_for_production: Some(true),
            ..Default::default()
        })
        .log(3, "INFO", args!["x"])
        .unwrap()
        .unwrap();
        assert!(record.meta.path.is_none());
    }

    #[test]
    fn test_prefix_and_masking() {
        let record = base(SettingsParam::default().with_prefix(args!["[svc]"]))
            .log(3, "INFO", args![Object::new().with("password", "pw")])
            .unwrap()
            .unwrap();

        assert_eq!(record.body.get("0"), Some(&Value::from("[svc]")));
        assert_eq!(
            record.body.get("1").unwrap().get("password"),
            Some(Value::from("[***]"))
        );
    }

    #[test]
    fn test_empty_key_list_bypasses_masking() {
        let object = Value::object(Object::new().with("password", "pw"));
        let record = base(SettingsParam {
            mask_values_of_keys: Some(Vec::new()),
            ..Default::default()
        })
        .log(3, "INFO", vec![Value::from("x"), object.clone()])
        .unwrap()
        .unwrap();

        assert!(record.body.get("1").unwrap().ptr_eq(&object));
    }

    #[test]
    fn test_base_object_functions_and_precedence() {
        let base_obj = Object::new()
            .with("requestId", Value::function(|| Value::from("req-42")))
            .with("user", "base");
        let logger = BaseLogger::with_runtime(hidden(SettingsParam::default()), Some(base_obj), runtime());

        let merged = logger
            .log(3, "INFO", args![Object::new().with("user", "arg").with("x", 1)])
            .unwrap()
            .unwrap();
        assert_eq!(merged.body.get("requestId"), Some(&Value::from("req-42")));
        assert_eq!(merged.body.get("user"), Some(&Value::from("base")));

        let positional = logger.log(3, "INFO", args!["a", "b"]).unwrap().unwrap();
        assert_eq!(positional.body.get("user"), Some(&Value::from("base")));
        assert_eq!(positional.body.get("0"), Some(&Value::from("a")));
    }

    #[test]
    fn test_overrides_replace_stages() {
        let formatted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&formatted);

        let overwrite = Overwrites {
            mask: Some(Arc::new(|args: Vec<Value>| -> Vec<Value> {
                args.into_iter().map(|_| Value::from("masked")).collect()
            })),
            format_meta: Some(Arc::new(|meta: &LogMeta| format!("[{}] ", meta.log_level_name))),
            format_log_obj: Some(Arc::new(|args: &[Value], _: &Settings| FormattedLogObj {
                args: args.to_vec(),
                errors: Vec::new(),
            })),
            transport_formatted: Some(Arc::new(
                move |markup: &str, args: &[Value], _errors: &[String], _: &Settings| -> Result<()> {
                    sink.lock().push(format!("{}{}", markup, args.len()));
                    Ok(())
                },
            )),
            ..Default::default()
        };

        let record = base(SettingsParam::default().with_overwrite(overwrite))
            .log(3, "INFO", args!["secret", "other"])
            .unwrap()
            .unwrap();

        assert_eq!(record.body.get("0"), Some(&Value::from("masked")));
        assert_eq!(*formatted.lock(), vec!["[INFO] 2".to_string()]);
    }

    #[test]
    fn test_json_transport_override() {
        let captured = MemoryTransport::new();
        let overwrite = Overwrites {
            transport_json: Some(captured.transport()),
            ..Default::default()
        };
        base(SettingsParam::default().with_type(LogType::Json).with_overwrite(overwrite))
            .log(3, "INFO", args!["json"])
            .unwrap();

        assert_eq!(captured.len(), 1);
    }

    #[test]
    fn test_to_log_obj_override_shapes_dispatched_record() {
        let attached = MemoryTransport::new();
        let overwrite = Overwrites {
            to_log_obj: Some(Arc::new(|_: &[Value], _: Option<Object>| -> Object {
                Object::new().with("fixed", true)
            })),
            ..Default::default()
        };
        let mut logger = BaseLogger::with_runtime(
            hidden(SettingsParam::default().with_overwrite(overwrite)),
            Some(Object::new().with("service", "billing")),
            runtime(),
        );
        logger.attach_transport(attached.transport());

        let record = logger.log(3, "INFO", args!["ignored", 7]).unwrap().unwrap();

        assert_eq!(record.body, Object::new().with("fixed", true));
        assert_eq!(attached.records(), vec![record]);
    }

    #[test]
    fn test_add_meta_override_builds_dispatched_record() {
        let json = MemoryTransport::new();
        let attached = MemoryTransport::new();
        let overwrite = Overwrites {
            add_meta: Some(Arc::new(|body: Object, id: u8, name: &str| -> LogRecord {
                LogRecord::new(
                    body,
                    "ctx",
                    LogMeta {
                        environment: Environment::new("Custom"),
                        name: Some("override".to_string()),
                        parent_names: None,
                        date: chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 5, 1, 12, 0, 0)
                            .unwrap(),
                        log_level_id: id,
                        log_level_name: format!("custom-{}", name),
                        path: None,
                    },
                )
            })),
            transport_json: Some(json.transport()),
            ..Default::default()
        };
        let mut logger = BaseLogger::with_runtime(
            SettingsParam::default()
                .with_type(LogType::Json)
                .with_overwrite(overwrite),
            None,
            runtime(),
        );
        logger.attach_transport(attached.transport());

        let record = logger.log(4, "WARN", args!["payload"]).unwrap().unwrap();

        assert_eq!(record.meta_property, "ctx");
        assert_eq!(record.meta.log_level_name, "custom-WARN");
        assert_eq!(record.meta.environment.runtime, "Custom");
        assert_eq!(json.records(), vec![record.clone()]);
        assert_eq!(attached.records(), vec![record.clone()]);

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["ctx"]["logLevelName"], "custom-WARN");
        assert_eq!(value["ctx"]["date"], "2024-05-01T12:00:00.000Z");
        assert!(value.get("_meta").is_none());
    }

    #[test]
    fn test_json_keeps_argument_and_property_order() {
        let logger = base(SettingsParam::default());

        let positional = logger
            .log(3, "INFO", (0..12).map(Value::from).collect())
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&positional.to_json().unwrap()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        expected.push("_meta".to_string());
        assert_eq!(keys, expected);

        let keyed = logger
            .log(3, "INFO", args![Object::new().with("zeta", 1).with("alpha", 2)])
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&keyed.to_json().unwrap()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "_meta"]);
    }

    #[test]
    fn test_transport_failure_stops_later_transports() {
        let after = MemoryTransport::new();
        let mut logger = base(SettingsParam::default());
        logger.attach_transport(Arc::new(|_: &LogRecord| -> Result<()> {
            Err(crate::Error::transport("down"))
        }));
        logger.attach_transport(after.transport());

        let result = logger.log(3, "INFO", args!["x"]);
        assert!(matches!(result, Err(crate::Error::Transport { .. })));
        assert!(after.is_empty());
    }

    #[test]
    fn test_sub_logger_inherits() {
        let parent = base(SettingsParam::default().with_name("root").with_min_level(2));
        let child = parent.sub_logger(None, None);

        assert_eq!(child.settings().min_level, 2);
        assert_eq!(child.settings().name.as_deref(), Some("root"));
        assert_eq!(child.settings().parent_names, Some(vec!["root".to_string()]));
        assert_eq!(child.settings().prefix, parent.settings().prefix);
        assert_eq!(child.settings().log_type, parent.settings().log_type);
    }

    #[test]
    fn test_sub_logger_does_not_share_transports() {
        let memory = MemoryTransport::new();
        let parent = base(SettingsParam::default().with_name("root"));
        let mut child = parent.sub_logger(None, None);
        child.attach_transport(memory.transport());

        parent.log(3, "INFO", args!["parent"]).unwrap();
        child.log(3, "INFO", args!["child"]).unwrap();

        assert_eq!(memory.len(), 1);
        assert_eq!(parent.settings().attached_transports.len(), 0);
    }

    #[test]
    fn test_logger_level_methods() {
        let memory = MemoryTransport::new();
        let mut logger = Logger::with_runtime(hidden(SettingsParam::default()), None, runtime());
        logger.attach_transport(memory.transport());

        logger.silly(args!["s"]).unwrap();
        logger.trace(args!["t"]).unwrap();
        logger.debug(args!["d"]).unwrap();
        logger.info(args!["i"]).unwrap();
        logger.warn(args!["w"]).unwrap();
        logger.error(args!["e"]).unwrap();
        logger.fatal(args!["f"]).unwrap();
        logger.success(args!["ok"]).unwrap();
        logger.notice(args!["n"]).unwrap();
        logger.log(42, "CUSTOM", args!["c"]).unwrap();

        let ids: Vec<u8> = memory.records().iter().map(|r| r.meta.log_level_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 42]);
        assert_eq!(memory.records()[9].meta.log_level_name, "CUSTOM");
    }

    #[test]
    fn test_logger_sub_logger_is_logger() {
        let logger = Logger::with_runtime(
            hidden(SettingsParam::default().with_name("a")),
            None,
            runtime(),
        );
        let child: Logger = logger.sub_logger(Some(SettingsParam::default().with_name("b")), None);
        let record = child.info(args!["x"]).unwrap().unwrap();

        assert_eq!(record.meta.name.as_deref(), Some("b"));
        assert_eq!(record.meta.parent_names, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let record = base(SettingsParam::default())
            .log(3, "INFO", args!["x"])
            .unwrap()
            .unwrap();
        let json = serde_json::to_value(&record.meta).unwrap();

        assert_eq!(json["logLevelId"], 3);
        assert_eq!(json["runtime"], "Rust");
        assert!(json["date"].as_str().unwrap().ends_with('Z'));
        assert_eq!(json["path"]["fileName"], "main.rs");
        assert!(json.get("parentNames").is_none());
    }
}
