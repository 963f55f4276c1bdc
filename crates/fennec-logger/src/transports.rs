//! Output sinks for finished records

use crate::formatters::compose_pretty_line;
use crate::level::tracing_level;
use crate::logger::LogRecord;
use crate::settings::{FormattedTransportFn, Settings, TransportFn};
use crate::value::Value;
use crate::Result;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::Level;

/// Default pretty transport: one composed line on stdout
pub fn console_formatted(
    meta_markup: &str,
    args: &[Value],
    errors: &[String],
    settings: &Settings,
) -> Result<()> {
    let line = compose_pretty_line(meta_markup, args, errors, settings);
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    Ok(())
}

/// Default JSON transport: the full record as one line on stdout
pub fn console_json(record: &LogRecord) -> Result<()> {
    let json = record.to_json()?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

/// Writes every record as a JSON line to any writer
#[derive(Clone)]
pub struct WriterTransport {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl WriterTransport {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn write_record(&self, record: &LogRecord) -> Result<()> {
        let json = record.to_json()?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    /// Attachable transport writing through this writer
    pub fn transport(&self) -> TransportFn {
        let this = self.clone();
        Arc::new(move |record: &LogRecord| this.write_record(record))
    }
}

/// Keeps records and composed pretty lines in memory
#[derive(Clone, Default)]
pub struct MemoryTransport {
    records: Arc<Mutex<Vec<LogRecord>>>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attachable transport (or JSON override) capturing each record
    pub fn transport(&self) -> TransportFn {
        let records = Arc::clone(&self.records);
        Arc::new(move |record: &LogRecord| -> Result<()> {
            records.lock().push(record.clone());
            Ok(())
        })
    }

    /// Pretty-path override capturing each composed line, uncolored or not per settings
    pub fn formatted_transport(&self) -> FormattedTransportFn {
        let lines = Arc::clone(&self.lines);
        Arc::new(
            move |meta_markup: &str,
                  args: &[Value],
                  errors: &[String],
                  settings: &Settings|
                  -> Result<()> {
                lines
                    .lock()
                    .push(compose_pretty_line(meta_markup, args, errors, settings));
                Ok(())
            },
        )
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
        self.lines.lock().clear();
    }
}

/// Forwards records as `tracing` events, mapping level ids onto tracing levels
pub fn tracing_transport() -> TransportFn {
    Arc::new(|record: &LogRecord| -> Result<()> {
        let body = serde_json::to_string(&crate::formatters::to_json_value(&Value::object(
            record.body.clone(),
        )))?;
        let name = record.meta.name.as_deref().unwrap_or("");
        let level_name = record.meta.log_level_name.as_str();

        match tracing_level(record.meta.log_level_id) {
            Level::TRACE => tracing::trace!(logger.name = name, level_name, "{}", body),
            Level::DEBUG => tracing::debug!(logger.name = name, level_name, "{}", body),
            Level::INFO => tracing::info!(logger.name = name, level_name, "{}", body),
            Level::WARN => tracing::warn!(logger.name = name, level_name, "{}", body),
            _ => tracing::error!(logger.name = name, level_name, "{}", body),
        }
        Ok(())
    })
}
