//! # Fennec Logger
//!
//! Structured logging pipeline for Fennec.
//!
//! ## Features
//!
//! - **Structured Records**: call arguments shaped into one keyed record with attached metadata
//! - **Pretty Output**: `{{placeholder}}` templates with per-placeholder ANSI styles
//! - **Privacy & Security**: cycle-safe deep cloning that masks sensitive keys and patterns
//! - **Source Location**: caller and error stack frames parsed from captured stack text
//! - **Transports**: console, JSON lines, in-memory and `tracing` sinks
//! - **Configurable**: TOML configuration with environment overrides and child loggers
//!
//! ## Quick Start
//!
//! ```rust
//! use fennec_logger::{args, Logger, SettingsParam, LogType};
//!
//! fn main() -> fennec_logger::Result<()> {
//!     let logger = Logger::new(SettingsParam {
//!         name: Some("app".to_string()),
//!         log_type: Some(LogType::Json),
//!         ..Default::default()
//!     });
//!
//!     logger.info(args!["Application started", 42])?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod formatters;
pub mod inspect;
pub mod level;
pub mod logger;
pub mod masking;
pub mod runtime;
pub mod settings;
pub mod styles;
pub mod template;
pub mod transports;
pub mod value;


pub use config::LoggerConfig;
pub use level::LogLevel;
pub use logger::{BaseLogger, LogMeta, LogRecord, Logger};
pub use runtime::{BrowserRuntime, Environment, ProcessRuntime, Runtime, StackFrame};
pub use settings::{LogType, Overwrites, Settings, SettingsParam, TimeZone};
pub use styles::Style;
pub use value::{ErrorValue, Object, Value, ValueFn};

/// Result type for logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Logger-specific errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl Error {
    /// Shorthand for a transport failure with a message
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Transport {
            message: format!("{:#}", err),
        }
    }
}

/// Build a `Vec<Value>` of log arguments from heterogeneous expressions.
///
/// ```rust
/// use fennec_logger::{args, Value};
///
/// let a: Vec<Value> = args!["user", 7, true];
/// assert_eq!(a.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}
