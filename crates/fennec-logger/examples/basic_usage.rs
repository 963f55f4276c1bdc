//! Basic logger usage example
//!
//! This example demonstrates leveled logging, masking, child loggers and
//! attached transports.
//!
//! Run with: cargo run --example basic_usage

use fennec_logger::transports::{tracing_transport, MemoryTransport};
use fennec_logger::{args, ErrorValue, LogType, Logger, LoggerConfig, Object, SettingsParam};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    // Configuration file and FENNEC_LOG_* variables, falling back to defaults
    let config = LoggerConfig::load(None)?;
    let mut settings = config.into_settings_param()?;
    settings.name = Some("example".to_string());

    let mut logger = Logger::new(settings);

    // Every record is also forwarded as a tracing event
    logger.attach_transport(tracing_transport());

    logger.info(args!["Starting basic logging examples"])?;
    logger.debug(args!["This is a debug message", 1, true])?;
    logger.warn(args!["This is a warning message"])?;

    // Single objects are merged into the record; masked keys never leave
    logger.info(args![Object::new()
        .with("user_id", "user123")
        .with("password", "correct horse battery staple")
        .with("success", true)])?;

    // Errors render with their parsed stack
    logger.error(args![ErrorValue::capture("DatabaseError", "connection refused")])?;

    // Child loggers extend the name chain and prefix
    let child = logger.sub_logger(
        Some(SettingsParam {
            name: Some("worker".to_string()),
            prefix: Some(args!["[job]"]),
            ..Default::default()
        }),
        Some(Object::new().with("queue", "emails")),
    );
    child.success(args!["Processed batch", 25])?;

    // JSON records captured in memory
    let memory = MemoryTransport::new();
    let json_logger = Logger::new(SettingsParam {
        log_type: Some(LogType::Json),
        overwrite: Some(fennec_logger::Overwrites {
            transport_json: Some(memory.transport()),
            ..Default::default()
        }),
        ..Default::default()
    });
    json_logger.notice(args!["captured"])?;

    for record in memory.records() {
        println!("{}", record.to_json()?);
    }

    Ok(())
}
