//! Logger configuration and management

use crate::inspect::InspectOptions;
use crate::level::LogLevel;
use crate::masking::compile_patterns;
use crate::settings::{
    LogType, SettingsParam, TimeZone, DEFAULT_LOGGER_NAME_DELIMITER, DEFAULT_MASK_PLACEHOLDER,
    DEFAULT_META_PROPERTY, DEFAULT_PARENT_NAMES_SEPARATOR, DEFAULT_PRETTY_ERROR_STACK_TEMPLATE,
    DEFAULT_PRETTY_ERROR_TEMPLATE, DEFAULT_PRETTY_LOG_TEMPLATE,
};
use crate::styles::{default_styles, StyleMap};
use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main logger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output and identity settings
    pub logging: LoggingConfig,

    /// Pretty output templates and styles
    pub pretty: PrettyConfig,

    /// Masking settings
    pub privacy: PrivacyConfig,
}

/// Logging-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output mode (pretty, json, hidden)
    #[serde(rename = "type")]
    pub log_type: LogType,

    /// Minimum level (SILLY .. NOTICE)
    pub min_level: LogLevel,

    /// Logger name
    pub name: Option<String>,

    /// Store all arguments under this key instead of positionally
    pub arguments_array_name: Option<String>,

    /// Skip stack capture for the caller position
    pub hide_log_position_for_production: bool,

    /// Property holding the record meta
    pub meta_property: String,
}

/// Pretty output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrettyConfig {
    pub log_template: String,
    pub error_template: String,
    pub error_stack_template: String,
    pub parent_names_separator: String,
    pub logger_name_delimiter: String,

    /// Enable ANSI styles
    pub style: bool,

    pub time_zone: TimeZone,

    /// Per-placeholder styles
    pub styles: StyleMap,

    pub inspect: InspectOptions,
}

/// Privacy and security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Keys whose values are replaced
    pub mask_keys: Vec<String>,

    /// Match keys case-insensitively
    pub mask_keys_case_insensitive: bool,

    /// Patterns replaced in leaf values (regex patterns)
    pub mask_patterns: Vec<String>,

    /// Replacement text
    pub mask_placeholder: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_type: LogType::Pretty,
            min_level: LogLevel::Silly,
            name: None,
            arguments_array_name: None,
            hide_log_position_for_production: false,
            meta_property: DEFAULT_META_PROPERTY.to_string(),
        }
    }
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self {
            log_template: DEFAULT_PRETTY_LOG_TEMPLATE.to_string(),
            error_template: DEFAULT_PRETTY_ERROR_TEMPLATE.to_string(),
            error_stack_template: DEFAULT_PRETTY_ERROR_STACK_TEMPLATE.to_string(),
            parent_names_separator: DEFAULT_PARENT_NAMES_SEPARATOR.to_string(),
            logger_name_delimiter: DEFAULT_LOGGER_NAME_DELIMITER.to_string(),
            style: true,
            time_zone: TimeZone::Utc,
            styles: default_styles(),
            inspect: InspectOptions::default(),
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            mask_keys: vec!["password".to_string()],
            mask_keys_case_insensitive: false,
            mask_patterns: Vec::new(),
            mask_placeholder: DEFAULT_MASK_PLACEHOLDER.to_string(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from file or create default
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            let config: LoggerConfig = toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Failed to parse logger config: {}", e),
            })?;
            info!(
                logger.event = "config_loaded",
                path = %config_file.display(),
                "Loaded logger configuration"
            );
            Ok(config)
        } else {
            let mut config = Self::default();
            config.load_env_overrides();
            debug!(
                logger.event = "config_defaulted",
                path = %config_file.display(),
                "No logger configuration file, using defaults"
            );
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize logger config: {}", e),
        })?;

        std::fs::write(&config_file, content)?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        if let Ok(log_type) = std::env::var("FENNEC_LOG_TYPE") {
            self.logging.log_type = log_type.parse().unwrap_or(self.logging.log_type);
        }

        // Level name or numeric id
        if let Ok(level) = std::env::var("FENNEC_LOG_LEVEL") {
            self.logging.min_level = level.parse().unwrap_or(self.logging.min_level);
        }

        if let Ok(name) = std::env::var("FENNEC_LOG_NAME") {
            self.logging.name = Some(name);
        }

        if let Ok(style) = std::env::var("FENNEC_LOG_STYLE") {
            self.pretty.style = style.parse().unwrap_or(self.pretty.style);
        }

        if let Ok(time_zone) = std::env::var("FENNEC_LOG_TIMEZONE") {
            self.pretty.time_zone = time_zone.parse().unwrap_or(self.pretty.time_zone);
        }

        if let Ok(hide) = std::env::var("FENNEC_LOG_HIDE_POSITION") {
            self.logging.hide_log_position_for_production = hide
                .parse()
                .unwrap_or(self.logging.hide_log_position_for_production);
        }

        // Comma separated
        if let Ok(keys) = std::env::var("FENNEC_LOG_MASK_KEYS") {
            self.privacy.mask_keys = keys
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "fennec", "fennec").ok_or_else(|| Error::Config {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(project_dirs.config_dir().join("logger.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.logging.meta_property.is_empty() {
            return Err(Error::Config {
                message: "meta_property must not be empty".to_string(),
            });
        }

        if let Some(name) = &self.logging.arguments_array_name {
            if name.is_empty() {
                return Err(Error::Config {
                    message: "arguments_array_name must not be empty when set".to_string(),
                });
            }
        }

        compile_patterns(&self.privacy.mask_patterns)?;
        Ok(())
    }

    /// Settings for a new logger; fails on invalid mask patterns
    pub fn into_settings_param(self) -> Result<SettingsParam> {
        self.validate()?;
        let mask_values_regex = compile_patterns(&self.privacy.mask_patterns)?;

        Ok(SettingsParam {
            log_type: Some(self.logging.log_type),
            name: self.logging.name,
            min_level: Some(self.logging.min_level.id()),
            arguments_array_name: self.logging.arguments_array_name,
            hide_log_position_for_production: Some(self.logging.hide_log_position_for_production),
            meta_property: Some(self.logging.meta_property),
            pretty_log_template: Some(self.pretty.log_template),
            pretty_error_template: Some(self.pretty.error_template),
            pretty_error_stack_template: Some(self.pretty.error_stack_template),
            pretty_error_parent_names_separator: Some(self.pretty.parent_names_separator),
            pretty_error_logger_name_delimiter: Some(self.pretty.logger_name_delimiter),
            style_pretty_logs: Some(self.pretty.style),
            pretty_log_time_zone: Some(self.pretty.time_zone),
            pretty_log_styles: Some(self.pretty.styles),
            pretty_inspect_options: Some(self.pretty.inspect),
            mask_values_of_keys: Some(self.privacy.mask_keys),
            mask_values_of_keys_case_insensitive: Some(self.privacy.mask_keys_case_insensitive),
            mask_values_regex: Some(mask_values_regex),
            mask_placeholder: Some(self.privacy.mask_placeholder),
            ..Default::default()
        })
    }
}
