//! `{{placeholder}}` template expansion with optional ANSI styling

use crate::settings::Settings;
use crate::styles::RESET_SEQUENCE;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(.+?)\}\}").unwrap());

/// Placeholder name to substituted value
pub type PlaceholderValues = HashMap<String, String>;

/// Expand every `{{name}}` token in `template` from `values`.
///
/// Unset tokens are kept literally, or dropped when `hide_unset_placeholder`
/// is set. With `style_pretty_logs` enabled each expansion is wrapped in the
/// style configured for its placeholder and followed by a reset sequence.
pub fn format_template(
    settings: &Settings,
    template: &str,
    values: &PlaceholderValues,
    hide_unset_placeholder: bool,
) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let placeholder = &caps[1];
            let value = match values.get(placeholder) {
                Some(value) => value.as_str(),
                None if hide_unset_placeholder => "",
                None => &caps[0],
            };

            if !settings.style_pretty_logs {
                return value.to_string();
            }

            let styled = match settings.pretty_log_styles.get(placeholder) {
                Some(style) => style.apply(value),
                None => value.to_string(),
            };
            format!("{}{}", styled, RESET_SEQUENCE)
        })
        .into_owned()
}
