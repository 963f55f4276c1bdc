//! ANSI styles for pretty output

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reset emitted after every expanded placeholder
pub const RESET_SEQUENCE: &str = "\u{1b}[0m\u{1b}[0m";

/// Style specification for one placeholder.
///
/// Deserializes from a bare string, a list, or a table keyed by value
/// (with `"*"` as the fallback key), which is how it appears in TOML config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Style {
    /// One named ANSI style such as `"bold"` or `"bgRed"`
    Named(String),
    /// Styles applied in order, each wrapping the previous result
    Chain(Vec<Style>),
    /// Style picked by the trimmed value, falling back to `"*"`
    Keyed(BTreeMap<String, Style>),
}

impl Style {
    pub fn named(name: impl Into<String>) -> Self {
        Style::Named(name.into())
    }

    pub fn chain(names: &[&str]) -> Self {
        Style::Chain(names.iter().map(|name| Style::named(*name)).collect())
    }

    pub fn keyed<K: Into<String>>(entries: impl IntoIterator<Item = (K, Style)>) -> Self {
        Style::Keyed(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wrap `value` in the ANSI codes this style resolves to
    pub fn apply(&self, value: &str) -> String {
        match self {
            Style::Named(name) => match ansi_codes(name) {
                Some(codes) => ansi_wrap(value, codes),
                None => value.to_string(),
            },
            Style::Chain(styles) => styles
                .iter()
                .fold(value.to_string(), |styled, style| style.apply(&styled)),
            Style::Keyed(by_value) => match by_value.get(value.trim()).or_else(|| by_value.get("*")) {
                Some(style) => style.apply(value),
                None => value.to_string(),
            },
        }
    }
}

impl From<&str> for Style {
    fn from(name: &str) -> Self {
        Style::named(name)
    }
}

/// Placeholder name to style
pub type StyleMap = BTreeMap<String, Style>;

pub fn ansi_wrap(value: &str, (start, end): (u8, u8)) -> String {
    format!("\u{1b}[{}m{}\u{1b}[{}m", start, value, end)
}

/// Start and end SGR codes for a named style
pub fn ansi_codes(name: &str) -> Option<(u8, u8)> {
    let codes = match name {
        "reset" => (0, 0),
        "bold" => (1, 22),
        "dim" => (2, 22),
        "italic" => (3, 23),
        "underline" => (4, 24),
        "overline" => (53, 55),
        "inverse" => (7, 27),
        "hidden" => (8, 28),
        "strikethrough" => (9, 29),
        "black" => (30, 39),
        "red" => (31, 39),
        "green" => (32, 39),
        "yellow" => (33, 39),
        "blue" => (34, 39),
        "magenta" => (35, 39),
        "cyan" => (36, 39),
        "white" => (37, 39),
        "blackBright" | "gray" | "grey" => (90, 39),
        "redBright" => (91, 39),
        "greenBright" => (92, 39),
        "yellowBright" => (93, 39),
        "blueBright" => (94, 39),
        "magentaBright" => (95, 39),
        "cyanBright" => (96, 39),
        "whiteBright" => (97, 39),
        "bgBlack" => (40, 49),
        "bgRed" => (41, 49),
        "bgGreen" => (42, 49),
        "bgYellow" => (43, 49),
        "bgBlue" => (44, 49),
        "bgMagenta" => (45, 49),
        "bgCyan" => (46, 49),
        "bgWhite" => (47, 49),
        "bgBlackBright" => (100, 49),
        "bgRedBright" => (101, 49),
        "bgGreenBright" => (102, 49),
        "bgYellowBright" => (103, 49),
        "bgBlueBright" => (104, 49),
        "bgMagentaBright" => (105, 49),
        "bgCyanBright" => (106, 49),
        "bgWhiteBright" => (107, 49),
        _ => return None,
    };
    Some(codes)
}

/// Style map used when none is configured
pub fn default_styles() -> StyleMap {
    let mut styles = StyleMap::new();
    styles.insert(
        "logLevelName".to_string(),
        Style::keyed([
            ("*", Style::chain(&["bold", "black", "bgWhiteBright", "dim"])),
            ("SILLY", Style::chain(&["bold", "white"])),
            ("TRACE", Style::chain(&["bold", "whiteBright"])),
            ("DEBUG", Style::chain(&["bold", "magenta"])),
            ("INFO", Style::chain(&["bold", "blue"])),
            ("WARN", Style::chain(&["bold", "yellow"])),
            ("ERROR", Style::chain(&["bold", "red"])),
            ("FATAL", Style::chain(&["bold", "redBright"])),
            ("SUCCESS", Style::chain(&["bold", "greenBright", "bgGreenBright"])),
            ("NOTICE", Style::chain(&["bold", "yellow", "bgYellow"])),
        ]),
    );
    styles.insert("dateIsoStr".to_string(), Style::named("white"));
    styles.insert("filePathWithLine".to_string(), Style::named("white"));
    styles.insert("name".to_string(), Style::chain(&["white", "bold"]));
    styles.insert(
        "nameWithDelimiterPrefix".to_string(),
        Style::chain(&["white", "bold"]),
    );
    styles.insert(
        "nameWithDelimiterSuffix".to_string(),
        Style::chain(&["white", "bold"]),
    );
    styles.insert(
        "errorName".to_string(),
        Style::chain(&["bold", "bgRedBright", "whiteBright"]),
    );
    styles.insert("fileName".to_string(), Style::chain(&["yellow"]));
    styles.insert("fileNameWithLine".to_string(), Style::named("white"));
    styles
}
