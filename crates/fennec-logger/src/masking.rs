//! Cycle-safe deep cloning with redaction of sensitive keys and patterns

use crate::settings::Settings;
use crate::value::{ErrorValue, Object, Value};
use crate::{Error, Result};
use regex::{NoExpand, Regex};

/// Clone every argument, replacing the values of matching keys and every
/// regex match in leaf values with `placeholder`.
///
/// Cycles are cut per argument: a node reached a second time is emitted as a
/// one-level copy of itself. Maps and sets are copied without descending into
/// their entries, byte buffers are never scanned.
pub fn mask(
    args: &[Value],
    keys: &[String],
    case_insensitive: bool,
    regexes: &[Regex],
    placeholder: &str,
) -> Vec<Value> {
    let masker = Masker::new(keys, case_insensitive, regexes, placeholder);
    args.iter()
        .map(|arg| masker.clone_value(arg, &mut Vec::new()))
        .collect()
}

/// [`mask`] driven by a logger's masking settings
pub fn mask_with_settings(args: &[Value], settings: &Settings) -> Vec<Value> {
    mask(
        args,
        &settings.mask_values_of_keys,
        settings.mask_values_of_keys_case_insensitive,
        &settings.mask_values_regex,
        &settings.mask_placeholder,
    )
}

struct Masker<'a> {
    keys: Vec<String>,
    case_insensitive: bool,
    regexes: &'a [Regex],
    placeholder: &'a str,
}

impl<'a> Masker<'a> {
    fn new(
        keys: &[String],
        case_insensitive: bool,
        regexes: &'a [Regex],
        placeholder: &'a str,
    ) -> Self {
        let keys = if case_insensitive {
            keys.iter().map(|key| key.to_lowercase()).collect()
        } else {
            keys.to_vec()
        };

        Self {
            keys,
            case_insensitive,
            regexes,
            placeholder,
        }
    }

    fn should_mask_key(&self, key: &str) -> bool {
        if self.case_insensitive {
            let key = key.to_lowercase();
            self.keys.iter().any(|k| *k == key)
        } else {
            self.keys.iter().any(|k| k == key)
        }
    }

    fn clone_value(&self, source: &Value, seen: &mut Vec<usize>) -> Value {
        if let Some(id) = source.node_id() {
            if seen.contains(&id) {
                return source.shallow_copy();
            }
            seen.push(id);
        }

        match source {
            Value::Bytes(_) => source.clone(),
            Value::Map(_) | Value::Set(_) => source.shallow_copy(),
            Value::Date(date) => Value::Date(*date),
            Value::Array(items) => {
                let items = items.read_recursive().clone();
                Value::array(items.iter().map(|item| self.clone_value(item, seen)).collect())
            }
            Value::Error(error) => {
                let error = error.read_recursive().clone();
                Value::error(self.clone_error(&error, seen))
            }
            Value::Object(object) => {
                let object = object.read_recursive().clone();
                Value::object(self.clone_object(&object, seen))
            }
            Value::Null | Value::Function(_) => source.clone(),
            leaf => self.mask_leaf(leaf),
        }
    }

    fn clone_object(&self, object: &Object, seen: &mut Vec<usize>) -> Object {
        let mut clone = empty_like(object);
        for (key, value) in object.iter() {
            let value = if self.should_mask_key(key) {
                Value::from(self.placeholder)
            } else {
                self.clone_value(value, seen)
            };
            clone.insert(key, value);
        }
        clone
    }

    fn clone_error(&self, error: &ErrorValue, seen: &mut Vec<usize>) -> ErrorValue {
        let message = if self.should_mask_key("message") {
            self.placeholder.to_string()
        } else {
            self.mask_text(&error.message)
        };
        let stack = error.stack.as_ref().map(|stack| {
            if self.should_mask_key("stack") {
                self.placeholder.to_string()
            } else {
                self.mask_text(stack)
            }
        });

        ErrorValue {
            name: error.name.clone(),
            message,
            stack,
            properties: self.clone_object(&error.properties, seen),
        }
    }

    fn mask_text(&self, text: &str) -> String {
        self.regexes.iter().fold(text.to_string(), |acc, regex| {
            regex.replace_all(&acc, NoExpand(self.placeholder)).into_owned()
        })
    }

    fn mask_leaf(&self, leaf: &Value) -> Value {
        if self.regexes.is_empty() {
            return leaf.clone();
        }
        match leaf {
            Value::String(text) => Value::String(self.mask_text(text)),
            other => {
                let text = other.to_plain_string();
                let masked = self.mask_text(&text);
                if masked == text {
                    other.clone()
                } else {
                    Value::String(masked)
                }
            }
        }
    }
}

fn empty_like(object: &Object) -> Object {
    match object.class_name() {
        Some(class_name) => Object::with_class(class_name),
        None => Object::new(),
    }
}

/// Deep clone of a logger's base object in which every function-valued
/// property is replaced by the value it returns
pub fn clone_and_execute_functions(source: &Value) -> Value {
    execute_functions(source, &mut Vec::new())
}

fn execute_functions(source: &Value, seen: &mut Vec<usize>) -> Value {
    if let Some(id) = source.node_id() {
        if seen.contains(&id) {
            return source.shallow_copy();
        }
        seen.push(id);
    }

    match source {
        Value::Array(items) => {
            let items = items.read_recursive().clone();
            Value::array(items.iter().map(|item| execute_functions(item, seen)).collect())
        }
        Value::Date(date) => Value::Date(*date),
        Value::Object(object) => {
            let object = object.read_recursive().clone();
            let mut clone = empty_like(&object);
            for (key, value) in object.iter() {
                let value = match value {
                    Value::Function(f) => f.call(),
                    other => execute_functions(other, seen),
                };
                clone.insert(key, value);
            }
            Value::object(clone)
        }
        other => other.shallow_copy(),
    }
}

/// Compile redaction patterns, reporting the first invalid one
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern).map_err(|e| Error::Config {
                message: format!("Invalid redaction pattern '{}': {}", pattern, e),
            })
        })
        .collect()
}

/// Pre-defined redaction patterns for common sensitive data types
pub struct MaskPatterns;

impl MaskPatterns {
    /// API keys, bearer tokens and basic auth credentials
    pub fn api_credentials() -> Vec<String> {
        vec![
            r"(?i)(api_?key|token|secret|password)\s*[:=]\s*['\x22]?([a-zA-Z0-9_\-\.]{8,})['\x22]?"
                .to_string(),
            r"(?i)bearer\s+([a-zA-Z0-9_\-\.]+)".to_string(),
            r"(?i)basic\s+([a-zA-Z0-9+/=]+)".to_string(),
        ]
    }

    /// Personal identifiable information
    pub fn pii() -> Vec<String> {
        vec![
            // Social Security Numbers
            r"\b\d{3}-\d{2}-\d{4}\b".to_string(),
            // Phone numbers
            r"\b\d{3}-\d{3}-\d{4}\b".to_string(),
            r"\(\d{3}\)\s*\d{3}-\d{4}\b".to_string(),
            r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b".to_string(),
        ]
    }

    /// Card and bank account numbers
    pub fn financial() -> Vec<String> {
        vec![
            r"\b\d{4}[\s\-]?\d{4}[\s\-]?\d{4}[\s\-]?\d{4}\b".to_string(),
            r"\b\d{8,17}\b".to_string(),
        ]
    }

    pub fn all() -> Vec<String> {
        let mut patterns = Vec::new();
        patterns.extend(Self::api_credentials());
        patterns.extend(Self::pii());
        patterns.extend(Self::financial());
        patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PLACEHOLDER: &str = "[***]";

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn mask_one(value: &Value, names: &[&str], case_insensitive: bool) -> Value {
        mask(
            std::slice::from_ref(value),
            &keys(names),
            case_insensitive,
            &[],
            PLACEHOLDER,
        )
        .remove(0)
    }

    #[test]
    fn test_masks_nested_keys() {
        let input = Value::object(
            Object::new()
                .with("user", "ada")
                .with("password", "hunter2")
                .with(
                    "nested",
                    Object::new().with("password", "x").with("keep", 1),
                )
                .with("list", vec![Value::object(Object::new().with("password", "y"))]),
        );

        let masked = mask_one(&input, &["password"], false);

        assert_eq!(masked.get("user"), Some(Value::from("ada")));
        assert_eq!(masked.get("password"), Some(Value::from(PLACEHOLDER)));
        let nested = masked.get("nested").unwrap();
        assert_eq!(nested.get("password"), Some(Value::from(PLACEHOLDER)));
        assert_eq!(nested.get("keep"), Some(Value::from(1)));
        let first = masked.get("list").unwrap().get("0").unwrap();
        assert_eq!(first.get("password"), Some(Value::from(PLACEHOLDER)));

        // input untouched
        assert_eq!(input.get("password"), Some(Value::from("hunter2")));
    }

    #[test]
    fn test_case_insensitive_keys() {
        let input = Value::object(Object::new().with("PASSWORD", "x"));

        let insensitive = mask_one(&input, &["Password"], true);
        assert_eq!(insensitive.get("PASSWORD"), Some(Value::from(PLACEHOLDER)));

        let sensitive = mask_one(&input, &["Password"], false);
        assert_eq!(sensitive.get("PASSWORD"), Some(Value::from("x")));
    }

    #[test]
    fn test_cycle_terminates_with_shallow_copy() {
        let node = Value::object(Object::new().with("password", "secret"));
        node.insert("self", node.clone());

        let masked = mask_one(&node, &["password"], false);

        assert!(!masked.ptr_eq(&node));
        assert_eq!(masked.get("password"), Some(Value::from(PLACEHOLDER)));
        let revisited = masked.get("self").unwrap();
        assert!(!revisited.ptr_eq(&node));
        assert!(!revisited.ptr_eq(&masked));
        // one-level copy: not processed again
        assert_eq!(revisited.get("password"), Some(Value::from("secret")));
        assert!(revisited.get("self").unwrap().ptr_eq(&node));
    }

    #[test]
    fn test_maps_and_sets_are_shallow() {
        let secret = Value::object(Object::new().with("password", "x"));
        let map = Value::map(vec![(Value::from("k"), secret.clone())]);
        let set = Value::set(vec![secret.clone()]);

        let masked = mask(
            &[map.clone(), set.clone()],
            &keys(&["password"]),
            false,
            &[],
            PLACEHOLDER,
        );

        assert!(!masked[0].ptr_eq(&map));
        assert!(!masked[1].ptr_eq(&set));
        let Value::Map(entries) = &masked[0] else {
            panic!("expected map");
        };
        assert!(entries.read()[0].1.ptr_eq(&secret));
        assert!(masked[1].items().unwrap()[0].ptr_eq(&secret));
    }

    #[test]
    fn test_bytes_pass_through() {
        let bytes = Value::bytes(b"password=abc".to_vec());
        let regex = Regex::new("abc").unwrap();
        let masked = mask(&[bytes.clone()], &keys(&["password"]), false, &[regex], PLACEHOLDER);
        assert_eq!(masked[0], bytes);
    }

    #[test]
    fn test_regex_masks_leaves() {
        let regexes = compile_patterns(&[r"\d{4}-\d{4}", "tok_[a-z]+"]).unwrap();
        let input = Value::object(
            Object::new()
                .with("card", "1234-5678 and 8765-4321")
                .with("token", "tok_abc")
                .with("count", 12345678)
                .with("small", 7),
        );

        let masked = mask(&[input], &keys(&["none"]), false, &regexes, PLACEHOLDER).remove(0);

        assert_eq!(masked.get("card"), Some(Value::from("[***] and [***]")));
        assert_eq!(masked.get("token"), Some(Value::from(PLACEHOLDER)));
        assert_eq!(masked.get("small"), Some(Value::from(7)));
        assert_eq!(masked.get("count"), Some(Value::from(12345678)));
    }

    #[test]
    fn test_regex_masks_stringified_numbers() {
        let regexes = compile_patterns(&[r"^\d{8}$"]).unwrap();
        let masked = mask(&[Value::from(12345678)], &[], false, &regexes, PLACEHOLDER);
        assert_eq!(masked[0], Value::from(PLACEHOLDER));
    }

    #[test]
    fn test_placeholder_is_literal() {
        let regexes = compile_patterns(&["secret"]).unwrap();
        let masked = mask(&[Value::from("a secret")], &[], false, &regexes, "$0-$1");
        assert_eq!(masked[0], Value::from("a $0-$1"));
    }

    #[test]
    fn test_error_properties_masked() {
        let error = Value::error(
            ErrorValue::new("AuthError", "login failed")
                .with_stack("AuthError: login failed\n    at main (/a.rs:1:1)")
                .with_property("password", "pw")
                .with_property("user", "ada"),
        );

        let masked = mask_one(&error, &["password", "stack"], false);
        let clone = masked.to_error().unwrap();

        assert!(!masked.ptr_eq(&error));
        assert_eq!(clone.name, "AuthError");
        assert_eq!(clone.message, "login failed");
        assert_eq!(clone.stack.as_deref(), Some(PLACEHOLDER));
        assert_eq!(clone.properties.get("password"), Some(&Value::from(PLACEHOLDER)));
        assert_eq!(clone.properties.get("user"), Some(&Value::from("ada")));
    }

    #[test]
    fn test_class_name_is_kept() {
        let input = Value::object(Object::with_class("Credentials").with("password", "x"));
        let masked = mask_one(&input, &["password"], false);
        let Value::Object(object) = &masked else {
            panic!("expected object");
        };
        assert_eq!(object.read().class_name(), Some("Credentials"));
    }

    #[test]
    fn test_execute_functions_in_base_object() {
        let base = Value::object(
            Object::new()
                .with("requestId", Value::function(|| Value::from("req-1")))
                .with("static", "x")
                .with(
                    "nested",
                    Object::new().with("ts", Value::function(|| Value::from(5))),
                ),
        );

        let resolved = clone_and_execute_functions(&base);

        assert_eq!(resolved.get("requestId"), Some(Value::from("req-1")));
        assert_eq!(resolved.get("static"), Some(Value::from("x")));
        assert_eq!(resolved.get("nested").unwrap().get("ts"), Some(Value::from(5)));
        assert!(matches!(base.get("requestId"), Some(Value::Function(_))));
    }

    #[test]
    fn test_execute_functions_cycle() {
        let base = Value::object(Object::new().with("id", Value::function(|| Value::from(1))));
        base.insert("me", base.clone());

        let resolved = clone_and_execute_functions(&base);
        assert_eq!(resolved.get("id"), Some(Value::from(1)));
        assert!(!resolved.get("me").unwrap().ptr_eq(&resolved));
        assert!(!resolved.get("me").unwrap().ptr_eq(&base));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = compile_patterns(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_preset_patterns_compile() {
        let regexes = compile_patterns(&MaskPatterns::all()).unwrap();
        let masked = mask(
            &[Value::from("call 555-123-4567 with Bearer abc.def")],
            &[],
            false,
            &regexes,
            PLACEHOLDER,
        );
        let text = masked[0].to_plain_string();
        assert!(!text.contains("555-123-4567"));
        assert!(!text.contains("abc.def"));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-z ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::array),
                prop::collection::vec(("[a-z]{1,8}", inner), 0..5)
                    .prop_map(|entries| Value::object(entries.into_iter().collect())),
            ]
        })
    }

    fn assert_no_aliasing(original: &Value, clone: &Value) {
        if original.node_id().is_some() {
            assert!(!original.ptr_eq(clone));
        }
        match (original, clone) {
            (Value::Array(_), Value::Array(_)) => {
                let (a, b) = (original.items().unwrap(), clone.items().unwrap());
                for (x, y) in a.iter().zip(b.iter()) {
                    assert_no_aliasing(x, y);
                }
            }
            (Value::Object(_), Value::Object(_)) => {
                let (a, b) = (original.to_object().unwrap(), clone.to_object().unwrap());
                for (key, x) in a.iter() {
                    assert_no_aliasing(x, b.get(key).unwrap());
                }
            }
            _ => {}
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Without keys or patterns masking is a structural deep clone
        #[test]
        fn empty_key_list_is_deep_clone(value in arb_value()) {
            let cloned = mask(std::slice::from_ref(&value), &[], false, &[], PLACEHOLDER).remove(0);
            prop_assert_eq!(&cloned, &value);
            assert_no_aliasing(&value, &cloned);
        }

        /// Masked output keeps the topology and never contains the masked key's value
        #[test]
        fn masked_keys_never_leak(value in arb_value(), secret in "[A-Z]{6}") {
            let wrapper = Value::object(Object::new().with("inner", value).with("password", secret.clone()));
            let masked = mask_one(&wrapper, &["password"], false);
            prop_assert_eq!(masked.get("password"), Some(Value::from(PLACEHOLDER)));
            prop_assert_eq!(masked.len(), wrapper.len());
        }
    }
}
