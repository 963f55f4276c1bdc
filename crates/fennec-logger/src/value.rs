//! Dynamic value model for log arguments
//!
//! Log calls accept heterogeneous arguments. [`Value`] models them as a graph:
//! containers are shared behind `Arc<RwLock<_>>`, so the same node can be
//! referenced from several places, including from inside itself.

use crate::inspect::{self, InspectOptions};
use crate::runtime::native;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Shared, mutable container node
pub type Shared<T> = Arc<RwLock<T>>;

fn shared<T>(inner: T) -> Shared<T> {
    Arc::new(RwLock::new(inner))
}

/// Callable value, executed when a logger's base object is resolved
#[derive(Clone)]
pub struct ValueFn(Arc<dyn Fn() -> Value + Send + Sync>);

impl ValueFn {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> Value {
        (self.0)()
    }

    pub fn ptr_eq(&self, other: &ValueFn) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ValueFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[Function]")
    }
}

/// A single log argument or any node nested inside one
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    /// Binary payload, never scanned by masking
    Bytes(Arc<[u8]>),
    Array(Shared<Vec<Value>>),
    Object(Shared<Object>),
    Map(Shared<Vec<(Value, Value)>>),
    Set(Shared<Vec<Value>>),
    Error(Shared<ErrorValue>),
    Function(ValueFn),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(shared(items))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(shared(object))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(shared(entries))
    }

    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(shared(items))
    }

    pub fn error(error: ErrorValue) -> Self {
        Value::Error(shared(error))
    }

    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(bytes.into())
    }

    pub fn date(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }

    pub fn function(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Value::Function(ValueFn::new(f))
    }

    /// Insert a property into an object node. Returns `false` for any other variant.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self {
            Value::Object(object) => {
                object.write().insert(key, value);
                true
            }
            Value::Error(error) => {
                error.write().properties.insert(key, value);
                true
            }
            _ => false,
        }
    }

    /// Append to an array or set node. Returns `false` for any other variant.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        match self {
            Value::Array(items) | Value::Set(items) => {
                items.write().push(value.into());
                true
            }
            _ => false,
        }
    }

    /// Look up an object property, an error property or an array index
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.read_recursive().get(key).cloned(),
            Value::Error(error) => {
                let error = error.read_recursive();
                match key {
                    "name" => Some(Value::String(error.name.clone())),
                    "message" => Some(Value::String(error.message.clone())),
                    "stack" => error.stack.clone().map(Value::String),
                    _ => error.properties.get(key).cloned(),
                }
            }
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|index| items.read_recursive().get(index).cloned()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Number of direct children of a container, `None` for scalars
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items.read_recursive().len()),
            Value::Object(object) => Some(object.read_recursive().len()),
            Value::Map(entries) => Some(entries.read_recursive().len()),
            _ => None,
        }
    }

    /// Snapshot of an array's or set's items
    pub fn items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items.read_recursive().clone()),
            _ => None,
        }
    }

    /// Snapshot of an object's own properties
    pub fn to_object(&self) -> Option<Object> {
        match self {
            Value::Object(object) => Some(object.read_recursive().clone()),
            _ => None,
        }
    }

    /// Snapshot of an error node
    pub fn to_error(&self) -> Option<ErrorValue> {
        match self {
            Value::Error(error) => Some(error.read_recursive().clone()),
            _ => None,
        }
    }

    /// Identity of a container node, `None` for scalars
    pub fn node_id(&self) -> Option<usize> {
        match self {
            Value::Array(node) | Value::Set(node) => Some(Arc::as_ptr(node) as *const () as usize),
            Value::Object(node) => Some(Arc::as_ptr(node) as *const () as usize),
            Value::Map(node) => Some(Arc::as_ptr(node) as *const () as usize),
            Value::Error(node) => Some(Arc::as_ptr(node) as *const () as usize),
            _ => None,
        }
    }

    /// Whether both values are the same container node
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.node_id(), other.node_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// New container holding the same direct children; scalars are cloned
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Array(items) => Value::array(items.read_recursive().clone()),
            Value::Set(items) => Value::set(items.read_recursive().clone()),
            Value::Object(object) => Value::object(object.read_recursive().clone()),
            Value::Map(entries) => Value::map(entries.read_recursive().clone()),
            Value::Error(error) => Value::error(error.read_recursive().clone()),
            other => other.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Error(_) => "error",
            Value::Function(_) => "function",
        }
    }

    /// Plain string form of a scalar: strings unquoted, numbers as printed by the inspector
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => inspect::inspect(other, &InspectOptions::plain()),
        }
    }
}

/// Structural equality that terminates on cyclic graphs
fn structural_eq(a: &Value, b: &Value, visiting: &mut Vec<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x[..] == y[..],
        (Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
        _ => {
            let (Some(id_a), Some(id_b)) = (a.node_id(), b.node_id()) else {
                return false;
            };
            if id_a == id_b || visiting.contains(&(id_a, id_b)) {
                return true;
            }
            visiting.push((id_a, id_b));

            match (a, b) {
                (Value::Array(x), Value::Array(y)) | (Value::Set(x), Value::Set(y)) => {
                    let (x, y) = (x.read_recursive().clone(), y.read_recursive().clone());
                    x.len() == y.len()
                        && x.iter()
                            .zip(y.iter())
                            .all(|(l, r)| structural_eq(l, r, visiting))
                }
                (Value::Object(x), Value::Object(y)) => {
                    let (x, y) = (x.read_recursive().clone(), y.read_recursive().clone());
                    objects_eq(&x, &y, visiting)
                }
                (Value::Map(x), Value::Map(y)) => {
                    let (x, y) = (x.read_recursive().clone(), y.read_recursive().clone());
                    x.len() == y.len()
                        && x.iter().zip(y.iter()).all(|((lk, lv), (rk, rv))| {
                            structural_eq(lk, rk, visiting) && structural_eq(lv, rv, visiting)
                        })
                }
                (Value::Error(x), Value::Error(y)) => {
                    let (x, y) = (x.read_recursive().clone(), y.read_recursive().clone());
                    x.name == y.name
                        && x.message == y.message
                        && x.stack == y.stack
                        && objects_eq(&x.properties, &y.properties, visiting)
                }
                _ => false,
            }
        }
    }
}

fn objects_eq(x: &Object, y: &Object, visiting: &mut Vec<(usize, usize)>) -> bool {
    x.class_name == y.class_name
        && x.len() == y.len()
        && x.iter().all(|(key, value)| {
            y.get(key)
                .map(|other| structural_eq(value, other, visiting))
                .unwrap_or(false)
        })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&inspect::inspect(self, &InspectOptions::plain()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        crate::formatters::to_json_value(self).serialize(serializer)
    }
}

/// Ordered keyed structure with an optional class name
#[derive(Clone, Default)]
pub struct Object {
    class_name: Option<String>,
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object that renders as an instance of `class_name`
    pub fn with_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            entries: Vec::new(),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a property, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every property of `other` over this object (later keys win)
    pub fn extend_from(&mut self, other: &Object) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        objects_eq(self, other, &mut Vec::new())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Error argument: name, message, optional captured stack text and own properties
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub properties: Object,
}

impl ErrorValue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            properties: Object::new(),
        }
    }

    /// Error carrying the stack of the current call site
    pub fn capture(name: impl Into<String>, message: impl Into<String>) -> Self {
        let error = Self::new(name, message);
        let header = format!("{}: {}", error.name, error.message);
        let stack = native::capture_stack_with_header(&header);
        Self { stack, ..error }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Convert a typed error, naming it after its type and nesting its source chain as `cause`
    pub fn from_error<E: std::error::Error + 'static>(err: &E) -> Self {
        let mut error = Self::from_dyn(err);
        error.name = short_type_name(std::any::type_name::<E>());
        error
    }

    /// Convert a type-erased error, nesting its source chain as `cause`
    pub fn from_dyn(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut error = Self::new("Error", err.to_string());
        if let Some(source) = err.source() {
            error
                .properties
                .insert("cause", Value::error(Self::from_dyn(source)));
        }
        error
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map(Value::Int).unwrap_or(Value::Float(v as f64))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::object(v)
    }
}

impl From<ErrorValue> for Value {
    fn from(v: ErrorValue) -> Self {
        Value::error(v)
    }
}

impl From<ValueFn> for Value {
    fn from(v: ValueFn) -> Self {
        Value::Function(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::object(map.into_iter().collect()),
        }
    }
}

impl From<anyhow::Error> for Value {
    fn from(err: anyhow::Error) -> Self {
        let mut error = ErrorValue::new("Error", err.to_string());
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let header = format!("{}: {}", error.name, error.message);
            error.stack = Some(native::render_backtrace(&backtrace.to_string(), &header));
        }
        if let Some(source) = err.chain().nth(1) {
            error
                .properties
                .insert("cause", Value::error(ErrorValue::from_dyn(source)));
        }
        Value::error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DiskFull;

    impl fmt::Display for DiskFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk full")
        }
    }

    impl std::error::Error for DiskFull {}

    #[test]
    fn test_object_insert_keeps_position() {
        let mut object = Object::new().with("a", 1).with("b", 2);
        let previous = object.insert("a", 3);

        assert_eq!(previous, Some(Value::Int(1)));
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(object.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_cyclic_equality_terminates() {
        let a = Value::object(Object::new().with("id", 1));
        a.insert("me", a.clone());
        let b = Value::object(Object::new().with("id", 1));
        b.insert("me", b.clone());

        assert_eq!(a, b);

        let c = Value::object(Object::new().with("id", 2));
        c.insert("me", c.clone());
        assert_ne!(a, c);
    }

    #[test]
    fn test_shallow_copy_is_new_node() {
        let inner = Value::array(vec![Value::Int(1)]);
        let outer = Value::array(vec![inner.clone()]);
        let copy = outer.shallow_copy();

        assert!(!copy.ptr_eq(&outer));
        assert!(copy.get("0").unwrap().ptr_eq(&inner));
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(serde_json::json!({"user": "ada", "tags": [1, 2.5]}));
        assert_eq!(value.get("user"), Some(Value::from("ada")));
        assert_eq!(
            value.get("tags").unwrap().get("1"),
            Some(Value::Float(2.5))
        );
    }

    #[test]
    fn test_typed_error_name() {
        let error = ErrorValue::from_error(&DiskFull);
        assert_eq!(error.name, "DiskFull");
        assert_eq!(error.message, "disk full");
        assert!(error.properties.is_empty());
    }

    #[test]
    fn test_anyhow_error_chain() {
        let err = anyhow::Error::new(DiskFull).context("saving snapshot");
        let value = Value::from(err);

        assert_eq!(value.get("message"), Some(Value::from("saving snapshot")));
        let cause = value.get("cause").unwrap();
        assert_eq!(cause.get("message"), Some(Value::from("disk full")));
    }

    #[test]
    fn test_int_float_equality() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::from("3"));
    }
}
