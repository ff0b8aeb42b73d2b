//! Setting values and declared types
//!
//! A [`SettingValue`] is the dynamic representation of anything a setting may
//! hold. A [`SettingType`] is fixed at declaration and decides which values a
//! setting accepts.

use serde::de::Deserializer;
use serde::ser::{Error as _, SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque callback slot
///
/// Equality is identity: two hooks are equal only when they share the same
/// allocation.
#[derive(Clone)]
pub struct Hook(Arc<dyn Any + Send + Sync>);

impl Hook {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Hook) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook({:p})", Arc::as_ptr(&self.0))
    }
}

/// Dynamic setting value
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Absent value of an optional setting
    None,
    List(Vec<SettingValue>),
    Map(BTreeMap<String, SettingValue>),
    Hook(Hook),
}

impl SettingValue {
    /// False if any float in the value, nested ones included, is NaN or infinite
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            Self::Map(entries) => entries.values().all(Self::is_finite),
            _ => true,
        }
    }

    // Negative zero is stored as zero
    fn normalized(self) -> Self {
        match self {
            Self::Float(f) if f == 0.0 => Self::Float(0.0),
            Self::List(items) => Self::List(items.into_iter().map(Self::normalized).collect()),
            Self::Map(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.normalized()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Short name of the runtime kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::None => "none",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
            Self::Hook(_) => "callable",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SettingValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SettingValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_hook(&self) -> Option<&Hook> {
        match self {
            Self::Hook(h) => Some(h),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// True when a hook appears anywhere inside this value
    pub fn contains_hook(&self) -> bool {
        match self {
            Self::Hook(_) => true,
            Self::List(items) => items.iter().any(Self::contains_hook),
            Self::Map(entries) => entries.values().any(Self::contains_hook),
            _ => false,
        }
    }

    /// Convert a JSON value. Integers that fit in i64 stay integers.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for SettingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) if *f == 0.0 => serializer.serialize_f64(0.0),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(f) => Err(S::Error::custom(format!("non-finite float {f}"))),
            Self::Str(s) => serializer.serialize_str(s),
            Self::None => serializer.serialize_none(),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Hook(_) => Err(S::Error::custom("callable values cannot be serialized")),
        }
    }
}

impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::None => f.write_str("None"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Hook(h) => write!(f, "<{h:?}>"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Hook> for SettingValue {
    fn from(value: Hook) -> Self {
        Self::Hook(value)
    }
}

impl<T: Into<SettingValue>> From<Option<T>> for SettingValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl<T: Into<SettingValue>> From<Vec<T>> for SettingValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, SettingValue>> for SettingValue {
    fn from(value: BTreeMap<String, SettingValue>) -> Self {
        Self::Map(value)
    }
}

/// Declared type of a setting
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingType {
    Bool,
    Int,
    /// Accepts integers, widened on assignment
    Float,
    Str,
    /// Inner type or `None`
    Optional(Box<SettingType>),
    List,
    Mapping,
    Callable,
}

impl SettingType {
    pub fn optional(inner: SettingType) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn accepts(&self, value: &SettingValue) -> bool {
        value.is_finite() && self.accepts_kind(value)
    }

    fn accepts_kind(&self, value: &SettingValue) -> bool {
        match (self, value) {
            (Self::Bool, SettingValue::Bool(_))
            | (Self::Int, SettingValue::Int(_))
            | (Self::Float, SettingValue::Float(_) | SettingValue::Int(_))
            | (Self::Str, SettingValue::Str(_))
            | (Self::Optional(_), SettingValue::None)
            | (Self::List, SettingValue::List(_))
            | (Self::Mapping, SettingValue::Map(_))
            | (Self::Callable, SettingValue::Hook(_)) => true,
            (Self::Optional(inner), v) => inner.accepts_kind(v),
            _ => false,
        }
    }

    /// Bring `value` into this type, handing it back unchanged on mismatch
    pub fn coerce(&self, value: SettingValue) -> Result<SettingValue, SettingValue> {
        match (self, value) {
            (Self::Float, SettingValue::Int(i)) => Ok(SettingValue::Float(i as f64)),
            (Self::Optional(_), SettingValue::None) => Ok(SettingValue::None),
            (Self::Optional(inner), v) => inner.coerce(v),
            (ty, v) if ty.accepts(&v) => Ok(v.normalized()),
            (_, v) => Err(v),
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Self::Callable => true,
            Self::Optional(inner) => inner.is_callable(),
            _ => false,
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Optional(inner) => write!(f, "optional {inner}"),
            Self::List => f.write_str("list"),
            Self::Mapping => f.write_str("mapping"),
            Self::Callable => f.write_str("callable"),
        }
    }
}
