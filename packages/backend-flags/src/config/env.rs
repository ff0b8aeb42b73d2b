//! Environment and host inputs for default resolution
//!
//! Defaults are resolved against an [`EnvSource`] and a [`HostInfo`] instead of
//! reading process state directly, so construction can be replayed with a
//! fixed environment in tests.

use super::value::{SettingType, SettingValue};
use std::collections::HashMap;

/// Read-only view of environment variables
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed in-memory environment
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Host facts consulted by computed defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub cpu_count: usize,
    /// Platform where parallel compilation is unavailable
    pub constrained: bool,
}

impl HostInfo {
    pub fn new(cpu_count: usize, constrained: bool) -> Self {
        Self {
            cpu_count: cpu_count.max(1),
            constrained,
        }
    }

    /// Probe the current machine
    pub fn detect() -> Self {
        Self::new(num_cpus::get(), cfg!(windows))
    }
}

impl Default for HostInfo {
    fn default() -> Self {
        Self::detect()
    }
}

/// Parse a raw environment string as `ty`
///
/// Booleans are true only for the exact string `"1"`. Lists are comma
/// separated strings. Mappings and callables have no textual form.
pub fn parse_env_value(ty: &SettingType, raw: &str) -> Option<SettingValue> {
    match ty {
        SettingType::Bool => Some(SettingValue::Bool(raw == "1")),
        SettingType::Int => raw.trim().parse::<i64>().ok().map(SettingValue::Int),
        SettingType::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(SettingValue::Float),
        SettingType::Str => Some(SettingValue::Str(raw.to_string())),
        SettingType::Optional(inner) => parse_env_value(inner, raw),
        SettingType::List => Some(SettingValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(SettingValue::from)
                .collect(),
        )),
        SettingType::Mapping | SettingType::Callable => None,
    }
}
