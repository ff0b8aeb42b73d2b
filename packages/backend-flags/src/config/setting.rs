//! Setting declarations and registered settings

use super::env::{EnvSource, HostInfo};
use super::namespace::Namespace;
use super::value::{SettingType, SettingValue};
use std::collections::BTreeMap;
use std::fmt;

/// Function producing a default at registry construction
pub type DefaultFn = Box<dyn FnOnce(&DefaultContext<'_>) -> SettingValue + Send>;

/// Where a declared default comes from
pub enum DefaultValue {
    Static(SettingValue),
    /// Evaluated exactly once, in declaration order
    Computed(DefaultFn),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Inputs visible to a computed default
pub struct DefaultContext<'a> {
    pub(crate) env: &'a dyn EnvSource,
    pub(crate) host: &'a HostInfo,
    pub(crate) resolved: &'a Namespace,
}

impl DefaultContext<'_> {
    pub fn env_var(&self, name: &str) -> Option<String> {
        self.env.var(name)
    }

    /// `true` iff the variable equals `"1"`; `default` when unset
    pub fn env_flag(&self, name: &str, default: bool) -> bool {
        match self.env.var(name) {
            Some(raw) => raw == "1",
            None => default,
        }
    }

    pub fn host(&self) -> &HostInfo {
        self.host
    }

    /// Value of a setting declared earlier in the same registry
    pub fn resolved(&self, path: &str) -> Option<&SettingValue> {
        self.resolved.leaf(path).map(Setting::value)
    }
}

/// Declaration of one setting
///
/// ```
/// use backend_flags::config::SettingSpec;
///
/// let spec = SettingSpec::int("threads", -1)
///     .env("N_THREADS")
///     .doc("Worker threads, -1 for automatic");
/// assert_eq!(spec.path(), "threads");
/// ```
#[derive(Debug)]
pub struct SettingSpec {
    pub(crate) path: String,
    pub(crate) ty: SettingType,
    pub(crate) default: DefaultValue,
    pub(crate) env_var: Option<String>,
    pub(crate) ignored: bool,
    pub(crate) doc: Option<String>,
}

impl SettingSpec {
    pub fn new(path: impl Into<String>, ty: SettingType, default: impl Into<SettingValue>) -> Self {
        Self {
            path: path.into(),
            ty,
            default: DefaultValue::Static(default.into()),
            env_var: None,
            ignored: false,
            doc: None,
        }
    }

    pub fn computed<F>(path: impl Into<String>, ty: SettingType, f: F) -> Self
    where
        F: FnOnce(&DefaultContext<'_>) -> SettingValue + Send + 'static,
    {
        Self {
            default: DefaultValue::Computed(Box::new(f)),
            ..Self::new(path, ty, SettingValue::None)
        }
    }

    pub fn bool(path: impl Into<String>, default: bool) -> Self {
        Self::new(path, SettingType::Bool, default)
    }

    pub fn int(path: impl Into<String>, default: i64) -> Self {
        Self::new(path, SettingType::Int, default)
    }

    pub fn float(path: impl Into<String>, default: f64) -> Self {
        Self::new(path, SettingType::Float, default)
    }

    pub fn string(path: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(path, SettingType::Str, default.into())
    }

    /// Optional setting defaulting to `None`
    pub fn optional(path: impl Into<String>, inner: SettingType) -> Self {
        Self::new(path, SettingType::optional(inner), SettingValue::None)
    }

    pub fn list<T: Into<SettingValue>>(path: impl Into<String>, items: Vec<T>) -> Self {
        Self::new(path, SettingType::List, items)
    }

    pub fn mapping(path: impl Into<String>, entries: BTreeMap<String, SettingValue>) -> Self {
        Self::new(path, SettingType::Mapping, entries)
    }

    /// Callback slot defaulting to `None`
    pub fn hook(path: impl Into<String>) -> Self {
        Self::optional(path, SettingType::Callable)
    }

    /// Environment variable overriding the default at construction
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env_var = Some(var.into());
        self
    }

    /// Exclude from snapshots and hashes
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn setting_type(&self) -> &SettingType {
        &self.ty
    }
}

/// A registered setting with its resolved default and current value
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub(crate) path: String,
    pub(crate) ty: SettingType,
    pub(crate) default: SettingValue,
    pub(crate) value: SettingValue,
    pub(crate) env_var: Option<String>,
    pub(crate) ignored: bool,
    pub(crate) doc: Option<String>,
}

impl Setting {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn setting_type(&self) -> &SettingType {
        &self.ty
    }

    pub fn default_value(&self) -> &SettingValue {
        &self.default
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env_var.as_deref()
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.value == self.default
    }

    /// Swap in an already type-checked value
    pub(crate) fn replace(&mut self, value: SettingValue) -> SettingValue {
        std::mem::replace(&mut self.value, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::MapEnv;

    #[test]
    fn test_spec_builders() {
        let spec = SettingSpec::optional("cpp.simdlen", SettingType::Int)
            .doc("SIMD width")
            .ignored();
        assert_eq!(spec.path(), "cpp.simdlen");
        assert_eq!(spec.setting_type(), &SettingType::optional(SettingType::Int));
        assert!(spec.ignored);
        assert!(matches!(spec.default, DefaultValue::Static(SettingValue::None)));

        let spec = SettingSpec::hook("trace.upload_tar");
        assert!(spec.setting_type().is_callable());
    }

    #[test]
    fn test_default_context() {
        let env = MapEnv::new().with("FLAG", "1").with("OFF", "true");
        let host = HostInfo::new(8, false);
        let root = Namespace::new();
        let ctx = DefaultContext {
            env: &env,
            host: &host,
            resolved: &root,
        };

        assert!(ctx.env_flag("FLAG", false));
        assert!(!ctx.env_flag("OFF", true));
        assert!(ctx.env_flag("MISSING", true));
        assert_eq!(ctx.host().cpu_count, 8);
        assert!(ctx.resolved("anything").is_none());
    }

    #[test]
    fn test_computed_debug() {
        let spec = SettingSpec::computed("x", SettingType::Int, |_| SettingValue::Int(1));
        assert!(format!("{:?}", spec).contains("Computed(..)"));
    }
}
