//! The setting registry
//!
//! A [`Registry`] owns the namespace tree behind one `parking_lot::RwLock`.
//! Single reads and writes take the lock once. Multi-key mutations (patch,
//! restore, reset) hold the write guard for the whole batch, so readers see
//! either none or all of a batch.

use super::builder::RegistryBuilder;
use super::error::{RegistryError, RegistryResult};
use super::namespace::{join_path, Namespace, Node};
use super::patch::PatchFrame;
use super::provenance::{ConfigProvenance, ConfigSource};
use super::setting::Setting;
use super::value::{Hook, SettingType, SettingValue};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub(crate) struct RegistryState {
    pub(crate) root: Namespace,
    pub(crate) provenance: ConfigProvenance,
    /// Active patches, oldest first
    pub(crate) frames: Vec<PatchFrame>,
    pub(crate) next_frame: u64,
}

/// Hierarchical store of typed settings
pub struct Registry {
    pub(crate) state: RwLock<RegistryState>,
    /// Ignore entries that name no setting
    pub(crate) unresolved_ignores: Vec<String>,
}

/// A setting whose current value differs from its default
#[derive(Debug, Clone, PartialEq)]
pub struct SettingDiff {
    pub path: String,
    pub default: SettingValue,
    pub current: SettingValue,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn from_parts(
        root: Namespace,
        provenance: ConfigProvenance,
        unresolved_ignores: Vec<String>,
    ) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                root,
                provenance,
                frames: Vec::new(),
                next_frame: 0,
            }),
            unresolved_ignores,
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read()
    }

    pub(crate) fn unknown(root: &Namespace, path: &str) -> RegistryError {
        let paths = root.paths();
        RegistryError::unknown_setting(path, paths.iter().map(String::as_str))
    }

    /// Run `f` against the setting at `path`
    pub fn with_setting<R>(&self, path: &str, f: impl FnOnce(&Setting) -> R) -> RegistryResult<R> {
        let state = self.read();
        match state.root.leaf(path) {
            Some(setting) => Ok(f(setting)),
            None => Err(Self::unknown(&state.root, path)),
        }
    }

    /// Current value of a setting
    pub fn get(&self, path: &str) -> RegistryResult<SettingValue> {
        self.with_setting(path, |s| s.value().clone())
    }

    /// Clone of the full setting record
    pub fn setting(&self, path: &str) -> RegistryResult<Setting> {
        self.with_setting(path, Setting::clone)
    }

    fn get_as<T>(
        &self,
        path: &str,
        expected: SettingType,
        extract: impl FnOnce(&SettingValue) -> Option<T>,
    ) -> RegistryResult<T> {
        self.with_setting(path, |s| {
            extract(s.value()).ok_or_else(|| RegistryError::type_mismatch(path, &expected, s.value()))
        })?
    }

    pub fn get_bool(&self, path: &str) -> RegistryResult<bool> {
        self.get_as(path, SettingType::Bool, SettingValue::as_bool)
    }

    pub fn get_int(&self, path: &str) -> RegistryResult<i64> {
        self.get_as(path, SettingType::Int, SettingValue::as_int)
    }

    pub fn get_float(&self, path: &str) -> RegistryResult<f64> {
        self.get_as(path, SettingType::Float, SettingValue::as_float)
    }

    pub fn get_str(&self, path: &str) -> RegistryResult<String> {
        self.get_as(path, SettingType::Str, |v| v.as_str().map(str::to_string))
    }

    pub fn get_opt_bool(&self, path: &str) -> RegistryResult<Option<bool>> {
        self.get_as(path, SettingType::optional(SettingType::Bool), |v| match v {
            SettingValue::None => Some(None),
            v => v.as_bool().map(Some),
        })
    }

    pub fn get_opt_int(&self, path: &str) -> RegistryResult<Option<i64>> {
        self.get_as(path, SettingType::optional(SettingType::Int), |v| match v {
            SettingValue::None => Some(None),
            v => v.as_int().map(Some),
        })
    }

    pub fn get_opt_str(&self, path: &str) -> RegistryResult<Option<String>> {
        self.get_as(path, SettingType::optional(SettingType::Str), |v| match v {
            SettingValue::None => Some(None),
            v => v.as_str().map(|s| Some(s.to_string())),
        })
    }

    pub fn get_list(&self, path: &str) -> RegistryResult<Vec<SettingValue>> {
        self.get_as(path, SettingType::List, |v| v.as_list().map(<[_]>::to_vec))
    }

    pub fn get_map(&self, path: &str) -> RegistryResult<BTreeMap<String, SettingValue>> {
        self.get_as(path, SettingType::Mapping, |v| v.as_map().cloned())
    }

    pub fn get_hook(&self, path: &str) -> RegistryResult<Option<Hook>> {
        self.get_as(path, SettingType::optional(SettingType::Callable), |v| match v {
            SettingValue::None => Some(None),
            v => v.as_hook().cloned().map(Some),
        })
    }

    /// Assign a new current value
    pub fn set(&self, path: &str, value: impl Into<SettingValue>) -> RegistryResult<()> {
        let mut state = self.state.write();
        let setting = match state.root.leaf_mut(path) {
            Some(setting) => setting,
            None => return Err(Self::unknown(&state.root, path)),
        };
        let value = setting
            .ty
            .coerce(value.into())
            .map_err(|found| RegistryError::type_mismatch(path, &setting.ty, &found))?;
        debug!(path, value = %value, "setting assigned");
        setting.replace(value);
        state.provenance.track_field(path, ConfigSource::Set);
        Ok(())
    }

    /// Restore one setting to its default
    pub fn reset(&self, path: &str) -> RegistryResult<()> {
        let mut state = self.state.write();
        let setting = match state.root.leaf_mut(path) {
            Some(setting) => setting,
            None => return Err(Self::unknown(&state.root, path)),
        };
        let default = setting.default.clone();
        setting.replace(default);
        state.provenance.reset_field(path);
        debug!(path, "setting reset");
        Ok(())
    }

    /// Restore every setting to its default
    pub fn reset_all(&self) {
        let mut state = self.state.write();
        state.root.visit_mut(&mut |s| {
            let default = s.default.clone();
            s.replace(default);
        });
        state.provenance.reset_all();
        debug!("all settings reset");
    }

    pub fn contains(&self, path: &str) -> bool {
        self.read().root.leaf(path).is_some()
    }

    pub fn default_of(&self, path: &str) -> RegistryResult<SettingValue> {
        self.with_setting(path, |s| s.default_value().clone())
    }

    pub fn setting_type(&self, path: &str) -> RegistryResult<SettingType> {
        self.with_setting(path, |s| s.setting_type().clone())
    }

    pub fn is_ignored(&self, path: &str) -> RegistryResult<bool> {
        self.with_setting(path, Setting::is_ignored)
    }

    /// Every setting path, sorted
    pub fn paths(&self) -> Vec<String> {
        self.read().root.paths()
    }

    pub fn len(&self) -> usize {
        self.read().root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().root.is_empty()
    }

    /// Current values of all settings, ignored ones included
    pub fn values(&self) -> BTreeMap<String, SettingValue> {
        let state = self.read();
        let mut out = BTreeMap::new();
        state.root.visit(&mut |s| {
            out.insert(s.path.clone(), s.value.clone());
        });
        out
    }

    /// Non-ignored settings whose current value differs from their default, by path
    pub fn non_default(&self) -> Vec<SettingDiff> {
        let state = self.read();
        let mut out = Vec::new();
        state.root.visit(&mut |s| {
            if !s.is_ignored() && !s.is_default() {
                out.push(SettingDiff {
                    path: s.path.clone(),
                    default: s.default.clone(),
                    current: s.value.clone(),
                });
            }
        });
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub fn provenance(&self, path: &str) -> Option<ConfigSource> {
        self.read().provenance.get_source(path).cloned()
    }

    pub fn provenance_summary(&self) -> String {
        self.read().provenance.summary()
    }

    /// View rooted at a namespace
    pub fn namespace(&self, path: &str) -> RegistryResult<NamespaceView<'_>> {
        let state = self.read();
        match state.root.lookup(path) {
            Some(Node::Namespace(_)) => Ok(NamespaceView {
                registry: self,
                prefix: path.to_string(),
            }),
            _ => Err(Self::unknown(&state.root, path)),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("settings", &self.len())
            .field("unresolved_ignores", &self.unresolved_ignores)
            .finish()
    }
}

/// Registry access relative to a namespace path
#[derive(Debug, Clone)]
pub struct NamespaceView<'a> {
    registry: &'a Registry,
    prefix: String,
}

impl<'a> NamespaceView<'a> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path_of(&self, name: &str) -> String {
        join_path(&self.prefix, name)
    }

    pub fn get(&self, name: &str) -> RegistryResult<SettingValue> {
        self.registry.get(&self.path_of(name))
    }

    pub fn set(&self, name: &str, value: impl Into<SettingValue>) -> RegistryResult<()> {
        self.registry.set(&self.path_of(name), value)
    }

    pub fn namespace(&self, name: &str) -> RegistryResult<NamespaceView<'a>> {
        self.registry.namespace(&self.path_of(name))
    }

    /// Full paths of settings below this namespace, sorted
    pub fn paths(&self) -> Vec<String> {
        self.registry
            .read()
            .root
            .namespace(&self.prefix)
            .map(Namespace::paths)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::{HostInfo, MapEnv};
    use crate::config::setting::SettingSpec;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::builder()
            .setting(SettingSpec::bool("debug", false))
            .setting(SettingSpec::float("ratio", 0.5))
            .namespace("cpp", |ns| {
                ns.setting(SettingSpec::int("threads", -1))
                    .setting(SettingSpec::optional("simdlen", SettingType::Int))
            })
            .build_with(&MapEnv::new(), &HostInfo::new(2, false))
            .unwrap()
    }

    #[test]
    fn test_get_and_set() {
        let reg = registry();
        assert!(!reg.get_bool("debug").unwrap());
        reg.set("debug", true).unwrap();
        assert!(reg.get_bool("debug").unwrap());
        assert_eq!(reg.provenance("debug"), Some(ConfigSource::Set));

        reg.set("cpp.simdlen", 8i64).unwrap();
        assert_eq!(reg.get_opt_int("cpp.simdlen").unwrap(), Some(8));
        reg.set("cpp.simdlen", SettingValue::None).unwrap();
        assert_eq!(reg.get_opt_int("cpp.simdlen").unwrap(), None);
    }

    #[test]
    fn test_set_rejects_wrong_type_without_change() {
        let reg = registry();
        let err = reg.set("cpp.threads", "four").unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));
        assert_eq!(reg.get_int("cpp.threads").unwrap(), -1);
    }

    #[test]
    fn test_float_widening() {
        let reg = registry();
        reg.set("ratio", 2i64).unwrap();
        assert_eq!(reg.get("ratio").unwrap(), SettingValue::Float(2.0));
    }

    #[test]
    fn test_unknown_paths() {
        let reg = registry();
        let err = reg.get("cpp.thread").unwrap_err();
        assert!(err.to_string().contains("Did you mean 'cpp.threads'?"));
        assert!(matches!(reg.get("cpp"), Err(RegistryError::UnknownSetting { .. })));
        assert!(reg.set("nope", true).is_err());
    }

    #[test]
    fn test_typed_getter_mismatch() {
        let reg = registry();
        assert!(matches!(
            reg.get_str("debug"),
            Err(RegistryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_reset() {
        let reg = registry();
        reg.set("debug", true).unwrap();
        reg.set("cpp.threads", 4i64).unwrap();
        assert_eq!(reg.non_default().len(), 2);

        reg.reset("debug").unwrap();
        assert!(!reg.get_bool("debug").unwrap());
        reg.reset_all();
        assert!(reg.non_default().is_empty());
    }

    #[test]
    fn test_reset_restores_provenance() {
        let reg = registry();
        reg.set("debug", true).unwrap();
        reg.set("cpp.threads", 4i64).unwrap();
        assert_eq!(reg.provenance("debug"), Some(ConfigSource::Set));

        reg.reset("debug").unwrap();
        assert_eq!(reg.provenance("debug"), Some(ConfigSource::Default));
        assert_eq!(reg.provenance("cpp.threads"), Some(ConfigSource::Set));

        reg.reset_all();
        assert_eq!(reg.provenance("cpp.threads"), Some(ConfigSource::Default));
        assert_eq!(reg.provenance_summary(), "All settings at declared defaults");
    }

    #[test]
    fn test_non_default_contents() {
        let reg = registry();
        reg.set("cpp.threads", 4i64).unwrap();
        assert_eq!(
            reg.non_default(),
            vec![SettingDiff {
                path: "cpp.threads".to_string(),
                default: SettingValue::Int(-1),
                current: SettingValue::Int(4),
            }]
        );
    }

    #[test]
    fn test_namespace_view() {
        let reg = registry();
        let cpp = reg.namespace("cpp").unwrap();
        cpp.set("threads", 2i64).unwrap();
        assert_eq!(cpp.get("threads").unwrap(), SettingValue::Int(2));
        assert_eq!(cpp.paths(), vec!["cpp.simdlen", "cpp.threads"]);
        assert!(reg.namespace("debug").is_err());
        assert!(cpp.namespace("missing").is_err());
    }

    #[test]
    fn test_introspection() {
        let reg = registry();
        assert_eq!(reg.len(), 4);
        assert!(reg.contains("cpp.threads"));
        assert!(!reg.contains("cpp"));
        assert_eq!(reg.setting_type("cpp.simdlen").unwrap(), SettingType::optional(SettingType::Int));
        assert!(!reg.is_ignored("debug").unwrap());
        assert_eq!(reg.values().len(), 4);
        assert_eq!(reg.paths(), vec!["cpp.simdlen", "cpp.threads", "debug", "ratio"]);
    }
}
