//! Scoped overrides
//!
//! [`Registry::patch_scope`] applies an [`Overrides`] set atomically and
//! returns a [`PatchGuard`]. Dropping the guard puts back exactly the values
//! that were current when the patch was applied, including while unwinding.
//! Active patches form a stack. A guard dropped while a later patch is still
//! active hands its saved values to that patch, so the base value comes back
//! once every patch over it has exited, whatever the exit order.

use super::error::{RegistryError, RegistryResult};
use super::namespace::{join_path, Node};
use super::registry::Registry;
use super::value::SettingValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::trace;

/// Ordered path → value overrides; later entries for the same path win
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    entries: Vec<(String, SettingValue)>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.entries.push((path.into(), value.into()));
        self
    }

    /// Overrides relative to a namespace
    ///
    /// ```
    /// use backend_flags::config::Overrides;
    ///
    /// let o = Overrides::new()
    ///     .set("debug", true)
    ///     .namespace("triton", |t| t.set("cudagraphs", true));
    /// assert_eq!(o.len(), 2);
    /// assert_eq!(o.paths().collect::<Vec<_>>(), vec!["debug", "triton.cudagraphs"]);
    /// ```
    pub fn namespace(mut self, name: &str, f: impl FnOnce(Overrides) -> Overrides) -> Self {
        let nested = f(Overrides::new());
        self.entries.extend(
            nested
                .entries
                .into_iter()
                .map(|(path, value)| (join_path(name, &path), value)),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<SettingValue>> FromIterator<(K, V)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// Flat `{path: value}` map on the wire
impl Serialize for Overrides {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat: BTreeMap<&str, &SettingValue> = self.iter().collect();
        flat.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Overrides {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat = BTreeMap::<String, SettingValue>::deserialize(deserializer)?;
        Ok(flat.into_iter().collect())
    }
}

/// Values an active patch displaced, in application order
#[derive(Debug)]
pub(crate) struct PatchFrame {
    id: u64,
    saved: Vec<(String, SettingValue)>,
}

impl PatchFrame {
    fn touches(&self, path: &str) -> bool {
        self.saved.iter().any(|(p, _)| p == path)
    }
}

/// Restores patched settings when dropped
#[must_use = "the patch is reverted as soon as the guard is dropped"]
#[derive(Debug)]
pub struct PatchGuard<'a> {
    registry: &'a Registry,
    frame: u64,
    paths: Vec<String>,
}

impl PatchGuard<'_> {
    /// Paths this guard will restore
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl Drop for PatchGuard<'_> {
    fn drop(&mut self) {
        let mut guard = self.registry.state.write();
        let state = &mut *guard;
        let Some(index) = state.frames.iter().position(|f| f.id == self.frame) else {
            return;
        };
        let frame = state.frames.remove(index);
        let count = frame.saved.len();
        let above = state.frames.len() - index;

        // A later patch shadowing the path inherits the displaced value
        for (path, previous) in frame.saved.into_iter().rev() {
            let heir = state.frames[index..].iter_mut().find(|f| f.touches(&path));
            match heir {
                Some(heir) => {
                    if let Some(slot) = heir.saved.iter_mut().find(|(p, _)| *p == path) {
                        slot.1 = previous;
                    }
                }
                None => {
                    if let Some(setting) = state.root.leaf_mut(&path) {
                        setting.replace(previous);
                    }
                }
            }
        }
        trace!(entries = count, frames_above = above, "patch reverted");
    }
}

impl Registry {
    /// Apply overrides until the returned guard is dropped
    ///
    /// All entries are validated before any is written. On error nothing
    /// changes.
    pub fn patch_scope(&self, overrides: Overrides) -> RegistryResult<PatchGuard<'_>> {
        let mut state = self.state.write();

        let mut staged = Vec::with_capacity(overrides.entries.len());
        for (path, value) in overrides.entries {
            let setting = match state.root.leaf(&path) {
                Some(setting) => setting,
                None => return Err(Self::unknown(&state.root, &path)),
            };
            let value = setting
                .setting_type()
                .coerce(value)
                .map_err(|found| RegistryError::type_mismatch(&path, setting.setting_type(), &found))?;
            staged.push((path, value));
        }

        let mut saved = Vec::with_capacity(staged.len());
        for (path, value) in staged {
            if let Some(setting) = state.root.leaf_mut(&path) {
                let previous = setting.replace(value);
                saved.push((path, previous));
            }
        }

        let id = state.next_frame;
        state.next_frame += 1;
        let paths = saved.iter().map(|(p, _)| p.clone()).collect();
        trace!(entries = saved.len(), frame = id, "patch applied");
        state.frames.push(PatchFrame { id, saved });
        Ok(PatchGuard {
            registry: self,
            frame: id,
            paths,
        })
    }

    /// Run `f` with overrides applied, restoring afterwards
    ///
    /// The lock is not held while `f` runs, so `f` may read and write the
    /// registry freely.
    pub fn patch<R>(&self, overrides: Overrides, f: impl FnOnce() -> R) -> RegistryResult<R> {
        let _guard = self.patch_scope(overrides)?;
        Ok(f())
    }

    /// Like [`Registry::patch`] for bodies that can fail
    pub fn try_patch<R, E>(&self, overrides: Overrides, f: impl FnOnce() -> Result<R, E>) -> Result<R, E>
    where
        E: From<RegistryError>,
    {
        let _guard = self.patch_scope(overrides)?;
        f()
    }

    /// Build overrides from a JSON object
    ///
    /// Keys may be full dotted paths or namespace names whose values are
    /// nested objects of further overrides. An object under a mapping setting
    /// is that setting's value.
    pub fn overrides_from_json(&self, value: &serde_json::Value) -> RegistryResult<Overrides> {
        let state = self.read();
        let mut overrides = Overrides::new();
        collect_json_overrides(&state.root, "", value, &mut overrides)?;
        Ok(overrides)
    }
}

fn collect_json_overrides(
    root: &super::namespace::Namespace,
    prefix: &str,
    value: &serde_json::Value,
    out: &mut Overrides,
) -> RegistryResult<()> {
    let object = match value {
        serde_json::Value::Object(object) => object,
        _ => {
            return Err(RegistryError::invalid_path(
                prefix,
                "overrides must be a JSON object",
            ))
        }
    };

    for (key, nested) in object {
        let path = join_path(prefix, key);
        match root.lookup(&path) {
            Some(Node::Namespace(_)) => collect_json_overrides(root, &path, nested, out)?,
            _ => out
                .entries
                .push((path, SettingValue::from_json(nested.clone()))),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::{HostInfo, MapEnv};
    use crate::config::setting::SettingSpec;
    use crate::config::value::SettingType;

    fn registry() -> Registry {
        Registry::builder()
            .setting(SettingSpec::bool("debug", false))
            .setting(SettingSpec::mapping("options", BTreeMap::new()))
            .namespace("triton", |ns| {
                ns.setting(SettingSpec::bool("cudagraphs", false))
                    .setting(SettingSpec::int("spill_threshold", 16))
            })
            .build_with(&MapEnv::new(), &HostInfo::new(1, false))
            .unwrap()
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let reg = registry();
        {
            let guard = reg
                .patch_scope(Overrides::new().set("triton.cudagraphs", true))
                .unwrap();
            assert_eq!(guard.paths().collect::<Vec<_>>(), vec!["triton.cudagraphs"]);
            assert!(reg.get_bool("triton.cudagraphs").unwrap());
        }
        assert!(!reg.get_bool("triton.cudagraphs").unwrap());
    }

    #[test]
    fn test_failed_patch_changes_nothing() {
        let reg = registry();
        let result = reg.patch_scope(
            Overrides::new()
                .set("debug", true)
                .set("triton.spill_threshold", "many"),
        );
        assert!(matches!(result, Err(RegistryError::TypeMismatch { .. })));
        assert!(!reg.get_bool("debug").unwrap());

        let result = reg.patch_scope(Overrides::new().set("debug", true).set("triton.nope", 1i64));
        assert!(matches!(result, Err(RegistryError::UnknownSetting { .. })));
        assert!(!reg.get_bool("debug").unwrap());
    }

    #[test]
    fn test_duplicate_entries_last_wins_and_unwind() {
        let reg = registry();
        let overrides = Overrides::new()
            .set("triton.spill_threshold", 1i64)
            .set("triton.spill_threshold", 2i64);
        reg.patch(overrides, || {
            assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 2);
        })
        .unwrap();
        assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 16);
    }

    #[test]
    fn test_try_patch_propagates_body_error() {
        let reg = registry();
        let result: Result<(), RegistryError> =
            reg.try_patch(Overrides::new().set("debug", true), || {
                reg.get_str("debug").map(|_| ())
            });
        assert!(result.is_err());
        assert!(!reg.get_bool("debug").unwrap());
    }

    #[test]
    fn test_overrides_from_json() {
        let reg = registry();
        let json = serde_json::json!({
            "debug": true,
            "triton": {"cudagraphs": true},
            "triton.spill_threshold": 4,
            "options": {"a": 1}
        });
        let overrides = reg.overrides_from_json(&json).unwrap();
        let paths: Vec<_> = overrides.paths().collect();
        assert_eq!(
            paths,
            vec!["debug", "options", "triton.cudagraphs", "triton.spill_threshold"]
        );

        reg.patch(overrides, || {
            assert_eq!(reg.get_map("options").unwrap().len(), 1);
            assert_eq!(reg.setting_type("options").unwrap(), SettingType::Mapping);
        })
        .unwrap();

        assert!(reg.overrides_from_json(&serde_json::json!([1])).is_err());
    }

    #[test]
    fn test_overrides_serde_flat() {
        let overrides: Overrides =
            serde_json::from_str(r#"{"triton.cudagraphs": true, "debug": false}"#).unwrap();
        assert_eq!(overrides.len(), 2);
        let json = serde_json::to_string(&overrides).unwrap();
        assert_eq!(json, r#"{"debug":false,"triton.cudagraphs":true}"#);
    }
}
