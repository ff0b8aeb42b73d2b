//! Snapshots, restore and configuration hashing
//!
//! A [`Snapshot`] maps every non-ignored setting path to its current value.
//! Its canonical byte form is compact JSON with keys in path order, and the
//! [`ConfigHash`] is the Blake3 digest of those bytes.

use super::error::{RegistryError, RegistryResult};
use super::provenance::ConfigSource;
use super::registry::Registry;
use super::value::SettingValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Point-in-time copy of non-ignored setting values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, SettingValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<SettingValue>) {
        self.values.insert(path.into(), value.into());
    }

    pub fn get(&self, path: &str) -> Option<&SettingValue> {
        self.values.get(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<SettingValue> {
        self.values.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Paths whose value differs between the two snapshots, or that only one holds
    pub fn changed_paths(&self, other: &Snapshot) -> Vec<String> {
        let mut changed: Vec<String> = self
            .values
            .iter()
            .filter(|(path, value)| other.values.get(*path) != Some(*value))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            other
                .values
                .keys()
                .filter(|path| !self.values.contains_key(*path))
                .cloned(),
        );
        changed.sort();
        changed
    }

    /// Canonical serialized form
    pub fn to_json_bytes(&self) -> RegistryResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    pub fn from_json_slice(bytes: &[u8]) -> RegistryResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn hash(&self) -> RegistryResult<ConfigHash> {
        Ok(ConfigHash::compute(&self.to_json_bytes()?))
    }

    pub(crate) fn into_values(self) -> BTreeMap<String, SettingValue> {
        self.values
    }
}

impl FromIterator<(String, SettingValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, SettingValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Blake3 digest of a snapshot, used in compilation cache keys
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigHash(blake3::Hash);

impl ConfigHash {
    pub fn compute(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    /// Key derived from this hash and other cache inputs
    pub fn combine(&self, content: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.0.as_bytes());
        hasher.update(content);
        Self(hasher.finalize())
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn from_hex(hex: &str) -> Result<Self, blake3::HexError> {
        Ok(Self(blake3::Hash::from_hex(hex)?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigHash({})", self.to_hex())
    }
}

// Serialized as hex
impl Serialize for ConfigHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ConfigHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

/// Outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Paths written, in path order
    pub restored: Vec<String>,
    /// Snapshot paths with no registered setting
    pub unknown: Vec<String>,
    /// Paths left alone because the setting is excluded from snapshots
    pub ignored: Vec<String>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty()
    }
}

impl Registry {
    /// Copy every non-ignored setting value
    ///
    /// Fails when an ignore entry names no setting or when a non-ignored
    /// setting holds a callable.
    pub fn snapshot(&self) -> RegistryResult<Snapshot> {
        if let Some(path) = self.unresolved_ignores.first() {
            return Err(RegistryError::Serialization(format!(
                "ignored path '{path}' does not name a registered setting"
            )));
        }

        let state = self.read();
        let mut values = BTreeMap::new();
        let mut failure = None;
        state.root.visit(&mut |s| {
            if s.is_ignored() || failure.is_some() {
                return;
            }
            if s.value().contains_hook() {
                failure = Some(s.path().to_string());
                return;
            }
            values.insert(s.path().to_string(), s.value().clone());
        });

        match failure {
            Some(path) => Err(RegistryError::Serialization(format!(
                "setting '{path}' holds a callable and is not ignored"
            ))),
            None => Ok(Snapshot { values }),
        }
    }

    /// Write snapshot values back
    ///
    /// Every entry is type-checked before anything is written, so a mismatch
    /// leaves the registry untouched. Paths with no registered setting, and
    /// paths of ignored settings, are skipped and reported.
    pub fn restore(&self, snapshot: &Snapshot) -> RegistryResult<RestoreReport> {
        self.restore_from(snapshot.clone(), ConfigSource::Restore)
    }

    pub(crate) fn restore_from(
        &self,
        snapshot: Snapshot,
        source: ConfigSource,
    ) -> RegistryResult<RestoreReport> {
        let mut state = self.state.write();
        let mut report = RestoreReport::default();
        let mut staged = Vec::with_capacity(snapshot.len());

        for (path, value) in snapshot.into_values() {
            match state.root.leaf(&path) {
                Some(setting) if setting.is_ignored() => report.ignored.push(path),
                Some(setting) => {
                    let value = setting
                        .setting_type()
                        .coerce(value)
                        .map_err(|found| RegistryError::type_mismatch(&path, setting.setting_type(), &found))?;
                    staged.push((path, value));
                }
                None => report.unknown.push(path),
            }
        }

        for (path, value) in staged {
            if let Some(setting) = state.root.leaf_mut(&path) {
                setting.replace(value);
            }
            state.provenance.track_field(&path, source.clone());
            report.restored.push(path);
        }

        if !report.unknown.is_empty() {
            warn!(unknown = ?report.unknown, "snapshot paths not registered, skipped");
        }
        if !report.ignored.is_empty() {
            debug!(ignored = ?report.ignored, "ignored settings left unchanged");
        }
        debug!(restored = report.restored.len(), source = %source, "snapshot restored");
        Ok(report)
    }

    /// Stable digest of the current snapshot
    pub fn hash(&self) -> RegistryResult<ConfigHash> {
        self.snapshot()?.hash()
    }

    /// Serialized snapshot bytes
    pub fn save_config(&self) -> RegistryResult<Vec<u8>> {
        self.snapshot()?.to_json_bytes()
    }

    /// Restore from bytes produced by [`Registry::save_config`]
    pub fn load_config(&self, bytes: &[u8]) -> RegistryResult<RestoreReport> {
        self.restore(&Snapshot::from_json_slice(bytes)?)
    }
}
