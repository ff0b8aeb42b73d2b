//! Settings file I/O (YAML)
//!
//! Schema v1:
//!
//! ```yaml
//! version: 1
//! settings:
//!   compile_threads: 8
//!   triton.cudagraphs: true
//! ```
//!
//! Keys are full dotted paths. Loading goes through restore semantics: every
//! value is type-checked before any is written, unknown paths are reported.

use super::error::{RegistryError, RegistryResult};
use super::provenance::ConfigSource;
use super::registry::Registry;
use super::snapshot::{RestoreReport, Snapshot};
use super::value::SettingValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    #[serde(default)]
    pub version: Option<u32>,

    /// Dotted path → value
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
}

impl ConfigExportV1 {
    fn check_version(&self) -> RegistryResult<()> {
        match self.version {
            None => Err(RegistryError::MissingVersion),
            Some(v) if SUPPORTED_VERSIONS.contains(&v) => Ok(()),
            Some(found) => Err(RegistryError::UnsupportedVersion {
                found,
                supported: SUPPORTED_VERSIONS.to_vec(),
            }),
        }
    }
}

impl Registry {
    /// Export non-ignored settings as a v1 YAML document
    pub fn to_yaml(&self) -> RegistryResult<String> {
        let export = ConfigExportV1 {
            version: Some(1),
            settings: self.snapshot()?.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    /// Apply a v1 YAML document held in memory
    pub fn load_yaml_str(&self, content: &str) -> RegistryResult<RestoreReport> {
        self.load_yaml_with_source(content, "<inline>")
    }

    /// Apply a v1 YAML file
    pub fn load_yaml(&self, path: impl AsRef<Path>) -> RegistryResult<RestoreReport> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        self.load_yaml_with_source(&content, &path.display().to_string())
    }

    fn load_yaml_with_source(&self, content: &str, source: &str) -> RegistryResult<RestoreReport> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;
        export.check_version()?;

        let snapshot: Snapshot = export.settings.into_iter().collect();
        self.restore_from(
            snapshot,
            ConfigSource::Yaml {
                path: source.to_string(),
            },
        )
    }
}
