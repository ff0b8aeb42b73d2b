//! Setting provenance tracking
//!
//! Track where each current value came from (declaration, env, set, restore, YAML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Provenance of every setting's current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigProvenance {
    /// Setting path → source
    /// Example: "compile_threads" → ConfigSource::Env("TORCHINDUCTOR_COMPILE_THREADS")
    field_sources: BTreeMap<String, ConfigSource>,

    /// Source each setting had at construction
    #[serde(default)]
    default_sources: BTreeMap<String, ConfigSource>,
}

/// Value source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Static declared default
    Default,

    /// Default produced by a default function
    Computed,

    /// From environment variable at construction
    Env(String),

    /// From `Registry::set`
    Set,

    /// From a snapshot restore
    Restore,

    /// From YAML file (path only, no line tracking)
    Yaml { path: String },
}

impl ConfigProvenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the source of a setting's value
    pub fn track_field(&mut self, field_path: &str, source: ConfigSource) {
        self.field_sources.insert(field_path.to_string(), source);
    }

    /// Record the construction-time source of a setting's default
    pub fn track_default(&mut self, field_path: &str, source: ConfigSource) {
        self.default_sources
            .insert(field_path.to_string(), source.clone());
        self.track_field(field_path, source);
    }

    /// Put a setting's source back to what it was at construction
    pub fn reset_field(&mut self, field_path: &str) {
        let source = self
            .default_sources
            .get(field_path)
            .cloned()
            .unwrap_or(ConfigSource::Default);
        self.track_field(field_path, source);
    }

    pub fn reset_all(&mut self) {
        self.field_sources = self.default_sources.clone();
    }

    /// Get source for a specific setting
    pub fn get_source(&self, field_path: &str) -> Option<&ConfigSource> {
        self.field_sources.get(field_path)
    }

    pub fn field_sources(&self) -> &BTreeMap<String, ConfigSource> {
        &self.field_sources
    }

    /// Human-readable list of settings not at their static default
    pub fn summary(&self) -> String {
        let overridden: Vec<_> = self
            .field_sources
            .iter()
            .filter(|(_, source)| **source != ConfigSource::Default)
            .collect();

        if overridden.is_empty() {
            return "All settings at declared defaults".to_string();
        }

        let mut lines = vec!["Non-static sources:".to_string()];
        for (field, source) in overridden {
            let source_str = match source {
                ConfigSource::Default => "declared default".to_string(),
                ConfigSource::Computed => "default function".to_string(),
                ConfigSource::Env(var) => format!("env ${}", var),
                ConfigSource::Set => "set".to_string(),
                ConfigSource::Restore => "snapshot restore".to_string(),
                ConfigSource::Yaml { path } => path.clone(),
            };
            lines.push(format!("  {} ← {}", field, source_str));
        }

        lines.join("\n")
    }
}

impl ConfigSource {
    /// Get a short description
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Default => "default".to_string(),
            ConfigSource::Computed => "computed".to_string(),
            ConfigSource::Env(var) => format!("env:{}", var),
            ConfigSource::Set => "set".to_string(),
            ConfigSource::Restore => "restore".to_string(),
            ConfigSource::Yaml { path } => format!("yaml:{}", path),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
