//! Registry error types

use super::value::{SettingType, SettingValue};
use thiserror::Error;

/// Registry error type
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Path does not name a registered setting
    #[error("Unknown setting '{path}'. {suggestion}")]
    UnknownSetting { path: String, suggestion: String },

    /// Value is incompatible with the declared type
    #[error("Type mismatch for '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Environment variable present but not parseable as the declared type
    #[error("Environment variable {var}={value:?} cannot be parsed as {expected} for '{path}'")]
    EnvironmentParse {
        var: String,
        path: String,
        value: String,
        expected: String,
    },

    /// Snapshot or hash requested over a value that cannot be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Declaration reuses a path already taken by a setting or namespace
    #[error("Path '{path}' is already declared as a {existing}")]
    PathCollision {
        path: String,
        existing: &'static str,
    },

    /// Malformed dotted path
    #[error("Invalid setting path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Missing version field in a settings file
    #[error("Missing 'version' field in settings file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    /// Unsupported settings file version
    #[error("Unsupported settings file version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registry result type
pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    /// Create an unknown setting error, suggesting the closest registered path
    pub fn unknown_setting<'a>(
        path: impl Into<String>,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let path = path.into();
        let suggestion = find_closest_match(&path, candidates);
        Self::UnknownSetting { path, suggestion }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &SettingType, found: &SettingValue) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path carried by path-scoped errors
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::UnknownSetting { path, .. }
            | Self::TypeMismatch { path, .. }
            | Self::EnvironmentParse { path, .. }
            | Self::PathCollision { path, .. }
            | Self::InvalidPath { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Find closest match using edit distance
fn find_closest_match<'a>(target: &str, candidates: impl IntoIterator<Item = &'a str>) -> String {
    let closest = candidates
        .into_iter()
        .map(|candidate| (levenshtein_distance(target, candidate), candidate))
        .min();

    match closest {
        // Suggestions further away than half the target are noise
        Some((distance, candidate)) if distance <= target.chars().count().max(4) / 2 => {
            format!("Did you mean '{}'?", candidate)
        }
        Some(_) => "No similarly named setting is registered".to_string(),
        None => "No settings are registered".to_string(),
    }
}

/// Levenshtein distance over chars, two rolling rows
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
        assert_eq!(levenshtein_distance("cudagraph", "cudagraphs"), 1);
    }

    #[test]
    fn test_unknown_setting_suggestion() {
        let err = RegistryError::unknown_setting(
            "triton.cudagraph",
            ["triton.cudagraphs", "triton.multi_kernel", "debug"],
        );
        let msg = err.to_string();
        assert!(msg.contains("triton.cudagraph"));
        assert!(msg.contains("Did you mean 'triton.cudagraphs'?"));
    }

    #[test]
    fn test_unknown_setting_without_close_match() {
        let err = RegistryError::unknown_setting("zzzzzzzzzzzz", ["debug"]);
        assert!(!err.to_string().contains("Did you mean"));

        let err = RegistryError::unknown_setting("debug", std::iter::empty());
        assert!(err.to_string().contains("No settings are registered"));
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = RegistryError::type_mismatch(
            "cpp.threads",
            &SettingType::Int,
            &SettingValue::Str("four".into()),
        );
        assert_eq!(
            err.to_string(),
            "Type mismatch for 'cpp.threads': expected int, found str"
        );
        assert_eq!(err.path(), Some("cpp.threads"));
    }

    #[test]
    fn test_unsupported_version_message() {
        let err = RegistryError::UnsupportedVersion {
            found: 2,
            supported: vec![1],
        };
        assert!(err.to_string().contains("Supported versions: 1"));
    }
}
