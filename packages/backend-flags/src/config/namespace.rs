//! Namespace tree
//!
//! Settings live at the leaves of a tree keyed by path segment. Siblings are
//! kept in a `BTreeMap`, so every walk visits them in name order.

use super::error::{RegistryError, RegistryResult};
use super::setting::Setting;
use std::collections::BTreeMap;

pub(crate) const SEPARATOR: char = '.';

/// Child of a namespace
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Setting),
    Namespace(Namespace),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "setting",
            Node::Namespace(_) => "namespace",
        }
    }
}

/// Named group of settings and sub-namespaces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    children: BTreeMap<String, Node>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Child names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Resolve a dotted path to a node
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split(SEPARATOR);
        let mut node = self.children.get(segments.next()?)?;
        for segment in segments {
            node = match node {
                Node::Namespace(ns) => ns.children.get(segment)?,
                Node::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    pub fn leaf(&self, path: &str) -> Option<&Setting> {
        match self.lookup(path)? {
            Node::Leaf(setting) => Some(setting),
            Node::Namespace(_) => None,
        }
    }

    pub fn namespace(&self, path: &str) -> Option<&Namespace> {
        match self.lookup(path)? {
            Node::Namespace(ns) => Some(ns),
            Node::Leaf(_) => None,
        }
    }

    pub(crate) fn leaf_mut(&mut self, path: &str) -> Option<&mut Setting> {
        let mut current = self;
        let mut segments = path.split(SEPARATOR).peekable();
        while let Some(segment) = segments.next() {
            let node = current.children.get_mut(segment)?;
            match node {
                Node::Leaf(setting) if segments.peek().is_none() => return Some(setting),
                Node::Namespace(ns) => current = ns,
                Node::Leaf(_) => return None,
            }
        }
        None
    }

    /// Insert a setting at its path, creating intermediate namespaces
    pub(crate) fn insert(&mut self, setting: Setting) -> RegistryResult<()> {
        let segments = split_path(&setting.path)?;
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Err(RegistryError::invalid_path(&setting.path, "empty path")),
        };

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let node = current
                .children
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Namespace(Namespace::new()));
            current = match node {
                Node::Namespace(ns) => ns,
                Node::Leaf(_) => {
                    return Err(RegistryError::PathCollision {
                        path: parents[..=depth].join("."),
                        existing: "setting",
                    })
                }
            };
        }

        let name = (*last).to_string();
        if let Some(existing) = current.children.get(&name) {
            return Err(RegistryError::PathCollision {
                path: setting.path.clone(),
                existing: existing.kind(),
            });
        }
        current.children.insert(name, Node::Leaf(setting));
        Ok(())
    }

    /// Depth-first walk over every setting
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Setting)) {
        for node in self.children.values() {
            match node {
                Node::Leaf(setting) => f(setting),
                Node::Namespace(ns) => ns.visit(f),
            }
        }
    }

    pub(crate) fn visit_mut(&mut self, f: &mut impl FnMut(&mut Setting)) {
        for node in self.children.values_mut() {
            match node {
                Node::Leaf(setting) => f(setting),
                Node::Namespace(ns) => ns.visit_mut(f),
            }
        }
    }

    pub fn settings(&self) -> Vec<&Setting> {
        let mut out = Vec::new();
        self.visit(&mut |s| out.push(s));
        out
    }

    /// Full paths of every setting, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self.settings().iter().map(|s| s.path.clone()).collect();
        out.sort();
        out
    }

    /// Number of settings below this namespace
    pub fn len(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_| count += 1);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Split and validate a dotted path
pub(crate) fn split_path(path: &str) -> RegistryResult<Vec<&str>> {
    if path.is_empty() {
        return Err(RegistryError::invalid_path(path, "empty path"));
    }
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(RegistryError::invalid_path(path, "empty segment"));
        }
        if segment.chars().any(char::is_whitespace) {
            return Err(RegistryError::invalid_path(path, "segment contains whitespace"));
        }
    }
    Ok(segments)
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::value::{SettingType, SettingValue};

    fn leaf(path: &str, value: i64) -> Setting {
        Setting {
            path: path.to_string(),
            ty: SettingType::Int,
            default: SettingValue::Int(value),
            value: SettingValue::Int(value),
            env_var: None,
            ignored: false,
            doc: None,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut root = Namespace::new();
        root.insert(leaf("debug", 0)).unwrap();
        root.insert(leaf("triton.spill_threshold", 16)).unwrap();
        root.insert(leaf("triton.inner.depth", 2)).unwrap();

        assert_eq!(root.len(), 3);
        assert!(matches!(root.lookup("triton"), Some(Node::Namespace(_))));
        assert_eq!(
            root.leaf("triton.inner.depth").map(|s| s.value().clone()),
            Some(SettingValue::Int(2))
        );
        assert!(root.leaf("triton").is_none());
        assert!(root.leaf("debug.extra").is_none());
        assert_eq!(
            root.paths(),
            vec!["debug", "triton.inner.depth", "triton.spill_threshold"]
        );
    }

    #[test]
    fn test_collisions() {
        let mut root = Namespace::new();
        root.insert(leaf("cpp.threads", 1)).unwrap();

        let err = root.insert(leaf("cpp.threads", 2)).unwrap_err();
        assert!(matches!(err, RegistryError::PathCollision { existing: "setting", .. }));

        let err = root.insert(leaf("cpp", 2)).unwrap_err();
        assert!(matches!(err, RegistryError::PathCollision { existing: "namespace", .. }));

        let err = root.insert(leaf("cpp.threads.inner", 2)).unwrap_err();
        match err {
            RegistryError::PathCollision { path, existing } => {
                assert_eq!(path, "cpp.threads");
                assert_eq!(existing, "setting");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_leaf_mut() {
        let mut root = Namespace::new();
        root.insert(leaf("a.b", 1)).unwrap();
        root.leaf_mut("a.b").unwrap().replace(SettingValue::Int(5));
        assert_eq!(root.leaf("a.b").unwrap().value(), &SettingValue::Int(5));
        assert!(root.leaf_mut("a").is_none());
        assert!(root.leaf_mut("a.b.c").is_none());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(split_path("").is_err());
        assert!(split_path("a..b").is_err());
        assert!(split_path(".a").is_err());
        assert!(split_path("a b").is_err());
        assert_eq!(split_path("a.b").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "debug"), "debug");
        assert_eq!(join_path("cpp", "threads"), "cpp.threads");
    }
}
