//! Registry construction
//!
//! Declarations are collected in order and resolved once in
//! [`RegistryBuilder::build_with`]: each default is computed, type-checked and
//! then overridden by its environment variable when one is set.

use super::env::{parse_env_value, EnvSource, HostInfo, ProcessEnv};
use super::error::{RegistryError, RegistryResult};
use super::namespace::{join_path, split_path, Namespace};
use super::provenance::{ConfigProvenance, ConfigSource};
use super::registry::Registry;
use super::setting::{DefaultContext, DefaultValue, Setting, SettingSpec};
use tracing::{debug, info};

/// Ordered list of setting declarations
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    prefix: String,
    specs: Vec<SettingSpec>,
    ignore: Vec<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a setting below the current namespace
    pub fn setting(mut self, mut spec: SettingSpec) -> Self {
        spec.path = join_path(&self.prefix, &spec.path);
        self.specs.push(spec);
        self
    }

    /// Declare settings inside a nested namespace
    ///
    /// ```
    /// use backend_flags::config::{RegistryBuilder, SettingSpec};
    ///
    /// let builder = RegistryBuilder::new()
    ///     .setting(SettingSpec::bool("debug", false))
    ///     .namespace("triton", |ns| ns.setting(SettingSpec::bool("cudagraphs", false)));
    /// assert_eq!(builder.len(), 2);
    /// ```
    pub fn namespace(mut self, name: &str, f: impl FnOnce(RegistryBuilder) -> RegistryBuilder) -> Self {
        let child = f(RegistryBuilder {
            prefix: join_path(&self.prefix, name),
            ..Self::default()
        });
        self.specs.extend(child.specs);
        self.ignore.extend(child.ignore);
        self
    }

    /// Exclude a path from snapshots and hashes
    ///
    /// The path must name a declared setting once the registry is built,
    /// otherwise every snapshot fails.
    pub fn ignore(mut self, path: &str) -> Self {
        self.ignore.push(join_path(&self.prefix, path));
        self
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Build against the process environment and detected host
    pub fn build(self) -> RegistryResult<Registry> {
        self.build_with(&ProcessEnv, &HostInfo::detect())
    }

    pub fn build_with(self, env: &dyn EnvSource, host: &HostInfo) -> RegistryResult<Registry> {
        let mut root = Namespace::new();
        let mut provenance = ConfigProvenance::new();

        for spec in self.specs {
            split_path(&spec.path)?;

            let (declared, mut source) = match spec.default {
                DefaultValue::Static(value) => (value, ConfigSource::Default),
                DefaultValue::Computed(f) => {
                    let ctx = DefaultContext {
                        env,
                        host,
                        resolved: &root,
                    };
                    (f(&ctx), ConfigSource::Computed)
                }
            };

            let mut value = spec
                .ty
                .coerce(declared)
                .map_err(|found| RegistryError::type_mismatch(&spec.path, &spec.ty, &found))?;

            if let Some(var) = &spec.env_var {
                if let Some(raw) = env.var(var) {
                    value = parse_env_value(&spec.ty, &raw)
                        .and_then(|parsed| spec.ty.coerce(parsed).ok())
                        .ok_or_else(|| RegistryError::EnvironmentParse {
                            var: var.clone(),
                            path: spec.path.clone(),
                            value: raw.clone(),
                            expected: spec.ty.to_string(),
                        })?;
                    debug!(path = %spec.path, var = %var, value = %value, "environment override");
                    source = ConfigSource::Env(var.clone());
                }
            }

            provenance.track_default(&spec.path, source);
            root.insert(Setting {
                path: spec.path,
                ty: spec.ty,
                default: value.clone(),
                value,
                env_var: spec.env_var,
                ignored: spec.ignored,
                doc: spec.doc,
            })?;
        }

        let mut unresolved_ignores = Vec::new();
        for path in self.ignore {
            match root.leaf_mut(&path) {
                Some(setting) => setting.ignored = true,
                None => unresolved_ignores.push(path),
            }
        }

        let registry = Registry::from_parts(root, provenance, unresolved_ignores);
        info!(settings = registry.len(), "backend flag registry constructed");
        Ok(registry)
    }
}
