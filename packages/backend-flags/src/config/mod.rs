//! Setting registry
//!
//! A typed, hierarchical store of tuning settings:
//! - Declaration: [`RegistryBuilder`] of [`SettingSpec`]s, defaults resolved once
//! - Access: `get` / `set` by dotted path, or through a [`NamespaceView`]
//! - Scoped overrides: [`Registry::patch`] and the RAII [`PatchGuard`]
//! - Snapshot / restore / [`ConfigHash`] for cache keys and worker hand-off
//!
//! # Examples
//!
//! ```
//! use backend_flags::config::{HostInfo, MapEnv, Overrides, Registry, SettingSpec};
//!
//! let registry = Registry::builder()
//!     .setting(SettingSpec::bool("debug", false))
//!     .namespace("triton", |ns| ns.setting(SettingSpec::bool("cudagraphs", false)))
//!     .build_with(&MapEnv::new(), &HostInfo::new(8, false))?;
//!
//! let before = registry.hash()?;
//! registry.patch(Overrides::new().set("triton.cudagraphs", true), || {
//!     assert!(registry.get_bool("triton.cudagraphs").unwrap());
//! })?;
//! assert_eq!(registry.hash()?, before);
//! # Ok::<(), backend_flags::config::RegistryError>(())
//! ```

pub mod builder;
pub mod env;
pub mod error;
pub mod io;
pub mod namespace;
pub mod patch;
pub mod provenance;
pub mod registry;
pub mod setting;
pub mod snapshot;
pub mod value;

// Re-exports
pub use builder::RegistryBuilder;
pub use env::{parse_env_value, EnvSource, HostInfo, MapEnv, ProcessEnv};
pub use error::{RegistryError, RegistryResult};
pub use io::{ConfigExportV1, SUPPORTED_VERSIONS};
pub use namespace::{Namespace, Node};
pub use patch::{Overrides, PatchGuard};
pub use provenance::{ConfigProvenance, ConfigSource};
pub use registry::{NamespaceView, Registry, SettingDiff};
pub use setting::{DefaultContext, DefaultFn, DefaultValue, Setting, SettingSpec};
pub use snapshot::{ConfigHash, RestoreReport, Snapshot};
pub use value::{Hook, SettingType, SettingValue};
