//! Built-in backend flags
//!
//! Declarations for the root namespace and the `cpp`, `triton`,
//! `aot_inductor`, `cuda` and `trace` namespaces, plus typed views over a
//! built registry:
//!
//! ```
//! use backend_flags::config::{HostInfo, MapEnv};
//! use backend_flags::flags;
//!
//! let registry = flags::build_with(&MapEnv::new(), &HostInfo::new(8, false))?;
//! assert_eq!(registry.flags().compile_threads()?, 8);
//! assert_eq!(registry.flags().triton().multi_kernel()?, 0);
//! # Ok::<(), backend_flags::config::RegistryError>(())
//! ```

use crate::config::{EnvSource, HostInfo, Registry, RegistryBuilder, RegistryResult, SettingSpec};
use once_cell::sync::OnceCell;

/// Generate a typed view with one accessor per listed setting
macro_rules! flag_view {
    ($(#[$meta:meta])* $view:ident, $prefix:literal, { $($name:ident: $getter:ident -> $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $view<'a> {
            pub(crate) registry: &'a crate::config::Registry,
        }

        impl<'a> $view<'a> {
            pub(crate) fn new(registry: &'a crate::config::Registry) -> Self {
                Self { registry }
            }

            $(
                pub fn $name(&self) -> crate::config::RegistryResult<$ty> {
                    self.registry.$getter(concat!($prefix, stringify!($name)))
                }
            )*
        }
    };
}

pub mod aot_inductor;
pub mod cpp;
pub mod cuda;
pub mod root;
pub mod trace;
pub mod triton;

pub use aot_inductor::AotInductorFlags;
pub use cpp::CppFlags;
pub use cuda::CudaFlags;
pub use root::FlagsView;
pub use trace::TraceFlags;
pub use triton::TritonFlags;

/// Paths excluded from snapshots and hashes
pub const SAVE_IGNORE: &[&str] = &[
    "trace.upload_tar",
    "post_grad_custom_pre_pass",
    "post_grad_custom_post_pass",
    "pre_grad_custom_pass",
];

/// Boolean flag overridable by an environment variable
pub(crate) fn env_flag(name: &str, var: &str, default: bool) -> SettingSpec {
    SettingSpec::bool(name, default).env(var)
}

/// Every built-in declaration, in declaration order
pub fn builtin() -> RegistryBuilder {
    let builder = root::declare(RegistryBuilder::new())
        .namespace("cpp", cpp::declare)
        .namespace("triton", triton::declare)
        .namespace("aot_inductor", aot_inductor::declare)
        .namespace("cuda", cuda::declare)
        .namespace("trace", trace::declare);

    SAVE_IGNORE.iter().fold(builder, |b, path| b.ignore(path))
}

/// Build the built-in flags against an explicit environment and host
pub fn build_with(env: &dyn EnvSource, host: &HostInfo) -> RegistryResult<Registry> {
    builtin().build_with(env, host)
}

static GLOBAL: OnceCell<Registry> = OnceCell::new();

/// Process-wide registry of built-in flags, built from the process
/// environment on first use
pub fn global() -> RegistryResult<&'static Registry> {
    GLOBAL.get_or_try_init(|| builtin().build())
}

impl Registry {
    /// Typed view over the built-in flags
    pub fn flags(&self) -> FlagsView<'_> {
        FlagsView::new(self)
    }
}

impl<'a> FlagsView<'a> {
    pub fn cpp(&self) -> CppFlags<'a> {
        CppFlags::new(self.registry)
    }

    pub fn triton(&self) -> TritonFlags<'a> {
        TritonFlags::new(self.registry)
    }

    pub fn aot_inductor(&self) -> AotInductorFlags<'a> {
        AotInductorFlags::new(self.registry)
    }

    pub fn cuda(&self) -> CudaFlags<'a> {
        CudaFlags::new(self.registry)
    }

    pub fn trace(&self) -> TraceFlags<'a> {
        TraceFlags::new(self.registry)
    }
}
