//! CUDA template backend flags

use crate::config::{RegistryBuilder, SettingSpec, SettingType};

flag_view!(
    /// Typed accessors for `cuda.*`
    CudaFlags, "cuda.", {
        arch: get_opt_str -> Option<String>,
        version: get_opt_str -> Option<String>,
        compile_opt_level: get_str -> String,
        enable_cuda_lto: get_bool -> bool,
        enable_ptxas_info: get_bool -> bool,
        enable_debug_info: get_bool -> bool,
        use_fast_math: get_bool -> bool,
        cutlass_dir: get_str -> String,
        cutlass_max_profiling_configs: get_opt_int -> Option<i64>,
        cuda_cxx: get_opt_str -> Option<String>,
        cutlass_only_evt_capable_ops: get_bool -> bool,
    }
);

pub(crate) fn declare(b: RegistryBuilder) -> RegistryBuilder {
    b.setting(SettingSpec::optional("arch", SettingType::Str).doc("Target arch; None detects the device"))
        .setting(SettingSpec::optional("version", SettingType::Str))
        .setting(SettingSpec::string("compile_opt_level", "-O1"))
        .setting(SettingSpec::bool("enable_cuda_lto", false))
        .setting(SettingSpec::bool("enable_ptxas_info", false))
        .setting(SettingSpec::bool("enable_debug_info", false))
        .setting(SettingSpec::bool("use_fast_math", false))
        .setting(
            SettingSpec::string("cutlass_dir", "third_party/cutlass")
                .env("TORCHINDUCTOR_CUTLASS_DIR"),
        )
        .setting(
            SettingSpec::optional("cutlass_max_profiling_configs", SettingType::Int)
                .doc("Cap on profiled configs; None profiles all"),
        )
        .setting(SettingSpec::optional("cuda_cxx", SettingType::Str))
        .setting(SettingSpec::bool("cutlass_only_evt_capable_ops", false))
}
