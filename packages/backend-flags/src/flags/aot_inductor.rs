//! Ahead-of-time compilation flags

use crate::config::{RegistryBuilder, SettingSpec};

flag_view!(
    /// Typed accessors for `aot_inductor.*`
    AotInductorFlags, "aot_inductor.", {
        output_path: get_str -> String,
        debug_compile: get_bool -> bool,
        abi_compatible: get_bool -> bool,
        serialized_in_spec: get_str -> String,
        serialized_out_spec: get_str -> String,
        use_runtime_constant_folding: get_bool -> bool,
    }
);

pub(crate) fn declare(b: RegistryBuilder) -> RegistryBuilder {
    b.setting(SettingSpec::string("output_path", "").doc("Directory for the compiled library; empty picks a temp dir"))
        .setting(super::env_flag("debug_compile", "AOT_INDUCTOR_DEBUG_COMPILE", false))
        .setting(SettingSpec::bool("abi_compatible", false))
        .setting(SettingSpec::string("serialized_in_spec", ""))
        .setting(SettingSpec::string("serialized_out_spec", ""))
        .setting(SettingSpec::bool("use_runtime_constant_folding", false))
}
