//! CPU C++ codegen flags

use crate::config::{RegistryBuilder, SettingSpec, SettingType, SettingValue};

flag_view!(
    /// Typed accessors for `cpp.*`
    CppFlags, "cpp.", {
        threads: get_int -> i64,
        no_redundant_loops: get_bool -> bool,
        dynamic_threads: get_bool -> bool,
        simdlen: get_opt_int -> Option<i64>,
        min_chunk_size: get_int -> i64,
        cxx: get_list -> Vec<SettingValue>,
        enable_kernel_profile: get_bool -> bool,
        weight_prepack: get_bool -> bool,
        vec_isa_ok: get_opt_bool -> Option<bool>,
        descriptive_names: get_str -> String,
        max_horizontal_fusion_size: get_int -> i64,
        fallback_scatter_reduce_sum: get_bool -> bool,
        enable_unsafe_math_opt_flag: get_bool -> bool,
        enable_floating_point_contract_flag: get_bool -> bool,
    }
);

fn default_compiler() -> &'static str {
    if cfg!(target_os = "macos") {
        "clang++"
    } else {
        "g++"
    }
}

pub(crate) fn declare(b: RegistryBuilder) -> RegistryBuilder {
    b.setting(SettingSpec::int("threads", -1).doc("Threads for generated code, -1 for all"))
        .setting(SettingSpec::bool("no_redundant_loops", true))
        .setting(SettingSpec::bool("dynamic_threads", false))
        .setting(SettingSpec::optional("simdlen", SettingType::Int))
        .setting(SettingSpec::int("min_chunk_size", 4096))
        .setting(
            SettingSpec::computed("cxx", SettingType::List, |ctx| {
                let compiler = ctx
                    .env_var("CXX")
                    .unwrap_or_else(|| default_compiler().to_string());
                SettingValue::List(vec![SettingValue::None, SettingValue::Str(compiler)])
            })
            .doc("Candidate compilers in order; None selects a bundled toolchain"),
        )
        .setting(SettingSpec::bool("enable_kernel_profile", false))
        .setting(SettingSpec::bool("weight_prepack", true))
        .setting(SettingSpec::optional("inject_relu_bug_TESTING_ONLY", SettingType::Str))
        .setting(SettingSpec::optional("inject_log1p_bug_TESTING_ONLY", SettingType::Str))
        .setting(
            SettingSpec::optional("vec_isa_ok", SettingType::Bool)
                .doc("Force the vector ISA check result; None runs the check"),
        )
        .setting(SettingSpec::string("descriptive_names", "original_aten"))
        .setting(SettingSpec::int("max_horizontal_fusion_size", 16))
        .setting(SettingSpec::bool("fallback_scatter_reduce_sum", true))
        .setting(SettingSpec::bool("enable_unsafe_math_opt_flag", false))
        .setting(SettingSpec::bool("enable_floating_point_contract_flag", false))
}

#[cfg(test)]
mod tests {
    use crate::config::{HostInfo, MapEnv, SettingValue};
    use crate::flags::build_with;

    #[test]
    fn test_cxx_from_env() {
        let env = MapEnv::new().with("CXX", "clang++-17");
        let reg = build_with(&env, &HostInfo::new(2, false)).unwrap();
        assert_eq!(
            reg.flags().cpp().cxx().unwrap(),
            vec![SettingValue::None, SettingValue::Str("clang++-17".into())]
        );
    }

    #[test]
    fn test_optional_defaults() {
        let reg = build_with(&MapEnv::new(), &HostInfo::new(2, false)).unwrap();
        let cpp = reg.flags().cpp();
        assert_eq!(cpp.simdlen().unwrap(), None);
        assert_eq!(cpp.vec_isa_ok().unwrap(), None);
        assert_eq!(cpp.threads().unwrap(), -1);

        reg.set("cpp.vec_isa_ok", false).unwrap();
        assert_eq!(cpp.vec_isa_ok().unwrap(), Some(false));
    }
}
