//! GPU kernel codegen flags

use crate::config::{RegistryBuilder, SettingSpec, SettingType, SettingValue};
use std::collections::BTreeMap;

flag_view!(
    /// Typed accessors for `triton.*`
    TritonFlags, "triton.", {
        cudagraphs: get_bool -> bool,
        cudagraph_trees: get_bool -> bool,
        debug_sync_graph: get_bool -> bool,
        debug_sync_kernel: get_bool -> bool,
        dense_indexing: get_bool -> bool,
        max_tiles: get_int -> i64,
        autotune_pointwise: get_bool -> bool,
        unique_kernel_names: get_bool -> bool,
        descriptive_names: get_str -> String,
        persistent_reductions: get_bool -> bool,
        multi_kernel: get_int -> i64,
        divisible_by_16: get_bool -> bool,
        max_block: get_map -> BTreeMap<String, SettingValue>,
        store_cubin: get_bool -> bool,
        spill_threshold: get_int -> i64,
        use_block_ptr: get_bool -> bool,
    }
);

/// Reduction block size multiplier when multi-kernel dispatch is on
const MULTI_KERNEL_RBLOCK_SCALE: i64 = 16;

pub(crate) fn declare(b: RegistryBuilder) -> RegistryBuilder {
    b.setting(SettingSpec::bool("cudagraphs", false).doc("Launch kernels through CUDA graphs"))
        .setting(SettingSpec::bool("cudagraph_trees", true))
        .setting(SettingSpec::bool("slow_path_cudagraph_asserts", true))
        .setting(SettingSpec::bool("cudagraph_trees_history_recording", false))
        .setting(SettingSpec::bool("fast_path_cudagraph_asserts", false))
        .setting(SettingSpec::bool("skip_cudagraph_warmup", false))
        .setting(SettingSpec::bool("debug_sync_graph", false))
        .setting(SettingSpec::bool("debug_sync_kernel", false))
        .setting(SettingSpec::bool("dense_indexing", false))
        .setting(SettingSpec::int("max_tiles", 2))
        .setting(SettingSpec::bool("autotune_pointwise", true))
        .setting(SettingSpec::bool("autotune_cublasLt", true))
        .setting(SettingSpec::bool("tiling_prevents_pointwise_fusion", true))
        .setting(SettingSpec::bool("tiling_prevents_reduction_fusion", true))
        .setting(super::env_flag(
            "unique_kernel_names",
            "TORCHINDUCTOR_UNIQUE_KERNEL_NAMES",
            false,
        ))
        .setting(SettingSpec::string("descriptive_names", "original_aten"))
        .setting(super::env_flag(
            "persistent_reductions",
            "TORCHINDUCTOR_PERSISTENT_REDUCTIONS",
            true,
        ))
        .setting(
            SettingSpec::int("multi_kernel", 0)
                .env("TORCHINDUCTOR_MULTI_KERNEL")
                .doc("Generate persistent and non-persistent reduction kernels, pick at runtime"),
        )
        .setting(SettingSpec::bool("divisible_by_16", true))
        // Depends on multi_kernel, declared above
        .setting(SettingSpec::computed("max_block", SettingType::Mapping, |ctx| {
            let multi_kernel = ctx
                .resolved("triton.multi_kernel")
                .and_then(SettingValue::as_int)
                .unwrap_or(0);
            let r_scale = if multi_kernel != 0 {
                MULTI_KERNEL_RBLOCK_SCALE
            } else {
                1
            };
            SettingValue::Map(BTreeMap::from([
                ("X".to_string(), SettingValue::Int(2048)),
                ("Y".to_string(), SettingValue::Int(1024)),
                ("Z".to_string(), SettingValue::Int(1024)),
                ("R".to_string(), SettingValue::Int(4096 * r_scale)),
            ]))
        }))
        .setting(SettingSpec::bool("store_cubin", false))
        .setting(SettingSpec::int("spill_threshold", 16).doc("Register spills tolerated before a config is rejected"))
        .setting(SettingSpec::bool("use_block_ptr", false))
        .setting(SettingSpec::optional("inject_relu_bug_TESTING_ONLY", SettingType::Str))
}
