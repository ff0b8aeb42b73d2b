//! Top-level flags

use super::env_flag;
use crate::config::{Hook, RegistryBuilder, SettingSpec, SettingType, SettingValue};
use std::collections::BTreeMap;

flag_view!(
    /// Typed accessors for top-level flags
    FlagsView, "", {
        debug: get_bool -> bool,
        debug_check_inf_and_nan: get_bool -> bool,
        disable_progress: get_bool -> bool,
        verbose_progress: get_bool -> bool,
        fx_graph_cache: get_bool -> bool,
        cpp_wrapper: get_bool -> bool,
        dce: get_bool -> bool,
        size_asserts: get_bool -> bool,
        nan_asserts: get_bool -> bool,
        memory_planning: get_bool -> bool,
        memory_pool: get_str -> String,
        epilogue_fusion: get_bool -> bool,
        pattern_matcher: get_bool -> bool,
        post_grad_custom_pre_pass: get_hook -> Option<Hook>,
        post_grad_custom_post_pass: get_hook -> Option<Hook>,
        pre_grad_custom_pass: get_hook -> Option<Hook>,
        pre_grad_fusion_options: get_map -> BTreeMap<String, SettingValue>,
        post_grad_fusion_options: get_map -> BTreeMap<String, SettingValue>,
        fx_passes_numeric_check: get_map -> BTreeMap<String, SettingValue>,
        reorder_for_compute_comm_overlap: get_bool -> bool,
        reorder_for_compute_comm_overlap_passes: get_list -> Vec<SettingValue>,
        max_autotune: get_bool -> bool,
        max_autotune_pointwise: get_bool -> bool,
        max_autotune_gemm: get_bool -> bool,
        max_autotune_gemm_backends: get_str -> String,
        force_same_precision: get_bool -> bool,
        coordinate_descent_tuning: get_bool -> bool,
        coordinate_descent_search_radius: get_int -> i64,
        layout_optimization: get_bool -> bool,
        max_fusion_size: get_int -> i64,
        benchmark_kernel: get_bool -> bool,
        worker_start_method: get_str -> String,
        compile_threads: get_int -> i64,
        global_cache_dir: get_opt_str -> Option<String>,
        shape_padding: get_bool -> bool,
        profile_bandwidth: get_bool -> bool,
        profile_bandwidth_regex: get_str -> String,
        profile_bandwidth_output: get_opt_str -> Option<String>,
        freezing: get_bool -> bool,
    }
);

/// Maximum worker count derived from the host
const MAX_COMPILE_THREADS: usize = 32;

fn fusion_options(names: &[&str]) -> BTreeMap<String, SettingValue> {
    names
        .iter()
        .map(|name| (name.to_string(), SettingValue::Map(BTreeMap::new())))
        .collect()
}

fn numeric_check_defaults() -> BTreeMap<String, SettingValue> {
    BTreeMap::from([
        ("pre_grad".to_string(), SettingValue::Bool(false)),
        ("precision".to_string(), SettingValue::Float(1e-4)),
        ("num_iterations".to_string(), SettingValue::Int(1)),
        ("requires_optimizer".to_string(), SettingValue::Bool(true)),
    ])
}

pub(crate) fn declare(b: RegistryBuilder) -> RegistryBuilder {
    b.setting(SettingSpec::bool("debug", false).doc("Add debug printouts"))
        .setting(SettingSpec::bool("debug_check_inf_and_nan", false))
        .setting(SettingSpec::bool("disable_progress", true))
        .setting(SettingSpec::bool("verbose_progress", false))
        .setting(env_flag("fx_graph_cache", "TORCHINDUCTOR_FX_GRAPH_CACHE", false).doc("Use the FX graph codegen cache"))
        .setting(env_flag("cpp_wrapper", "TORCHINDUCTOR_CPP_WRAPPER", false))
        .setting(SettingSpec::bool("dce", false).doc("Dead code elimination"))
        .setting(SettingSpec::bool("static_weight_shapes", true))
        .setting(env_flag("size_asserts", "TORCHINDUCTOR_SIZE_ASSERTS", true))
        .setting(env_flag("nan_asserts", "TORCHINDUCTOR_NAN_ASSERTS", false))
        .setting(SettingSpec::bool("pick_loop_orders", true))
        .setting(SettingSpec::bool("inplace_buffers", true))
        .setting(SettingSpec::bool("allow_buffer_reuse", true))
        .setting(env_flag("memory_planning", "TORCHINDUCTOR_MEMORY_PLANNING", false))
        .setting(
            SettingSpec::string("memory_pool", "intermediates")
                .env("TORCHINDUCTOR_MEMORY_POOL")
                .doc("Pooling under memory_planning: none, intermediates, outputs or combined"),
        )
        .setting(SettingSpec::bool("benchmark_harness", true))
        .setting(SettingSpec::bool("epilogue_fusion", true))
        .setting(SettingSpec::bool("epilogue_fusion_first", false))
        .setting(SettingSpec::bool("pattern_matcher", true))
        // Graph pass hooks, ignored for snapshots
        .setting(SettingSpec::hook("post_grad_custom_pre_pass"))
        .setting(SettingSpec::hook("post_grad_custom_post_pass"))
        .setting(SettingSpec::hook("pre_grad_custom_pass"))
        .setting(SettingSpec::bool("split_cat_fx_passes", true))
        .setting(SettingSpec::bool("efficient_conv_bn_eval_fx_passes", false))
        .setting(SettingSpec::bool("is_predispatch", false))
        .setting(SettingSpec::bool("group_fusion", false))
        .setting(SettingSpec::bool("batch_fusion", true))
        .setting(
            SettingSpec::mapping(
                "pre_grad_fusion_options",
                fusion_options(&[
                    "batch_linear",
                    "batch_linear_lhs",
                    "batch_layernorm",
                    "batch_tanh",
                    "batch_relu",
                    "batch_sigmoid",
                ]),
            )
            .doc("Pre-grad group/batch fusions and their options; empty disables"),
        )
        .setting(SettingSpec::mapping("post_grad_fusion_options", BTreeMap::new()))
        .setting(SettingSpec::bool("reorder_for_locality", true))
        .setting(env_flag("dynamic_scale_rblock", "TORCHINDUCTOR_DYNAMIC_SCALE_RBLOCK", true))
        .setting(SettingSpec::bool("force_fuse_int_mm_with_mul", false))
        .setting(SettingSpec::bool("use_mixed_mm", false))
        .setting(SettingSpec::mapping("fx_passes_numeric_check", numeric_check_defaults()))
        .setting(SettingSpec::bool("force_mixed_mm", false))
        .setting(SettingSpec::bool("reorder_for_compute_comm_overlap", false))
        .setting(
            SettingSpec::list(
                "reorder_for_compute_comm_overlap_passes",
                vec!["reorder_compute_for_overlap", "sink_waits", "raise_comms"],
            )
            .doc("Overlap passes in execution order"),
        )
        .setting(SettingSpec::string("estimate_op_runtime", "default"))
        .setting(SettingSpec::int("intra_node_bw", 300).doc("GB/s per card"))
        .setting(SettingSpec::int("inter_node_bw", 25).doc("GB/s per node"))
        .setting(env_flag("max_autotune", "TORCHINDUCTOR_MAX_AUTOTUNE", false))
        .setting(env_flag("max_autotune_pointwise", "TORCHINDUCTOR_MAX_AUTOTUNE_POINTWISE", false))
        .setting(env_flag("max_autotune_gemm", "TORCHINDUCTOR_MAX_AUTOTUNE_GEMM", false))
        .setting(env_flag("force_same_precision", "TORCHINDUCTOR_FORCE_SAME_PRECISION", false))
        .setting(
            SettingSpec::computed("max_autotune_gemm_backends", SettingType::Str, |ctx| {
                ctx.env_var("TORCHINDUCTOR_MAX_AUTOTUNE_GEMM_BACKENDS")
                    .unwrap_or_else(|| "ATEN,TRITON".to_string())
                    .to_uppercase()
                    .into()
            })
            .doc("Comma separated gemm autotune backends"),
        )
        .setting(SettingSpec::int("unbacked_symint_fallback", 8192))
        .setting(env_flag("search_autotune_cache", "TORCHINDUCTOR_SEARCH_AUTOTUNE_CACHE", false))
        .setting(env_flag("save_args", "TORCHINDUCTOR_SAVE_ARGS", false))
        .setting(env_flag("autotune_in_subproc", "TORCHINDUCTOR_AUTOTUNE_IN_SUBPROC", false))
        .setting(env_flag("autotune_multi_device", "TORCHINDUCTOR_AUTOTUNE_MULTI_DEVICE", false))
        .setting(env_flag("coordinate_descent_tuning", "TORCHINDUCTOR_COORDINATE_DESCENT_TUNING", false))
        .setting(env_flag(
            "coordinate_descent_check_all_directions",
            "TORCHINDUCTOR_COORDINATE_DESCENT_CHECK_ALL_DIRECTIONS",
            false,
        ))
        .setting(
            SettingSpec::int("coordinate_descent_search_radius", 1)
                .env("TORCHINDUCTOR_COORDINATE_DESCENT_RADIUS"),
        )
        .setting(env_flag("layout_optimization", "TORCHINDUCTOR_LAYOUT_OPTIMIZATION", true))
        .setting(env_flag("force_layout_optimization", "TORCHINDUCTOR_FORCE_LAYOUT_OPT", false))
        .setting(env_flag("keep_output_stride", "TORCHINDUCTOR_KEEP_OUTPUT_STRIDE", true))
        .setting(env_flag("warn_mix_layout", "TORCHINDUCTOR_WARN_MIX_LAYOUT", false))
        .setting(SettingSpec::int("realize_reads_threshold", 4))
        .setting(SettingSpec::int("realize_opcount_threshold", 30))
        .setting(SettingSpec::int("realize_acc_reads_threshold", 8))
        .setting(SettingSpec::bool("fallback_random", false))
        .setting(SettingSpec::bool("implicit_fallbacks", true))
        .setting(SettingSpec::bool("aggressive_fusion", false))
        .setting(env_flag("debug_fusion", "TORCHINDUCTOR_DEBUG_FUSION", false))
        .setting(env_flag("benchmark_fusion", "TORCHINDUCTOR_BENCHMARK_FUSION", false))
        .setting(SettingSpec::string("enabled_metric_tables", "").env("TORCHINDUCTOR_ENABLED_METRIC_TABLES"))
        .setting(SettingSpec::int("max_fusion_size", 64))
        .setting(SettingSpec::int("max_pointwise_cat_inputs", 128))
        .setting(SettingSpec::int("unroll_reductions_threshold", 8))
        .setting(SettingSpec::bool("comment_origin", false))
        .setting(SettingSpec::bool("conv_1x1_as_mm", false))
        .setting(SettingSpec::bool("split_reductions", true))
        .setting(env_flag("benchmark_kernel", "TORCHINDUCTOR_BENCHMARK_KERNEL", false))
        .setting(SettingSpec::bool("constant_and_index_propagation", true))
        .setting(SettingSpec::bool("always_keep_tensor_constants", false))
        .setting(SettingSpec::bool("assert_indirect_indexing", true))
        .setting(SettingSpec::bool("joint_graph_constant_folding", true))
        .setting(SettingSpec::bool("debug_index_asserts", false))
        .setting(SettingSpec::bool("developer_warnings", false))
        .setting(
            SettingSpec::string("worker_start_method", "fork")
                .doc("Start method for compile worker processes"),
        )
        .setting(
            SettingSpec::computed("compile_threads", SettingType::Int, |ctx| {
                let host = ctx.host();
                let threads = if host.constrained {
                    1
                } else {
                    host.cpu_count.min(MAX_COMPILE_THREADS)
                };
                SettingValue::Int(threads as i64)
            })
            .env("TORCHINDUCTOR_COMPILE_THREADS")
            .doc("Parallel compile workers; 1 disables async compilation"),
        )
        .setting(SettingSpec::optional("global_cache_dir", SettingType::Str))
        .setting(SettingSpec::int("kernel_name_max_ops", 10))
        .setting(env_flag("shape_padding", "TORCHINDUCTOR_SHAPE_PADDING", true))
        .setting(SettingSpec::bool("shape_pad_use_transpose", true))
        .setting(SettingSpec::bool("force_shape_pad", false))
        .setting(env_flag("permute_fusion", "TORCHINDUCTOR_PERMUTE_FUSION", false))
        .setting(SettingSpec::bool("profiler_mark_wrapper_call", false))
        .setting(SettingSpec::bool("generate_intermediate_hooks", false))
        .setting(SettingSpec::bool("debug_ir_traceback", false))
        // TORCHINDUCTOR_PROFILE: "1" profiles every kernel, any other value is a kernel name regex
        .setting(SettingSpec::computed("profile_bandwidth", SettingType::Bool, |ctx| {
            ctx.env_var("TORCHINDUCTOR_PROFILE")
                .is_some_and(|v| !v.is_empty())
                .into()
        }))
        .setting(SettingSpec::computed("profile_bandwidth_regex", SettingType::Str, |ctx| {
            match ctx.env_var("TORCHINDUCTOR_PROFILE") {
                Some(v) if v != "1" => v.into(),
                _ => "".into(),
            }
        }))
        .setting(
            SettingSpec::optional("profile_bandwidth_output", SettingType::Str)
                .env("TORCHINDUCTOR_PROFILE_OUTPUT"),
        )
        .setting(SettingSpec::bool("disable_cpp_codegen", false))
        .setting(env_flag("freezing", "TORCHINDUCTOR_FREEZING", false).doc("Constant-fold frozen parameters"))
        .setting(SettingSpec::bool("freezing_discard_parameters", false))
        .setting(SettingSpec::bool("allow_stack_allocation", true))
        .setting(SettingSpec::bool("use_minimal_arrayref_interface", false))
}
