//! Compile tracing and debug artifact flags

use crate::config::{Hook, RegistryBuilder, SettingSpec, SettingType};

flag_view!(
    /// Typed accessors for `trace.*`
    TraceFlags, "trace.", {
        enabled: get_bool -> bool,
        debug_dir: get_opt_str -> Option<String>,
        debug_log: get_bool -> bool,
        info_log: get_bool -> bool,
        fx_graph: get_bool -> bool,
        fx_graph_transformed: get_bool -> bool,
        ir_pre_fusion: get_bool -> bool,
        ir_post_fusion: get_bool -> bool,
        output_code: get_bool -> bool,
        graph_diagram: get_bool -> bool,
        draw_orig_fx_graph: get_bool -> bool,
        dot_graph_shape: get_opt_str -> Option<String>,
        compile_profile: get_bool -> bool,
        upload_tar: get_hook -> Option<Hook>,
    }
);

pub(crate) fn declare(b: RegistryBuilder) -> RegistryBuilder {
    b.setting(super::env_flag("enabled", "TORCH_COMPILE_DEBUG", false).doc("Master switch for debug artifacts"))
        .setting(SettingSpec::optional("debug_dir", SettingType::Str))
        .setting(SettingSpec::bool("debug_log", false))
        .setting(SettingSpec::bool("info_log", false))
        .setting(SettingSpec::bool("fx_graph", true))
        .setting(SettingSpec::bool("fx_graph_transformed", true))
        .setting(SettingSpec::bool("ir_pre_fusion", true))
        .setting(SettingSpec::bool("ir_post_fusion", true))
        .setting(SettingSpec::bool("output_code", true))
        .setting(super::env_flag("graph_diagram", "INDUCTOR_POST_FUSION_SVG", false))
        .setting(super::env_flag("draw_orig_fx_graph", "INDUCTOR_ORIG_FX_SVG", false))
        .setting(
            SettingSpec::optional("dot_graph_shape", SettingType::Str)
                .env("INDUCTOR_DOT_GRAPH_SHAPE_SVG"),
        )
        .setting(SettingSpec::bool("compile_profile", false))
        .setting(SettingSpec::hook("upload_tar").doc("Called with the trace tarball path"))
}
