//! Built-in flag tests

use backend_flags::config::{ConfigSource, Hook, HostInfo, MapEnv, SettingValue};
use backend_flags::flags::{self, SAVE_IGNORE};
use backend_flags::{Registry, RegistryError};

fn build(env: &MapEnv) -> Registry {
    flags::build_with(env, &HostInfo::new(16, false)).unwrap()
}

#[test]
fn namespaces_are_present() {
    let registry = build(&MapEnv::new());
    for ns in ["cpp", "triton", "aot_inductor", "cuda", "trace"] {
        let view = registry.namespace(ns).unwrap();
        assert!(!view.paths().is_empty(), "{ns} has no settings");
    }
}

#[test]
fn bool_env_requires_exact_one() {
    let on = build(&MapEnv::new().with("TORCHINDUCTOR_MAX_AUTOTUNE", "1"));
    assert!(on.flags().max_autotune().unwrap());

    let off = build(&MapEnv::new().with("TORCHINDUCTOR_MAX_AUTOTUNE", "true"));
    assert!(!off.flags().max_autotune().unwrap());

    // Default-on flag switched off by any value other than "1"
    let off = build(&MapEnv::new().with("TORCHINDUCTOR_SIZE_ASSERTS", "0"));
    assert!(!off.flags().size_asserts().unwrap());
}

#[test]
fn env_overrides_record_provenance() {
    let registry = build(&MapEnv::new().with("TORCH_COMPILE_DEBUG", "1"));
    assert!(registry.flags().trace().enabled().unwrap());
    assert_eq!(
        registry.provenance("trace.enabled"),
        Some(ConfigSource::Env("TORCH_COMPILE_DEBUG".to_string()))
    );
    assert_eq!(registry.provenance("trace.fx_graph"), Some(ConfigSource::Default));
}

#[test]
fn optional_string_from_env() {
    let registry = build(&MapEnv::new());
    assert_eq!(registry.flags().trace().dot_graph_shape().unwrap(), None);

    let registry = build(&MapEnv::new().with("INDUCTOR_DOT_GRAPH_SHAPE_SVG", "ellipse"));
    assert_eq!(
        registry.flags().trace().dot_graph_shape().unwrap(),
        Some("ellipse".to_string())
    );
}

#[test]
fn invalid_int_env_fails_construction() {
    let env = MapEnv::new().with("TORCHINDUCTOR_COORDINATE_DESCENT_RADIUS", "wide");
    let err = flags::build_with(&env, &HostInfo::new(4, false)).unwrap_err();
    assert!(matches!(err, RegistryError::EnvironmentParse { .. }));
}

#[test]
fn typed_view_matches_dotted_get() {
    let registry = build(&MapEnv::new());
    registry.set("triton.multi_kernel", 3i64).unwrap();
    assert_eq!(
        registry.get("triton.multi_kernel").unwrap(),
        SettingValue::Int(registry.flags().triton().multi_kernel().unwrap())
    );
    assert_eq!(
        registry.namespace("triton").unwrap().get("multi_kernel").unwrap(),
        SettingValue::Int(3)
    );
}

#[test]
fn hooks_are_ignored_for_hashing() {
    let registry = build(&MapEnv::new());
    let before = registry.hash().unwrap();

    registry
        .set("post_grad_custom_post_pass", Hook::new(|| ()))
        .unwrap();
    registry
        .set("trace.upload_tar", Hook::new(|_: &str| ()))
        .unwrap();

    assert_eq!(registry.hash().unwrap(), before);
    for path in SAVE_IGNORE {
        assert!(registry.snapshot().unwrap().get(path).is_none());
    }
}

#[test]
fn equal_environments_hash_equal() {
    let env = MapEnv::new()
        .with("TORCHINDUCTOR_MAX_AUTOTUNE", "1")
        .with("TORCHINDUCTOR_COMPILE_THREADS", "4");
    let a = build(&env);
    let b = build(&env);
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    assert_ne!(a.hash().unwrap(), build(&MapEnv::new()).hash().unwrap());
}

#[test]
fn worker_snapshot_reproduces_parent_hash() {
    let parent = build(&MapEnv::new());
    parent.set("cpp.threads", 4i64).unwrap();
    parent.set("cuda.arch", "90").unwrap();
    let bytes = parent.save_config().unwrap();

    let worker = build(&MapEnv::new());
    let report = worker.load_config(&bytes).unwrap();
    assert!(report.is_complete());
    assert_eq!(worker.hash().unwrap(), parent.hash().unwrap());
}

#[test]
fn patch_over_builtin_flags() {
    let registry = build(&MapEnv::new());
    let overrides = registry
        .overrides_from_json(&serde_json::json!({
            "max_autotune": true,
            "triton": {"cudagraphs": true, "max_block": {"X": 1024}},
        }))
        .unwrap();

    registry
        .patch(overrides, || {
            assert!(registry.flags().max_autotune().unwrap());
            assert!(registry.flags().triton().cudagraphs().unwrap());
            assert_eq!(registry.flags().triton().max_block().unwrap().len(), 1);
            assert_eq!(registry.flags().worker_start_method().unwrap(), "fork");
        })
        .unwrap();

    assert!(!registry.flags().max_autotune().unwrap());
    assert_eq!(registry.flags().triton().max_block().unwrap().len(), 4);
}
