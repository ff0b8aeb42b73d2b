//! Scoped override tests

use backend_flags::config::*;
use std::panic::{catch_unwind, AssertUnwindSafe};

fn registry() -> Registry {
    Registry::builder()
        .setting(SettingSpec::bool("debug", false))
        .setting(SettingSpec::string("worker_start_method", "fork"))
        .namespace("triton", |ns| {
            ns.setting(SettingSpec::bool("cudagraphs", false))
                .setting(SettingSpec::int("spill_threshold", 16))
        })
        .namespace("cpp", |ns| ns.setting(SettingSpec::int("threads", -1)))
        .build_with(&MapEnv::new(), &HostInfo::new(4, false))
        .unwrap()
}

#[test]
fn patch_applies_during_work_and_restores_after() {
    let reg = registry();
    let seen = reg
        .patch(Overrides::new().set("triton.cudagraphs", true), || {
            reg.get_bool("triton.cudagraphs").unwrap()
        })
        .unwrap();
    assert!(seen);
    assert!(!reg.get_bool("triton.cudagraphs").unwrap());
}

#[test]
fn patch_restores_when_work_fails() {
    let reg = registry();
    let result: Result<(), RegistryError> =
        reg.try_patch(Overrides::new().set("cpp.threads", 8i64), || {
            assert_eq!(reg.get_int("cpp.threads")?, 8);
            Err(RegistryError::Serialization("work failed".into()))
        });
    assert!(result.is_err());
    assert_eq!(reg.get_int("cpp.threads").unwrap(), -1);
}

#[test]
fn patch_restores_when_work_panics() {
    let reg = registry();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        reg.patch(Overrides::new().set("debug", true), || {
            panic!("work panicked");
        })
    }));
    assert!(outcome.is_err());
    assert!(!reg.get_bool("debug").unwrap());
}

#[test]
fn nested_patch_restores_to_outer_value() {
    let reg = registry();
    reg.patch(Overrides::new().set("triton.spill_threshold", 32i64), || {
        reg.patch(Overrides::new().set("triton.spill_threshold", 64i64), || {
            assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 64);
        })
        .unwrap();
        assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 32);
    })
    .unwrap();
    assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 16);
}

#[test]
fn nested_guards_unwind_in_order() {
    let reg = registry();
    let outer = reg.patch_scope(Overrides::new().set("debug", true)).unwrap();
    let inner = reg
        .patch_scope(Overrides::new().set("debug", false).set("cpp.threads", 2i64))
        .unwrap();
    assert!(!reg.get_bool("debug").unwrap());

    drop(inner);
    assert!(reg.get_bool("debug").unwrap());
    assert_eq!(reg.get_int("cpp.threads").unwrap(), -1);

    drop(outer);
    assert!(!reg.get_bool("debug").unwrap());
}

#[test]
fn outer_guard_dropped_first_hands_value_to_inner() {
    let reg = registry();
    let outer = reg
        .patch_scope(Overrides::new().set("cpp.threads", 1i64).set("debug", true))
        .unwrap();
    let inner = reg.patch_scope(Overrides::new().set("cpp.threads", 2i64)).unwrap();

    drop(outer);
    // Only the outer patch touched debug
    assert!(!reg.get_bool("debug").unwrap());
    assert_eq!(reg.get_int("cpp.threads").unwrap(), 2);

    drop(inner);
    assert_eq!(reg.get_int("cpp.threads").unwrap(), -1);
    assert!(reg.non_default().is_empty());
}

#[test]
fn middle_guard_dropped_first_skips_to_next_shadowing_patch() {
    let reg = registry();
    let first = reg.patch_scope(Overrides::new().set("triton.spill_threshold", 1i64)).unwrap();
    let second = reg
        .patch_scope(
            Overrides::new()
                .set("triton.spill_threshold", 2i64)
                .set("triton.spill_threshold", 3i64),
        )
        .unwrap();
    let third = reg.patch_scope(Overrides::new().set("debug", true)).unwrap();
    let fourth = reg.patch_scope(Overrides::new().set("triton.spill_threshold", 4i64)).unwrap();

    drop(second);
    drop(first);
    assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 4);
    drop(fourth);
    assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 16);
    assert!(reg.get_bool("debug").unwrap());
    drop(third);
    assert!(reg.non_default().is_empty());
}

#[test]
fn unrelated_patch_keeps_static_default() {
    let reg = registry();
    reg.patch(Overrides::new().set("triton.cudagraphs", true), || {
        assert_eq!(reg.get_str("worker_start_method").unwrap(), "fork");
    })
    .unwrap();
    assert_eq!(reg.get_str("worker_start_method").unwrap(), "fork");
}

#[test]
fn failed_validation_changes_nothing() {
    let reg = registry();
    let before = reg.snapshot().unwrap();

    let result = reg.patch(
        Overrides::new()
            .set("debug", true)
            .set("cpp.threads", 4i64)
            .set("triton.cudagraphs", "on"),
        || unreachable!("work must not run"),
    );
    assert!(matches!(result, Err(RegistryError::TypeMismatch { .. })));
    assert_eq!(reg.snapshot().unwrap(), before);
}

#[test]
fn namespace_overrides_target_nested_paths() {
    let reg = registry();
    let overrides = Overrides::new()
        .namespace("triton", |t| t.set("cudagraphs", true).set("spill_threshold", 0i64))
        .namespace("cpp", |c| c.set("threads", 1i64));
    reg.patch(overrides, || {
        assert!(reg.get_bool("triton.cudagraphs").unwrap());
        assert_eq!(reg.get_int("triton.spill_threshold").unwrap(), 0);
        assert_eq!(reg.get_int("cpp.threads").unwrap(), 1);
    })
    .unwrap();
    assert!(reg.non_default().is_empty());
}

#[test]
fn set_inside_patch_is_reverted_with_it() {
    let reg = registry();
    reg.set("cpp.threads", 3i64).unwrap();
    reg.patch(Overrides::new().set("cpp.threads", 8i64), || {
        reg.set("cpp.threads", 5i64).unwrap();
    })
    .unwrap();
    // Guard restores the value captured when the patch was applied
    assert_eq!(reg.get_int("cpp.threads").unwrap(), 3);
}

#[test]
fn patch_changes_hash_only_while_active() {
    let reg = registry();
    let base = reg.hash().unwrap();
    let patched = reg
        .patch(Overrides::new().set("debug", true), || reg.hash().unwrap())
        .unwrap();
    assert_ne!(patched, base);
    assert_eq!(reg.hash().unwrap(), base);
}
