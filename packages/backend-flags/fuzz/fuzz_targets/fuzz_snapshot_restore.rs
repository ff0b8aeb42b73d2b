#![no_main]

use backend_flags::config::{HostInfo, MapEnv};
use backend_flags::flags;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let registry = match flags::build_with(&MapEnv::new(), &HostInfo::new(4, false)) {
        Ok(registry) => registry,
        Err(_) => return,
    };

    // Arbitrary bytes as a worker's saved config; must never panic
    if registry.load_config(data).is_ok() {
        let saved = registry.save_config().ok();
        assert!(saved.is_some());
    }
});
