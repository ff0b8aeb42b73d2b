#![no_main]

use backend_flags::config::{HostInfo, MapEnv};
use backend_flags::flags;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        let registry = match flags::build_with(&MapEnv::new(), &HostInfo::new(4, false)) {
            Ok(registry) => registry,
            Err(_) => return,
        };
        let before = registry.hash().ok();

        // A rejected file must leave every flag untouched
        if registry.load_yaml_str(yaml).is_err() {
            assert_eq!(registry.hash().ok(), before);
        }
    }
});
