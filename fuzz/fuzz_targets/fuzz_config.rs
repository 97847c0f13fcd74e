#![no_main]
#[macro_use]
extern crate libfuzzer_sys;

use chromake::Configuration;

fuzz_target!(|data: &[u8]| {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => return,
    };
    if let Ok(mut cfg) = Configuration::from_yaml_str(text) {
        cfg.validate_and_clean();
        let clean = cfg.clone();
        cfg.validate_and_clean();
        assert_eq!(cfg, clean);

        let yaml = cfg.to_yaml_string().unwrap();
        assert_eq!(Configuration::from_yaml_str(&yaml).unwrap(), cfg);
    }
});
