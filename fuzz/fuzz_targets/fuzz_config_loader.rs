#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or produce a Config whose
    // validation and derived accessors never panic.
    if let Ok(cfg) = rig_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = cfg.effective_cal_factor();
            let _ = cfg.export_dir();
        }
    }
});
