#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse, validate and convert arbitrary TOML; every stage may reject, none may panic.
    let Ok(cfg) = parkbay_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    if let Ok(bay) = parkbay_core::BayConfig::try_from(&cfg) {
        let _ = parkbay_core::BayMonitor::new(&bay);
    }
    for t in &cfg.triggers {
        let _ = parkbay_core::conversions::trigger(t, &cfg.system.topic_prefix, &cfg.bay.id);
    }
});
