#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse, validate and build every cover; errors are fine, panics are not.
    let Ok(cfg) = chronoshade_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    for raw_id in cfg.covers.keys() {
        if let Some((id, cover)) = cfg.cover(raw_id) {
            let _ = chronoshade_core::conversions::cover_setup(&id, cover, &cfg.controller);
        }
    }
});
