#![no_main]
use libfuzzer_sys::fuzz_target;
use sorter_core::mocks::{MemoryStore, NoopServo};
use sorter_core::{SorterCfg, Signals, build_sorter};
use std::sync::Arc;

fuzz_target!(|data: &str| {
    // Anything that validates must convert and build without panicking.
    let Ok(cfg) = sorter_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let core_cfg = SorterCfg::from(&cfg);
    let sorter = build_sorter(
        NoopServo,
        MemoryStore::new(),
        core_cfg,
        Arc::new(Signals::new()),
        None,
    );
    assert!(sorter.is_ok(), "validated config rejected by core: {sorter:?}");
});
