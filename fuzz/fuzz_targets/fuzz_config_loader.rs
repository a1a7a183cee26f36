#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate must reject bad input with an error, never a panic.
    if let Ok(cfg) = charge_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A validated config must also convert and build.
            let lp: charge_core::LoadpointCfg = (&cfg.loadpoint).into();
            let tuning: charge_core::SchedulerCfg = (&cfg.scheduler).into();
            assert!(lp.min_current <= lp.max_current);
            assert!(tuning.utilization > 0.0 && tuning.utilization <= 1.0);
        }
    }
});
