use charge_config::load_toml;
use rstest::rstest;

const BASE: &str = r#"
[loadpoint]
min_current = 6
max_current = 16
phases = 3
voltage = 230.0

[scheduler]
utilization = 0.6
deviation_min = 30

[vehicle]
capacity_kwh = 60.0
soc = 20.0
efficiency = 0.9

[runner]
tick_s = 60
"#;

#[test]
fn accepts_complete_config() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
}

#[rstest]
#[case("min_current = 6", "min_current = 20", "must be <= loadpoint.max_current")]
#[case("max_current = 16", "max_current = 0", "max_current must be > 0")]
#[case("phases = 3", "phases = 4", "phases must be in 1..=3")]
#[case("voltage = 230.0", "voltage = 0.0", "voltage must be > 0")]
#[case("utilization = 0.6", "utilization = 0.0", "utilization must be in (0.0, 1.0]")]
#[case("utilization = 0.6", "utilization = 1.5", "utilization must be in (0.0, 1.0]")]
#[case("deviation_min = 30", "deviation_min = 2000", "deviation_min is unreasonably large")]
#[case("capacity_kwh = 60.0", "capacity_kwh = -1.0", "capacity_kwh must be > 0")]
#[case("soc = 20.0", "soc = 120.0", "vehicle.soc must be in [0, 100]")]
#[case("efficiency = 0.9", "efficiency = 0.0", "efficiency must be in (0.0, 1.0]")]
#[case("tick_s = 60", "tick_s = 0", "tick_s must be >= 1")]
fn rejects_out_of_range_values(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let toml = BASE.replacen(from, to, 1);
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn rejects_unknown_rotation() {
    let toml = format!("{BASE}\n[logging]\nrotation = \"weekly\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject rotation");
    assert!(format!("{err}").contains("logging.rotation"));
}

#[test]
fn target_requires_a_deadline() {
    let toml = format!("{BASE}\n[target]\nsoc = 80\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("target without time");
    assert!(format!("{err}").contains("target.time or target.in_minutes"));
}

#[test]
fn target_soc_above_100_is_rejected() {
    let toml = format!("{BASE}\n[target]\nsoc = 101\nin_minutes = 120\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn missing_loadpoint_fails_to_parse() {
    assert!(load_toml("[runner]\ntick_s = 60\n").is_err());
}
