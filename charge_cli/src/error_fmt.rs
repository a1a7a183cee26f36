//! Human-readable error descriptions and structured JSON error formatting.

use charge_core::error::{BuildError, ChargeError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMeter => {
                "What happened: No current meter was provided to the scheduler.\nLikely causes: The charger handle was not wired into the builder.\nHow to fix: Pass the charger via with_meter(...).".to_string()
            }
            BuildError::MissingRamper => {
                "What happened: No ramper was provided to the scheduler.\nLikely causes: The charger handle was not wired into the builder.\nHow to fix: Pass the charger via with_ramper(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in [loadpoint] or [scheduler].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ChargeError>() {
        return match ce {
            ChargeError::Unsupported => {
                "What happened: Target charging is not supported.\nLikely causes: No SoC estimator is available for the vehicle.\nHow to fix: Configure a vehicle that reports its state of charge.".to_string()
            }
            ChargeError::Actuation { amps, source } => format!(
                "What happened: The charger rejected a request for {amps} A ({source}).\nLikely causes: Charger fault or lost connection.\nHow to fix: Check the charger, then rerun."
            ),
            ChargeError::InvalidRequest(msg) => format!(
                "What happened: The charge request was rejected ({msg}).\nLikely causes: A deadline in the past or a target SoC above 100.\nHow to fix: Pass a future --at/--in-minutes and a --soc in 0..=100."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        let cause = err.source().map(|s| format!(" ({s})")).unwrap_or_default();
        return format!(
            "What happened: Could not read the config file{cause}.\nHow to fix: Pass an existing file with --config."
        );
    }

    if lower.contains("parse config") || lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid: {cause}\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("no target") || lower.contains("no deadline") {
        return format!("What happened: {msg}.\nHow to fix: Pass the target on the command line or add a [target] section.");
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<ChargeError>() {
        return match ce {
            ChargeError::Unsupported => 3,
            ChargeError::Actuation { .. } => 4,
            ChargeError::InvalidRequest(_) => 5,
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 6;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<ChargeError>() {
        Some(ChargeError::Unsupported) => "Unsupported",
        Some(ChargeError::Actuation { .. }) => "Actuation",
        Some(ChargeError::InvalidRequest(_)) => "InvalidRequest",
        None if err.downcast_ref::<BuildError>().is_some() => "InvalidConfig",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let mut obj = serde_json::json!({
        "reason": reason_name(err),
        "message": humanize(err),
    });
    if let Some(ChargeError::Actuation { amps, .. }) = err.downcast_ref::<ChargeError>() {
        obj["details"] = serde_json::json!({ "amps": amps });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuation_maps_to_its_own_code() {
        let err = eyre::Report::new(ChargeError::Actuation {
            amps: 12,
            source: "down".into(),
        });
        assert_eq!(exit_code_for_error(&err), 4);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Actuation");
        assert_eq!(v["details"]["amps"], 12);
        assert!(humanize(&err).contains("12 A"));
    }

    #[test]
    fn wrapped_errors_are_still_classified() {
        use eyre::WrapErr;
        let err = Err::<(), _>(ChargeError::Unsupported)
            .wrap_err("plan")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn unknown_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
        assert!(format_error_json(&err).contains("\"Error\""));
    }
}
