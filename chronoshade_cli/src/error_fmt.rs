//! Human-readable error descriptions and structured JSON error formatting.

use chronoshade_core::{AxisKind, CoverError, ValidationError};

/// Stable reason name of a typed error, used in JSON output.
fn reason_name(e: &CoverError) -> &'static str {
    match e {
        CoverError::Configuration(_) => "Configuration",
        CoverError::Actuator(_) => "Actuator",
        CoverError::OutOfRange { .. } => "OutOfRange",
        CoverError::TiltUnsupported => "TiltUnsupported",
        CoverError::Persistence(_) => "Persistence",
        CoverError::Disconnected => "Disconnected",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CoverError>() {
        return match ce {
            CoverError::Configuration(ve) => {
                let hint = match ve {
                    ValidationError::EndpointMismatch { .. } => {
                        "An opening map must run from 0 to 100 and a closing map from 100 to 0."
                    }
                    ValidationError::NonMonotonic { .. } => {
                        "Positions must only move one way (up while opening, down while closing)."
                    }
                    _ => "Check the time map entries of this cover.",
                };
                format!(
                    "What happened: Invalid time map ({err:#}).\nLikely causes: {hint}\nHow to fix: Edit the cover's opening_time_map/closing_time_map, then run `chronoshade check-config`."
                )
            }
            CoverError::Actuator(msg) => format!(
                "What happened: The cover motor did not accept the command ({msg}).\nLikely causes: Relay wiring, GPIO permissions, or a failing driver.\nHow to fix: Check the [covers.<id>.pins] values and relay power; the stored position was left unchanged."
            ),
            CoverError::OutOfRange { axis, value } => {
                let flag = match axis {
                    AxisKind::Position => "position",
                    AxisKind::Tilt => "tilt",
                };
                format!(
                    "What happened: Requested {flag} {value} is outside 0-100.\nHow to fix: Use 0 (closed) to 100 (open)."
                )
            }
            CoverError::TiltUnsupported => {
                "What happened: This cover has no tilt configured.\nLikely causes: tilting_time_down/tilting_time_up are missing from its config table.\nHow to fix: Add a tilt travel time to the cover, or use the position commands.".to_string()
            }
            CoverError::Persistence(msg) => format!(
                "What happened: The estimate could not be saved ({msg}).\nLikely causes: The state file or its directory is not writable.\nHow to fix: Check [state].path and its permissions; the motor command itself was carried out."
            ),
            CoverError::Disconnected => {
                "What happened: The cover worker stopped unexpectedly.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail.".to_string()
            }
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({msg}).\nHow to fix: Pass an existing file with --config."
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for chronoshade ({msg}).\nLikely causes: A typo in a key, a misplaced table, or an unknown cover setting.\nHow to fix: Compare against the sample in etc/chronoshade.toml."
        );
    }

    if lower.contains(INVALID_CONFIG) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nHow to fix: Edit the TOML config and run `chronoshade check-config`."
        );
    }

    if lower.contains("unknown cover") {
        return format!("What happened: {msg}.\nHow to fix: Use one of the configured cover ids.");
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

/// Context attached to every config load/validation failure.
pub const INVALID_CONFIG: &str = "invalid configuration";

/// Stable exit codes for typed errors and config failures; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<CoverError>() {
        Some(CoverError::Actuator(_)) => 2,
        Some(CoverError::OutOfRange { .. }) => 3,
        Some(CoverError::TiltUnsupported) => 4,
        Some(CoverError::Configuration(_)) => 5,
        Some(CoverError::Persistence(_)) => 6,
        _ if err.chain().any(|c| c.to_string() == INVALID_CONFIG) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    match err.downcast_ref::<CoverError>() {
        Some(ce @ CoverError::OutOfRange { axis, value }) => json!({
            "reason": reason_name(ce),
            "details": { "axis": axis, "value": value },
            "message": msg,
        }),
        Some(ce) => json!({ "reason": reason_name(ce), "message": msg }),
        None => json!({ "reason": "Error", "message": msg }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_get_stable_codes() {
        let r = eyre::Report::new(CoverError::TiltUnsupported);
        assert_eq!(exit_code_for_error(&r), 4);
        assert!(humanize(&r).contains("no tilt configured"));

        let r = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&r), 1);

        let r = eyre::eyre!("no covers configured").wrap_err(INVALID_CONFIG);
        assert_eq!(exit_code_for_error(&r), 5);
    }

    #[test]
    fn out_of_range_json_carries_details() {
        let r = eyre::Report::new(CoverError::OutOfRange {
            axis: AxisKind::Tilt,
            value: 140,
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&r)).unwrap();
        assert_eq!(v["reason"], "OutOfRange");
        assert_eq!(v["details"]["axis"], "tilt");
        assert_eq!(v["details"]["value"], 140);
    }
}
