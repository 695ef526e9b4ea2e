//! Human-readable error descriptions and structured JSON error formatting.

use parkbay_core::error::{BayError, BuildError, UnitError};

/// Config file could not be read, parsed or validated.
pub const EXIT_CONFIG: i32 = 2;
/// Config parsed but the bay could not be built from it.
pub const EXIT_BAY: i32 = 3;
/// Replay script could not be read.
pub const EXIT_SCRIPT: i32 = 4;

fn unit_hint(e: &UnitError) -> String {
    match e {
        UnitError::Unknown(u) => format!(
            "'{u}' is not a known unit. Use one of mm, cm, in, ft for lengths or ms, s for times."
        ),
        UnitError::Parse(s) => {
            format!("'{s}' is not a quantity. Write a number followed by a unit, e.g. \"30 cm\".")
        }
        UnitError::OutOfRange(q) => {
            format!("{q} is too large to use. Pick a realistic value, e.g. \"120 s\".")
        }
        UnitError::Incompatible { .. } => {
            format!("{e}. Lengths need mm/cm/in/ft and timeouts need ms/s.")
        }
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRange => {
                "What happened: The bay has no range sensor.\nLikely causes: [bay.range] is missing or was not passed to the builder.\nHow to fix: Add a [bay.range] table naming a sensor from [sensors].".to_string()
            }
            BuildError::UndefinedSensor { role, sensor } => format!(
                "What happened: The bay's {role} sensor '{sensor}' is not defined.\nLikely causes: A typo in the sensor id, or the [sensors.{sensor}] table is missing.\nHow to fix: Define [sensors.{sensor}] or point the bay at an existing sensor."
            ),
            BuildError::DuplicateSensor(sensor) => format!(
                "What happened: Sensor '{sensor}' is used for more than one role in the bay.\nLikely causes: The range sensor is also listed as a lateral sensor, or two zones share a sensor.\nHow to fix: Give every role its own physical sensor."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then run `parkbay check`."
            ),
            BuildError::Unit { field, source } => format!(
                "What happened: {field} has an unusable value.\nLikely causes: {}\nHow to fix: Fix {field} in the config, then run `parkbay check`.",
                unit_hint(source)
            ),
        };
    }

    if let Some(ue) = err.downcast_ref::<UnitError>() {
        return format!(
            "What happened: {ue}.\nLikely causes: {}\nHow to fix: Correct the value and retry.",
            unit_hint(ue)
        );
    }

    if let Some(be) = err.downcast_ref::<BayError>() {
        return match be {
            BayError::Configuration(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: A trigger or bay setting the core cannot use.\nHow to fix: Edit the config file, then run `parkbay check`."
            ),
            BayError::SourceTimeout => "What happened: The sensor source timed out.\nLikely causes: A sensor is unplugged, unpowered or too slow for system.cycle_ms.\nHow to fix: Check wiring and power, or raise system.cycle_ms.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading or the replay script
    let msg = err.to_string();
    let root = err.root_cause().to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("load config") {
        return format!(
            "What happened: The config could not be loaded ({root}).\nLikely causes: Wrong --config path, TOML syntax error, or a value failing validation.\nHow to fix: Fix the file (see etc/parkbay.toml for a sample), then run `parkbay check`."
        );
    }

    if lower.starts_with("replay script") {
        return format!(
            "What happened: The replay script could not be used ({root}).\nLikely causes: Wrong --readings path, missing 'cycle,kind,key,value' header, or a malformed row.\nHow to fix: Fix the CSV and retry."
        );
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

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<UnitError>().is_some() {
        return EXIT_BAY;
    }
    if let Some(BayError::Configuration(_)) = err.downcast_ref::<BayError>() {
        return EXIT_BAY;
    }
    let msg = err.to_string();
    if msg.starts_with("load config") {
        return EXIT_CONFIG;
    }
    if msg.starts_with("replay script") {
        return EXIT_SCRIPT;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRange => "MissingRange",
            BuildError::UndefinedSensor { .. } => "UndefinedSensor",
            BuildError::DuplicateSensor(_) => "DuplicateSensor",
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::Unit { .. } => "Unit",
        };
    }
    if err.downcast_ref::<UnitError>().is_some() {
        return "Unit";
    }
    if let Some(be) = err.downcast_ref::<BayError>() {
        return match be {
            BayError::Configuration(_) => "InvalidConfig",
            BayError::SourceTimeout => "SourceTimeout",
            _ => "Bay",
        };
    }
    match exit_code_for_error(err) {
        EXIT_CONFIG => "Config",
        EXIT_SCRIPT => "Script",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(BuildError::Unit { field, .. }) = err.downcast_ref::<BuildError>() {
        obj["details"] = json!({ "field": field });
    }
    obj.to_string()
}
