use std::sync::Arc;

use parkbay_core::conversions::trigger;
use parkbay_core::error::{BuildError, UnitError};
use parkbay_core::{
    Action, BayConfig, BayMonitor, ChangeMode, Command, Side, TriggerKind, Unit, UnitSystem, build_monitor,
};
use parkbay_traits::{RawSample, SteppedClock};
use rstest::rstest;

const CONFIG: &str = r#"
[system]
unit_system = "imperial"
topic_prefix = "garage"
buffer_capacity = 4

[sensors.range]
kind = "tfmini"
[sensors.left]
kind = "vl53l1x"

[bay]
id = "bay1"
name = "Left Bay"

[bay.range]
sensor = "range"
offset = "2 in"
max_detect_range = "400 cm"
stop_distance = "30 cm"

[[bay.lateral]]
sensor = "left"
side = "L"
ideal = "40 cm"
ok_spread = "2 cm"
warn_spread = "5 cm"
critical_spread = "10 cm"
intercept = "300 cm"

[bay.timeouts]
dock = "90 s"
undock = "2 min"

[[triggers]]
type = "syscmd"
id = "sys"

[[triggers]]
type = "baycmd"
id = "bay_cmd"

[[triggers]]
type = "mqtt_sensor"
id = "door"
topic = "door/state"
topic_mode = "suffix"
from = "Closed"
action = "occupancy"

[[triggers]]
type = "range"
id = "motion"
action = "verify"
"#;

fn config(text: &str) -> parkbay_config::Config {
    parkbay_config::load_toml(text).unwrap()
}

#[rstest]
fn bay_config_converts_units() {
    let cfg = config(&CONFIG.replace("\"2 min\"", "\"120 s\""));
    let bay = BayConfig::try_from(&cfg).unwrap();
    assert_eq!(bay.name, "Left Bay");
    assert_eq!(bay.unit_system, UnitSystem::Imperial);
    assert_eq!(bay.buffer_capacity, 4);
    assert_eq!(bay.range.offset.unit(), Unit::Inch);
    assert!((bay.range.offset.base_magnitude() - 5.08).abs() < 1e-9);
    assert_eq!(bay.zones[0].side, Side::Left);
    assert_eq!(bay.timeouts.undock.magnitude_in(Unit::Second).unwrap(), 120.0);
    assert!(bay.known_sensors.unwrap().contains("left"));
}

#[rstest]
fn bad_unit_names_the_field() {
    let cfg = config(&CONFIG.replace("\"2 min\"", "\"120 s\"").replace("\"5 cm\"", "\"5 parsecs\""));
    let err = BayConfig::try_from(&cfg).unwrap_err();
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::Unit { field, .. }) => assert_eq!(field, "bay.lateral[0].warn_spread"),
        other => panic!("expected unit error, got {other:?}"),
    }
}

#[rstest]
fn unknown_time_unit_is_rejected() {
    // "min" isn't a supported unit.
    let err = BayConfig::try_from(&config(CONFIG)).unwrap_err();
    assert!(err.to_string().contains("bay.timeouts.undock"), "{err}");
}

#[rstest]
fn oversized_timeout_is_a_unit_error() {
    let cfg = config(&CONFIG.replace("\"2 min\"", "\"100000000000000000000 s\""));
    cfg.validate().unwrap();
    let bay = BayConfig::try_from(&cfg).unwrap();
    let err = BayMonitor::new(&bay).unwrap_err();
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::Unit { field, source }) => {
            assert_eq!(field, "timeouts.undock");
            assert!(matches!(source, UnitError::OutOfRange(_)), "{source:?}");
        }
        other => panic!("expected unit error, got {other:?}"),
    }
    assert!(build_monitor(&cfg, Arc::new(SteppedClock::new())).is_err());
}

#[rstest]
fn triggers_resolve_topics() {
    let cfg = config(&CONFIG.replace("\"2 min\"", "\"120 s\""));
    let kinds: Vec<TriggerKind> = cfg
        .triggers
        .iter()
        .map(|t| trigger(t, &cfg.system.topic_prefix, &cfg.bay.id).unwrap().kind().clone())
        .collect();
    assert_eq!(
        kinds,
        vec![
            TriggerKind::SystemCommand {
                topic: "garage/cmd".into()
            },
            TriggerKind::BayCommand {
                topic: "garage/bay1/cmd".into()
            },
            TriggerKind::MqttSensor {
                topic: "garage/door/state".into(),
                mode: ChangeMode::From("closed".into()),
                action: Action::Occupancy,
            },
            TriggerKind::Range {
                action: Action::Command(Command::Verify)
            },
        ]
    );
}

#[rstest]
fn unknown_action_is_a_configuration_error() {
    let cfg = config(&CONFIG.replace("\"2 min\"", "\"120 s\"").replace("\"verify\"", "\"explode\""));
    let err = trigger(&cfg.triggers[3], "garage", "bay1").unwrap_err();
    assert!(err.to_string().contains("explode"), "{err}");
}

#[rstest]
fn build_monitor_wires_everything() {
    let cfg = config(&CONFIG.replace("\"2 min\"", "\"120 s\""));
    let mut monitor = build_monitor(&cfg, Arc::new(SteppedClock::new())).unwrap();
    assert_eq!(monitor.dispatcher().triggers().len(), 4);
    assert_eq!(monitor.name(), "Left Bay");
    monitor.post("garage/cmd", "rescan");
    let r = monitor.cycle(&[RawSample::distance("range", 1000.0, "mm")]);
    assert_eq!(r.system_commands, vec![Command::Rescan]);
}
