use parkbay_core::error::{BuildError, UnitError};
use parkbay_core::{BayStateEngine, LateralZoneConfig, Quantity, RangeConfig, Side};
use rstest::rstest;

fn cm(v: f64) -> Quantity {
    Quantity::centimeters(v)
}

fn zone(sensor: &str) -> LateralZoneConfig {
    LateralZoneConfig {
        sensor: sensor.to_string(),
        side: Side::Left,
        ideal: cm(50.0),
        ok_spread: cm(1.0),
        warn_spread: cm(3.0),
        critical_spread: cm(5.0),
        intercept: cm(100.0),
    }
}

#[rstest]
fn builder_missing_range_yields_typed_build_error() {
    let err = BayStateEngine::builder()
        .zone(zone("lat"))
        .try_build()
        .expect_err("should fail with MissingRange");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingRange) => {}
        other => panic!("expected MissingRange, got: {other:?}"),
    }
}

#[rstest]
fn undefined_sensor_is_a_configuration_error() {
    let err = BayStateEngine::builder()
        .known_sensors(["range"])
        .range(RangeConfig::new("range", cm(100.0), cm(10.0)))
        .zone(zone("ghost"))
        .build()
        .expect_err("ghost is not defined");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::UndefinedSensor { role, sensor }) => {
            assert_eq!(role, "lateral[0]");
            assert_eq!(sensor, "ghost");
        }
        other => panic!("expected UndefinedSensor, got: {other:?}"),
    }
}

#[rstest]
fn sensor_cannot_serve_two_roles() {
    let err = BayStateEngine::builder()
        .range(RangeConfig::new("range", cm(100.0), cm(10.0)))
        .zone(zone("range"))
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::DuplicateSensor(s)) if s == "range"
    ));
}

#[rstest]
fn time_quantity_in_a_length_field_is_a_unit_error() {
    let mut z = zone("lat");
    z.warn_spread = Quantity::seconds(3.0);
    let err = BayStateEngine::builder()
        .range(RangeConfig::new("range", cm(100.0), cm(10.0)))
        .zone(z)
        .build()
        .unwrap_err();
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::Unit { field, source }) => {
            assert_eq!(field, "lateral[0].warn_spread");
            assert!(matches!(source, UnitError::Incompatible { .. }));
        }
        other => panic!("expected Unit error, got: {other:?}"),
    }
}

#[rstest]
#[case::zero_max(RangeConfig::new("range", cm(0.0), cm(10.0)), "max_detect_range")]
#[case::negative_margin(
    RangeConfig::new("range", cm(100.0), cm(10.0)).with_motion_margin(cm(-1.0)),
    "motion_margin"
)]
#[case::negative_park_spread(
    RangeConfig::new("range", cm(100.0), cm(10.0)).with_spread_park(cm(-1.0)),
    "spread_park"
)]
#[case::warn_over_100(
    RangeConfig::new("range", cm(100.0), cm(10.0)).with_percentages(101.0, 10.0),
    "percentages"
)]
#[case::crit_nan(
    RangeConfig::new("range", cm(100.0), cm(10.0)).with_percentages(30.0, f64::NAN),
    "percentages"
)]
fn invalid_range_values(#[case] range: RangeConfig, #[case] needle: &str) {
    let err = BayStateEngine::builder().range(range).build().unwrap_err();
    assert!(
        matches!(err.downcast_ref::<BuildError>(), Some(BuildError::InvalidConfig(_))),
        "{err:?}"
    );
    assert!(err.to_string().contains(needle), "{err}");
}

#[rstest]
fn negative_spread_is_rejected() {
    let mut z = zone("lat");
    z.ok_spread = cm(-1.0);
    let err = BayStateEngine::builder()
        .range(RangeConfig::new("range", cm(100.0), cm(10.0)))
        .zone(z)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("spreads must be >= 0"), "{err}");
}

#[rstest]
fn negative_offset_and_stop_are_allowed() {
    let range = RangeConfig::new("range", cm(100.0), cm(-5.0)).with_offset(cm(-2.0));
    assert!(BayStateEngine::builder().range(range).build().is_ok());
}
