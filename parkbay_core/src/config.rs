//! Runtime configuration types for the bay engine and monitor.
//!
//! These are separate from the TOML-deserialized config in `parkbay_config`;
//! every length here is already a typed `Quantity`.

use std::collections::BTreeSet;

use crate::units::{Quantity, UnitSystem};

/// Which side of the bay a lateral sensor is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longitudinal range sensor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeConfig {
    pub sensor: String,
    /// Distance from the sensor face to the bay's reference point.
    pub offset: Quantity,
    /// Readings past this are reported as beyond range.
    pub max_detect_range: Quantity,
    /// Where the vehicle should stop, measured from the offset point.
    pub stop_distance: Quantity,
    /// Net travel within the buffer window below which the vehicle counts as still.
    pub motion_margin: Quantity,
    /// Tolerance either side of the stop point that still counts as parked.
    pub spread_park: Quantity,
    /// Percent of the approach span below which the quality is `base`.
    pub pct_warn: f64,
    /// Percent of the approach span below which the quality is `final`.
    pub pct_crit: f64,
}

impl RangeConfig {
    /// Zero offset, a 2 cm motion margin, a 2 in park spread, warn at 30% and critical at 10%.
    pub fn new(sensor: impl Into<String>, max_detect_range: Quantity, stop_distance: Quantity) -> Self {
        Self {
            sensor: sensor.into(),
            offset: Quantity::centimeters(0.0),
            max_detect_range,
            stop_distance,
            motion_margin: Quantity::centimeters(2.0),
            spread_park: Quantity::inches(2.0),
            pct_warn: 30.0,
            pct_crit: 10.0,
        }
    }

    pub fn with_spread_park(mut self, spread: Quantity) -> Self {
        self.spread_park = spread;
        self
    }

    pub fn with_percentages(mut self, pct_warn: f64, pct_crit: f64) -> Self {
        self.pct_warn = pct_warn;
        self.pct_crit = pct_crit;
        self
    }

    pub fn with_offset(mut self, offset: Quantity) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_motion_margin(mut self, margin: Quantity) -> Self {
        self.motion_margin = margin;
        self
    }
}

/// A lateral alignment checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LateralZoneConfig {
    pub sensor: String,
    pub side: Side,
    /// Expected reading when the vehicle is centered.
    pub ideal: Quantity,
    pub ok_spread: Quantity,
    pub warn_spread: Quantity,
    pub critical_spread: Quantity,
    /// The zone is evaluated once the range reading drops to this distance.
    pub intercept: Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeouts {
    pub dock: Quantity,
    pub undock: Quantity,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            dock: Quantity::seconds(120.0),
            undock: Quantity::seconds(120.0),
        }
    }
}

/// Everything needed to build one bay.
#[derive(Debug, Clone, PartialEq)]
pub struct BayConfig {
    pub id: String,
    pub name: String,
    pub unit_system: UnitSystem,
    pub range: RangeConfig,
    pub zones: Vec<LateralZoneConfig>,
    pub timeouts: Timeouts,
    pub buffer_capacity: usize,
    /// Sensors defined system-wide. When set, the bay may only reference these.
    pub known_sensors: Option<BTreeSet<String>>,
}
