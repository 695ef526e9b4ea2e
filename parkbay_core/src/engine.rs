//! Bay state engine: turns debounced readings into a classified snapshot.
//!
//! The engine owns no buffers. It receives the per-sensor estimates for a
//! cycle, adjusts the range reading against the bay geometry, evaluates each
//! lateral zone the vehicle has reached and scores occupancy.

use std::collections::HashMap;

use crate::builder::{BayEngineBuilder, Missing};
use crate::buffer::{InvalidReason, ReadingValue, SensorReading};
use crate::config::{LateralZoneConfig, RangeConfig, Side};
use crate::status::{Availability, Lifecycle, Motion, Occupancy, RangeQuality};
use crate::units::{Quantity, UnitSystem};

/// Raw range at or past this fraction of the max detect range counts as empty.
const EMPTY_BAY_FRACTION: f64 = 0.9;

/// Raw range below this many inches is an emergency regardless of geometry.
const EMERGENCY_INCHES: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeResult {
    /// No usable range reading this cycle.
    NotPresent,
    BeyondRange,
    Measured {
        /// Distance left to the stop point; negative means overshoot.
        adjusted: Quantity,
        /// `adjusted` as a fraction of the max detect range.
        fraction: f64,
    },
}

impl RangeResult {
    pub fn adjusted(&self) -> Option<Quantity> {
        match self {
            Self::Measured { adjusted, .. } => Some(*adjusted),
            _ => None,
        }
    }

    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Measured { fraction, .. } => Some(*fraction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LateralZoneResult {
    NotPresent,
    BeyondRange,
    Evaluated {
        /// Absolute distance from the ideal lateral position.
        magnitude: Quantity,
        /// Which way the vehicle sits relative to the bay centerline.
        direction: Option<Side>,
        severity: Severity,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneReport {
    pub sensor: String,
    pub side: Side,
    pub result: LateralZoneResult,
}

/// Snapshot of one bay for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BayStateSnapshot {
    pub range: RangeResult,
    pub quality: RangeQuality,
    /// In ascending intercept order.
    pub zones: Vec<ZoneReport>,
    pub expected_zones: usize,
    pub occupancy: Occupancy,
    pub motion: Motion,
}

impl BayStateSnapshot {
    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BayStateEngine {
    pub(crate) id: String,
    pub(crate) unit_system: UnitSystem,
    pub(crate) range: RangeConfig,
    pub(crate) zones: Vec<LateralZoneConfig>,
    /// Adjusted range at or below which the quality is `base`.
    pub(crate) dist_warn: Quantity,
    /// Adjusted range at or below which the quality is `final`.
    pub(crate) dist_crit: Quantity,
    pub(crate) lifecycle: Lifecycle,
}

impl BayStateEngine {
    pub fn builder() -> BayEngineBuilder<Missing> {
        BayEngineBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lifecycle_state(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn range_config(&self) -> &RangeConfig {
        &self.range
    }

    pub fn zones(&self) -> &[LateralZoneConfig] {
        &self.zones
    }

    pub fn unit_system(&self) -> UnitSystem {
        self.unit_system
    }

    /// Every sensor this bay depends on, range sensor first.
    pub fn sensor_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.range.sensor.as_str()).chain(self.zones.iter().map(|z| z.sensor.as_str()))
    }

    /// `Unavailable` when any depended-on sensor is missing from `status` or unavailable.
    pub fn recheck_availability(&mut self, status: &HashMap<String, Availability>) -> Lifecycle {
        let missing: Vec<&str> = self
            .sensor_ids()
            .filter(|id| status.get(*id) != Some(&Availability::Available))
            .collect();
        let next = if missing.is_empty() {
            Lifecycle::Ready
        } else {
            Lifecycle::Unavailable
        };
        if next != self.lifecycle {
            tracing::info!(
                bay = %self.id,
                from = %self.lifecycle,
                to = %next,
                missing = ?missing,
                "bay lifecycle changed"
            );
            self.lifecycle = next;
        }
        next
    }

    /// Build a snapshot from this cycle's estimates. `None` while the bay is unavailable.
    pub fn update(&self, readings: &HashMap<String, SensorReading>) -> Option<BayStateSnapshot> {
        if self.lifecycle == Lifecycle::Unavailable {
            return None;
        }

        let reading = readings.get(&self.range.sensor);
        let raw_range = self.raw_range(reading);
        // The sensor itself saw nothing within its limit: the bay is clear, not unknown.
        let out_of_range =
            reading.is_some_and(|r| r.value == ReadingValue::Invalid(InvalidReason::OutOfRange));
        let range = if out_of_range {
            RangeResult::BeyondRange
        } else {
            self.adjust_range(raw_range)
        };
        let quality = self.quality(reading, raw_range, &range);

        let zones = self
            .zones
            .iter()
            .map(|zone| ZoneReport {
                sensor: zone.sensor.clone(),
                side: zone.side,
                result: self.evaluate_zone(zone, raw_range, readings.get(&zone.sensor)),
            })
            .collect::<Vec<_>>();

        let occupancy = self.occupancy(raw_range, &range, &zones);
        tracing::debug!(
            bay = %self.id,
            range = ?range,
            quality = %quality,
            occupancy = %occupancy,
            "bay updated"
        );

        Some(BayStateSnapshot {
            range,
            quality,
            zones,
            expected_zones: self.zones.len(),
            occupancy,
            motion: Motion::Unknown,
        })
    }

    // A range reading in the wrong dimension is treated as absent.
    fn raw_range(&self, reading: Option<&SensorReading>) -> Option<Quantity> {
        let q = reading?.quantity()?;
        if q.dimension() != self.range.max_detect_range.dimension() {
            tracing::warn!(bay = %self.id, sensor = %self.range.sensor, unit = %q.unit(), "range reading is not a distance");
            return None;
        }
        Some(q)
    }

    fn adjust_range(&self, raw: Option<Quantity>) -> RangeResult {
        let Some(raw) = raw else {
            return RangeResult::NotPresent;
        };
        let max = &self.range.max_detect_range;
        if raw.try_gt(max).unwrap_or(false) {
            return RangeResult::BeyondRange;
        }
        let adjusted = raw
            .checked_sub(&self.range.offset)
            .and_then(|q| q.checked_sub(&self.range.stop_distance));
        match adjusted {
            Ok(adjusted) => {
                let fraction = adjusted.ratio(max).unwrap_or(0.0);
                RangeResult::Measured {
                    adjusted: self.unit_system.present(adjusted),
                    fraction,
                }
            }
            Err(e) => {
                tracing::warn!(bay = %self.id, error = %e, "range adjustment failed");
                RangeResult::NotPresent
            }
        }
    }

    fn evaluate_zone(
        &self,
        zone: &LateralZoneConfig,
        raw_range: Option<Quantity>,
        reading: Option<&SensorReading>,
    ) -> LateralZoneResult {
        let Some(SensorReading {
            value: ReadingValue::Valid(lateral),
            ..
        }) = reading
        else {
            return LateralZoneResult::NotPresent;
        };
        // The vehicle hasn't reached the zone, or we can't tell where it is.
        let reached = raw_range.is_some_and(|r| r.try_le(&zone.intercept).unwrap_or(false));
        if !reached {
            return LateralZoneResult::BeyondRange;
        }
        let Ok(deviation) = lateral.checked_sub(&zone.ideal) else {
            tracing::warn!(bay = %self.id, sensor = %zone.sensor, unit = %lateral.unit(), "lateral reading is not a distance");
            return LateralZoneResult::NotPresent;
        };
        let magnitude = deviation.abs();
        LateralZoneResult::Evaluated {
            magnitude: self.unit_system.present(magnitude),
            direction: direction(zone.side, &deviation),
            severity: severity(zone, &magnitude),
        }
    }

    fn occupancy(&self, raw: Option<Quantity>, range: &RangeResult, zones: &[ZoneReport]) -> Occupancy {
        let raw = match (range, raw) {
            (RangeResult::BeyondRange, _) => return Occupancy::Unoccupied,
            (RangeResult::NotPresent, _) | (_, None) => return Occupancy::Unknown,
            (RangeResult::Measured { .. }, Some(raw)) => raw,
        };
        let empty_at = self.range.max_detect_range.scale(EMPTY_BAY_FRACTION);
        if raw.try_ge(&empty_at).unwrap_or(false) {
            return Occupancy::Unoccupied;
        }
        let score = 1 + zones
            .iter()
            .filter(|z| matches!(z.result, LateralZoneResult::Evaluated { .. }))
            .count();
        if score > self.zones.len() * 2 / 3 {
            Occupancy::Occupied
        } else {
            Occupancy::Unoccupied
        }
    }

    /// Emergency and empty-bay checks use the raw reading; the rest use the
    /// distance left to the stop point.
    fn quality(&self, reading: Option<&SensorReading>, raw: Option<Quantity>, range: &RangeResult) -> RangeQuality {
        match reading.map(|r| &r.value) {
            None => return RangeQuality::Unknown,
            Some(ReadingValue::Invalid(InvalidReason::OutOfRange)) => return RangeQuality::BeyondRange,
            Some(ReadingValue::Invalid(_)) => return RangeQuality::NoReading,
            Some(ReadingValue::Valid(_)) => {}
        }
        let Some(raw) = raw else {
            return RangeQuality::Unknown;
        };
        if raw.try_lt(&Quantity::inches(EMERGENCY_INCHES)).unwrap_or(false) {
            return RangeQuality::Emergency;
        }
        let empty_at = self.range.max_detect_range.scale(EMPTY_BAY_FRACTION);
        if raw.try_ge(&empty_at).unwrap_or(false) {
            return RangeQuality::NoObject;
        }
        let Some(adjusted) = range.adjusted() else {
            return RangeQuality::Unknown;
        };
        let spread = &self.range.spread_park;
        let off = adjusted.abs();
        if adjusted.is_negative() && off.try_gt(spread).unwrap_or(false) {
            RangeQuality::BackUp
        } else if off.try_lt(spread).unwrap_or(false) {
            RangeQuality::Park
        } else if adjusted.try_le(&self.dist_crit).unwrap_or(false) {
            RangeQuality::Final
        } else if adjusted.try_le(&self.dist_warn).unwrap_or(false) {
            RangeQuality::Base
        } else {
            RangeQuality::Ok
        }
    }
}

/// Centerline-relative direction. A reading further from a left-mounted sensor means
/// the vehicle sits to the right, and the other way round for right-mounted sensors.
pub fn direction(side: Side, deviation: &Quantity) -> Option<Side> {
    if deviation.is_zero() {
        return None;
    }
    let further = !deviation.is_negative();
    Some(match (side, further) {
        (Side::Left, true) | (Side::Right, false) => Side::Right,
        (Side::Left, false) | (Side::Right, true) => Side::Left,
    })
}

/// ok is checked first, then critical, then warning; anything else is info.
pub fn severity(zone: &LateralZoneConfig, magnitude: &Quantity) -> Severity {
    if magnitude.try_le(&zone.ok_spread).unwrap_or(false) {
        Severity::Ok
    } else if magnitude.try_ge(&zone.critical_spread).unwrap_or(false) {
        Severity::Critical
    } else if magnitude.try_ge(&zone.warn_spread).unwrap_or(false) {
        Severity::Warning
    } else {
        Severity::Info
    }
}
