//! Type-state builder for `BayStateEngine`.
//!
//! `build()` only exists once a range configuration has been supplied.
//! `try_build()` is always available and reports the missing piece at runtime.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use crate::config::{LateralZoneConfig, RangeConfig};
use crate::engine::BayStateEngine;
use crate::error::{BuildError, Result};
use crate::status::Lifecycle;
use crate::units::{Quantity, Unit, UnitSystem};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct BayEngineBuilder<R> {
    id: String,
    unit_system: UnitSystem,
    range: Option<RangeConfig>,
    zones: Vec<LateralZoneConfig>,
    known_sensors: Option<BTreeSet<String>>,
    _r: PhantomData<R>,
}

impl Default for BayEngineBuilder<Missing> {
    fn default() -> Self {
        Self {
            id: "bay".to_string(),
            unit_system: UnitSystem::default(),
            range: None,
            zones: Vec::new(),
            known_sensors: None,
            _r: PhantomData,
        }
    }
}

impl<R> BayEngineBuilder<R> {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn unit_system(mut self, unit_system: UnitSystem) -> Self {
        self.unit_system = unit_system;
        self
    }

    pub fn zone(mut self, zone: LateralZoneConfig) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn zones(mut self, zones: impl IntoIterator<Item = LateralZoneConfig>) -> Self {
        self.zones.extend(zones);
        self
    }

    /// Restrict references to this set of defined sensors.
    /// Without it any sensor id is accepted.
    pub fn known_sensors<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_sensors = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn range(self, range: RangeConfig) -> BayEngineBuilder<Set> {
        BayEngineBuilder {
            id: self.id,
            unit_system: self.unit_system,
            range: Some(range),
            zones: self.zones,
            known_sensors: self.known_sensors,
            _r: PhantomData,
        }
    }

    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<BayStateEngine> {
        let range = self
            .range
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRange))?;
        validate_and_build(
            self.id,
            self.unit_system,
            range,
            self.zones,
            self.known_sensors.as_ref(),
        )
    }
}

impl BayEngineBuilder<Set> {
    pub fn build(self) -> Result<BayStateEngine> {
        self.try_build()
    }
}

fn require_distance(field: impl Into<String>, q: &Quantity) -> Result<()> {
    q.convert(Unit::Centimeter).map(|_| ()).map_err(|source| {
        eyre::Report::new(BuildError::Unit {
            field: field.into(),
            source,
        })
    })
}

fn validate_and_build(
    id: String,
    unit_system: UnitSystem,
    range: RangeConfig,
    mut zones: Vec<LateralZoneConfig>,
    known: Option<&BTreeSet<String>>,
) -> Result<BayStateEngine> {
    // ── Sensors ──────────────────────────────────────────────────────────────
    let mut seen = BTreeSet::new();
    let roles = std::iter::once(("range".to_string(), &range.sensor)).chain(
        zones
            .iter()
            .enumerate()
            .map(|(i, z)| (format!("lateral[{i}]"), &z.sensor)),
    );
    for (role, sensor) in roles {
        if let Some(known) = known
            && !known.contains(sensor)
        {
            return Err(eyre::Report::new(BuildError::UndefinedSensor {
                role,
                sensor: sensor.clone(),
            }));
        }
        if !seen.insert(sensor.clone()) {
            return Err(eyre::Report::new(BuildError::DuplicateSensor(
                sensor.clone(),
            )));
        }
    }

    // ── Units ────────────────────────────────────────────────────────────────
    require_distance("range.offset", &range.offset)?;
    require_distance("range.max_detect_range", &range.max_detect_range)?;
    require_distance("range.stop_distance", &range.stop_distance)?;
    require_distance("range.motion_margin", &range.motion_margin)?;
    require_distance("range.spread_park", &range.spread_park)?;
    for (i, z) in zones.iter().enumerate() {
        require_distance(format!("lateral[{i}].ideal"), &z.ideal)?;
        require_distance(format!("lateral[{i}].ok_spread"), &z.ok_spread)?;
        require_distance(format!("lateral[{i}].warn_spread"), &z.warn_spread)?;
        require_distance(format!("lateral[{i}].critical_spread"), &z.critical_spread)?;
        require_distance(format!("lateral[{i}].intercept"), &z.intercept)?;
    }

    // ── Values ───────────────────────────────────────────────────────────────
    if !range.max_detect_range.is_finite() || range.max_detect_range.base_magnitude() <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "range.max_detect_range must be > 0",
        )));
    }
    if range.motion_margin.is_negative() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "range.motion_margin must be >= 0",
        )));
    }
    if range.spread_park.is_negative() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "range.spread_park must be >= 0",
        )));
    }
    if !(0.0..=100.0).contains(&range.pct_warn) || !(0.0..=100.0).contains(&range.pct_crit) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "range percentages must be within 0..=100",
        )));
    }
    for z in &zones {
        if z.ok_spread.is_negative() || z.warn_spread.is_negative() || z.critical_spread.is_negative()
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "lateral spreads must be >= 0",
            )));
        }
        if z.intercept.is_negative() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "lateral intercept must be >= 0",
            )));
        }
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    zones.sort_by(|a, b| a.intercept.base_magnitude().total_cmp(&b.intercept.base_magnitude()));

    let span = range
        .max_detect_range
        .checked_sub(&range.offset)
        .and_then(|q| q.checked_sub(&range.stop_distance))
        .map_err(|source| {
            eyre::Report::new(BuildError::Unit {
                field: "range.max_detect_range".into(),
                source,
            })
        })?;
    let dist_warn = span.scale(range.pct_warn / 100.0);
    let dist_crit = span.scale(range.pct_crit / 100.0);
    tracing::debug!(bay = %id, approach = %span, %dist_warn, %dist_crit, "derived range distances");

    Ok(BayStateEngine {
        id,
        unit_system,
        range,
        zones,
        dist_warn,
        dist_crit,
        lifecycle: Lifecycle::Initializing,
    })
}
