//! Conversions bridging `parkbay_config` types to `parkbay_core` types.
//!
//! Structural checks already happened in `Config::validate`; what can fail
//! here is unit parsing and action/command names.

use std::sync::Arc;

use parkbay_traits::Clock;

use crate::config::{BayConfig, LateralZoneConfig, RangeConfig, Side, Timeouts};
use crate::error::{BayError, BuildError, Result};
use crate::monitor::BayMonitor;
use crate::triggers::{Action, ChangeMode, TopicMode, Trigger, bay_topic, resolve_topic};
use crate::units::{Quantity, UnitSystem};

fn quantity(field: &str, text: &str) -> Result<Quantity> {
    Quantity::parse(text).map_err(|source| {
        eyre::Report::new(BuildError::Unit {
            field: field.to_string(),
            source,
        })
    })
}

// ── Enums ────────────────────────────────────────────────────────────────────

impl From<parkbay_config::UnitSystemCfg> for UnitSystem {
    fn from(c: parkbay_config::UnitSystemCfg) -> Self {
        match c {
            parkbay_config::UnitSystemCfg::Metric => Self::Metric,
            parkbay_config::UnitSystemCfg::Imperial => Self::Imperial,
        }
    }
}

impl From<parkbay_config::SideCfg> for Side {
    fn from(c: parkbay_config::SideCfg) -> Self {
        match c {
            parkbay_config::SideCfg::Left => Self::Left,
            parkbay_config::SideCfg::Right => Self::Right,
        }
    }
}

impl From<parkbay_config::TopicMode> for TopicMode {
    fn from(c: parkbay_config::TopicMode) -> Self {
        match c {
            parkbay_config::TopicMode::Full => Self::Full,
            parkbay_config::TopicMode::Suffix => Self::Suffix,
        }
    }
}

// ── Bay geometry ─────────────────────────────────────────────────────────────

impl TryFrom<&parkbay_config::RangeCfg> for RangeConfig {
    type Error = eyre::Report;

    fn try_from(c: &parkbay_config::RangeCfg) -> Result<Self> {
        Ok(Self {
            sensor: c.sensor.clone(),
            offset: quantity("bay.range.offset", &c.offset)?,
            max_detect_range: quantity("bay.range.max_detect_range", &c.max_detect_range)?,
            stop_distance: quantity("bay.range.stop_distance", &c.stop_distance)?,
            motion_margin: quantity("bay.range.motion_margin", &c.motion_margin)?,
            spread_park: quantity("bay.range.spread_park", &c.spread_park)?,
            pct_warn: c.pct_warn,
            pct_crit: c.pct_crit,
        })
    }
}

fn lateral(i: usize, c: &parkbay_config::LateralCfg) -> Result<LateralZoneConfig> {
    let field = |name: &str| format!("bay.lateral[{i}].{name}");
    Ok(LateralZoneConfig {
        sensor: c.sensor.clone(),
        side: c.side.into(),
        ideal: quantity(&field("ideal"), &c.ideal)?,
        ok_spread: quantity(&field("ok_spread"), &c.ok_spread)?,
        warn_spread: quantity(&field("warn_spread"), &c.warn_spread)?,
        critical_spread: quantity(&field("critical_spread"), &c.critical_spread)?,
        intercept: quantity(&field("intercept"), &c.intercept)?,
    })
}

impl TryFrom<&parkbay_config::BayTimeouts> for Timeouts {
    type Error = eyre::Report;

    fn try_from(c: &parkbay_config::BayTimeouts) -> Result<Self> {
        Ok(Self {
            dock: quantity("bay.timeouts.dock", &c.dock)?,
            undock: quantity("bay.timeouts.undock", &c.undock)?,
        })
    }
}

impl TryFrom<&parkbay_config::Config> for BayConfig {
    type Error = eyre::Report;

    fn try_from(c: &parkbay_config::Config) -> Result<Self> {
        let zones = c
            .bay
            .lateral
            .iter()
            .enumerate()
            .map(|(i, l)| lateral(i, l))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: c.bay.id.clone(),
            name: c.bay.name.clone().unwrap_or_else(|| c.bay.id.clone()),
            unit_system: c.system.unit_system.into(),
            range: RangeConfig::try_from(&c.bay.range)?,
            zones,
            timeouts: Timeouts::try_from(&c.bay.timeouts)?,
            buffer_capacity: c.system.buffer_capacity,
            known_sensors: Some(c.sensors.keys().cloned().collect()),
        })
    }
}

// ── Triggers ─────────────────────────────────────────────────────────────────

fn action(id: &str, text: &str) -> Result<Action> {
    text.parse().map_err(|e: BayError| {
        eyre::Report::new(BayError::Configuration(format!(
            "trigger '{id}': action: {e}"
        )))
    })
}

/// Build the trigger with topics resolved against `prefix` and `bay_id`.
pub fn trigger(c: &parkbay_config::TriggerCfg, prefix: &str, bay_id: &str) -> Result<Trigger> {
    use parkbay_config::TriggerCfg;
    let t = match c {
        TriggerCfg::SysCommand { id, topic } => {
            Trigger::system_command(id, resolve_topic(prefix, topic, TopicMode::Suffix))
        }
        TriggerCfg::BayCommand { id, topic } => Trigger::bay_command(id, bay_topic(prefix, bay_id, topic)),
        TriggerCfg::MqttSensor {
            id,
            topic,
            topic_mode,
            to,
            from,
            action: act,
        } => {
            let mode = match (to, from) {
                (Some(v), None) => ChangeMode::To(v.clone()),
                (None, Some(v)) => ChangeMode::From(v.clone()),
                _ => {
                    return Err(eyre::Report::new(BayError::Configuration(format!(
                        "trigger '{id}' needs exactly one of 'to' or 'from'"
                    ))));
                }
            };
            Trigger::mqtt_sensor(
                id,
                resolve_topic(prefix, topic, (*topic_mode).into()),
                mode,
                action(id, act)?,
            )
        }
        TriggerCfg::Range { id, action: act } => Trigger::range(id, action(id, act)?),
    };
    Ok(t)
}

/// Build a fully wired monitor from a validated config.
pub fn build_monitor(c: &parkbay_config::Config, clock: Arc<dyn Clock + Send + Sync>) -> Result<BayMonitor> {
    let bay = BayConfig::try_from(c)?;
    let mut monitor = BayMonitor::with_clock(&bay, clock)?;
    for t in &c.triggers {
        monitor.register_trigger(trigger(t, &c.system.topic_prefix, &bay.id)?)?;
    }
    Ok(monitor)
}
