#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the parking bay monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated once.
//! - Lengths and durations stay as `"<number> <unit>"` strings here; the core
//!   parses them into unit-tagged quantities when building its runtime types.
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystemCfg {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SystemCfg {
    /// Preferred display units. Internally everything is normalized anyway.
    pub unit_system: UnitSystemCfg,
    /// Prefix prepended to `suffix`-mode trigger topics.
    pub topic_prefix: String,
    /// Polling cycle period in milliseconds.
    pub cycle_ms: u64,
    /// Readings kept per sensor for the debounced estimate.
    pub buffer_capacity: usize,
}

impl Default for SystemCfg {
    fn default() -> Self {
        Self {
            unit_system: UnitSystemCfg::Metric,
            topic_prefix: "parkbay".to_string(),
            cycle_ms: 100,
            buffer_capacity: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// A physical sensor known to the system. The bay refers to these by id.
#[derive(Debug, Deserialize, Clone)]
pub struct SensorCfg {
    /// Driver family, e.g. "vl53l1x" or "tfmini". Informational for the core.
    pub kind: String,
    /// Optional physical ceiling of the sensor, e.g. "400 cm".
    #[serde(default)]
    pub max_range: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SideCfg {
    #[serde(rename = "left", alias = "L", alias = "l", alias = "Left")]
    Left,
    #[serde(rename = "right", alias = "R", alias = "r", alias = "Right")]
    Right,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RangeCfg {
    pub sensor: String,
    /// Mounting offset of the range sensor, subtracted from raw readings.
    #[serde(default = "zero_cm")]
    pub offset: String,
    /// Readings beyond this are treated as "nothing in range yet".
    #[serde(alias = "dist_max")]
    pub max_detect_range: String,
    /// Raw distance at which the vehicle should stop.
    #[serde(alias = "dist_stop")]
    pub stop_distance: String,
    /// Net travel across the buffer window that counts as motion.
    #[serde(default = "default_motion_margin")]
    pub motion_margin: String,
    /// Tolerance either side of the stop point that still counts as parked.
    #[serde(default = "default_spread_park")]
    pub spread_park: String,
    #[serde(default = "default_pct_warn")]
    pub pct_warn: f64,
    #[serde(default = "default_pct_crit")]
    pub pct_crit: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LateralCfg {
    pub sensor: String,
    pub side: SideCfg,
    /// Reading expected when the vehicle is perfectly centered.
    #[serde(alias = "dist_ideal")]
    pub ideal: String,
    pub ok_spread: String,
    pub warn_spread: String,
    #[serde(alias = "red_spread")]
    pub critical_spread: String,
    /// Range-sensor distance at or below which this zone becomes relevant.
    #[serde(alias = "intercept_range")]
    pub intercept: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BayTimeouts {
    /// Give up docking after this long without motion.
    pub dock: String,
    /// Give up undocking after this long without motion.
    pub undock: String,
}

impl Default for BayTimeouts {
    fn default() -> Self {
        Self {
            dock: "120 s".to_string(),
            undock: "120 s".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BayCfg {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub range: RangeCfg,
    #[serde(default)]
    pub lateral: Vec<LateralCfg>,
    #[serde(default)]
    pub timeouts: BayTimeouts,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopicMode {
    /// Topic is used exactly as written.
    Full,
    /// Topic is appended to the system topic prefix.
    #[default]
    Suffix,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCfg {
    /// System-wide commands (reboot, rescan, rediscover).
    #[serde(rename = "syscmd", alias = "syscommand")]
    SysCommand {
        id: String,
        #[serde(default = "default_cmd_topic")]
        topic: String,
    },
    /// Bay commands (dock, undock, verify, abort) addressed to the bay.
    #[serde(rename = "baycmd", alias = "baycommand")]
    BayCommand {
        id: String,
        #[serde(default = "default_cmd_topic")]
        topic: String,
    },
    /// Fires on an external sensor's state change, e.g. a garage door.
    MqttSensor {
        id: String,
        topic: String,
        #[serde(default = "full_topic_mode")]
        topic_mode: TopicMode,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        from: Option<String>,
        action: String,
    },
    /// Fires whenever the bay's range sensor reports motion.
    Range { id: String, action: String },
}

impl TriggerCfg {
    pub fn id(&self) -> &str {
        match self {
            Self::SysCommand { id, .. }
            | Self::BayCommand { id, .. }
            | Self::MqttSensor { id, .. }
            | Self::Range { id, .. } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemCfg,
    #[serde(default)]
    pub logging: Logging,
    pub sensors: BTreeMap<String, SensorCfg>,
    pub bay: BayCfg,
    #[serde(default)]
    pub triggers: Vec<TriggerCfg>,
}

fn zero_cm() -> String {
    "0 cm".to_string()
}

fn default_motion_margin() -> String {
    "2 cm".to_string()
}

fn default_spread_park() -> String {
    "2 in".to_string()
}

fn default_pct_warn() -> f64 {
    30.0
}

fn default_pct_crit() -> f64 {
    10.0
}

fn default_cmd_topic() -> String {
    "cmd".to_string()
}

fn full_topic_mode() -> TopicMode {
    TopicMode::Full
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file in one go.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Every sensor id the bay depends on, range sensor first.
    pub fn bay_sensor_ids(&self) -> Vec<&str> {
        std::iter::once(self.bay.range.sensor.as_str())
            .chain(self.bay.lateral.iter().map(|l| l.sensor.as_str()))
            .collect()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // System
        if self.system.cycle_ms == 0 {
            eyre::bail!("system.cycle_ms must be >= 1");
        }
        if self.system.cycle_ms > 60 * 1000 {
            eyre::bail!("system.cycle_ms is unreasonably large (>60s)");
        }
        if self.system.buffer_capacity == 0 {
            eyre::bail!("system.buffer_capacity must be >= 1");
        }
        if self.system.buffer_capacity > 1000 {
            eyre::bail!("system.buffer_capacity is unreasonably large (>1000)");
        }
        if self.system.topic_prefix.trim().is_empty() {
            eyre::bail!("system.topic_prefix must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{rot}'");
        }

        // Sensors
        if self.sensors.is_empty() {
            eyre::bail!("at least one [sensors.<id>] entry is required");
        }
        for (id, sensor) in &self.sensors {
            if id.trim().is_empty() || id.contains(char::is_whitespace) {
                eyre::bail!("sensor id '{id}' must be non-empty and contain no whitespace");
            }
            if sensor.kind.trim().is_empty() {
                eyre::bail!("sensors.{id}.kind must not be empty");
            }
        }

        // Bay
        if self.bay.id.trim().is_empty() || self.bay.id.contains(char::is_whitespace) {
            eyre::bail!("bay.id must be non-empty and contain no whitespace");
        }
        if !self.sensors.contains_key(&self.bay.range.sensor) {
            eyre::bail!(
                "bay.range.sensor references undefined sensor '{}'",
                self.bay.range.sensor
            );
        }
        for (field, pct) in [("pct_warn", self.bay.range.pct_warn), ("pct_crit", self.bay.range.pct_crit)] {
            if !(0.0..=100.0).contains(&pct) {
                eyre::bail!("bay.range.{field} must be within 0..=100, got {pct}");
            }
        }
        let mut seen = HashSet::new();
        seen.insert(self.bay.range.sensor.as_str());
        for (idx, lat) in self.bay.lateral.iter().enumerate() {
            if !self.sensors.contains_key(&lat.sensor) {
                eyre::bail!(
                    "bay.lateral[{idx}].sensor references undefined sensor '{}'",
                    lat.sensor
                );
            }
            if !seen.insert(lat.sensor.as_str()) {
                eyre::bail!(
                    "bay.lateral[{idx}].sensor '{}' is already used by this bay",
                    lat.sensor
                );
            }
            for (field, value) in [
                ("ideal", &lat.ideal),
                ("ok_spread", &lat.ok_spread),
                ("warn_spread", &lat.warn_spread),
                ("critical_spread", &lat.critical_spread),
                ("intercept", &lat.intercept),
            ] {
                if value.trim().is_empty() {
                    eyre::bail!("bay.lateral[{idx}].{field} must not be empty");
                }
            }
        }

        // Triggers
        let mut ids = HashSet::new();
        for trig in &self.triggers {
            let id = trig.id();
            if id.trim().is_empty() {
                eyre::bail!("trigger id must not be empty");
            }
            if !ids.insert(id.to_lowercase()) {
                eyre::bail!("duplicate trigger id '{id}'");
            }
            match trig {
                TriggerCfg::SysCommand { topic, .. } | TriggerCfg::BayCommand { topic, .. } => {
                    if topic.trim().is_empty() {
                        eyre::bail!("triggers.{id}.topic must not be empty");
                    }
                }
                TriggerCfg::MqttSensor {
                    topic,
                    to,
                    from,
                    action,
                    ..
                } => {
                    if topic.trim().is_empty() {
                        eyre::bail!("triggers.{id}.topic must not be empty");
                    }
                    match (to, from) {
                        (Some(_), Some(_)) => {
                            eyre::bail!("triggers.{id} cannot have both 'to' and 'from' set")
                        }
                        (None, None) => {
                            eyre::bail!("triggers.{id} needs exactly one of 'to' or 'from'")
                        }
                        _ => {}
                    }
                    if action.trim().is_empty() {
                        eyre::bail!("triggers.{id}.action must not be empty");
                    }
                }
                TriggerCfg::Range { action, .. } => {
                    if action.trim().is_empty() {
                        eyre::bail!("triggers.{id}.action must not be empty");
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[sensors.range]
kind = "tfmini"

[bay]
id = "bay1"

[bay.range]
sensor = "range"
max_detect_range = "500 cm"
stop_distance = "30 cm"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = load_toml(MINIMAL).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.system.buffer_capacity, 10);
        assert_eq!(cfg.system.topic_prefix, "parkbay");
        assert_eq!(cfg.bay.range.offset, "0 cm");
        assert_eq!(cfg.bay.range.spread_park, "2 in");
        assert_eq!(cfg.bay.range.pct_warn, 30.0);
        assert_eq!(cfg.bay.range.pct_crit, 10.0);
        assert_eq!(cfg.bay.timeouts.dock, "120 s");
        assert!(cfg.triggers.is_empty());
        assert_eq!(cfg.bay_sensor_ids(), vec!["range"]);
    }

    #[test]
    fn percentages_outside_0_to_100_are_rejected() {
        let cfg = load_toml(&format!("{MINIMAL}pct_warn = 120\n")).expect("parse");
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("bay.range.pct_warn"), "{err}");

        let cfg = load_toml(&format!("{MINIMAL}pct_crit = -1.5\n")).expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn side_accepts_short_forms() {
        let side: SideCfg = toml::from_str::<BTreeMap<String, SideCfg>>("s = \"L\"")
            .expect("parse")
            .remove("s")
            .expect("present");
        assert_eq!(side, SideCfg::Left);
    }
}
