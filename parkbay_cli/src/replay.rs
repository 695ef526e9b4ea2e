//! Replay a recorded CSV script through a bay monitor.
//!
//! Script rows are `cycle,kind,key,value`:
//!
//! - `reading`: `key` is a sensor id, `value` is `"<n> <unit>"`, `timeout`,
//!   `out_of_range` or `fault:<msg>`
//! - `message`: `key` is a topic, `value` the payload
//! - `status`: `key` is a sensor id, `value` is `online` or `offline`
//!
//! Cycle numbers may skip; a skipped cycle runs with no samples.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::{WrapErr, eyre};
use parkbay_core::{
    Availability, BayMonitor, CycleReport, LateralZoneResult, Quantity, RangeResult,
};
use parkbay_traits::{RawSample, SampleFault, SensorSource, SteppedClock};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct Row {
    cycle: u64,
    kind: String,
    key: String,
    #[serde(default)]
    value: String,
}

/// Inputs for one cycle, in script order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleInput {
    pub samples: Vec<RawSample>,
    pub messages: Vec<(String, String)>,
    pub status: Vec<(String, Availability)>,
}

#[derive(Debug, Default)]
pub struct Script {
    cycles: BTreeMap<u64, CycleInput>,
}

impl Script {
    pub fn from_path(path: &Path) -> eyre::Result<Self> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)
            .map_err(|e| eyre!("open {path:?}: {e}"))?;
        Self::from_reader(rdr)
    }

    pub fn from_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> eyre::Result<Self> {
        let headers = rdr.headers()?.clone();
        for col in ["cycle", "kind", "key", "value"] {
            if !headers.iter().any(|h| h == col) {
                eyre::bail!("script must have headers 'cycle,kind,key,value' (missing '{col}')");
            }
        }

        let mut script = Self::default();
        for (idx, rec) in rdr.deserialize::<Row>().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let row = rec.wrap_err_with(|| format!("line {line}"))?;
            let input = script.cycles.entry(row.cycle).or_default();
            match row.kind.to_ascii_lowercase().as_str() {
                "reading" => input.samples.push(parse_reading(&row.key, &row.value)),
                "message" => input.messages.push((row.key, row.value)),
                "status" => {
                    let availability = parse_status(&row.value)
                        .ok_or_else(|| eyre!("line {line}: status must be online|offline, got '{}'", row.value))?;
                    input.status.push((row.key, availability));
                }
                other => eyre::bail!("line {line}: unknown row kind '{other}'"),
            }
        }
        Ok(script)
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// First through last scripted cycle, gaps filled with empty inputs as they are reached.
    pub fn cycles(&self) -> impl Iterator<Item = CycleInput> + '_ {
        let span = self
            .cycles
            .keys()
            .next()
            .copied()
            .zip(self.cycles.keys().next_back().copied());
        span.into_iter().flat_map(move |(first, last)| {
            (first..=last).map(move |n| self.cycles.get(&n).cloned().unwrap_or_default())
        })
    }
}

fn parse_status(value: &str) -> Option<Availability> {
    match value.to_ascii_lowercase().as_str() {
        "online" | "available" | "up" => Some(Availability::Available),
        "offline" | "unavailable" | "down" => Some(Availability::Unavailable),
        _ => None,
    }
}

/// Anything that is not a number followed by a unit is reported as a driver fault.
pub fn parse_reading(sensor: &str, value: &str) -> RawSample {
    let v = value.trim();
    match v.to_ascii_lowercase().as_str() {
        "timeout" => return RawSample::failed(sensor, SampleFault::Timeout),
        "out_of_range" | "oor" => return RawSample::failed(sensor, SampleFault::OutOfRange),
        _ => {}
    }
    if let Some(msg) = v.strip_prefix("fault:") {
        return RawSample::failed(sensor, SampleFault::Fault(msg.trim().to_string()));
    }
    let split = v
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(v.len());
    let (num, unit) = v.split_at(split);
    match num.trim().parse::<f64>() {
        Ok(n) if !unit.trim().is_empty() => RawSample::distance(sensor, n, unit.trim()),
        _ => RawSample::failed(sensor, SampleFault::Fault(format!("unparseable reading '{v}'"))),
    }
}

/// Hands out one scripted cycle per poll.
struct ReplaySource {
    pending: Option<Vec<RawSample>>,
}

impl SensorSource for ReplaySource {
    fn poll(&mut self) -> Result<Vec<RawSample>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.pending.take().unwrap_or_default())
    }
}

pub struct ReplayOptions {
    pub cycle_ms: u64,
    pub pace_ms: Option<u64>,
    pub online: bool,
    pub json: bool,
}

pub fn run(
    monitor: &mut BayMonitor,
    clock: &SteppedClock,
    script: &Script,
    opts: &ReplayOptions,
    shutdown: &AtomicBool,
) -> Vec<CycleReport> {
    let mut status: HashMap<String, Availability> = HashMap::new();
    if opts.online {
        for id in monitor.engine().sensor_ids() {
            status.insert(id.to_string(), Availability::Available);
        }
        monitor.recheck_availability(&status);
    }

    let mut source = ReplaySource { pending: None };
    let mut reports = Vec::new();
    for input in script.cycles() {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(cycles = reports.len(), "replay interrupted");
            break;
        }
        if !input.status.is_empty() {
            status.extend(input.status);
            monitor.recheck_availability(&status);
        }
        for (topic, payload) in input.messages {
            monitor.post(topic, payload);
        }
        source.pending = Some(input.samples);
        let report = monitor.poll_cycle(&mut source);
        if opts.json {
            println!("{}", report_json(&report));
        } else {
            println!("{}", report_text(&report));
        }
        reports.push(report);

        clock.advance(Duration::from_millis(opts.cycle_ms));
        if let Some(ms) = opts.pace_ms.filter(|ms| *ms > 0) {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
    reports
}

pub fn install_ctrlc() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    shutdown
}

// ── Rendering ───────────────────────────────────────────────────────────────

fn quantity_json(q: &Quantity) -> Value {
    json!({ "value": q.magnitude(), "unit": q.unit().symbol() })
}

fn range_json(r: &RangeResult) -> Value {
    match r {
        RangeResult::NotPresent => json!({ "state": "not_present" }),
        RangeResult::BeyondRange => json!({ "state": "beyond_range" }),
        RangeResult::Measured { adjusted, fraction } => json!({
            "state": "measured",
            "adjusted": quantity_json(adjusted),
            "fraction": fraction,
        }),
    }
}

fn zone_result_json(r: &LateralZoneResult) -> Value {
    match r {
        LateralZoneResult::NotPresent => json!({ "state": "not_present" }),
        LateralZoneResult::BeyondRange => json!({ "state": "beyond_range" }),
        LateralZoneResult::Evaluated {
            magnitude,
            direction,
            severity,
        } => json!({
            "state": "evaluated",
            "deviation": quantity_json(magnitude),
            "direction": direction.map(|s| s.as_str()),
            "severity": severity.as_str(),
        }),
    }
}

pub fn report_json(r: &CycleReport) -> Value {
    let snapshot = r.snapshot.as_ref().map(|s| {
        json!({
            "range": range_json(&s.range),
            "quality": s.quality.as_str(),
            "zones": s.zones.iter().map(|z| json!({
                "sensor": z.sensor,
                "side": z.side.as_str(),
                "result": zone_result_json(&z.result),
            })).collect::<Vec<_>>(),
            "expected_zones": s.expected_zones,
        })
    });
    json!({
        "cycle": r.cycle,
        "t_ms": r.timestamp_ms,
        "bay": r.view.bay_id,
        "lifecycle": r.view.lifecycle.as_str(),
        "activity": r.view.activity.as_str(),
        "occupancy": r.view.occupancy.as_str(),
        "motion": r.view.motion.as_str(),
        "snapshot": snapshot,
        "system_commands": r.system_commands.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        "bay_commands": r.bay_commands.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
    })
}

pub fn report_text(r: &CycleReport) -> String {
    let range = match r.snapshot.as_ref().map(|s| &s.range) {
        None => "-".to_string(),
        Some(RangeResult::NotPresent) => "not_present".to_string(),
        Some(RangeResult::BeyondRange) => "beyond_range".to_string(),
        Some(RangeResult::Measured { adjusted, fraction }) => {
            format!("{adjusted:.1} ({:.0}%)", fraction * 100.0)
        }
    };
    let quality = r.snapshot.as_ref().map_or("-", |s| s.quality.as_str());
    let zones = r
        .snapshot
        .as_ref()
        .map(|s| {
            s.zones
                .iter()
                .map(|z| match &z.result {
                    LateralZoneResult::NotPresent => format!("{}:not_present", z.sensor),
                    LateralZoneResult::BeyondRange => format!("{}:beyond_range", z.sensor),
                    LateralZoneResult::Evaluated {
                        magnitude,
                        direction,
                        severity,
                    } => format!(
                        "{}:{} {magnitude:.1}{}",
                        z.sensor,
                        severity.as_str(),
                        direction.map(|d| format!(" {d}")).unwrap_or_default()
                    ),
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let cmds = |c: &[parkbay_core::Command]| {
        c.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(",")
    };
    format!(
        "cycle={} t={}ms {} lifecycle={} activity={} occupancy={} motion={} range={} quality={} zones=[{}] sys=[{}] bay=[{}]",
        r.cycle,
        r.timestamp_ms,
        r.view.bay_id,
        r.view.lifecycle,
        r.view.activity,
        r.view.occupancy,
        r.view.motion,
        range,
        quality,
        zones,
        cmds(&r.system_commands),
        cmds(&r.bay_commands),
    )
}
