//! Per-bay polling cycle.
//!
//! `BayMonitor` ties the pieces together: driver samples go into per-sensor
//! buffers, the buffer estimates go through the engine, the resulting view is
//! handed to the dispatcher, and drained bay commands move the activity state.
//! Nothing here blocks; the caller owns the loop and its pacing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parkbay_traits::{Clock, MonotonicClock, RawSample, SensorSource};

use crate::buffer::{InvalidReason, SensorBuffer, SensorReading};
use crate::config::BayConfig;
use crate::dispatch::{Dispatch, Dispatcher, MessageSender};
use crate::engine::{BayStateEngine, BayStateSnapshot};
use crate::error::{BuildError, Result};
use crate::sample::{map_source_error, to_reading};
use crate::status::{Activity, Availability, BayView, Lifecycle, Motion, Occupancy};
use crate::triggers::{Command, Trigger};
use crate::units::Quantity;

/// Everything one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub timestamp_ms: u64,
    pub view: BayView,
    /// `None` while the bay is unavailable.
    pub snapshot: Option<BayStateSnapshot>,
    pub system_commands: Vec<Command>,
    pub bay_commands: Vec<Command>,
}

pub struct BayMonitor {
    name: String,
    engine: BayStateEngine,
    buffers: BTreeMap<String, SensorBuffer>,
    dispatcher: Dispatcher,
    activity: Activity,
    dock_timeout_ms: u64,
    undock_timeout_ms: u64,
    clock: Arc<dyn Clock + Send + Sync>,
    motion_mark_ms: u64,
    cycles: u64,
}

impl core::fmt::Debug for BayMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BayMonitor")
            .field("bay", &self.engine.id())
            .field("lifecycle", &self.engine.lifecycle_state())
            .field("activity", &self.activity)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

fn timeout_ms(field: &str, q: &Quantity) -> Result<u64> {
    let d = q.as_duration().map_err(|source| {
        eyre::Report::new(BuildError::Unit {
            field: field.to_string(),
            source,
        })
    })?;
    if d.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "motion timeouts must be > 0",
        )));
    }
    Ok(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl BayMonitor {
    /// Build a monitor on the real monotonic clock.
    pub fn new(config: &BayConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: &BayConfig, clock: Arc<dyn Clock + Send + Sync>) -> Result<Self> {
        let mut builder = BayStateEngine::builder()
            .id(config.id.clone())
            .unit_system(config.unit_system)
            .zones(config.zones.iter().cloned());
        if let Some(known) = &config.known_sensors {
            builder = builder.known_sensors(known.iter().cloned());
        }
        let engine = builder.range(config.range.clone()).build()?;

        let dock_timeout_ms = timeout_ms("timeouts.dock", &config.timeouts.dock)?;
        let undock_timeout_ms = timeout_ms("timeouts.undock", &config.timeouts.undock)?;

        let buffers = engine
            .sensor_ids()
            .map(|id| (id.to_string(), SensorBuffer::new(config.buffer_capacity)))
            .collect();

        let now = clock.now_ms();
        tracing::info!(bay = %config.id, zones = config.zones.len(), "bay monitor ready");
        Ok(Self {
            name: config.name.clone(),
            engine,
            buffers,
            dispatcher: Dispatcher::new(),
            activity: Activity::Idle,
            dock_timeout_ms,
            undock_timeout_ms,
            clock,
            motion_mark_ms: now,
            cycles: 0,
        })
    }

    pub fn register_trigger(&mut self, trigger: Trigger) -> Result<()> {
        self.dispatcher.register(trigger).map_err(eyre::Report::new)
    }

    pub fn id(&self) -> &str {
        self.engine.id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &BayStateEngine {
        &self.engine
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.engine.lifecycle_state()
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn buffer(&self, sensor_id: &str) -> Option<&SensorBuffer> {
        self.buffers.get(sensor_id)
    }

    /// Handle for delivering messages from another thread.
    pub fn sender(&self) -> MessageSender {
        self.dispatcher.sender()
    }

    /// Queue a message for the next cycle.
    pub fn post(&self, topic: impl Into<String>, payload: impl Into<String>) {
        self.dispatcher.post(topic, payload);
    }

    pub fn recheck_availability(&mut self, status: &HashMap<String, Availability>) -> Lifecycle {
        self.engine.recheck_availability(status)
    }

    /// Poll `source` and run one cycle. A failed poll runs the cycle with no samples.
    pub fn poll_cycle<S: SensorSource + ?Sized>(&mut self, source: &mut S) -> CycleReport {
        let samples = match source.poll() {
            Ok(samples) => samples,
            Err(e) => {
                let err = map_source_error(e.as_ref());
                tracing::warn!(bay = %self.id(), error = %err, "sensor poll failed");
                Vec::new()
            }
        };
        self.cycle(&samples)
    }

    pub fn cycle(&mut self, samples: &[RawSample]) -> CycleReport {
        let now = self.clock.now_ms();
        self.cycles += 1;

        // Sensors that reported nothing this cycle age out through NoReading entries.
        let mut seen = HashSet::new();
        for sample in samples {
            match self.buffers.get_mut(&sample.sensor_id) {
                Some(buffer) => {
                    buffer.push(to_reading(sample, now));
                    seen.insert(sample.sensor_id.as_str());
                }
                None => tracing::debug!(sensor = %sample.sensor_id, "sample for unused sensor ignored"),
            }
        }
        for (id, buffer) in &mut self.buffers {
            if !seen.contains(id.as_str()) {
                buffer.push(SensorReading::invalid(InvalidReason::NoReading, now));
            }
        }

        let estimates: HashMap<String, SensorReading> = self
            .buffers
            .iter()
            .map(|(id, b)| (id.clone(), b.estimate()))
            .collect();
        let range = self.engine.range_config();
        let motion = self
            .buffers
            .get(&range.sensor)
            .map_or(Motion::Unknown, |b| b.motion(&range.motion_margin));
        let snapshot = self.engine.update(&estimates).map(|s| s.with_motion(motion));

        self.check_motion_timer(snapshot.as_ref().map_or(Motion::Unknown, |s| s.motion), now);

        let view = BayView {
            bay_id: self.engine.id().to_string(),
            lifecycle: self.engine.lifecycle_state(),
            activity: self.activity,
            occupancy: snapshot.as_ref().map_or(Occupancy::Unknown, |s| s.occupancy),
            motion: snapshot.as_ref().map_or(Motion::Unknown, |s| s.motion),
        };

        let Dispatch { system, bay } = self.dispatcher.dispatch(&view);

        // A verify lasts for the one cycle that reported it.
        if self.activity == Activity::Verifying {
            self.set_activity(Activity::Idle, now);
        }
        for cmd in &bay {
            self.apply(*cmd, now);
        }

        CycleReport {
            cycle: self.cycles,
            timestamp_ms: now,
            view,
            snapshot,
            system_commands: system,
            bay_commands: bay,
        }
    }

    fn apply(&mut self, cmd: Command, now: u64) {
        let next = match cmd {
            Command::Dock => Activity::Docking,
            Command::Undock => Activity::Undocking,
            Command::Verify => Activity::Verifying,
            Command::Abort => Activity::Idle,
            Command::Reboot | Command::Rescan | Command::Rediscover => return,
        };
        self.set_activity(next, now);
    }

    fn set_activity(&mut self, next: Activity, now: u64) {
        if next == self.activity {
            return;
        }
        tracing::info!(bay = %self.engine.id(), from = %self.activity, to = %next, "bay activity changed");
        self.activity = next;
        self.motion_mark_ms = now;
    }

    fn check_motion_timer(&mut self, motion: Motion, now: u64) {
        let limit = match self.activity {
            Activity::Docking => self.dock_timeout_ms,
            Activity::Undocking => self.undock_timeout_ms,
            Activity::Idle | Activity::Verifying => return,
        };
        if motion.is_moving() {
            self.motion_mark_ms = now;
            return;
        }
        let still_for = now.saturating_sub(self.motion_mark_ms);
        if still_for >= limit {
            tracing::info!(bay = %self.engine.id(), still_ms = still_for, "motion timer expired");
            self.set_activity(Activity::Idle, now);
        }
    }
}
