//! Boundary traits shared between sensor drivers, the bay core and the CLI.
//!
//! Drivers hand the core raw per-cycle samples; they never interpret them.
pub mod clock;

pub use clock::{Clock, MonotonicClock, SteppedClock};

/// Why a driver could not produce a distance this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleFault {
    /// Sensor did not answer within its timing budget.
    Timeout,
    /// Target is beyond the sensor's physical range (weak/no return).
    OutOfRange,
    /// Any other driver-reported failure.
    Fault(String),
}

/// One raw sample as reported by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRange {
    /// A distance with the unit string the driver measures in ("mm", "cm", ...).
    Distance { value: f64, unit: String },
    Failed(SampleFault),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub sensor_id: String,
    pub range: RawRange,
}

impl RawSample {
    pub fn distance(sensor_id: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            range: RawRange::Distance {
                value,
                unit: unit.into(),
            },
        }
    }

    pub fn failed(sensor_id: impl Into<String>, fault: SampleFault) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            range: RawRange::Failed(fault),
        }
    }
}

/// Source of one polling cycle's worth of samples.
///
/// Implementations own the hardware (or a script) and return whatever each
/// sensor produced this cycle. A sensor that produced nothing may simply be absent.
pub trait SensorSource {
    fn poll(&mut self) -> Result<Vec<RawSample>, Box<dyn std::error::Error + Send + Sync>>;
}
