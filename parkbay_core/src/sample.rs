//! Maps driver-side samples and errors into core types.
//!
//! `parkbay_traits` keeps the driver boundary untyped (unit strings, boxed
//! errors); this module is where they become `SensorReading`s and `BayError`s.

use parkbay_traits::{RawRange, RawSample, SampleFault};

use crate::buffer::{InvalidReason, SensorReading};
use crate::error::BayError;
use crate::units::Quantity;

/// Convert one raw sample. Unknown units and non-finite values become `Invalid(Fault)`.
pub fn to_reading(sample: &RawSample, timestamp_ms: u64) -> SensorReading {
    match &sample.range {
        RawRange::Distance { value, unit } => {
            if !value.is_finite() {
                tracing::warn!(sensor = %sample.sensor_id, value, "non-finite sample");
                return SensorReading::invalid(
                    InvalidReason::Fault("non-finite value".to_string()),
                    timestamp_ms,
                );
            }
            match Quantity::with_unit_str(*value, unit) {
                Ok(q) => SensorReading::valid(q, timestamp_ms),
                Err(e) => {
                    tracing::warn!(sensor = %sample.sensor_id, error = %e, "sample unit rejected");
                    SensorReading::invalid(InvalidReason::Fault(e.to_string()), timestamp_ms)
                }
            }
        }
        RawRange::Failed(fault) => SensorReading::invalid(reason_for(fault), timestamp_ms),
    }
}

fn reason_for(fault: &SampleFault) -> InvalidReason {
    match fault {
        SampleFault::Timeout => InvalidReason::Timeout,
        SampleFault::OutOfRange => InvalidReason::OutOfRange,
        SampleFault::Fault(msg) => InvalidReason::Fault(msg.clone()),
    }
}

/// Map a `SensorSource` error to a typed `BayError`.
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> BayError {
    if let Some(bay) = e.downcast_ref::<BayError>() {
        return bay.clone();
    }
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        BayError::SourceTimeout
    } else {
        BayError::Source(s)
    }
}
