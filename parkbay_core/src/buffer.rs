//! Per-sensor rolling window with a debounced mode estimate.

use std::collections::VecDeque;

use crate::status::Motion;
use crate::units::Quantity;

pub const DEFAULT_CAPACITY: usize = 10;

/// Why a reading carries no distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    Fault(String),
    Timeout,
    OutOfRange,
    NoReading,
}

impl InvalidReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fault(_) => "fault",
            Self::Timeout => "timeout",
            Self::OutOfRange => "out_of_range",
            Self::NoReading => "no_reading",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    Valid(Quantity),
    Invalid(InvalidReason),
}

/// One sensor sample as seen by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub value: ReadingValue,
    pub timestamp_ms: u64,
}

impl SensorReading {
    pub fn valid(q: Quantity, timestamp_ms: u64) -> Self {
        Self {
            value: ReadingValue::Valid(q),
            timestamp_ms,
        }
    }

    pub fn invalid(reason: InvalidReason, timestamp_ms: u64) -> Self {
        Self {
            value: ReadingValue::Invalid(reason),
            timestamp_ms,
        }
    }

    pub fn quantity(&self) -> Option<Quantity> {
        match self.value {
            ReadingValue::Valid(q) => Some(q),
            ReadingValue::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.value, ReadingValue::Valid(_))
    }
}

/// Bounded FIFO of recent readings for one sensor.
#[derive(Debug, Clone)]
pub struct SensorBuffer {
    readings: VecDeque<SensorReading>,
    capacity: usize,
}

impl Default for SensorBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SensorBuffer {
    /// A zero capacity is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, reading: SensorReading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    /// At least one valid reading is buffered.
    pub fn is_available(&self) -> bool {
        self.readings.iter().any(SensorReading::is_valid)
    }

    /// Mode of the valid values. Ties go to the value whose latest occurrence is newest,
    /// and the returned reading is that occurrence. With no valid values the result is
    /// `Invalid`, carrying the newest invalid reason.
    pub fn estimate(&self) -> SensorReading {
        // (base magnitude, count, index of latest occurrence)
        let mut tally: Vec<(f64, usize, usize)> = Vec::new();
        for (idx, reading) in self.readings.iter().enumerate() {
            let Some(q) = reading.quantity() else {
                continue;
            };
            let key = q.base_magnitude();
            match tally.iter_mut().find(|(v, _, _)| *v == key) {
                Some(entry) => {
                    entry.1 += 1;
                    entry.2 = idx;
                }
                None => tally.push((key, 1, idx)),
            }
        }

        let winner = tally
            .iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)))
            .map(|&(_, _, idx)| idx);

        match winner.and_then(|idx| self.readings.get(idx)) {
            Some(reading) => reading.clone(),
            None => match self.readings.back() {
                Some(newest) => {
                    let reason = match &newest.value {
                        ReadingValue::Invalid(r) => r.clone(),
                        ReadingValue::Valid(_) => InvalidReason::NoReading,
                    };
                    SensorReading::invalid(reason, newest.timestamp_ms)
                }
                None => SensorReading::invalid(InvalidReason::NoReading, 0),
            },
        }
    }

    /// Net travel between the oldest and newest valid readings in the window.
    pub fn motion(&self, margin: &Quantity) -> Motion {
        let mut valid = self.readings.iter().filter_map(SensorReading::quantity);
        let Some(oldest) = valid.next() else {
            return Motion::Unknown;
        };
        let Some(newest) = valid.last() else {
            return Motion::Unknown;
        };
        let Ok(travel) = newest.checked_sub(&oldest) else {
            return Motion::Unknown;
        };
        match travel.abs().try_le(margin) {
            Ok(true) => Motion::Still,
            Ok(false) if travel.is_negative() => Motion::Approaching,
            Ok(false) => Motion::Receding,
            Err(_) => Motion::Unknown,
        }
    }
}
