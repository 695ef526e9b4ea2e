#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Bay position and sensor fusion core (hardware-agnostic).
//!
//! Sensor drivers hand over raw per-cycle samples through
//! `parkbay_traits::SensorSource`; everything from there to a command stream
//! lives here.
//!
//! ## Architecture
//!
//! - **Units**: unit-tagged `Quantity` with dimension-checked arithmetic (`units`)
//! - **Buffers**: per-sensor rolling window and debounced mode estimate (`buffer`)
//! - **Engine**: range adjustment, lateral zones, occupancy, lifecycle (`engine`, `builder`)
//! - **Triggers**: message and state watchers with FIFO command queues (`triggers`, `dispatch`)
//! - **Monitor**: the polling cycle that ties them together (`monitor`)
//!
//! Distances are kept in centimeters and times in milliseconds internally;
//! the unit a value was expressed in is only used for presentation.

pub mod buffer;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod sample;
pub mod status;
pub mod triggers;
pub mod units;

pub use buffer::{InvalidReason, ReadingValue, SensorBuffer, SensorReading};
pub use builder::BayEngineBuilder;
pub use config::{BayConfig, LateralZoneConfig, RangeConfig, Side, Timeouts};
pub use conversions::build_monitor;
pub use dispatch::{Dispatch, Dispatcher, MessageSender};
pub use engine::{BayStateEngine, BayStateSnapshot, LateralZoneResult, RangeResult, Severity, ZoneReport};
pub use error::{BayError, BuildError, Result, UnitError};
pub use monitor::{BayMonitor, CycleReport};
pub use status::{Activity, Availability, BayView, Lifecycle, Motion, Occupancy, RangeQuality};
pub use triggers::{Action, ChangeMode, Command, CommandQueue, Event, TopicMode, Trigger, TriggerKind};
pub use units::{Dimension, Quantity, Unit, UnitSystem};
