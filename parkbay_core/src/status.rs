//! Bay-level state enumerations and the per-cycle `BayView`.
//!
//! Every enum renders as the lowercase token published to the network side.

use std::fmt;

macro_rules! lowercase_tokens {
    ($ty:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Coarse availability of the bay, re-evaluated on every availability recheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Initializing,
    Ready,
    Unavailable,
}

lowercase_tokens!(Lifecycle {
    Initializing => "initializing",
    Ready => "ready",
    Unavailable => "unavailable",
});

/// What the bay is currently doing. Independent of lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Docking,
    Undocking,
    Verifying,
}

lowercase_tokens!(Activity {
    Idle => "idle",
    Docking => "docking",
    Undocking => "undocking",
    Verifying => "verifying",
});

impl Activity {
    /// Docking and undocking hold the bay; new motion commands are refused meanwhile.
    pub const fn is_motion(self) -> bool {
        matches!(self, Self::Docking | Self::Undocking)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occupancy {
    Occupied,
    Unoccupied,
    #[default]
    Unknown,
}

lowercase_tokens!(Occupancy {
    Occupied => "occupied",
    Unoccupied => "unoccupied",
    Unknown => "unknown",
});

/// Direction of travel seen by the range sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    Approaching,
    Receding,
    Still,
    #[default]
    Unknown,
}

lowercase_tokens!(Motion {
    Approaching => "approaching",
    Receding => "receding",
    Still => "still",
    Unknown => "unknown",
});

impl Motion {
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::Approaching | Self::Receding)
    }
}

/// How the range reading reads against the stop point, for guidance displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeQuality {
    /// Something is right against the sensor.
    Emergency,
    NoObject,
    /// Overshot the stop point by more than the park spread.
    BackUp,
    Park,
    Final,
    Base,
    Ok,
    /// The sensor reported nothing within its own limit.
    BeyondRange,
    NoReading,
    #[default]
    Unknown,
}

lowercase_tokens!(RangeQuality {
    Emergency => "emergency",
    NoObject => "no_object",
    BackUp => "back_up",
    Park => "park",
    Final => "final",
    Base => "base",
    Ok => "ok",
    BeyondRange => "beyond_range",
    NoReading => "no_reading",
    Unknown => "unknown",
});

/// Availability reported for a single sensor by the driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

lowercase_tokens!(Availability {
    Available => "available",
    Unavailable => "unavailable",
});

/// One consistent view of the bay for a single cycle, shared read-only by every trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BayView {
    pub bay_id: String,
    pub lifecycle: Lifecycle,
    pub activity: Activity,
    pub occupancy: Occupancy,
    pub motion: Motion,
}

impl BayView {
    pub fn new(bay_id: impl Into<String>) -> Self {
        Self {
            bay_id: bay_id.into(),
            lifecycle: Lifecycle::default(),
            activity: Activity::default(),
            occupancy: Occupancy::default(),
            motion: Motion::default(),
        }
    }
}
