//! Command triggers.
//!
//! Each trigger watches either inbound messages or the per-cycle bay view and
//! turns what it sees into high-level commands on its own FIFO queue. The
//! reaction of every trigger kind is the pure function [`react`]; `Trigger`
//! only stores the watch state and the queue around it.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::BayError;
use crate::status::{BayView, Lifecycle, Occupancy};

// ── Commands ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Dock,
    Undock,
    Verify,
    Abort,
    Reboot,
    Rescan,
    Rediscover,
}

impl Command {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dock => "dock",
            Self::Undock => "undock",
            Self::Verify => "verify",
            Self::Abort => "abort",
            Self::Reboot => "reboot",
            Self::Rescan => "rescan",
            Self::Rediscover => "rediscover",
        }
    }

    /// Commands handled by the system rather than by a bay.
    pub const fn is_system(self) -> bool {
        matches!(self, Self::Reboot | Self::Rescan | Self::Rediscover)
    }
}

impl FromStr for Command {
    type Err = BayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cmd = match s.trim().to_ascii_lowercase().as_str() {
            "dock" => Self::Dock,
            "undock" => Self::Undock,
            "verify" => Self::Verify,
            "abort" => Self::Abort,
            "reboot" => Self::Reboot,
            "rescan" => Self::Rescan,
            "rediscover" => Self::Rediscover,
            _ => return Err(BayError::UnknownCommand(s.trim().to_string())),
        };
        Ok(cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FIFO of pending commands. Oldest first out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    inner: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, cmd: Command) {
        self.inner.push_back(cmd);
    }

    /// Remove and return everything queued, in arrival order.
    pub fn drain_all(&mut self) -> Vec<Command> {
        self.inner.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.inner.iter()
    }
}

// ── Topics ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicMode {
    /// Use the topic verbatim.
    Full,
    /// Append the topic to the system prefix.
    #[default]
    Suffix,
}

pub fn resolve_topic(prefix: &str, topic: &str, mode: TopicMode) -> String {
    match mode {
        TopicMode::Full => topic.to_string(),
        TopicMode::Suffix => format!("{prefix}/{topic}"),
    }
}

/// Bay command topics live under the bay: `<prefix>/<bay_id>/<topic>`.
pub fn bay_topic(prefix: &str, bay_id: &str, topic: &str) -> String {
    format!("{prefix}/{bay_id}/{topic}")
}

// ── Trigger kinds ────────────────────────────────────────────────────────────

/// How an observed sensor value fires a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeMode {
    /// Fire whenever the value equals this.
    To(String),
    /// Fire when the value moves away from this.
    From(String),
}

/// What a fired trigger enqueues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Undock an occupied bay, dock an empty one.
    Occupancy,
    Command(Command),
}

impl FromStr for Action {
    type Err = BayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("occupancy") {
            Ok(Self::Occupancy)
        } else {
            s.parse().map(Self::Command)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    SystemCommand {
        topic: String,
    },
    BayCommand {
        topic: String,
    },
    MqttSensor {
        topic: String,
        mode: ChangeMode,
        action: Action,
    },
    Range {
        action: Action,
    },
}

impl TriggerKind {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::SystemCommand { .. } => "syscmd",
            Self::BayCommand { .. } => "baycmd",
            Self::MqttSensor { .. } => "mqtt_sensor",
            Self::Range { .. } => "range",
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match self {
            Self::SystemCommand { topic }
            | Self::BayCommand { topic }
            | Self::MqttSensor { topic, .. } => Some(topic),
            Self::Range { .. } => None,
        }
    }
}

/// Something a trigger can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Message { topic: &'a str, payload: &'a str },
    /// The bay view was refreshed for a new cycle.
    BayChanged,
}

/// What a trigger kind remembers between events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchState {
    pub previous_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub state: WatchState,
    pub commands: Vec<Command>,
}

/// Pure reaction of a trigger kind to one event.
pub fn react(kind: &TriggerKind, prior: &WatchState, event: &Event<'_>, view: &BayView) -> Reaction {
    let mut state = prior.clone();
    let mut commands = Vec::new();

    match (kind, event) {
        (TriggerKind::SystemCommand { topic }, Event::Message { topic: t, payload }) if t == topic => {
            match payload.parse::<Command>() {
                Ok(cmd) if cmd.is_system() => commands.push(cmd),
                Ok(cmd) => tracing::warn!(command = %cmd, "bay command on system topic discarded"),
                Err(e) => tracing::warn!(error = %e, "system command discarded"),
            }
        }
        (TriggerKind::BayCommand { topic }, Event::Message { topic: t, payload }) if t == topic => {
            match payload.parse::<Command>() {
                Ok(Command::Abort) => commands.push(Command::Abort),
                Ok(cmd @ (Command::Dock | Command::Undock | Command::Verify)) => {
                    if view.activity.is_motion() || view.lifecycle == Lifecycle::Unavailable {
                        tracing::info!(
                            bay = %view.bay_id,
                            command = %cmd,
                            activity = %view.activity,
                            lifecycle = %view.lifecycle,
                            "bay busy or unavailable, command refused"
                        );
                    } else {
                        commands.push(cmd);
                    }
                }
                Ok(cmd) => tracing::warn!(command = %cmd, "system command on bay topic discarded"),
                Err(e) => tracing::warn!(bay = %view.bay_id, error = %e, "bay command discarded"),
            }
        }
        (
            TriggerKind::MqttSensor {
                topic,
                mode,
                action,
            },
            Event::Message { topic: t, payload },
        ) if t == topic => {
            let value = payload.trim().to_ascii_lowercase();
            let fire = match mode {
                ChangeMode::To(target) => value == *target,
                ChangeMode::From(target) => {
                    prior.previous_value.as_deref() == Some(target.as_str()) && value != *target
                }
            };
            state.previous_value = Some(value);
            if fire {
                commands.extend(resolve_action(*action, view));
            }
        }
        (TriggerKind::Range { action }, Event::BayChanged) if view.motion.is_moving() => {
            commands.extend(resolve_action(*action, view));
        }
        _ => {}
    }

    Reaction { state, commands }
}

fn resolve_action(action: Action, view: &BayView) -> Option<Command> {
    match action {
        Action::Command(cmd) => Some(cmd),
        Action::Occupancy => match view.occupancy {
            Occupancy::Occupied => Some(Command::Undock),
            Occupancy::Unoccupied => Some(Command::Dock),
            Occupancy::Unknown => {
                tracing::info!(bay = %view.bay_id, "occupancy unknown, no action taken");
                None
            }
        },
    }
}

// ── Trigger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Trigger {
    id: String,
    kind: TriggerKind,
    state: WatchState,
    queue: CommandQueue,
}

impl Trigger {
    pub fn new(id: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            state: WatchState::default(),
            queue: CommandQueue::new(),
        }
    }

    pub fn system_command(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::new(id, TriggerKind::SystemCommand { topic: topic.into() })
    }

    pub fn bay_command(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::new(id, TriggerKind::BayCommand { topic: topic.into() })
    }

    /// `mode` values are matched case-insensitively.
    pub fn mqtt_sensor(
        id: impl Into<String>,
        topic: impl Into<String>,
        mode: ChangeMode,
        action: Action,
    ) -> Self {
        let mode = match mode {
            ChangeMode::To(v) => ChangeMode::To(v.trim().to_ascii_lowercase()),
            ChangeMode::From(v) => ChangeMode::From(v.trim().to_ascii_lowercase()),
        };
        Self::new(
            id,
            TriggerKind::MqttSensor {
                topic: topic.into(),
                mode,
                action,
            },
        )
    }

    pub fn range(id: impl Into<String>, action: Action) -> Self {
        Self::new(id, TriggerKind::Range { action })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &TriggerKind {
        &self.kind
    }

    pub fn watch_state(&self) -> &WatchState {
        &self.state
    }

    pub fn is_system(&self) -> bool {
        matches!(self.kind, TriggerKind::SystemCommand { .. })
    }

    /// Feed one event; returns how many commands were enqueued.
    pub fn observe(&mut self, event: &Event<'_>, view: &BayView) -> usize {
        let Reaction { state, commands } = react(&self.kind, &self.state, event, view);
        self.state = state;
        let n = commands.len();
        for cmd in commands {
            tracing::debug!(trigger = %self.id, command = %cmd, "command queued");
            self.queue.enqueue(cmd);
        }
        n
    }

    pub fn drain(&mut self) -> Vec<Command> {
        self.queue.drain_all()
    }

    /// Commands are waiting. Does not consume them.
    pub fn triggered(&self) -> bool {
        !self.queue.is_empty()
    }
}
