use thiserror::Error;

/// Unit misuse. Always a configuration or programming error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("unknown unit '{0}'")]
    Unknown(String),
    #[error("cannot parse quantity '{0}'")]
    Parse(String),
    #[error("quantity '{0}' is out of range")]
    OutOfRange(String),
    #[error("incompatible units: {from} is a {from_dim}, {to} is a {to_dim}")]
    Incompatible {
        from: &'static str,
        from_dim: &'static str,
        to: &'static str,
        to_dim: &'static str,
    },
}

/// Runtime and wiring errors of the bay core.
#[derive(Debug, Error, Clone)]
pub enum BayError {
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("sensor source timed out")]
    SourceTimeout,
    #[error("sensor source error: {0}")]
    Source(String),
    #[error("message inbox is closed")]
    InboxClosed,
}

/// Rejected bay geometry or sensor wiring.
#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing range sensor configuration")]
    MissingRange,
    #[error("{role} references undefined sensor '{sensor}'")]
    UndefinedSensor { role: String, sensor: String },
    #[error("sensor '{0}' is used more than once by the bay")]
    DuplicateSensor(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("{field}: {source}")]
    Unit {
        field: String,
        #[source]
        source: UnitError,
    },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
