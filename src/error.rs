use std::convert::Infallible;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error("Wrong direction (in/out): {0}")]
    InvalidDirection(String),
    #[error("Wrong edge (none/rising/falling/both): {0}")]
    InvalidEdge(String),
    #[error("Wrong value (1/0): {0}")]
    InvalidValue(String),
    #[error("Not exported: {0}")]
    NotClaimed(u32),
    #[error("Not configured for output: {0}")]
    NotOutput(u32),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidId {
    #[error("Empty gpio id")]
    Empty,
    #[error("Gpio id must be an integer: {0}")]
    NotInteger(String),
    #[error("Out of range ({low}-{high}): {value}")]
    OutOfRange { low: u32, high: u32, value: i64 },
}

impl GpioError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GpioError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the validation family, which never leaves partial writes behind.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GpioError::InvalidId(_)
                | GpioError::InvalidDirection(_)
                | GpioError::InvalidEdge(_)
                | GpioError::InvalidValue(_)
        )
    }
}

// Lets operations accept both typed values and raw strings through `TryInto`.
impl From<Infallible> for GpioError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
