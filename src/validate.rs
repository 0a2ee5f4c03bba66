use serde::{Deserialize, Serialize};

use crate::codec::{Direction, Edge};
use crate::error::{GpioError, InvalidId};

pub const BOUND_LOW: u32 = 2;
pub const BOUND_HIGH: u32 = 27;

/// Inclusive range of physical line numbers exposed by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub low: u32,
    pub high: u32,
}

impl Default for Bound {
    fn default() -> Self {
        Self {
            low: BOUND_LOW,
            high: BOUND_HIGH,
        }
    }
}

impl Bound {
    pub fn new(low: u32, high: u32) -> Result<Self, GpioError> {
        if low == 0 || low > high {
            return Err(GpioError::Config(format!("invalid gpio bound {low}-{high}")));
        }
        Ok(Self { low, high })
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.low..=self.high).contains(&id)
    }

    pub fn validate(&self, candidate: i64) -> Result<u32, GpioError> {
        if candidate == 0 {
            return Err(InvalidId::Empty.into());
        }
        match u32::try_from(candidate) {
            Ok(id) if self.contains(id) => Ok(id),
            _ => Err(InvalidId::OutOfRange {
                low: self.low,
                high: self.high,
                value: candidate,
            }
            .into()),
        }
    }

    /// Validates a textual id, as found in configuration or on the command line.
    pub fn parse(&self, text: &str) -> Result<u32, GpioError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InvalidId::Empty.into());
        }
        let candidate: i64 = text
            .parse()
            .map_err(|_| InvalidId::NotInteger(text.to_string()))?;
        self.validate(candidate)
    }
}

pub fn validate_direction(candidate: &str) -> Result<Direction, GpioError> {
    candidate.parse()
}

pub fn validate_edge(candidate: &str) -> Result<Edge, GpioError> {
    candidate.parse()
}
