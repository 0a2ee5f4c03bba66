use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GpioError;

pub const UP: &str = "1";
pub const DOWN: &str = "0";

/// Electrical state of a line as encoded in its `value` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn encode(self) -> &'static str {
        match self {
            Level::High => UP,
            Level::Low => DOWN,
        }
    }

    /// Decodes the raw contents of a `value` file. Trailing whitespace is
    /// ignored and an empty file reads as low.
    pub fn decode(raw: &str) -> Level {
        let raw = raw.trim();
        let raw = if raw.is_empty() { DOWN } else { raw };
        if raw == UP { Level::High } else { Level::Low }
    }

    /// Lenient conversion used by writes: only the up symbol is high.
    pub fn coerce(symbol: &str) -> Level {
        if symbol == UP { Level::High } else { Level::Low }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(bit: bool) -> Self {
        if bit { Level::High } else { Level::Low }
    }
}

impl From<u8> for Level {
    fn from(bit: u8) -> Self {
        if bit == 1 { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

impl FromStr for Level {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            UP => Ok(Level::High),
            DOWN => Ok(Level::Low),
            other => Err(GpioError::InvalidValue(other.to_string())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl FromStr for Direction {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(GpioError::InvalidDirection(other.to_string())),
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = GpioError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Edge {
    #[default]
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }

    /// Whether a transition from `from` to `to` raises an interrupt under this edge.
    pub fn triggers(self, from: Level, to: Level) -> bool {
        match (self, from, to) {
            (Edge::None, _, _) => false,
            (_, a, b) if a == b => false,
            (Edge::Rising, _, to) => to == Level::High,
            (Edge::Falling, _, to) => to == Level::Low,
            (Edge::Both, _, _) => true,
        }
    }
}

impl FromStr for Edge {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Edge::None),
            "rising" => Ok(Edge::Rising),
            "falling" => Ok(Edge::Falling),
            "both" => Ok(Edge::Both),
            other => Err(GpioError::InvalidEdge(other.to_string())),
        }
    }
}

impl TryFrom<&str> for Edge {
    type Error = GpioError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
