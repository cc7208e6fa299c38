//! Simulated time.
//!
//! Durations are kept in femtoseconds, the finest unit a discrete-event
//! design can name. They are parsed from and displayed as compact strings
//! such as `10ns` or `1s5ms`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for simulated time arithmetic and parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid time literal: {0:?}")]
    Parse(String),

    #[error("time value overflows: {amount}{unit}")]
    Overflow { amount: u64, unit: TimeUnit },

    #[error("cannot subtract {subtrahend} from {minuend}")]
    Negative { minuend: SimTime, subtrahend: SimTime },
}

/// Units of simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeUnit {
    Fs,
    Ps,
    Ns,
    Us,
    Ms,
    S,
}

impl TimeUnit {
    /// Largest unit first.
    pub const ALL: [TimeUnit; 6] = [
        TimeUnit::S,
        TimeUnit::Ms,
        TimeUnit::Us,
        TimeUnit::Ns,
        TimeUnit::Ps,
        TimeUnit::Fs,
    ];

    /// Femtoseconds per unit.
    pub const fn femtos(self) -> u64 {
        match self {
            TimeUnit::Fs => 1,
            TimeUnit::Ps => 1_000,
            TimeUnit::Ns => 1_000_000,
            TimeUnit::Us => 1_000_000_000,
            TimeUnit::Ms => 1_000_000_000_000,
            TimeUnit::S => 1_000_000_000_000_000,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A non-negative simulated duration with femtosecond resolution.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SimTime {
    femtos: u64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { femtos: 0 };

    pub const fn from_femtos(femtos: u64) -> Self {
        Self { femtos }
    }

    /// `amount` of `unit`, failing if it does not fit.
    pub fn new(amount: u64, unit: TimeUnit) -> Result<Self, TimeError> {
        amount
            .checked_mul(unit.femtos())
            .map(Self::from_femtos)
            .ok_or(TimeError::Overflow { amount, unit })
    }

    pub const fn as_femtos(self) -> u64 {
        self.femtos
    }

    pub const fn is_zero(self) -> bool {
        self.femtos == 0
    }

    /// `self - other`, an error if `other` is larger.
    pub fn checked_sub(self, other: SimTime) -> Result<SimTime, TimeError> {
        self.femtos
            .checked_sub(other.femtos)
            .map(Self::from_femtos)
            .ok_or(TimeError::Negative {
                minuend: self,
                subtrahend: other,
            })
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.femtos == 0 {
            return f.write_str("0s");
        }
        let mut rest = self.femtos;
        for unit in TimeUnit::ALL {
            let amount = rest / unit.femtos();
            rest %= unit.femtos();
            if amount > 0 {
                write!(f, "{amount}{unit}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for SimTime {
    type Err = TimeError;

    /// Parses a sequence of `<amount><unit>` components, e.g. `10ns` or `1s5ms`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let literal = s.trim();
        let invalid = || TimeError::Parse(s.to_string());
        if literal.is_empty() {
            return Err(invalid());
        }

        let mut total = SimTime::ZERO;
        let mut rest = literal;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
            if digits == 0 {
                return Err(invalid());
            }
            let amount: u64 = rest[..digits].parse().map_err(|_| invalid())?;
            rest = &rest[digits..];

            let letters = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            let unit = match &rest[..letters] {
                "fs" => TimeUnit::Fs,
                "ps" => TimeUnit::Ps,
                "ns" => TimeUnit::Ns,
                "us" => TimeUnit::Us,
                "ms" => TimeUnit::Ms,
                "s" => TimeUnit::S,
                _ => return Err(invalid()),
            };
            rest = &rest[letters..];

            let part = SimTime::new(amount, unit)?;
            total = total
                .femtos
                .checked_add(part.femtos)
                .map(SimTime::from_femtos)
                .ok_or(TimeError::Overflow { amount, unit })?;
        }
        Ok(total)
    }
}

impl TryFrom<String> for SimTime {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SimTime> for String {
    fn from(value: SimTime) -> Self {
        value.to_string()
    }
}
