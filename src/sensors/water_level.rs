//! Reservoir level ladder.
//!
//! Five float contacts sit at empty / 25 / 50 / 75 / 100 % of the tank and
//! are only powered while a reading is taken (the enable line), which keeps
//! electrolysis off the contacts. A rising water line closes contacts from
//! the bottom up, so rungs are evaluated from the top: the highest closed
//! contact is the level.
//!
//! ## Safe default
//!
//! The enable line is driven low at construction and by an RAII guard at the
//! end of every read, including on panic unwinding.

use core::fmt;
use std::thread;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::WaterLevelPort;
use crate::drivers::gpio::{InputLine, OutputLine};

/// Quantised tank level, carried on the wire as its percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
#[repr(i8)]
pub enum WaterLevel {
    /// No contact closed.
    Dry = -1,
    Empty = 0,
    Quarter = 25,
    Half = 50,
    ThreeQuarter = 75,
    Full = 100,
}

impl WaterLevel {
    pub const fn percent(self) -> i8 {
        self as i8
    }

    /// Pixels the level mirror lights for this level.
    pub const fn lit_pixels(self) -> usize {
        match self {
            Self::Dry => 0,
            Self::Empty => 1,
            Self::Quarter => 2,
            Self::Half => 3,
            Self::ThreeQuarter => 4,
            Self::Full => 5,
        }
    }

    /// Quantise one set of rung states. First closed rung from the top wins.
    pub fn from_rungs(r: Rungs) -> Self {
        if r.full {
            Self::Full
        } else if r.three_quarter {
            Self::ThreeQuarter
        } else if r.half {
            Self::Half
        } else if r.quarter {
            Self::Quarter
        } else if r.empty {
            Self::Empty
        } else {
            Self::Dry
        }
    }
}

impl From<WaterLevel> for i8 {
    fn from(level: WaterLevel) -> Self {
        level.percent()
    }
}

impl TryFrom<i8> for WaterLevel {
    type Error = InvalidLevel;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Self::Dry),
            0 => Ok(Self::Empty),
            25 => Ok(Self::Quarter),
            50 => Ok(Self::Half),
            75 => Ok(Self::ThreeQuarter),
            100 => Ok(Self::Full),
            other => Err(InvalidLevel(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLevel(pub i8);

impl fmt::Display for InvalidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a ladder level", self.0)
    }
}

/// Raw contact states, bottom to top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rungs {
    pub empty: bool,
    pub quarter: bool,
    pub half: bool,
    pub three_quarter: bool,
    pub full: bool,
}

impl Rungs {
    /// Ladder with the bottom `n` contacts closed.
    pub fn submerged(n: usize) -> Self {
        Self {
            empty: n >= 1,
            quarter: n >= 2,
            half: n >= 3,
            three_quarter: n >= 4,
            full: n >= 5,
        }
    }
}

/// Holds the ladder's enable line high for its lifetime.
struct EnableGuard<'a, E: OutputLine> {
    line: &'a mut E,
}

impl<'a, E: OutputLine> EnableGuard<'a, E> {
    fn energise(line: &'a mut E) -> Self {
        if let Err(e) = line.set_level(true) {
            warn!("level: enable line write failed ({e})");
        }
        Self { line }
    }
}

impl<E: OutputLine> Drop for EnableGuard<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.line.set_level(false) {
            warn!("level: enable line release failed ({e})");
        }
    }
}

/// Five-contact ladder with a shared enable line.
pub struct WaterLevelSensor<E, I> {
    enable: E,
    /// Bottom to top: empty, quarter, half, three-quarter, full.
    rungs: [I; 5],
    settle: Duration,
}

impl<E: OutputLine, I: InputLine> WaterLevelSensor<E, I> {
    pub fn new(mut enable: E, rungs: [I; 5], settle: Duration) -> Self {
        if let Err(e) = enable.set_level(false) {
            warn!("level: enable line init failed ({e})");
        }
        Self {
            enable,
            rungs,
            settle,
        }
    }

    /// Energise, settle, sample every contact, de-energise.
    pub fn sample_rungs(&mut self) -> Rungs {
        let _powered = EnableGuard::energise(&mut self.enable);
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        let mut closed = [false; 5];
        for (state, rung) in closed.iter_mut().zip(self.rungs.iter_mut()) {
            // An unreadable contact counts as open.
            *state = rung.read_level().unwrap_or(false);
        }
        Rungs {
            empty: closed[0],
            quarter: closed[1],
            half: closed[2],
            three_quarter: closed[3],
            full: closed[4],
        }
    }
}

impl<E, I> WaterLevelPort for WaterLevelSensor<E, I>
where
    E: OutputLine,
    I: InputLine,
{
    fn read(&mut self) -> WaterLevel {
        WaterLevel::from_rungs(self.sample_rungs())
    }

    fn release(&mut self) {
        if let Err(e) = self.enable.set_level(false) {
            warn!("level: enable line release failed ({e})");
        }
    }
}
