//! Mode machine: the single owner of the device's operating mode.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ModeTable                                   │
//! │  ┌────────────┬──────────────┬────────────┐  │
//! │  │ Mode       │ busy         │ on_enter   │  │
//! │  ├────────────┼──────────────┼────────────┤  │
//! │  │ Booting    │              │ boot sweep │  │
//! │  │ Ok         │              │ clear      │  │
//! │  │ Hot … Out  │              │ alert meter│  │
//! │  │ Watering   │ ✔            │ meter      │  │
//! │  │ Filling    │ ✔            │ clear      │  │
//! │  │ Emptying   │ ✔            │ clear      │  │
//! │  └────────────┴──────────────┴────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The mode lives behind one mutex. Every write is a check-and-set under
//! that lock ([`ModeMachine::admit`], [`ModeMachine::enter_alert`],
//! [`ModeMachine::transition_from`]), so a reader never sees a torn mode
//! and two threads can never both win a busy mode. The entry action runs
//! inside the same critical section; actions only enqueue LED work and
//! never block.

pub mod alerts;
pub mod states;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::FeedbackPort;
use crate::scheduler::lock;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Every operating mode of the device.
/// Must stay in sync with the table built in [`states::build_mode_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Mode {
    Booting = 0,
    Ready = 1,
    Ok = 2,
    Hot = 3,
    Cold = 4,
    Drowned = 5,
    Thirsty = 6,
    TooDark = 7,
    TooBright = 8,
    OutOfWater = 9,
    Watering = 10,
    Emptying = 11,
    Filling = 12,
}

impl Mode {
    /// Total number of modes — used to size the table array.
    pub const COUNT: usize = 13;

    pub const ALL: [Mode; Mode::COUNT] = [
        Self::Booting,
        Self::Ready,
        Self::Ok,
        Self::Hot,
        Self::Cold,
        Self::Drowned,
        Self::Thirsty,
        Self::TooDark,
        Self::TooBright,
        Self::OutOfWater,
        Self::Watering,
        Self::Emptying,
        Self::Filling,
    ];

    /// A busy mode owns the pump or the tank and refuses mode changes.
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Watering | Self::Emptying | Self::Filling)
    }

    pub const fn is_alert(self) -> bool {
        matches!(
            self,
            Self::Hot
                | Self::Cold
                | Self::Drowned
                | Self::Thirsty
                | Self::TooDark
                | Self::TooBright
                | Self::OutOfWater
        )
    }
}

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Entry action, run once each time the mode is entered.
pub type EnterFn = fn(&dyn FeedbackPort);

pub struct ModeDescriptor {
    pub id: Mode,
    pub name: &'static str,
    pub on_enter: Option<EnterFn>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of asking for a busy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The requested mode is now current.
    Admitted { from: Mode },
    /// Refused: the device is in `current`, which is busy or still booting.
    Refused { current: Mode },
}

/// Result of an alert notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEntry {
    /// Alert mode entered; the user must be told.
    Entered { from: Mode },
    /// Already in that alert mode; nothing to tell.
    Suppressed,
    /// Busy or booting; alert dropped.
    Deferred { current: Mode },
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct ModeState {
    current: Mode,
    entered_at: Instant,
    transitions: u64,
}

pub struct ModeMachine {
    /// Fixed-size table indexed by `Mode as usize`.
    table: [ModeDescriptor; Mode::COUNT],
    state: Mutex<ModeState>,
    feedback: Arc<dyn FeedbackPort>,
}

impl ModeMachine {
    pub fn new(
        table: [ModeDescriptor; Mode::COUNT],
        initial: Mode,
        feedback: Arc<dyn FeedbackPort>,
    ) -> Self {
        Self {
            table,
            state: Mutex::new(ModeState {
                current: initial,
                entered_at: Instant::now(),
                transitions: 0,
            }),
            feedback,
        }
    }

    /// Run the entry action of the starting mode.
    pub fn start(&self) {
        let st = lock(&self.state);
        info!("mode: starting in {}", self.name(st.current));
        self.run_enter(st.current);
    }

    pub fn current(&self) -> Mode {
        lock(&self.state).current
    }

    pub fn time_in_mode(&self) -> Duration {
        lock(&self.state).entered_at.elapsed()
    }

    pub fn transition_count(&self) -> u64 {
        lock(&self.state).transitions
    }

    pub fn name(&self, mode: Mode) -> &'static str {
        self.table[mode as usize].name
    }

    /// Move from `expected` to `to`. Does nothing (and returns `false`) if
    /// the mode has moved on since the caller last looked.
    pub fn transition_from(&self, expected: Mode, to: Mode) -> bool {
        let mut st = lock(&self.state);
        if st.current != expected {
            return false;
        }
        self.enter(&mut st, to);
        true
    }

    /// Claim a busy mode unless another busy mode holds the device.
    pub fn admit(&self, to: Mode) -> Admission {
        let mut st = lock(&self.state);
        let current = st.current;
        if current.is_busy() || current == Mode::Booting {
            return Admission::Refused { current };
        }
        self.enter(&mut st, to);
        Admission::Admitted { from: current }
    }

    /// Enter an alert mode, once per visit.
    pub fn enter_alert(&self, to: Mode) -> AlertEntry {
        let mut st = lock(&self.state);
        let current = st.current;
        if current.is_busy() || current == Mode::Booting {
            return AlertEntry::Deferred { current };
        }
        if current == to {
            return AlertEntry::Suppressed;
        }
        self.enter(&mut st, to);
        AlertEntry::Entered { from: current }
    }

    fn enter(&self, st: &mut ModeState, to: Mode) {
        info!("mode: {} -> {}", self.name(st.current), self.name(to));
        st.current = to;
        st.entered_at = Instant::now();
        st.transitions = st.transitions.wrapping_add(1);
        self.run_enter(to);
    }

    fn run_enter(&self, mode: Mode) {
        if let Some(enter) = self.table[mode as usize].on_enter {
            enter(self.feedback.as_ref());
        }
    }
}
