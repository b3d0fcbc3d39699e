//! Watering pump driver (logic-level MOSFET on a single GPIO).
//!
//! ## Safety contract
//!
//! The pump is never left on without a pending shutoff. [`PumpActuator::trigger`]
//! energises the line and arms a one-shot shutoff in the same critical
//! section; a trigger while running is ignored rather than extending the
//! burst. After [`PumpActuator::teardown`] the line is held low and every
//! further trigger is refused.
//!
//! Each burst carries a run id. The shutoff task only acts on the burst it
//! was armed for, so a late timer can never cut short a newer burst.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::drivers::gpio::OutputLine;
use crate::error::ActuatorError;
use crate::scheduler::{TaskSlot, lock};

/// Result of a trigger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The pump was off and is now running.
    Started,
    /// The pump was already running; nothing changed.
    Ignored,
}

/// Snapshot of the pump for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpState {
    pub running: bool,
    pub shutoff_deadline: Option<Instant>,
}

struct PumpInner {
    line: Box<dyn OutputLine>,
    running: bool,
    shutoff_deadline: Option<Instant>,
    run_id: u64,
    disabled: bool,
}

impl PumpInner {
    fn drive_off(&mut self) {
        if let Err(e) = self.line.set_level(false) {
            warn!("pump: failed to drive line low ({e})");
        }
        self.running = false;
        self.shutoff_deadline = None;
    }
}

pub struct PumpActuator {
    inner: Arc<Mutex<PumpInner>>,
    shutoff: TaskSlot,
}

impl PumpActuator {
    /// Take ownership of the pump line and drive it low.
    pub fn new(line: impl OutputLine + 'static) -> Self {
        let mut inner = PumpInner {
            line: Box::new(line),
            running: false,
            shutoff_deadline: None,
            run_id: 0,
            disabled: false,
        };
        inner.drive_off();
        Self {
            inner: Arc::new(Mutex::new(inner)),
            shutoff: TaskSlot::new("pump-off\0"),
        }
    }

    /// Run the pump for `duration`, or do nothing if it is already running.
    pub fn trigger(&self, duration: Duration) -> Result<TriggerOutcome, ActuatorError> {
        let mut st = lock(&self.inner);
        if st.disabled {
            return Err(ActuatorError::Disabled);
        }
        if st.running {
            debug!("pump: already running, trigger ignored");
            return Ok(TriggerOutcome::Ignored);
        }

        st.line.set_level(true)?;
        st.running = true;
        st.shutoff_deadline = Some(Instant::now() + duration);
        st.run_id = st.run_id.wrapping_add(1);
        let run_id = st.run_id;

        let inner = Arc::clone(&self.inner);
        let armed = self.shutoff.schedule_once(duration, move || {
            let mut st = lock(&inner);
            if st.running && st.run_id == run_id {
                st.drive_off();
                info!("pump: auto-shutoff");
            }
        });
        if !armed {
            st.drive_off();
            return Err(ActuatorError::TimerUnavailable);
        }

        info!("pump: on for {} ms", duration.as_millis());
        Ok(TriggerOutcome::Started)
    }

    /// Force the pump off now and drop the pending shutoff.
    pub fn stop(&self) {
        self.shutoff.cancel();
        let mut st = lock(&self.inner);
        if st.running {
            info!("pump: stopped");
        }
        st.drive_off();
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).running
    }

    pub fn state(&self) -> PumpState {
        let st = lock(&self.inner);
        PumpState {
            running: st.running,
            shutoff_deadline: st.shutoff_deadline,
        }
    }

    /// Cancel the shutoff timer (bounded join), force the line low and
    /// refuse any later trigger.
    pub fn teardown(&self, timeout: Duration) {
        {
            let mut st = lock(&self.inner);
            st.disabled = true;
            st.drive_off();
        }
        self.shutoff.cancel_and_join(timeout);
        info!("pump: torn down, line held low");
    }
}

/// The shutoff slot dies with the actuator, so the line must go low here.
impl Drop for PumpActuator {
    fn drop(&mut self) {
        self.shutoff.cancel();
        let mut st = lock(&self.inner);
        if st.running {
            warn!("pump: dropped while running, forcing off");
        }
        st.disabled = true;
        st.drive_off();
    }
}
