//! Device service — the hexagonal core.
//!
//! [`DeviceService`] owns the mode machine, the pump, the level ladder and
//! the telemetry sampler, and reacts to [`Inbound`] commands. Feedback goes
//! out through the [`FeedbackPort`] and every outcome through the
//! [`EventSink`].
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  Inbound ─────▶ │        DeviceService         │ ──▶ EventSink
//!                 │  ModeMachine · mode loops    │
//!  report timer ▶ │  PumpActuator · Sampler      │ ──▶ FeedbackPort
//!                 └──────────────────────────────┘
//! ```
//!
//! ## Threads
//!
//! - caller of [`DeviceService::handle`]: identity check, admission,
//!   alert entry. Never blocks on hardware beyond a pump GPIO write.
//! - one mode-loop thread per busy mode (`Watering`, `Filling`,
//!   `Emptying`). It is the only writer that may take its own mode back
//!   to `Ok`.
//! - the report timer: samples, reports, moves `Ready` (and resolved alert
//!   modes) to `Ok`.
//!
//! Mode writes are all check-and-set on the [`ModeMachine`], so the report
//! timer can never clobber a busy mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::config::SystemConfig;
use crate::drivers::led_patterns::{COLOUR_EMPTIED, COLOUR_EMPTYING, COLOUR_FILLING, PIXEL_COUNT};
use crate::drivers::pump::PumpActuator;
use crate::drivers::task_pin::{self, MODE_LOOP_TASK};
use crate::error::Result;
use crate::fsm::alerts::{Alert, first_breach};
use crate::fsm::states::build_mode_table;
use crate::fsm::{Admission, AlertEntry, Mode, ModeMachine};
use crate::scheduler::{TaskSlot, join_bounded, lock};
use crate::sensors::water_level::WaterLevel;
use crate::sensors::{SharedLevel, TelemetrySampler};

use super::commands::{DeviceCommand, Inbound};
use super::events::{DeviceEvent, Outbound};
use super::ports::{EventSink, FeedbackPort};

/// Bound on every join during teardown.
const TEARDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a watering loop tolerates the pump outliving its burst.
const SHUTOFF_GRACE: Duration = Duration::from_secs(1);

/// Everything the service drives, already brought up.
pub struct DeviceHardware {
    pub pump: PumpActuator,
    pub level: SharedLevel,
    pub sampler: TelemetrySampler,
    pub feedback: Arc<dyn FeedbackPort>,
}

// ───────────────────────────────────────────────────────────────
// Mode loops
// ───────────────────────────────────────────────────────────────

type LoopBody = fn(&Arc<Shared>, Option<String>);

struct ModeLoop {
    mode: Mode,
    thread: &'static str,
    body: LoopBody,
}

const WATERING: ModeLoop = ModeLoop {
    mode: Mode::Watering,
    thread: "mode-water\0",
    body: run_watering,
};

const FILLING: ModeLoop = ModeLoop {
    mode: Mode::Filling,
    thread: "mode-fill\0",
    body: run_fill,
};

const EMPTYING: ModeLoop = ModeLoop {
    mode: Mode::Emptying,
    thread: "mode-empty\0",
    body: run_empty,
};

fn run_watering(shared: &Arc<Shared>, _session: Option<String>) {
    let burst = shared.config.pump_duration();
    match shared.pump.trigger(burst) {
        Ok(outcome) => {
            debug!("watering: pump {outcome:?}");
            let deadline = Instant::now() + burst + SHUTOFF_GRACE;
            while shared.pump.is_running() {
                if Instant::now() >= deadline {
                    warn!("watering: pump outlived its burst, forcing off");
                    shared.pump.stop();
                    break;
                }
                if !shared.pause(shared.config.poll_interval()) {
                    shared.pump.stop();
                    return;
                }
            }
        }
        Err(e) => warn!("watering: pump did not start ({e})"),
    }
    shared.finish(Mode::Watering);
}

fn run_fill(shared: &Arc<Shared>, session: Option<String>) {
    let mut shown = WaterLevel::Dry;
    loop {
        let level = shared.read_level();
        if level != shown {
            shared.feedback.display_level(level.lit_pixels(), COLOUR_FILLING);
            shown = level;
        }
        if level == WaterLevel::Full {
            break;
        }
        if !shared.pause(shared.config.poll_interval()) {
            info!("filling: interrupted by shutdown");
            return;
        }
    }

    info!("filling: tank full");
    shared.emit(DeviceEvent::RefillFull, session);
    shared.feedback.clear();
    shared.pause(shared.config.exit_hold());
    shared.finish(Mode::Filling);
    shared.arm_report(Duration::ZERO);
}

fn run_empty(shared: &Arc<Shared>, session: Option<String>) {
    let burst = shared.config.pump_duration();
    let mut shown = WaterLevel::Dry;
    loop {
        let level = shared.read_level();
        if level != shown {
            shared.feedback.display_level(level.lit_pixels(), COLOUR_EMPTYING);
            shown = level;
        }
        if level == WaterLevel::Dry {
            break;
        }
        // Each burst has its own shutoff; keep re-triggering until dry.
        if !shared.pump.is_running() {
            if let Err(e) = shared.pump.trigger(burst) {
                warn!("emptying: pump did not start ({e})");
            }
        }
        if !shared.pause(shared.config.poll_interval()) {
            shared.pump.stop();
            info!("emptying: interrupted by shutdown");
            return;
        }
    }

    info!("emptying: tank dry");
    let hold = shared.config.exit_hold();
    shared.feedback.display_level(PIXEL_COUNT, COLOUR_EMPTIED);
    shared.pause(hold);
    shared.feedback.clear();
    shared.pause(hold);
    shared.emit(DeviceEvent::WaterEmptied, session);
    shared.pump.stop();
    shared.finish(Mode::Emptying);
    shared.arm_report(Duration::ZERO);
}

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

struct Shared {
    config: SystemConfig,
    site_id: String,
    modes: ModeMachine,
    pump: PumpActuator,
    level: SharedLevel,
    sampler: Mutex<TelemetrySampler>,
    feedback: Arc<dyn FeedbackPort>,
    sink: Mutex<Box<dyn EventSink>>,
    report: TaskSlot,
    mode_loop: Mutex<Option<JoinHandle<()>>>,
    stopping: AtomicBool,
}

impl Shared {
    fn stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    fn emit(&self, event: DeviceEvent, session_id: Option<String>) {
        let out = Outbound {
            site_id: self.site_id.clone(),
            session_id,
            event,
        };
        lock(&self.sink).emit(&out);
    }

    fn moved(&self, from: Mode, to: Mode) {
        self.emit(DeviceEvent::ModeChanged { from, to }, None);
    }

    fn read_level(&self) -> WaterLevel {
        lock(&self.level).read()
    }

    /// Sleep for `d` in poll-sized slices. Returns `false` if shutdown began.
    fn pause(&self, d: Duration) -> bool {
        let deadline = Instant::now() + d;
        let slice = self.config.poll_interval();
        loop {
            if self.stopping() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }

    /// Hand a busy mode back to `Ok`, unless something else already moved it.
    fn finish(&self, mode: Mode) {
        let spent = self.modes.time_in_mode();
        if self.modes.transition_from(mode, Mode::Ok) {
            info!("mode: {:?} done after {} ms", mode, spent.as_millis());
            self.moved(mode, Mode::Ok);
        }
    }

    fn begin(self: &Arc<Self>, request: DeviceCommand, run: &ModeLoop, session: Option<String>) {
        match self.modes.admit(run.mode) {
            Admission::Admitted { from } => {
                self.moved(from, run.mode);
                self.spawn_mode_loop(run, session);
            }
            Admission::Refused { current } => {
                warn!("mode: {} refused while {:?}", request.name(), current);
                self.emit(
                    DeviceEvent::Refused {
                        request: request.name(),
                        mode: current,
                    },
                    session,
                );
            }
        }
    }

    fn spawn_mode_loop(self: &Arc<Self>, run: &ModeLoop, session: Option<String>) {
        let shared = Arc::clone(self);
        let body = run.body;
        match task_pin::spawn_on_core(MODE_LOOP_TASK, run.thread, move || body(&shared, session)) {
            Ok(handle) => {
                // Busy modes are exclusive, so any previous loop is done or
                // about to return.
                lock(&self.mode_loop).replace(handle);
            }
            Err(e) => {
                error!("mode: {:?} loop could not start: {e}", run.mode);
                self.finish(run.mode);
            }
        }
    }

    fn on_alert(self: &Arc<Self>, alert: Alert) {
        let Some(target) = alert.mode() else {
            warn!("alert {alert}: no matching mode, ignored");
            return;
        };
        match self.modes.enter_alert(target) {
            AlertEntry::Entered { from } => {
                self.moved(from, target);
                self.emit(DeviceEvent::AlertUser(alert), None);
                if target == Mode::Thirsty {
                    self.begin(DeviceCommand::Water, &WATERING, None);
                }
            }
            AlertEntry::Suppressed => debug!("alert {alert}: already {target:?}, suppressed"),
            AlertEntry::Deferred { current } => info!("alert {alert}: ignored while {current:?}"),
        }
    }

    fn report(&self) {
        if self.stopping() {
            return;
        }
        let sample = lock(&self.sampler).sample();
        info!(
            "telemetry: moisture={:.1}% temperature={:.1}C light={:.0} water={}",
            sample.moisture,
            sample.temperature,
            sample.luminosity,
            sample.water.percent()
        );
        self.emit(DeviceEvent::TelemetryReport(sample), None);

        if self.modes.transition_from(Mode::Ready, Mode::Ok) {
            self.moved(Mode::Ready, Mode::Ok);
            return;
        }
        let current = self.modes.current();
        if current.is_alert()
            && first_breach(&self.config.plant, &sample).is_none()
            && self.modes.transition_from(current, Mode::Ok)
        {
            info!("mode: {current:?} resolved, readings back in range");
            self.moved(current, Mode::Ok);
        }
    }

    /// (Re)start the periodic report, first run after `first`.
    fn arm_report(self: &Arc<Self>, first: Duration) {
        if self.stopping() {
            return;
        }
        let weak = Arc::downgrade(self);
        let armed = self
            .report
            .schedule_periodic(first, self.config.report_interval(), move || {
                if let Some(shared) = weak.upgrade() {
                    shared.report();
                }
            });
        if !armed {
            error!("telemetry: report timer could not be armed");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// DeviceService
// ───────────────────────────────────────────────────────────────

pub struct DeviceService {
    shared: Arc<Shared>,
}

impl DeviceService {
    /// Validate `config` and take ownership of the hardware.
    ///
    /// Starts in `Booting`; call [`start`](Self::start) once messaging is up.
    pub fn new(
        config: SystemConfig,
        site_id: impl Into<String>,
        hw: DeviceHardware,
        sink: impl EventSink + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let site_id = site_id.into();
        let modes = ModeMachine::new(build_mode_table(), Mode::Booting, Arc::clone(&hw.feedback));
        info!("service: site '{}', plant '{}'", site_id, config.plant.name);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                site_id,
                modes,
                pump: hw.pump,
                level: hw.level,
                sampler: Mutex::new(hw.sampler),
                feedback: hw.feedback,
                sink: Mutex::new(Box::new(sink)),
                report: TaskSlot::new("report\0"),
                mode_loop: Mutex::new(None),
                stopping: AtomicBool::new(false),
            }),
        })
    }

    /// Boot sweep, `Booting -> Ready`, first telemetry report once the
    /// sweep is over. The `Ok` entry action blanks the bar, so reporting
    /// earlier would cut the sweep short.
    pub fn start(&self) {
        let s = &self.shared;
        s.modes.start();
        if s.modes.transition_from(Mode::Booting, Mode::Ready) {
            s.moved(Mode::Booting, Mode::Ready);
        }
        s.arm_report(s.feedback.boot_duration());
    }

    /// Act on one inbound command addressed to this device.
    pub fn handle(&self, msg: Inbound) {
        let s = &self.shared;
        if s.stopping() {
            return;
        }
        if msg.site_id != s.site_id {
            debug!("service: {} for site '{}' ignored", msg.command.name(), msg.site_id);
            return;
        }
        let Inbound {
            session_id,
            command,
            ..
        } = msg;
        match command {
            DeviceCommand::Water => s.begin(command, &WATERING, session_id),
            DeviceCommand::Refill => s.begin(command, &FILLING, session_id),
            DeviceCommand::Empty => s.begin(command, &EMPTYING, session_id),
            DeviceCommand::Alert(alert) => s.on_alert(alert),
        }
    }

    /// Sample and report now, on the caller's thread.
    pub fn report_now(&self) {
        self.shared.report();
    }

    pub fn mode(&self) -> Mode {
        self.shared.modes.current()
    }

    pub fn site_id(&self) -> &str {
        &self.shared.site_id
    }

    pub fn pump_running(&self) -> bool {
        self.shared.pump.is_running()
    }

    /// Stop timers and loops, then leave every line in its safe state.
    /// Idempotent.
    pub fn shutdown(&self) {
        let s = &self.shared;
        if s.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("service: shutting down");
        s.report.cancel_and_join(TEARDOWN_JOIN_TIMEOUT);
        let mode_loop = lock(&s.mode_loop).take();
        if let Some(handle) = mode_loop {
            join_bounded(handle, TEARDOWN_JOIN_TIMEOUT, "mode loop");
        }
        s.pump.teardown(TEARDOWN_JOIN_TIMEOUT);
        s.feedback.shutdown();
        lock(&s.level).release();
        info!("service: pump off, ladder released");
    }
}

impl Drop for DeviceService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
