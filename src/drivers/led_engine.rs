//! LED animation engine.
//!
//! One worker thread drains a job queue and renders one [`AnimationKind`]
//! at a time. Callers never block on rendering.
//!
//! ## Supersede model
//!
//! Every `enqueue` bumps an epoch and clears the `animating` flag under one
//! lock. The worker admits a job only if its epoch is still current, then
//! raises `animating` under that same lock, so a job that lost the race is
//! dropped instead of replayed. Running animations sleep on a condvar that
//! wakes the moment they are superseded. Pixel writes re-check the epoch
//! while holding the control lock, and the auto-clear timer carries the
//! epoch it was armed for; neither can touch the bar on behalf of a
//! superseded job.
//!
//! Lock order: `control` before `strip`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::{FeedbackPort, PixelStrip};
use crate::config::SystemConfig;
use crate::drivers::led_patterns::{
    Breathing, COLOUR_BOOT, OFF, PIXEL_COUNT, Pixels, Rgb, gauge, pixels_for_percentage,
};
use crate::drivers::task_pin::{self, LED_TASK};
use crate::error::ActuatorError;
use crate::scheduler::{TaskSlot, join_bounded, lock};

/// How long `shutdown` waits for the worker.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// One unit of rendering work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationKind {
    /// Boot sweep: pixels turn on one by one, hold, clear.
    Start,
    /// Static gauge of `lit` pixels.
    DisplayLevel { lit: usize, colour: Rgb },
    /// Animated gauge followed by breathing.
    DisplayMeter {
        percentage: f32,
        colour: Rgb,
        brightness: f32,
        auto_alert: bool,
    },
}

/// Animation pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedTiming {
    /// Delay between boot-sweep pixels.
    pub boot_step: Duration,
    /// Hold after the sweep completes.
    pub boot_hold: Duration,
    /// Delay between gauge pixels for ordinary meters.
    pub fill_step: Duration,
    /// Delay between gauge pixels for alert meters.
    pub alert_fill_step: Duration,
    /// Auto-clear delay for ordinary meters.
    pub auto_clear: Duration,
}

impl Default for LedTiming {
    fn default() -> Self {
        Self {
            boot_step: Duration::from_millis(500),
            boot_hold: Duration::from_secs(1),
            fill_step: Duration::from_millis(250),
            alert_fill_step: Duration::from_millis(100),
            auto_clear: Duration::from_secs(10),
        }
    }
}

impl LedTiming {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            auto_clear: config.meter_auto_clear(),
            ..Self::default()
        }
    }
}

struct Job {
    epoch: u64,
    kind: AnimationKind,
}

struct Control {
    epoch: u64,
    animating: bool,
}

struct StripState {
    strip: Box<dyn PixelStrip>,
    pixels: Pixels,
    brightness: f32,
}

struct EngineShared {
    active: AtomicBool,
    control: Mutex<Control>,
    wake: Condvar,
    strip: Mutex<StripState>,
    auto_clear: TaskSlot,
    timing: LedTiming,
}

impl EngineShared {
    /// Invalidate whatever is queued or running. Returns the new epoch.
    fn supersede(&self) -> u64 {
        self.auto_clear.cancel();
        let mut c = lock(&self.control);
        c.epoch = c.epoch.wrapping_add(1);
        c.animating = false;
        self.wake.notify_all();
        c.epoch
    }

    /// Admit a dequeued job if nothing newer has been requested.
    fn begin(&self, epoch: u64) -> bool {
        let mut c = lock(&self.control);
        if c.epoch != epoch {
            return false;
        }
        c.animating = true;
        true
    }

    fn finish(&self, epoch: u64) {
        let mut c = lock(&self.control);
        if c.epoch == epoch {
            c.animating = false;
        }
    }

    /// Sleep for `d` unless superseded first. Returns `true` if the job may
    /// carry on.
    fn pause(&self, epoch: u64, d: Duration) -> bool {
        let guard = lock(&self.control);
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, d, |c| c.animating && c.epoch == epoch)
            .unwrap_or_else(PoisonError::into_inner);
        guard.animating && guard.epoch == epoch
    }

    /// Mutate the frame and push it, but only on behalf of the current job.
    fn paint(&self, epoch: u64, f: impl FnOnce(&mut StripState)) -> bool {
        let c = lock(&self.control);
        if c.epoch != epoch || !c.animating {
            return false;
        }
        let mut s = lock(&self.strip);
        f(&mut s);
        push(&mut s);
        drop(c);
        true
    }

    fn clear(&self) {
        self.auto_clear.cancel();
        let mut c = lock(&self.control);
        c.epoch = c.epoch.wrapping_add(1);
        c.animating = false;
        self.wake.notify_all();
        self.blank();
    }

    /// Auto-clear entry point: only clears if `epoch` was never superseded.
    fn clear_if_current(&self, epoch: u64) {
        let mut c = lock(&self.control);
        if c.epoch != epoch {
            return;
        }
        c.epoch = c.epoch.wrapping_add(1);
        c.animating = false;
        self.wake.notify_all();
        self.blank();
        debug!("leds: auto-cleared");
    }

    fn blank(&self) {
        let mut s = lock(&self.strip);
        s.pixels = [OFF; PIXEL_COUNT];
        s.brightness = 1.0;
        push(&mut s);
    }
}

fn push(s: &mut StripState) {
    let StripState {
        strip,
        pixels,
        brightness,
    } = s;
    if let Err(e) = strip.show(pixels, *brightness) {
        warn!("leds: frame dropped ({e})");
    }
}

/// Owns the worker thread and the job queue.
pub struct LedEngine {
    shared: Arc<EngineShared>,
    queue: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    peak_brightness: f32,
}

impl LedEngine {
    /// Blank the strip and start the worker.
    pub fn start(
        strip: impl PixelStrip + 'static,
        timing: LedTiming,
        peak_brightness: f32,
    ) -> Result<Self, ActuatorError> {
        let shared = Arc::new(EngineShared {
            active: AtomicBool::new(true),
            control: Mutex::new(Control {
                epoch: 0,
                animating: false,
            }),
            wake: Condvar::new(),
            strip: Mutex::new(StripState {
                strip: Box::new(strip),
                pixels: [OFF; PIXEL_COUNT],
                brightness: 1.0,
            }),
            auto_clear: TaskSlot::new("led-clear\0"),
            timing,
        });
        shared.blank();

        let (tx, rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let handle = task_pin::spawn_on_core(LED_TASK, "leds\0", move || {
            run_worker(&worker_shared, &rx);
        })
        .map_err(|e| {
            warn!("leds: worker spawn failed: {e}");
            ActuatorError::WorkerUnavailable
        })?;

        Ok(Self {
            shared,
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            peak_brightness,
        })
    }

    /// Supersede whatever is running and queue `kind`.
    pub fn enqueue(&self, kind: AnimationKind) {
        let epoch = self.shared.supersede();
        if !self.shared.active.load(Ordering::Acquire) {
            return;
        }
        if let Some(tx) = lock(&self.queue).as_ref() {
            if tx.send(Job { epoch, kind }).is_err() {
                warn!("leds: worker gone, {kind:?} dropped");
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        lock(&self.shared.control).animating
    }

    /// Current frame and brightness.
    pub fn snapshot(&self) -> (Pixels, f32) {
        let s = lock(&self.shared.strip);
        (s.pixels, s.brightness)
    }
}

impl FeedbackPort for LedEngine {
    fn boot_animation(&self) {
        self.enqueue(AnimationKind::Start);
    }

    fn boot_duration(&self) -> Duration {
        let t = self.shared.timing;
        t.boot_step * PIXEL_COUNT as u32 + t.boot_hold
    }

    fn display_level(&self, lit: usize, colour: Rgb) {
        self.enqueue(AnimationKind::DisplayLevel { lit, colour });
    }

    fn display_meter(&self, percentage: f32, colour: Rgb, auto_alert: bool) {
        self.enqueue(AnimationKind::DisplayMeter {
            percentage,
            colour,
            brightness: self.peak_brightness,
            auto_alert,
        });
    }

    fn clear(&self) {
        self.shared.clear();
    }

    fn shutdown(&self) {
        if !self.shared.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shared.clear();
        // Dropping the sender wakes the worker out of recv().
        drop(lock(&self.queue).take());
        if let Some(handle) = lock(&self.worker).take() {
            join_bounded(handle, WORKER_JOIN_TIMEOUT, "leds");
        }
        self.shared.auto_clear.cancel();
        info!("leds: stopped");
    }
}

impl Drop for LedEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Worker
// ═══════════════════════════════════════════════════════════════

fn run_worker(shared: &Arc<EngineShared>, jobs: &Receiver<Job>) {
    debug!("leds: worker running");
    while let Ok(job) = jobs.recv() {
        if !shared.active.load(Ordering::Acquire) {
            break;
        }
        if !shared.begin(job.epoch) {
            debug!("leds: dropping superseded {:?}", job.kind);
            continue;
        }
        match job.kind {
            AnimationKind::Start => boot_sweep(shared, job.epoch),
            AnimationKind::DisplayLevel { lit, colour } => {
                shared.paint(job.epoch, |s| {
                    s.pixels = gauge(lit, colour);
                    s.brightness = 1.0;
                });
            }
            AnimationKind::DisplayMeter {
                percentage,
                colour,
                brightness,
                auto_alert,
            } => meter(shared, job.epoch, percentage, colour, brightness, auto_alert),
        }
        shared.finish(job.epoch);
    }
    debug!("leds: worker exiting");
}

fn boot_sweep(shared: &EngineShared, epoch: u64) {
    let t = shared.timing;
    for i in 0..PIXEL_COUNT {
        let lit = shared.paint(epoch, |s| {
            s.brightness = 1.0;
            s.pixels[i] = COLOUR_BOOT;
        });
        if !lit || !shared.pause(epoch, t.boot_step) {
            return;
        }
    }
    if shared.pause(epoch, t.boot_hold) {
        shared.clear_if_current(epoch);
    }
}

fn meter(
    shared: &Arc<EngineShared>,
    epoch: u64,
    percentage: f32,
    colour: Rgb,
    peak: f32,
    auto_alert: bool,
) {
    let t = shared.timing;
    let step = if auto_alert {
        t.alert_fill_step
    } else {
        t.fill_step
    };

    let blanked = shared.paint(epoch, |s| {
        s.pixels = [OFF; PIXEL_COUNT];
        s.brightness = 1.0;
    });
    if !blanked {
        return;
    }
    for i in 0..pixels_for_percentage(percentage) {
        if !shared.paint(epoch, |s| s.pixels[i] = colour) || !shared.pause(epoch, step) {
            return;
        }
    }

    if !auto_alert {
        let weak: Weak<EngineShared> = Arc::downgrade(shared);
        shared.auto_clear.schedule_once(t.auto_clear, move || {
            if let Some(shared) = weak.upgrade() {
                shared.clear_if_current(epoch);
            }
        });
    }

    let mut breath = Breathing::new(peak);
    if !shared.paint(epoch, |s| s.brightness = breath.level()) {
        return;
    }
    while shared.pause(epoch, breath.step_interval()) {
        let level = breath.next_level();
        if !shared.paint(epoch, |s| s.brightness = level) {
            return;
        }
    }
}
