//! Mock hardware for integration tests.
//!
//! Pins implement the `embedded-hal` digital traits and record every write;
//! the port mocks record every call so tests can assert on the full
//! history without touching real GPIO, SPI or I²C.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use flowerpot::app::events::{DeviceEvent, Outbound};
use flowerpot::app::ports::{EventSink, FeedbackPort, PixelStrip, PlantSensorPort, WaterLevelPort};
use flowerpot::drivers::led_patterns::{Pixels, Rgb};
use flowerpot::error::{ActuatorError, SensorError};
use flowerpot::fsm::Mode;
use flowerpot::sensors::PlantReading;
use flowerpot::sensors::water_level::WaterLevel;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

// ── Output pin ────────────────────────────────────────────────

/// Output pin that records every level written to it.
#[derive(Clone, Default)]
pub struct MockOutputPin {
    writes: Arc<Mutex<Vec<bool>>>,
}

impl MockOutputPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<bool> {
        lock(&self.writes).clone()
    }

    pub fn is_high(&self) -> bool {
        lock(&self.writes).last().copied().unwrap_or(false)
    }

    /// Number of low → high edges.
    pub fn rising_edges(&self) -> usize {
        let w = lock(&self.writes);
        let mut prev = false;
        let mut edges = 0;
        for &level in w.iter() {
            if level && !prev {
                edges += 1;
            }
            prev = level;
        }
        edges
    }
}

impl ErrorType for MockOutputPin {
    type Error = Infallible;
}

impl OutputPin for MockOutputPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        lock(&self.writes).push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        lock(&self.writes).push(true);
        Ok(())
    }
}

// ── Input pin ─────────────────────────────────────────────────

/// Input pin whose level the test sets.
#[derive(Clone, Default)]
pub struct MockInputPin {
    level: Arc<AtomicBool>,
}

impl MockInputPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

impl ErrorType for MockInputPin {
    type Error = Infallible;
}

impl InputPin for MockInputPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.load(Ordering::SeqCst))
    }
}

// ── Level ladder ──────────────────────────────────────────────

/// Level port whose reading the test controls.
#[derive(Clone)]
pub struct MockLevel {
    level: Arc<Mutex<WaterLevel>>,
    reads: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl MockLevel {
    pub fn new(initial: WaterLevel) -> Self {
        Self {
            level: Arc::new(Mutex::new(initial)),
            reads: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set(&self, level: WaterLevel) {
        *lock(&self.level) = level;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl WaterLevelPort for MockLevel {
    fn read(&mut self) -> WaterLevel {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *lock(&self.level)
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

// ── Soil probe ────────────────────────────────────────────────

/// Probe that plays back queued readings, then repeats `steady`.
#[derive(Clone)]
pub struct MockProbe {
    queue: Arc<Mutex<VecDeque<Result<PlantReading, SensorError>>>>,
    steady: Arc<Mutex<PlantReading>>,
    reads: Arc<AtomicUsize>,
}

pub const COMFORTABLE: PlantReading = PlantReading {
    moisture: 50.0,
    temperature: 21.0,
    luminosity: 50.0,
};

impl MockProbe {
    pub fn new(steady: PlantReading) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            steady: Arc::new(Mutex::new(steady)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, reading: Result<PlantReading, SensorError>) {
        lock(&self.queue).push_back(reading);
    }

    pub fn set_steady(&self, reading: PlantReading) {
        *lock(&self.steady) = reading;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl PlantSensorPort for MockProbe {
    fn wake(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<PlantReading, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let queued = lock(&self.queue).pop_front();
        queued.unwrap_or_else(|| Ok(*lock(&self.steady)))
    }

    fn sleep(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
}

// ── Feedback ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackCall {
    Boot,
    Level { lit: usize, colour: Rgb },
    Meter { percentage: f32, colour: Rgb, auto_alert: bool },
    Clear,
    Shutdown,
}

/// Feedback port that records every call.
#[derive(Clone, Default)]
pub struct RecordingFeedback {
    calls: Arc<Mutex<Vec<FeedbackCall>>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FeedbackCall> {
        lock(&self.calls).clone()
    }

    /// `lit` of every `display_level` call, in order.
    pub fn levels(&self) -> Vec<usize> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                FeedbackCall::Level { lit, .. } => Some(*lit),
                _ => None,
            })
            .collect()
    }
}

impl FeedbackPort for RecordingFeedback {
    fn boot_animation(&self) {
        lock(&self.calls).push(FeedbackCall::Boot);
    }

    fn display_level(&self, lit: usize, colour: Rgb) {
        lock(&self.calls).push(FeedbackCall::Level { lit, colour });
    }

    fn display_meter(&self, percentage: f32, colour: Rgb, auto_alert: bool) {
        lock(&self.calls).push(FeedbackCall::Meter {
            percentage,
            colour,
            auto_alert,
        });
    }

    fn clear(&self) {
        lock(&self.calls).push(FeedbackCall::Clear);
    }

    fn shutdown(&self) {
        lock(&self.calls).push(FeedbackCall::Shutdown);
    }
}

// ── Pixel strip ───────────────────────────────────────────────

/// Strip that keeps every frame it is asked to show.
#[derive(Clone, Default)]
pub struct RecordingStrip {
    frames: Arc<Mutex<Vec<(Pixels, f32)>>>,
}

impl RecordingStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<(Pixels, f32)> {
        lock(&self.frames).clone()
    }

    pub fn last(&self) -> Option<(Pixels, f32)> {
        lock(&self.frames).last().copied()
    }
}

impl PixelStrip for RecordingStrip {
    fn show(&mut self, pixels: &Pixels, brightness: f32) -> Result<(), ActuatorError> {
        lock(&self.frames).push((*pixels, brightness));
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Sink that records every outbound event.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Outbound>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Outbound> {
        lock(&self.events).clone()
    }

    pub fn count(&self, name: &str) -> usize {
        lock(&self.events).iter().filter(|o| o.event.name() == name).count()
    }

    pub fn find(&self, name: &str) -> Option<Outbound> {
        lock(&self.events).iter().find(|o| o.event.name() == name).cloned()
    }

    /// Every `to` of the mode changes, in order.
    pub fn modes(&self) -> Vec<Mode> {
        lock(&self.events)
            .iter()
            .filter_map(|o| match o.event {
                DeviceEvent::ModeChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &Outbound) {
        lock(&self.events).push(event.clone());
    }
}
