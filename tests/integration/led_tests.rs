//! Integration tests for the mode table → LED engine → DotStar chain.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::spi::{ErrorType, SpiBus};

use flowerpot::app::ports::FeedbackPort;
use flowerpot::drivers::led_engine::{LedEngine, LedTiming};
use flowerpot::drivers::led_patterns::{
    COLOUR_FILLING, COLOUR_HOT, COLOUR_THIRSTY, OFF, PIXEL_COUNT, gauge,
};
use flowerpot::drivers::led_strip::{DotStarStrip, encode_frame};
use flowerpot::fsm::states::build_mode_table;
use flowerpot::fsm::{AlertEntry, Mode, ModeMachine};

use crate::mock_hw::{RecordingStrip, wait_until};

const WAIT: Duration = Duration::from_secs(2);

fn fast() -> LedTiming {
    LedTiming {
        boot_step: Duration::from_millis(5),
        boot_hold: Duration::from_millis(10),
        fill_step: Duration::from_millis(2),
        alert_fill_step: Duration::from_millis(1),
        auto_clear: Duration::from_millis(100),
    }
}

// ── SPI bus that keeps every write ────────────────────────────

#[derive(Clone, Default)]
struct MockSpi {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockSpi {
    fn last(&self) -> Option<Vec<u8>> {
        self.writes.lock().unwrap().last().cloned()
    }
}

impl ErrorType for MockSpi {
    type Error = Infallible;
}

impl SpiBus for MockSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        self.writes.lock().unwrap().push(words.to_vec());
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        read.fill(0);
        self.write(write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let copy = words.to_vec();
        self.write(&copy)
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

#[test]
fn level_display_reaches_the_spi_bus() {
    let spi = MockSpi::default();
    let engine = LedEngine::start(DotStarStrip::new(spi.clone()), fast(), 1.0).unwrap();

    engine.display_level(2, COLOUR_FILLING);

    let expected = encode_frame(&gauge(2, COLOUR_FILLING), 1.0).to_vec();
    assert!(wait_until(WAIT, || spi.last() == Some(expected.clone())));
    engine.shutdown();

    let blank = encode_frame(&[OFF; PIXEL_COUNT], 1.0).to_vec();
    assert_eq!(spi.last(), Some(blank));
}

#[test]
fn alert_mode_entry_paints_persistent_gauge() {
    let strip = RecordingStrip::new();
    let engine: Arc<LedEngine> = Arc::new(LedEngine::start(strip.clone(), fast(), 1.0).unwrap());
    let modes = ModeMachine::new(build_mode_table(), Mode::Ok, engine.clone());

    assert_eq!(modes.enter_alert(Mode::Hot), AlertEntry::Entered { from: Mode::Ok });
    assert!(wait_until(WAIT, || engine.snapshot().0 == [COLOUR_HOT; PIXEL_COUNT]));

    // Alert meters never auto-clear.
    std::thread::sleep(fast().auto_clear * 3);
    assert_eq!(engine.snapshot().0, [COLOUR_HOT; PIXEL_COUNT]);
    assert!(engine.is_animating());

    assert!(modes.transition_from(Mode::Hot, Mode::Ok));
    assert_eq!(engine.snapshot(), ([OFF; PIXEL_COUNT], 1.0));
    engine.shutdown();
}

#[test]
fn min_bound_alert_lights_one_pixel() {
    let engine = Arc::new(LedEngine::start(RecordingStrip::new(), fast(), 1.0).unwrap());
    let modes = ModeMachine::new(build_mode_table(), Mode::Ok, engine.clone());

    modes.enter_alert(Mode::Thirsty);
    assert!(wait_until(WAIT, || engine.snapshot().0 == gauge(1, COLOUR_THIRSTY)));
    engine.shutdown();
}

#[test]
fn level_display_supersedes_breathing_meter() {
    let strip = RecordingStrip::new();
    let engine = LedEngine::start(strip.clone(), fast(), 0.5).unwrap();

    engine.display_meter(100.0, COLOUR_HOT, true);
    assert!(wait_until(WAIT, || engine.snapshot().0 == [COLOUR_HOT; PIXEL_COUNT]));

    engine.display_level(4, COLOUR_FILLING);
    assert!(wait_until(WAIT, || {
        engine.snapshot() == (gauge(4, COLOUR_FILLING), 1.0) && !engine.is_animating()
    }));

    // Nothing from the old meter lands after the level frame.
    let frames_after = strip.frames().len();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(strip.frames().len(), frames_after);
    assert_eq!(strip.last().map(|f| f.0), Some(gauge(4, COLOUR_FILLING)));
    engine.shutdown();
}

#[test]
fn boot_mode_sweeps_then_blanks() {
    let strip = RecordingStrip::new();
    let engine = Arc::new(LedEngine::start(strip.clone(), fast(), 1.0).unwrap());
    let modes = ModeMachine::new(build_mode_table(), Mode::Booting, engine.clone());

    modes.start();
    assert!(wait_until(WAIT, || {
        strip.frames().iter().any(|f| f.0.iter().all(|p| *p != OFF))
    }));
    assert!(wait_until(WAIT, || {
        engine.snapshot().0 == [OFF; PIXEL_COUNT] && !engine.is_animating()
    }));
    engine.shutdown();
}
