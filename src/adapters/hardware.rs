//! Hardware adapter — board bring-up for the Flowerpot carrier.
//!
//! Takes the ESP32 peripherals once and wraps each in the driver that
//! implements the matching port trait. This is the only module in the
//! system that names concrete `esp-idf-hal` types.
//!
//! | Peripheral          | Driver               | Port              |
//! |---------------------|----------------------|-------------------|
//! | GPIO out            | `PumpActuator`       | (owned by core)   |
//! | GPIO out + 5 in     | `WaterLevelSensor`   | `WaterLevelPort`  |
//! | SPI2 (SCK, MOSI)    | `DotStarStrip`       | `PixelStrip`      |
//! | I2C0 (SDA, SCL)     | `ChirpSensor`        | `PlantSensorPort` |

use std::sync::Arc;

use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, InputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{SpiBusDriver, SpiConfig, SpiDriver, SpiDriverConfig};
use esp_idf_hal::units::Hertz;
use log::info;

use crate::app::ports::FeedbackPort;
use crate::app::service::DeviceHardware;
use crate::config::SystemConfig;
use crate::drivers::led_engine::{LedEngine, LedTiming};
use crate::drivers::led_strip::DotStarStrip;
use crate::drivers::pump::PumpActuator;
use crate::error::Error;
use crate::pins;
use crate::sensors::chirp::{self, Calibration, ChirpSensor};
use crate::sensors::water_level::WaterLevelSensor;
use crate::sensors::{TelemetrySampler, share_level};

/// Bring up every peripheral the service drives.
///
/// The typed GPIOs below must agree with [`crate::pins`].
pub fn bring_up(config: &SystemConfig) -> Result<DeviceHardware> {
    let p = Peripherals::take()?;
    let io = p.pins;

    // ── Pump ──────────────────────────────────────────────────
    let pump = PumpActuator::new(PinDriver::output(io.gpio25)?);
    info!("board: pump on GPIO{}", pins::PUMP_GPIO);

    // ── Level ladder ──────────────────────────────────────────
    let enable = PinDriver::output(io.gpio26)?;
    let rungs = [
        PinDriver::input(io.gpio34.downgrade_input())?,
        PinDriver::input(io.gpio35.downgrade_input())?,
        PinDriver::input(io.gpio36.downgrade_input())?,
        PinDriver::input(io.gpio39.downgrade_input())?,
        PinDriver::input(io.gpio32.downgrade_input())?,
    ];
    let level = share_level(WaterLevelSensor::new(enable, rungs, config.level_settle()));
    info!(
        "board: ladder enable GPIO{}, rungs {:?}",
        pins::LEVEL_ENABLE_GPIO,
        pins::LEVEL_RUNG_GPIOS
    );

    // ── LED strip ─────────────────────────────────────────────
    let spi = SpiDriver::new(
        p.spi2,
        io.gpio18,
        io.gpio23,
        None::<AnyIOPin>,
        &SpiDriverConfig::new(),
    )?;
    let bus = SpiBusDriver::new(spi, &SpiConfig::new().baudrate(Hertz(pins::LED_SPI_FREQ_HZ)))?;
    let engine = LedEngine::start(
        DotStarStrip::new(bus),
        LedTiming::from_config(config),
        config.led_brightness,
    )
    .map_err(Error::from)?;
    let feedback: Arc<dyn FeedbackPort> = Arc::new(engine);
    info!(
        "board: DotStar on SCK GPIO{} / MOSI GPIO{}",
        pins::LED_SPI_SCK_GPIO,
        pins::LED_SPI_MOSI_GPIO
    );

    // ── Soil probe ────────────────────────────────────────────
    let i2c = I2cDriver::new(
        p.i2c0,
        io.gpio21,
        io.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let probe = ChirpSensor::new(
        i2c,
        chirp::DEFAULT_ADDRESS,
        Calibration {
            raw_dry: config.moisture_raw_min,
            raw_wet: config.moisture_raw_max,
        },
    );
    let sampler = TelemetrySampler::new(
        probe,
        Arc::clone(&level),
        config.sensor_settle(),
        config.retry_backoff(),
    );
    info!(
        "board: soil probe 0x{:02X} on SDA GPIO{} / SCL GPIO{}",
        chirp::DEFAULT_ADDRESS,
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO
    );

    Ok(DeviceHardware {
        pump,
        level,
        sampler,
        feedback,
    })
}
