//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements / provides      | Connects to              |
//! |-------------|----------------------------|--------------------------|
//! | `hardware`  | `DeviceHardware`           | ESP32 GPIO, SPI2, I2C0   |
//! | `log_sink`  | EventSink                  | Serial log output        |
//! | `device_id` | default site identity      | eFuse factory MAC        |

pub mod device_id;
#[cfg(target_os = "espidf")]
pub mod hardware;
pub mod log_sink;
