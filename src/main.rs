//! Flowerpot Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  bring_up()             LogEventSink      console reader       │
//! │  (pump, ladder, strip,  (EventSink)       (name {json} lines)  │
//! │   soil probe)                                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            DeviceService (mode machine)                │    │
//! │  │  mode loops · report timer · pump auto-shutoff         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;

use anyhow::Result;
use log::{info, warn};

use flowerpot::adapters::device_id::DeviceIdentity;
use flowerpot::adapters::hardware::bring_up;
use flowerpot::adapters::log_sink::LogEventSink;
use flowerpot::app::service::DeviceService;
use flowerpot::app::wire;
use flowerpot::config::SystemConfig;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Flowerpot v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate()?;

    // ── 3. Device identity ────────────────────────────────────
    let identity = DeviceIdentity::of_this_board(&config.site_id);
    info!("Device ID: {} (site: {})", identity.tag, identity.site_id);

    // ── 4. Hardware + service ─────────────────────────────────
    let hw = bring_up(&config)?;
    let service = DeviceService::new(config, identity.site_id.as_str(), hw, LogEventSink::new())?;
    service.start();

    info!("System ready. Reading commands from the console.");

    // ── 5. Console command loop ───────────────────────────────
    // One command per line: `<name> <json>`, e.g.
    // `refillMode {"siteId":"flowerpot-efcafe","sessionId":"s1"}`.
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("console: read failed ({})", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, body) = line.split_once(' ').unwrap_or((line, "{}"));
        match wire::decode_command(name, body.trim().as_bytes()) {
            Ok(msg) => service.handle(msg),
            Err(e) => warn!("console: '{}' rejected ({})", name, e),
        }
    }

    info!("console closed, shutting down");
    service.shutdown();
    Ok(())
}
