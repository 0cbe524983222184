//! dialbox library — portable core for a rotary-dial RF multi-tool.
//!
//! The hard center of the device is its interrupt-driven quadrature
//! encoder subsystem: `encoder` (finite-state decoding with torn-free
//! position accessors) and `dispatch` (fixed-capacity interrupt-line
//! registry plus the ISR entry points). Around it sit the collaborator
//! boundaries — `menu`, `settings`, `leds`, `activity` — as host-testable
//! logic over traits the firmware implements. Everything here is `no_std`,
//! allocation-free, and testable on any host with `cargo test`; the ESP32
//! binary (`src/main.rs`, behind the `firmware` feature) is a thin consumer
//! that provides pins, interrupts, and the OLED.

#![cfg_attr(not(test), no_std)]

pub mod activity;
pub mod board;
pub mod dispatch;
pub mod encoder;
pub mod leds;
pub mod menu;
pub mod settings;

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
