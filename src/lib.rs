//! Host-testable core of the capsense-scan firmware.
//!
//! Everything that does not touch hardware lives here: the widget table,
//! the completion handoff, the scan scheduler, the touch status reporter,
//! touch detection and the tuner register file.
//!
//! Usage: `cargo test --lib` and `cargo test --test integration`
//!
//! Note: The firmware binary (main.rs, `embedded` feature) wires these
//! pieces to the nRF52840 SAADC, UARTE, TWIS and the status LED.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod reporter;
pub mod scheduler;
pub mod signal;
pub mod tuner;
pub mod widget;

pub use engine::SensingEngine;
pub use error::{Error, InitError, TunerError};
pub use reporter::{ChangeEvent, CycleReport, EventSink, IndicatorSink, TouchStatusReporter};
pub use scheduler::{ScanScheduler, SchedulerState, TickOutcome};
pub use signal::{CompletionReleaser, CompletionSignal, CompletionWaiter};
pub use widget::{SliderTouch, WidgetId, WidgetState};
