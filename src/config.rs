//! Application-wide constants and compile-time configuration.
//!
//! Scan timing, the widget table, tuner layout sizes and pin notes
//! live here so they can be tuned in one place.

use crate::widget::{WidgetConfig, WidgetId};

// Scan timing

/// Period of the scan tick (ms).
pub const SCAN_PERIOD_MS: u64 = 20;

/// Upper bound on a single completion wait (ms).
///
/// `None` waits forever. A bounded wait abandons the outstanding cycle so
/// the next tick can re-trigger.
pub const COMPLETION_TIMEOUT_MS: Option<u64> = Some(10 * SCAN_PERIOD_MS);

/// Consecutive busy ticks after which the scan loop warns that the engine
/// looks wedged, and then again every this many ticks.
pub const BUSY_WARN_TICKS: u32 = 10;

/// Start one scan immediately at start-up instead of waiting a full
/// period for the first tick.
pub const PRIME_SCAN_ON_START: bool = true;

// Widgets

/// Number of configured widgets.
pub const WIDGET_COUNT: usize = 3;

/// Number of contacts that makes a slider position valid.
pub const SLIDER_NUM_TOUCH: u32 = 1;

/// Widget table. Order matches [`WidgetId::index`].
pub const WIDGETS: [WidgetConfig; WIDGET_COUNT] = [
    WidgetConfig::button(WidgetId::Button0, 0),
    WidgetConfig::button(WidgetId::Button1, 0),
    WidgetConfig::slider(WidgetId::Slider0),
];

// Sensors (electrodes)

/// Electrodes per button widget.
pub const BUTTON_SENSORS: usize = 1;

/// Segments on the linear slider.
pub const SLIDER_SEGMENTS: usize = 5;

/// Total electrodes scanned per cycle: two buttons plus the slider segments.
pub const SENSOR_COUNT: usize = 2 * BUTTON_SENSORS + SLIDER_SEGMENTS;

/// Slider coordinate range is `0..=SLIDER_RESOLUTION`.
pub const SLIDER_RESOLUTION: u32 = 100;

/// Default finger threshold, in raw counts above baseline.
pub const DEFAULT_FINGER_THRESHOLD: u16 = 80;

/// Counts below `threshold - hysteresis` release an active sensor.
pub const TOUCH_HYSTERESIS: u16 = 10;

/// Frames averaged into each sensor baseline at start-up.
pub const BASELINE_SAMPLES: usize = 16;

/// Accepted range for a captured baseline. Outside it the electrode is
/// treated as shorted or floating and initialisation fails.
pub const BASELINE_MIN: u16 = 16;
pub const BASELINE_MAX: u16 = 4000;

// Tuner (diagnostics over I²C)

/// 7-bit I²C slave address the tuner host talks to.
pub const TUNER_I2C_ADDRESS: u8 = 0x08;

// Console

/// Console UART baud rate.
pub const CONSOLE_BAUD: u32 = 115_200;

/// Depth of the change-event queue feeding the console task.
///
/// A cycle emits at most `WIDGET_COUNT` lines of under 52 bytes. At
/// 115200 baud that is about 14 ms of UART time per 20 ms cycle, so the
/// queue only has to absorb bursts. Two full cycles fit.
pub const CONSOLE_QUEUE_DEPTH: usize = 8;

const _: () = assert!(CONSOLE_QUEUE_DEPTH >= 2 * WIDGET_COUNT);

/// Maximum length of one rendered console line.
pub const CONSOLE_LINE_CAPACITY: usize = 64;

// GPIO pin assignments (nRF52840-DK defaults)
//
//   Status LED (LED1, active-low) → P0.13
//   Console UART TX / RX          → P0.06 / P0.08
//   Tuner I²C SDA / SCL           → P0.26 / P0.27
//   Button 0 / Button 1           → AIN0 (P0.02) / AIN1 (P0.03)
//   Slider segments 0..4          → AIN2..AIN6 (P0.04, P0.05, P0.28, P0.29, P0.30)

/// Scheduler behaviour knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanConfig {
    /// Tick period (ms).
    pub period_ms: u64,
    /// Bound on a completion wait (ms), `None` for no bound.
    pub completion_timeout_ms: Option<u64>,
    /// Trigger one scan as soon as the engine is initialised.
    pub prime_on_start: bool,
}

impl ScanConfig {
    pub const DEFAULT: Self = Self {
        period_ms: SCAN_PERIOD_MS,
        completion_timeout_ms: COMPLETION_TIMEOUT_MS,
        prime_on_start: PRIME_SCAN_ON_START,
    };
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
