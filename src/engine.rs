//! Sensing engine seam.
//!
//! The engine owns the scan hardware and the touch-detection algorithm.
//! The scan loop only ever triggers it, asks whether it is busy and reads
//! widget results after a completed scan. Completion is reported by the
//! engine itself through a [`CompletionReleaser`](crate::signal::CompletionReleaser)
//! it holds, from whatever context observes the end of scan (usually an
//! interrupt).

use crate::error::InitError;
use crate::widget::{SliderTouch, WidgetId};

pub trait SensingEngine {
    /// Bring up the scan hardware. Called once, before any trigger.
    fn initialize(&mut self) -> Result<(), InitError>;

    /// Start a scan of all widgets. Only called while [`is_busy`](Self::is_busy)
    /// returns `false`.
    fn trigger_scan(&mut self);

    /// `true` while a scan is in progress.
    fn is_busy(&self) -> bool;

    /// Active flag of one electrode of a button widget.
    fn read_button(&self, widget: WidgetId, sensor: u8) -> bool;

    /// Contact count and position of a slider widget.
    fn read_slider(&self, widget: WidgetId) -> SliderTouch;

    /// Turn the latest raw scan into widget results. Called once per
    /// completed scan, before any read.
    fn process_widgets(&mut self) {}

    /// Exchange data with the diagnostics buffer. Called once per
    /// completed scan, after [`process_widgets`](Self::process_widgets).
    fn run_tuner(&mut self) {}
}
