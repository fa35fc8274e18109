//! SAADC-backed sensing engine.
//!
//! Each electrode is wired to one SAADC input; a scan samples all of them
//! in one burst. The scan itself runs in [`saadc_task`], which the engine
//! wakes through a signal. The SAADC END interrupt resumes that task, and
//! it releases the completion signal once the frame is stored, so the
//! scheduler never sees a completion before the data is readable.
//!
//! Touch detection and tuner publishing happen in the scheduler's context
//! (`process_widgets` / `run_tuner`).

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use capsense_scan::config::{BASELINE_SAMPLES, SCAN_PERIOD_MS, SENSOR_COUNT};
use capsense_scan::detect::{Baseline, Detector, Frame};
use capsense_scan::engine::SensingEngine;
use capsense_scan::error::InitError;
use capsense_scan::signal::CompletionReleaser;
use capsense_scan::widget::{SliderTouch, WidgetId};
use defmt::{debug, info};
use embassy_nrf::saadc::Saadc;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;

use crate::tuner_link::TUNER;

static SCAN_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static SCAN_BUSY: AtomicBool = AtomicBool::new(false);
static LATEST_FRAME: Mutex<CriticalSectionRawMutex, Cell<Frame>> =
    Mutex::new(Cell::new([0; SENSOR_COUNT]));

fn to_frame(samples: &[i16; SENSOR_COUNT]) -> Frame {
    // Negative readings are noise around ground.
    core::array::from_fn(|i| samples[i].max(0) as u16)
}

/// Sample untouched electrodes at start-up.
///
/// Frames are spaced one scan period apart so slow drift is averaged the
/// same way it will be seen later.
pub async fn capture_baseline(saadc: &mut Saadc<'_, SENSOR_COUNT>) -> Baseline {
    let mut baseline = Baseline::new();
    let mut samples = [0i16; SENSOR_COUNT];
    for _ in 0..BASELINE_SAMPLES {
        saadc.sample(&mut samples).await;
        baseline.push(&to_frame(&samples));
        Timer::after_millis(SCAN_PERIOD_MS).await;
    }
    debug!("baseline: {} frames", baseline.samples());
    baseline
}

pub struct SaadcEngine {
    calibration: Baseline,
    detector: Option<Detector>,
}

impl SaadcEngine {
    pub fn new(calibration: Baseline) -> Self {
        Self {
            calibration,
            detector: None,
        }
    }
}

impl SensingEngine for SaadcEngine {
    fn initialize(&mut self) -> Result<(), InitError> {
        let baseline = self.calibration.finish()?;
        info!("baseline: {}", baseline);

        let detector = Detector::new(baseline);
        TUNER.lock(|regs| {
            let mut regs = regs.borrow_mut();
            regs.set_thresholds(detector.thresholds());
            regs.publish(&detector.status());
        });
        self.detector = Some(detector);
        Ok(())
    }

    fn trigger_scan(&mut self) {
        SCAN_BUSY.store(true, Ordering::Release);
        SCAN_REQUEST.signal(());
    }

    fn is_busy(&self) -> bool {
        SCAN_BUSY.load(Ordering::Acquire)
    }

    fn read_button(&self, widget: WidgetId, sensor: u8) -> bool {
        self.detector
            .as_ref()
            .is_some_and(|d| d.button(widget, sensor))
    }

    fn read_slider(&self, widget: WidgetId) -> SliderTouch {
        self.detector
            .as_ref()
            .map_or(SliderTouch::NONE, |d| d.slider(widget))
    }

    fn process_widgets(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            detector.update(&LATEST_FRAME.lock(Cell::get));
        }
    }

    fn run_tuner(&mut self) {
        let Some(detector) = self.detector.as_mut() else {
            return;
        };
        TUNER.lock(|regs| {
            let mut regs = regs.borrow_mut();
            let thresholds = regs.thresholds();
            if &thresholds != detector.thresholds() {
                info!("tuner: thresholds {}", thresholds);
                detector.set_thresholds(&thresholds);
            }
            regs.publish(&detector.status());
        });
    }
}

/// Runs requested scans and reports their completion.
#[embassy_executor::task]
pub async fn saadc_task(
    mut saadc: Saadc<'static, SENSOR_COUNT>,
    releaser: CompletionReleaser<'static>,
) {
    let mut samples = [0i16; SENSOR_COUNT];
    loop {
        SCAN_REQUEST.wait().await;
        saadc.sample(&mut samples).await;
        LATEST_FRAME.lock(|frame| frame.set(to_frame(&samples)));
        SCAN_BUSY.store(false, Ordering::Release);

        if !releaser.release() {
            debug!("completion dropped: scan was abandoned");
        }
    }
}
