//! Touch detection on raw electrode counts.
//!
//! Each scan yields one raw count per electrode. A [`Baseline`] averages
//! untouched frames at start-up; the [`Detector`] then compares every new
//! frame against it. An electrode turns active once its count rises
//! `threshold` above baseline and stays active until it drops below
//! `threshold - TOUCH_HYSTERESIS`.
//!
//! Slider segments are grouped into contacts (runs of adjacent active
//! segments). With a single contact the position is the count-weighted
//! centroid of the strongest segment and its two neighbours, scaled to
//! `0..=SLIDER_RESOLUTION`.

use crate::config::{
    BASELINE_MAX, BASELINE_MIN, BUTTON_SENSORS, DEFAULT_FINGER_THRESHOLD, SENSOR_COUNT,
    SLIDER_NUM_TOUCH, SLIDER_RESOLUTION, SLIDER_SEGMENTS, TOUCH_HYSTERESIS, WIDGETS,
};
use crate::error::InitError;
use crate::tuner::TunerStatus;
use crate::widget::{Position, SliderTouch, WidgetId, WidgetKind};

/// One count per electrode, in scan order.
pub type Frame = [u16; SENSOR_COUNT];

/// Index of the first slider segment in a [`Frame`].
pub const SLIDER_FIRST_SENSOR: usize = 2 * BUTTON_SENSORS;

/// Frame index of electrode `sensor` of a button widget.
pub const fn button_sensor(widget: WidgetId, sensor: u8) -> Option<usize> {
    let sensor = sensor as usize;
    if sensor >= BUTTON_SENSORS {
        return None;
    }
    match widget {
        WidgetId::Button0 => Some(sensor),
        WidgetId::Button1 => Some(BUTTON_SENSORS + sensor),
        WidgetId::Slider0 => None,
    }
}

fn segment_position(segment: usize) -> Position {
    segment as Position * SLIDER_RESOLUTION / (SLIDER_SEGMENTS as Position - 1)
}

/// Start-up baseline accumulator.
pub struct Baseline {
    sums: [u32; SENSOR_COUNT],
    samples: u32,
}

impl Baseline {
    pub const fn new() -> Self {
        Self {
            sums: [0; SENSOR_COUNT],
            samples: 0,
        }
    }

    pub fn push(&mut self, frame: &Frame) {
        for (sum, count) in self.sums.iter_mut().zip(frame) {
            *sum += u32::from(*count);
        }
        self.samples += 1;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Average of the pushed frames. Fails if nothing was pushed or an
    /// electrode averaged outside `BASELINE_MIN..=BASELINE_MAX`.
    pub fn finish(&self) -> Result<Frame, InitError> {
        if self.samples == 0 {
            return Err(InitError::NotCalibrated);
        }
        let mut baseline = [0u16; SENSOR_COUNT];
        for (sensor, (out, sum)) in baseline.iter_mut().zip(self.sums).enumerate() {
            let average = sum / self.samples;
            if !(u32::from(BASELINE_MIN)..=u32::from(BASELINE_MAX)).contains(&average) {
                return Err(InitError::BaselineOutOfRange {
                    sensor: sensor as u8,
                });
            }
            *out = average as u16;
        }
        Ok(baseline)
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Detector {
    baseline: Frame,
    thresholds: Frame,
    raw: Frame,
    active: [bool; SENSOR_COUNT],
    slider: SliderTouch,
    scans: u16,
}

impl Detector {
    pub fn new(baseline: Frame) -> Self {
        Self {
            baseline,
            thresholds: [DEFAULT_FINGER_THRESHOLD; SENSOR_COUNT],
            raw: baseline,
            active: [false; SENSOR_COUNT],
            slider: SliderTouch::NONE,
            scans: 0,
        }
    }

    /// Feed the counts of one completed scan.
    pub fn update(&mut self, raw: &Frame) {
        self.raw = *raw;
        for sensor in 0..SENSOR_COUNT {
            let delta = self.delta(sensor);
            let threshold = self.thresholds[sensor];
            self.active[sensor] = if self.active[sensor] {
                delta >= threshold.saturating_sub(TOUCH_HYSTERESIS)
            } else {
                delta >= threshold
            };
        }
        self.slider = self.locate_slider();
        self.scans = self.scans.wrapping_add(1);
    }

    pub fn button(&self, widget: WidgetId, sensor: u8) -> bool {
        button_sensor(widget, sensor).is_some_and(|i| self.active[i])
    }

    pub fn slider(&self, widget: WidgetId) -> SliderTouch {
        match widget {
            WidgetId::Slider0 => self.slider,
            _ => SliderTouch::NONE,
        }
    }

    pub fn thresholds(&self) -> &Frame {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: &Frame) {
        self.thresholds = *thresholds;
    }

    pub fn scans(&self) -> u16 {
        self.scans
    }

    /// Snapshot for the tuner register file.
    pub fn status(&self) -> TunerStatus {
        let mut widget_bits = 0u8;
        for (bit, widget) in WIDGETS.iter().enumerate() {
            let on = match widget.kind {
                WidgetKind::Button { sensor } => self.button(widget.id, sensor),
                WidgetKind::Slider => self.slider(widget.id).contact_count > 0,
            };
            if on {
                widget_bits |= 1 << bit;
            }
        }
        TunerStatus {
            widget_bits,
            slider_contacts: u8::try_from(self.slider.contact_count).unwrap_or(u8::MAX),
            slider_position: self.slider.position.and_then(|p| u16::try_from(p).ok()),
            scan_count: self.scans,
            raw: self.raw,
            baseline: self.baseline,
        }
    }

    fn delta(&self, sensor: usize) -> u16 {
        self.raw[sensor].saturating_sub(self.baseline[sensor])
    }

    fn locate_slider(&self) -> SliderTouch {
        let active = &self.active[SLIDER_FIRST_SENSOR..];

        let mut contacts = 0u32;
        let mut previous = false;
        for &on in active {
            if on && !previous {
                contacts += 1;
            }
            previous = on;
        }
        if contacts != SLIDER_NUM_TOUCH {
            return SliderTouch {
                contact_count: contacts,
                position: None,
            };
        }

        let deltas: [u16; SLIDER_SEGMENTS] =
            core::array::from_fn(|i| self.delta(SLIDER_FIRST_SENSOR + i));
        let Some(peak) = (0..SLIDER_SEGMENTS)
            .filter(|&i| active[i])
            .max_by_key(|&i| deltas[i])
        else {
            return SliderTouch::NONE;
        };

        let low = peak.saturating_sub(1);
        let high = (peak + 1).min(SLIDER_SEGMENTS - 1);
        let mut weighted = 0u32;
        let mut total = 0u32;
        for (segment, delta) in deltas.iter().enumerate().take(high + 1).skip(low) {
            weighted += u32::from(*delta) * segment_position(segment);
            total += u32::from(*delta);
        }
        let position = if total == 0 {
            segment_position(peak)
        } else {
            weighted / total
        };
        SliderTouch::single(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u16 = 400;
    const TOUCH: u16 = BASE + DEFAULT_FINGER_THRESHOLD + 20;

    fn detector() -> Detector {
        Detector::new([BASE; SENSOR_COUNT])
    }

    fn slider_frame(segments: [u16; SLIDER_SEGMENTS]) -> Frame {
        let mut frame = [BASE; SENSOR_COUNT];
        frame[SLIDER_FIRST_SENSOR..].copy_from_slice(&segments);
        frame
    }

    // ═══════════════════════════════════════════════════════════════════
    // Baseline
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn baseline_averages_frames() {
        let mut baseline = Baseline::new();
        baseline.push(&[300; SENSOR_COUNT]);
        baseline.push(&[500; SENSOR_COUNT]);
        assert_eq!(baseline.samples(), 2);
        assert_eq!(baseline.finish(), Ok([400; SENSOR_COUNT]));
    }

    #[test]
    fn empty_baseline_is_not_calibrated() {
        assert_eq!(Baseline::new().finish(), Err(InitError::NotCalibrated));
    }

    #[test]
    fn shorted_electrode_fails_baseline() {
        let mut frame = [BASE; SENSOR_COUNT];
        frame[3] = 0;
        let mut baseline = Baseline::new();
        baseline.push(&frame);
        assert_eq!(
            baseline.finish(),
            Err(InitError::BaselineOutOfRange { sensor: 3 })
        );
    }

    // ═══════════════════════════════════════════════════════════════════
    // Buttons
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn button_threshold_and_hysteresis() {
        let mut d = detector();
        let mut frame = [BASE; SENSOR_COUNT];

        frame[0] = BASE + DEFAULT_FINGER_THRESHOLD - 1;
        d.update(&frame);
        assert!(!d.button(WidgetId::Button0, 0));

        frame[0] = BASE + DEFAULT_FINGER_THRESHOLD;
        d.update(&frame);
        assert!(d.button(WidgetId::Button0, 0));
        assert!(!d.button(WidgetId::Button1, 0));

        // Inside the hysteresis band: still active
        frame[0] = BASE + DEFAULT_FINGER_THRESHOLD - TOUCH_HYSTERESIS;
        d.update(&frame);
        assert!(d.button(WidgetId::Button0, 0));

        frame[0] = BASE;
        d.update(&frame);
        assert!(!d.button(WidgetId::Button0, 0));
        assert_eq!(d.scans(), 4);
    }

    #[test]
    fn counts_below_baseline_never_touch() {
        let mut d = detector();
        d.update(&[0; SENSOR_COUNT]);
        assert!(!d.button(WidgetId::Button0, 0));
        assert_eq!(d.slider(WidgetId::Slider0), SliderTouch::NONE);
    }

    #[test]
    fn button_sensor_mapping() {
        assert_eq!(button_sensor(WidgetId::Button0, 0), Some(0));
        assert_eq!(button_sensor(WidgetId::Button1, 0), Some(BUTTON_SENSORS));
        assert_eq!(button_sensor(WidgetId::Slider0, 0), None);
        assert_eq!(button_sensor(WidgetId::Button0, BUTTON_SENSORS as u8), None);
    }

    #[test]
    fn threshold_update_takes_effect_next_scan() {
        let mut d = detector();
        let mut frame = [BASE; SENSOR_COUNT];
        frame[1] = BASE + 40;
        d.update(&frame);
        assert!(!d.button(WidgetId::Button1, 0));

        d.set_thresholds(&[30; SENSOR_COUNT]);
        d.update(&frame);
        assert!(d.button(WidgetId::Button1, 0));
        assert_eq!(d.thresholds(), &[30; SENSOR_COUNT]);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Slider
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn slider_centroid_between_segments() {
        let mut d = detector();
        d.update(&slider_frame([BASE, BASE + 100, BASE + 100, BASE, BASE]));
        assert_eq!(d.slider(WidgetId::Slider0), SliderTouch::single(37));
    }

    #[test]
    fn slider_ends() {
        let mut d = detector();
        d.update(&slider_frame([TOUCH, BASE, BASE, BASE, BASE]));
        assert_eq!(d.slider(WidgetId::Slider0), SliderTouch::single(0));

        d.update(&slider_frame([BASE, BASE, BASE, BASE, TOUCH]));
        assert_eq!(
            d.slider(WidgetId::Slider0),
            SliderTouch::single(SLIDER_RESOLUTION)
        );
    }

    #[test]
    fn two_contacts_have_no_position() {
        let mut d = detector();
        d.update(&slider_frame([TOUCH, BASE, BASE, BASE, TOUCH]));
        let touch = d.slider(WidgetId::Slider0);
        assert_eq!(touch.contact_count, 2);
        assert_eq!(touch.valid_position(), None);
    }

    #[test]
    fn slider_reading_only_for_slider_widget() {
        let mut d = detector();
        d.update(&slider_frame([BASE, BASE, TOUCH, BASE, BASE]));
        assert_eq!(d.slider(WidgetId::Slider0), SliderTouch::single(50));
        assert_eq!(d.slider(WidgetId::Button0), SliderTouch::NONE);
    }

    #[test]
    fn status_reports_widgets_and_counts() {
        let mut d = detector();
        let mut frame = slider_frame([BASE, BASE, TOUCH, BASE, BASE]);
        frame[0] = TOUCH;
        d.update(&frame);

        let status = d.status();
        assert_eq!(status.widget_bits, 0b101);
        assert_eq!(status.slider_contacts, 1);
        assert_eq!(status.slider_position, Some(50));
        assert_eq!(status.scan_count, 1);
        assert_eq!(status.raw, frame);
        assert_eq!(status.baseline, [BASE; SENSOR_COUNT]);
    }
}
