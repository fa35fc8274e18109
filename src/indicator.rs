//! Status LED driven by the combined touch level.

use embedded_hal::digital::OutputPin;

use crate::reporter::IndicatorSink;

/// Electrical level that lights the LED.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    /// Kit LEDs sink current: low = on.
    ActiveLow,
}

pub struct LedIndicator<P> {
    pin: P,
    polarity: Polarity,
    lit: bool,
}

impl<P: OutputPin> LedIndicator<P> {
    /// Take the pin and drive the LED off.
    pub fn new(pin: P, polarity: Polarity) -> Self {
        let mut led = Self {
            pin,
            polarity,
            lit: false,
        };
        led.set_indicator(false);
        led
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> IndicatorSink for LedIndicator<P> {
    fn set_indicator(&mut self, active: bool) {
        let high = match self.polarity {
            Polarity::ActiveHigh => active,
            Polarity::ActiveLow => !active,
        };
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        // A failed write leaves the LED where it was.
        if result.is_ok() {
            self.lit = active;
        }
    }
}
