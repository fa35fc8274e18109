//! Unified error type for capsense-scan.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

use core::fmt;

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The sensing engine could not be brought up. Fatal.
    Init(InitError),

    /// A triggered scan never signalled completion within the bound.
    MissingCompletion,

    /// A tuner bus transaction was malformed.
    Tuner(TunerError),

    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Reasons the sensing engine refuses to initialise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Raw status code reported by the engine.
    Status(u32),
    /// A sensor's baseline fell outside the accepted range.
    BaselineOutOfRange { sensor: u8 },
    /// No baseline was captured before initialisation.
    NotCalibrated,
}

/// Malformed tuner transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TunerError {
    /// Write shorter than the 16-bit sub-address.
    ShortSubAddress,
    /// Sub-address beyond the end of the register file.
    OffsetOutOfRange(u16),
}

// Convenience conversions

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Error::Init(e)
    }
}

impl From<TunerError> for Error {
    fn from(e: TunerError) -> Self {
        Error::Tuner(e)
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Status(code) => write!(f, "Status code: {}", code),
            InitError::BaselineOutOfRange { sensor } => {
                write!(f, "Baseline out of range on sensor {}", sensor)
            }
            InitError::NotCalibrated => f.write_str("Baseline not captured"),
        }
    }
}
