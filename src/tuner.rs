//! Tuner register file.
//!
//! Byte-addressed buffer exposed to an external tuning host over I²C
//! (address [`TUNER_I2C_ADDRESS`](crate::config::TUNER_I2C_ADDRESS)).
//! Every transaction starts with a 16-bit big-endian sub-address; a write
//! may carry data after it, a read returns bytes from the last
//! sub-address onwards.
//!
//! Layout (multi-byte fields little-endian):
//! ```text
//! 0x00  [u16; SENSOR_COUNT]  finger thresholds        read/write
//! ----  RW_BOUNDARY --------------------------------------------
//! +0    u8                   widget status bits       read-only
//! +1    u8                   slider contact count
//! +2    u16                  slider position (0xFFFF = none)
//! +4    u16                  scan counter
//! +6    [u16; SENSOR_COUNT]  raw counts
//! ..    [u16; SENSOR_COUNT]  baselines
//! ```
//!
//! The sensing engine owns the contents: it publishes status and picks up
//! threshold writes once per completed scan.

use crate::config::SENSOR_COUNT;
use crate::error::TunerError;

/// Bytes of sub-address preceding every write.
pub const SUB_ADDRESS_LEN: usize = 2;

pub const THRESHOLDS_OFFSET: usize = 0;
/// Bytes below this offset are writable by the host.
pub const RW_BOUNDARY: usize = THRESHOLDS_OFFSET + 2 * SENSOR_COUNT;
pub const WIDGET_STATUS_OFFSET: usize = RW_BOUNDARY;
pub const SLIDER_CONTACTS_OFFSET: usize = WIDGET_STATUS_OFFSET + 1;
pub const SLIDER_POSITION_OFFSET: usize = SLIDER_CONTACTS_OFFSET + 1;
pub const SCAN_COUNTER_OFFSET: usize = SLIDER_POSITION_OFFSET + 2;
pub const RAW_COUNTS_OFFSET: usize = SCAN_COUNTER_OFFSET + 2;
pub const BASELINES_OFFSET: usize = RAW_COUNTS_OFFSET + 2 * SENSOR_COUNT;
pub const TUNER_BUFFER_SIZE: usize = BASELINES_OFFSET + 2 * SENSOR_COUNT;

/// Read value past the end of the register file.
const FILL: u8 = 0xFF;
const NO_POSITION: u16 = 0xFFFF;

/// Snapshot the engine publishes after each scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TunerStatus {
    /// Bit per widget, in widget-table order.
    pub widget_bits: u8,
    pub slider_contacts: u8,
    pub slider_position: Option<u16>,
    pub scan_count: u16,
    pub raw: [u16; SENSOR_COUNT],
    pub baseline: [u16; SENSOR_COUNT],
}

pub struct TunerRegisters {
    buf: [u8; TUNER_BUFFER_SIZE],
    offset: usize,
}

impl TunerRegisters {
    pub const fn new() -> Self {
        Self {
            buf: [0; TUNER_BUFFER_SIZE],
            offset: 0,
        }
    }

    /// Handle a host write.
    ///
    /// Sets the sub-address and stores any payload bytes that fall below
    /// [`RW_BOUNDARY`]; bytes beyond it are dropped, as the bus would NACK
    /// them. Returns the number of payload bytes stored.
    pub fn handle_write(&mut self, data: &[u8]) -> Result<usize, TunerError> {
        if data.len() < SUB_ADDRESS_LEN {
            return Err(TunerError::ShortSubAddress);
        }
        let sub_address = u16::from_be_bytes([data[0], data[1]]);
        let offset = usize::from(sub_address);
        if offset > TUNER_BUFFER_SIZE {
            return Err(TunerError::OffsetOutOfRange(sub_address));
        }
        self.offset = offset;

        let payload = &data[SUB_ADDRESS_LEN..];
        let writable = RW_BOUNDARY.saturating_sub(offset).min(payload.len());
        self.buf[offset..offset + writable].copy_from_slice(&payload[..writable]);
        Ok(writable)
    }

    /// Handle a host read starting at the current sub-address. Fills the
    /// whole of `out`, padding past the end with `0xFF`.
    pub fn handle_read(&self, out: &mut [u8]) -> usize {
        let available = &self.buf[self.offset.min(TUNER_BUFFER_SIZE)..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        out[n..].fill(FILL);
        out.len()
    }

    pub fn thresholds(&self) -> [u16; SENSOR_COUNT] {
        let mut thresholds = [0u16; SENSOR_COUNT];
        for (i, t) in thresholds.iter_mut().enumerate() {
            *t = self.read_u16(THRESHOLDS_OFFSET + 2 * i);
        }
        thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: &[u16; SENSOR_COUNT]) {
        for (i, t) in thresholds.iter().enumerate() {
            self.write_u16(THRESHOLDS_OFFSET + 2 * i, *t);
        }
    }

    pub fn publish(&mut self, status: &TunerStatus) {
        self.buf[WIDGET_STATUS_OFFSET] = status.widget_bits;
        self.buf[SLIDER_CONTACTS_OFFSET] = status.slider_contacts;
        self.write_u16(
            SLIDER_POSITION_OFFSET,
            status.slider_position.unwrap_or(NO_POSITION),
        );
        self.write_u16(SCAN_COUNTER_OFFSET, status.scan_count);
        for i in 0..SENSOR_COUNT {
            self.write_u16(RAW_COUNTS_OFFSET + 2 * i, status.raw[i]);
            self.write_u16(BASELINES_OFFSET + 2 * i, status.baseline[i]);
        }
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.buf[at], self.buf[at + 1]])
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for TunerRegisters {
    fn default() -> Self {
        Self::new()
    }
}
